//! Loading property files and URLs into the project map.

use crate::{PropCryptError, PropertyMap, Result, properties};
use propcrypt_core::ReadConfig;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

/// A place properties can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    File(PathBuf),
    Url(Url),
}

impl Resource {
    /// Parses a URL resource.
    ///
    /// Supported schemes are `file`, `http` and `https`.
    ///
    /// # Errors
    ///
    /// Returns [`PropCryptError::BadUrl`] for malformed URLs and other schemes.
    pub fn from_url(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| PropCryptError::BadUrl {
            url: s.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "file" | "http" | "https" => Ok(Resource::Url(url)),
            scheme => Err(PropCryptError::BadUrl {
                url: s.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            }),
        }
    }

    /// Reads the resource.
    ///
    /// Returns `Ok(None)` when the resource cannot be opened (missing file,
    /// unreachable host, non-success status) and an error when it was opened
    /// but could not be read.
    pub fn fetch(&self) -> Result<Option<String>> {
        match self {
            Resource::File(path) => read_file(path, self),
            Resource::Url(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|_| PropCryptError::BadUrl {
                    url: url.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                read_file(&path, self)
            }
            Resource::Url(url) => {
                let response = match reqwest::blocking::get(url.as_str()) {
                    Ok(response) => response,
                    Err(e) => {
                        debug!("Cannot open {}: {}", self, e);
                        return Ok(None);
                    }
                };
                if !response.status().is_success() {
                    debug!("Cannot open {}: status {}", self, response.status());
                    return Ok(None);
                }
                response
                    .text()
                    .map(Some)
                    .map_err(|e| PropCryptError::ResourceUnreadable {
                        resource: self.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

fn read_file(path: &std::path::Path, resource: &Resource) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| PropCryptError::ResourceUnreadable {
            resource: resource.to_string(),
            reason: e.to_string(),
        })
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::File(path) => write!(f, "File: {}", path.display()),
            Resource::Url(url) => write!(f, "URL {}", url),
        }
    }
}

/// Reads property files or URLs into a [`PropertyMap`].
///
/// Resources are read in order, later definitions overriding earlier ones.
///
/// # Example
///
/// ```ignore
/// # use propcrypt::{PropertyLoader, PropertyMap};
/// let loader = PropertyLoader::new()
///     .files(["defaults.properties", "local.properties"])
///     .quiet(true);
///
/// let mut properties = PropertyMap::new();
/// loader.load(&mut properties)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyLoader {
    files: Vec<PathBuf>,
    urls: Vec<String>,
    quiet: bool,
    key_prefix: Option<String>,
}

impl PropertyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ReadConfig) -> Self {
        Self {
            files: config.files.clone(),
            urls: config.urls.clone(),
            quiet: config.quiet,
            key_prefix: config.key_prefix.clone(),
        }
    }

    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Skip resources that cannot be opened instead of failing.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Prefix prepended to every loaded key.
    pub fn key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix;
        self
    }

    /// Files and URLs are mutually exclusive.
    pub fn check_parameters(&self) -> Result<()> {
        if !self.files.is_empty() && !self.urls.is_empty() {
            return Err(PropCryptError::ConflictingSources);
        }
        Ok(())
    }

    /// Loads every configured resource into `properties` and returns the number
    /// of entries read.
    pub fn load(&self, properties: &mut PropertyMap) -> Result<usize> {
        self.check_parameters()?;

        let mut loaded = 0;
        for file in &self.files {
            loaded += self.load_resource(&Resource::File(file.clone()), properties)?;
        }
        for url in &self.urls {
            loaded += self.load_resource(&Resource::from_url(url)?, properties)?;
        }
        Ok(loaded)
    }

    fn load_resource(&self, resource: &Resource, properties: &mut PropertyMap) -> Result<usize> {
        debug!("Loading properties from {}", resource);

        match resource.fetch()? {
            Some(content) => {
                properties::load_into(&content, properties, self.key_prefix.as_deref())
            }
            None if self.quiet => {
                info!(
                    "Quiet processing - ignoring properties cannot be loaded from {}",
                    resource
                );
                Ok(0)
            }
            None => Err(PropCryptError::ResourceMissing(resource.to_string())),
        }
    }
}
