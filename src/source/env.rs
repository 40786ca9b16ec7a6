use super::ValueSource;
use crate::Result;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::debug;

/// A snapshot of environment variables.
///
/// The snapshot is taken once per resolution pass. Variables whose name or
/// value is not valid Unicode are skipped.
///
/// # Example
///
/// ```ignore
/// # use propcrypt::source::{EnvSource, ValueSource};
/// let env = EnvSource::from_process();
/// let home = env.get("HOME");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        let vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Builds a source from explicit pairs, mostly useful for embedding and tests.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Adds the variables of a `.env` file that are not already set.
    ///
    /// Variables present in the snapshot win over the file, the same way a
    /// shell-exported variable wins over a dotenv default.
    pub fn overlay_dotenv(mut self, path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No dotenv file at {}", path.display());
            return Ok(self);
        }

        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            self.vars.entry(key).or_insert(value);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl ValueSource for EnvSource {
    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

/// Loads the environment layer used by a resolution pass: the process
/// environment, optionally completed by a `.env` file.
pub fn load_environment(env_file: Option<&Path>) -> Result<EnvSource> {
    let source = EnvSource::from_process();
    let source = match env_file {
        Some(path) => source.overlay_dotenv(path)?,
        None => source,
    };
    debug!("Loaded {} environment variables", source.len());
    Ok(source)
}
