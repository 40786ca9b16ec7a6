//! Drives the resolver over a whole property map.

use crate::resolver::{ENV_PREFIX, PlaceholderResolver};
use crate::source::{ValueSource, env::load_environment};
use crate::{PropertyMap, Result};
use std::path::PathBuf;
use tracing::debug;

/// Produces the environment layer on demand.
pub type EnvironmentLoader<'a> = Box<dyn Fn() -> Result<Box<dyn ValueSource>> + 'a>;

/// Resolves every value of a property map in place.
///
/// The environment layer is only loaded when at least one value contains
/// `${env.`; otherwise the loader is never called and `env.` placeholders have
/// nothing to resolve against.
pub struct ResolutionPass<'a> {
    resolver: PlaceholderResolver<'a>,
    load_environment: EnvironmentLoader<'a>,
}

impl<'a> ResolutionPass<'a> {
    /// Creates a pass that reads the process environment when needed.
    pub fn new(system: &'a dyn ValueSource) -> Self {
        Self {
            resolver: PlaceholderResolver::new(system),
            load_environment: Box::new(|| {
                load_environment(None).map(|env| Box::new(env) as Box<dyn ValueSource>)
            }),
        }
    }

    /// Replaces the environment loader.
    pub fn with_environment_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ValueSource>> + 'a,
    {
        self.load_environment = Box::new(loader);
        self
    }

    /// Completes the process environment with the variables of a `.env` file.
    pub fn with_env_file(self, path: PathBuf) -> Self {
        self.with_environment_loader(move || {
            load_environment(Some(&path)).map(|env| Box::new(env) as Box<dyn ValueSource>)
        })
    }

    /// Resolves all values of `properties`.
    ///
    /// Keys are visited in map order over a snapshot of the key set. The first
    /// illegal reference aborts the pass; values resolved before it keep their
    /// new form.
    pub fn run(&self, properties: &mut PropertyMap) -> Result<()> {
        let environment = if references_environment(properties) {
            debug!("Environment placeholders found, loading environment");
            Some((self.load_environment)()?)
        } else {
            None
        };

        let keys: Vec<String> = properties.keys().cloned().collect();
        debug!("Resolving {} properties", keys.len());

        for key in keys {
            let value = self
                .resolver
                .resolve(&key, &*properties, environment.as_deref())?;
            properties.insert(key, value);
        }

        Ok(())
    }
}

/// Whether any value references the environment layer.
pub fn references_environment(properties: &PropertyMap) -> bool {
    let marker = format!("${{{}", ENV_PREFIX);
    properties.values().any(|value| value.contains(&marker))
}
