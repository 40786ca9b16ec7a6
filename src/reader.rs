//! The read pipeline: load, resolve, decrypt.

use crate::cipher::{Encryptor, PbeEncryptor};
use crate::decrypt::SecretDecryptor;
use crate::loader::PropertyLoader;
use crate::pass::ResolutionPass;
use crate::source::{EnvSource, SystemProperties, ValueSource};
use crate::{PropertyMap, Result};
use propcrypt_core::{EncryptorConfig, ReadConfig};
use std::path::PathBuf;
use tracing::info;

/// Counts reported by [`PropertyReader::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadReport {
    /// Entries read from files or URLs.
    pub loaded: usize,
    /// Values replaced by their plaintext.
    pub decrypted: usize,
}

/// Reads properties from the configured resources, resolves their
/// placeholders and decrypts their `ENC(...)` values.
///
/// Resolution happens before decryption, so a placeholder may expand to a
/// marked value and a marked value is never looked into for placeholders.
pub struct PropertyReader {
    config: ReadConfig,
    encryptor: Box<dyn Encryptor>,
    system: SystemProperties,
    env_file: Option<PathBuf>,
    environment: Option<EnvSource>,
}

impl PropertyReader {
    pub fn new(config: ReadConfig, encryptor: Box<dyn Encryptor>) -> Self {
        Self {
            config,
            encryptor,
            system: SystemProperties::new(),
            env_file: None,
            environment: None,
        }
    }

    /// Builds a reader around a [`PbeEncryptor`].
    pub fn with_encryptor_config(config: ReadConfig, encryptor: EncryptorConfig) -> Result<Self> {
        Ok(Self::new(config, Box::new(PbeEncryptor::new(encryptor)?)))
    }

    pub fn system_properties(mut self, system: SystemProperties) -> Self {
        self.system = system;
        self
    }

    /// `.env` file completing the process environment for `${env.NAME}`.
    pub fn env_file(mut self, path: Option<PathBuf>) -> Self {
        self.env_file = path;
        self
    }

    /// Uses a fixed environment instead of the process environment.
    pub fn environment(mut self, environment: EnvSource) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Runs the pipeline into `properties`.
    ///
    /// Entries already in `properties` take part in resolution and decryption
    /// and are overridden by loaded entries with the same key.
    pub fn execute(
        &self,
        properties: &mut PropertyMap,
        password: Option<&str>,
    ) -> Result<ReadReport> {
        let loaded = PropertyLoader::from_config(&self.config).load(properties)?;

        let pass = ResolutionPass::new(&self.system);
        let pass = match (&self.environment, &self.env_file) {
            (Some(environment), _) => pass.with_environment_loader(move || {
                Ok(Box::new(environment.clone()) as Box<dyn ValueSource>)
            }),
            (None, Some(path)) => pass.with_env_file(path.clone()),
            (None, None) => pass,
        };
        pass.run(properties)?;

        let decrypted = SecretDecryptor::new(self.encryptor.as_ref(), &self.system)
            .log_decrypted_values(self.config.log_decrypted_values)
            .run(properties, password)?;

        info!(
            "Read {} properties, decrypted {} values",
            loaded, decrypted
        );

        Ok(ReadReport { loaded, decrypted })
    }
}
