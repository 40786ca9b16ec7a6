//! PropCrypt - property files with placeholders and encrypted values
//!
//! This library reads Java-style `.properties` files, substitutes `${key}`
//! placeholders across several precedence layers, and decrypts values stored as
//! `ENC(<ciphertext>)` with a password-based cipher.
//!
//! # Features
//!
//! - **Placeholder Resolution**: Nested `${key}` substitution with cycle detection
//! - **Layered Lookup**: `${env.NAME}` from the environment, then system properties, then the project
//! - **Encrypted Values**: Argon2id key derivation with ChaCha20-Poly1305
//! - **Multiple Sources**: Local files, `file:` and `http(s):` URLs
//!
//! # Example
//!
//! ```ignore
//! use propcrypt::{PropertyMap, PropertyReader, ReadConfig, EncryptorConfig};
//!
//! fn main() -> propcrypt::Result<()> {
//!     let config = ReadConfig {
//!         files: vec!["application.properties".into()],
//!         ..ReadConfig::default()
//!     };
//!
//!     let reader = PropertyReader::with_encryptor_config(config, EncryptorConfig::default())?;
//!     let mut properties = PropertyMap::new();
//!     let report = reader.execute(&mut properties, Some("s3cret"))?;
//!
//!     println!("{} loaded, {} decrypted", report.loaded, report.decrypted);
//!     Ok(())
//! }
//! ```

// Internal modules
mod decrypt;
mod error;
mod pass;
mod reader;
mod resolver;

pub mod cipher;
pub mod loader;
pub mod properties;
pub mod source;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

/// An insertion-ordered map of property keys to values.
pub type PropertyMap = indexmap::IndexMap<String, String>;

// Public API exports
pub use cipher::{CipherError, Encryptor, PbeEncryptor};
pub use decrypt::{PASSWORD_KEY, SecretDecryptor};
pub use error::{PropCryptError, Result};
pub use loader::{PropertyLoader, Resource};
pub use pass::{EnvironmentLoader, ResolutionPass, references_environment};
pub use reader::{PropertyReader, ReadReport};
pub use resolver::{ENV_PREFIX, PlaceholderResolver};
pub use source::{EnvSource, SystemProperties, ValueSource};

// Re-export config types
pub use propcrypt_core::{
    Config, EncryptorConfig, GlobalConfig, IvGenerator, ReadConfig, SaltGenerator,
    StringOutputType,
};
