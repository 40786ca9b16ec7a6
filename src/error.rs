//! Error types for propcrypt operations

use crate::cipher::CipherError;
use propcrypt_core::ParseError;
use thiserror::Error;

/// The main error type for propcrypt operations
///
/// Every variant is fatal for the pass that raised it. Tolerated conditions
/// (unknown placeholder targets, malformed placeholders, missing keys) never
/// surface here.
#[derive(Error, Debug)]
pub enum PropCryptError {
    #[error("Configuration error: {0}")]
    Config(#[from] ParseError),
    #[error("Dotenv error: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error(
        "Set files or URLs but not both - otherwise no order of precedence can be guaranteed"
    )]
    ConflictingSources,
    #[error("Properties could not be loaded from {0}")]
    ResourceMissing(String),
    #[error("Error reading properties from {resource}: {reason}")]
    ResourceUnreadable { resource: String, reason: String },
    #[error("Badly formed URL {url} - {reason}")]
    BadUrl { url: String, reason: String },
    #[error("Malformed properties content at line {line}: {reason}")]
    MalformedProperties { line: usize, reason: String },
    #[error("{message}")]
    IllegalReference { key: String, message: String },
    #[error(
        "Encryptor password is missing or empty.\n\nTo fix this, either:\n  1. Pass --password (or set PROPCRYPT_PASSWORD)\n  2. Define the '{0}' property"
    )]
    MissingPassword(&'static str),
    #[error("Failed to decrypt property '{key}': {source}")]
    Decryption {
        key: String,
        #[source]
        source: CipherError,
    },
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("Invalid definition '{0}', expected key=value")]
    InvalidDefinition(String),
}

impl PropCryptError {
    /// The property key this error is about, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            PropCryptError::IllegalReference { key, .. } => Some(key),
            PropCryptError::Decryption { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// A type alias for `Result<T, PropCryptError>`
pub type Result<T> = std::result::Result<T, PropCryptError>;
