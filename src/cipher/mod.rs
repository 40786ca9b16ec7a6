//! # Cipher Engine
//!
//! Encrypted property values are stored as `ENC(<ciphertext>)`. This module
//! defines the [`Encryptor`] seam used by the decryption pass, the marker
//! helpers shared by the `encrypt` and `decrypt` commands, and the
//! password-based implementation [`PbeEncryptor`].

use thiserror::Error;

pub mod pbe;

#[cfg(test)]
mod tests;

pub use pbe::PbeEncryptor;

/// Opening of the encrypted-value marker.
pub const MARKER_PREFIX: &str = "ENC(";

/// Closing of the encrypted-value marker.
pub const MARKER_SUFFIX: &str = ")";

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid encryptor configuration: {0}")]
    InvalidConfig(String),
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("ciphertext decoding failed: {0}")]
    DecodeFailed(String),
    #[error("value is not marked as encrypted: {0}")]
    NotMarked(String),
}

/// A password-based string cipher.
///
/// Implementations receive the bare ciphertext, without the `ENC(...)` marker.
pub trait Encryptor: Send + Sync {
    /// Encrypts `plaintext` and returns the encoded ciphertext.
    fn encrypt(&self, plaintext: &str, password: &str) -> Result<String, CipherError>;

    /// Decrypts an encoded ciphertext produced by [`Encryptor::encrypt`].
    ///
    /// Fails on a wrong password or corrupted ciphertext.
    fn decrypt(&self, ciphertext: &str, password: &str) -> Result<String, CipherError>;

    /// Whether `value` carries the `ENC(...)` marker.
    fn is_marked_encrypted(&self, value: &str) -> bool {
        is_marked(value)
    }
}

/// Whether `value`, ignoring surrounding whitespace, is wrapped in `ENC(...)`.
pub fn is_marked(value: &str) -> bool {
    unwrap(value).is_some()
}

/// Wraps a ciphertext in the marker.
pub fn wrap(ciphertext: &str) -> String {
    format!("{}{}{}", MARKER_PREFIX, ciphertext, MARKER_SUFFIX)
}

/// Returns the ciphertext inside `ENC(...)`, or `None` when unmarked.
pub fn unwrap(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)
}

/// Encrypts `plaintext` and wraps the result in the marker.
pub fn encrypt_value(
    encryptor: &dyn Encryptor,
    plaintext: &str,
    password: &str,
) -> Result<String, CipherError> {
    encryptor.encrypt(plaintext, password).map(|c| wrap(&c))
}

/// Decrypts a marked value.
pub fn decrypt_value(
    encryptor: &dyn Encryptor,
    value: &str,
    password: &str,
) -> Result<String, CipherError> {
    let ciphertext = unwrap(value).ok_or_else(|| CipherError::NotMarked(value.to_string()))?;
    encryptor.decrypt(ciphertext, password)
}
