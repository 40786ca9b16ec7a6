//! Decryption of `ENC(...)` values after resolution.

use crate::cipher::{self, Encryptor};
use crate::source::ValueSource;
use crate::{PropCryptError, PropertyMap, Result};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Property (and system property) carrying the encryptor password.
pub const PASSWORD_KEY: &str = "secret.encryptor.password";

/// Replaces every marked value of a property map with its plaintext.
///
/// The password is taken from, in order, the explicit password given to
/// [`SecretDecryptor::run`], the [`PASSWORD_KEY`] property, and the
/// [`PASSWORD_KEY`] system property. The first non-empty one wins.
pub struct SecretDecryptor<'a> {
    encryptor: &'a dyn Encryptor,
    system: &'a dyn ValueSource,
    log_decrypted_values: bool,
}

impl<'a> SecretDecryptor<'a> {
    pub fn new(encryptor: &'a dyn Encryptor, system: &'a dyn ValueSource) -> Self {
        Self {
            encryptor,
            system,
            log_decrypted_values: false,
        }
    }

    /// Logs `decrypted property <marked> to value <plaintext>` for every value.
    pub fn log_decrypted_values(mut self, enabled: bool) -> Self {
        self.log_decrypted_values = enabled;
        self
    }

    /// Picks the password for a pass.
    ///
    /// # Errors
    ///
    /// Returns [`PropCryptError::MissingPassword`] when every source is absent
    /// or empty.
    pub fn resolve_password(
        &self,
        properties: &PropertyMap,
        explicit_password: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        let candidates = [
            ("explicit", explicit_password),
            ("property", properties.get(PASSWORD_KEY).map(String::as_str)),
            ("system", self.system.get(PASSWORD_KEY)),
        ];

        candidates
            .into_iter()
            .find_map(|(origin, candidate)| {
                candidate.filter(|p| !p.is_empty()).map(|p| {
                    debug!("Using {} encryptor password", origin);
                    Zeroizing::new(p.to_string())
                })
            })
            .ok_or(PropCryptError::MissingPassword(PASSWORD_KEY))
    }

    /// Decrypts all marked values in place and returns how many were decrypted.
    ///
    /// Nothing is touched when no password is available. A value that fails to
    /// decrypt stops the pass; values decrypted before it keep their plaintext.
    pub fn run(
        &self,
        properties: &mut PropertyMap,
        explicit_password: Option<&str>,
    ) -> Result<usize> {
        let password = self.resolve_password(properties, explicit_password)?;
        let mut decrypted = 0;

        for (key, value) in properties.iter_mut() {
            if !self.encryptor.is_marked_encrypted(value) {
                continue;
            }

            let plaintext = cipher::decrypt_value(self.encryptor, value, &password).map_err(
                |source| PropCryptError::Decryption {
                    key: key.clone(),
                    source,
                },
            )?;

            if self.log_decrypted_values {
                info!("decrypted property {} to value {}", value, plaintext);
            }

            *value = plaintext;
            decrypted += 1;
        }

        debug!("Decrypted {} properties", decrypted);
        Ok(decrypted)
    }
}
