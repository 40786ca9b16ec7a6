//! Password-based encryption built on Argon2id and ChaCha20-Poly1305.
//!
//! Layout of the encoded ciphertext: `salt (16) || nonce (12) || ciphertext || tag (16)`,
//! rendered as padded standard base64 or lowercase hex.
//!
//! Argon2id yields 64 bytes per salt: the first half keys the cipher, the
//! second half keys the HMAC that derives synthetic nonces. With a fixed IV the
//! nonce is `HMAC-SHA256(nonce key, text || 0 || plaintext)`, so equal
//! plaintexts encrypt identically while distinct plaintexts never share a
//! keystream, even under a zero salt.

use super::{CipherError, Encryptor};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hmac::{Hmac, Mac};
use propcrypt_core::{EncryptorConfig, IvGenerator, SaltGenerator, StringOutputType};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const DERIVED_LEN: usize = 2 * KEY_LEN;
const TAG_LEN: usize = 16;

/// Encrypts strings under a key derived from a password.
///
/// Every call derives a fresh key from the password and the value's salt, so
/// one instance serves any number of passwords.
#[derive(Debug, Clone)]
pub struct PbeEncryptor {
    config: EncryptorConfig,
}

impl PbeEncryptor {
    pub fn new(config: EncryptorConfig) -> Result<Self, CipherError> {
        config.validate().map_err(CipherError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncryptorConfig {
        &self.config
    }

    fn salt(&self) -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        if self.config.salt_generator == SaltGenerator::Random {
            OsRng.fill_bytes(&mut salt);
        }
        salt
    }

    fn nonce(&self, nonce_key: &[u8], plaintext: &str) -> Result<[u8; NONCE_LEN], CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        match &self.config.iv_generator {
            IvGenerator::Random => OsRng.fill_bytes(&mut nonce),
            IvGenerator::Fixed(text) => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(nonce_key)
                    .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))?;
                mac.update(text.as_bytes());
                mac.update(&[0]);
                mac.update(plaintext.as_bytes());
                let tag = mac.finalize().into_bytes();
                nonce.copy_from_slice(&tag[..NONCE_LEN]);
            }
        }
        Ok(nonce)
    }

    /// Derives the cipher key followed by the nonce key.
    fn derive_keys(
        &self,
        password: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; DERIVED_LEN]>, CipherError> {
        let params = Params::new(
            self.config.memory_cost_kib,
            self.config.key_obtention_iterations,
            1,
            Some(DERIVED_LEN),
        )
        .map_err(|e| CipherError::DerivationFailed(format!("{e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; DERIVED_LEN]);
        argon2
            .hash_password_into(password.as_bytes(), salt, output.as_mut_slice())
            .map_err(|e| CipherError::DerivationFailed(format!("{e}")))?;
        Ok(output)
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self.config.string_output_type {
            StringOutputType::Base64 => STANDARD.encode(bytes),
            StringOutputType::Hexadecimal => hex::encode(bytes),
        }
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, CipherError> {
        match self.config.string_output_type {
            StringOutputType::Base64 => STANDARD
                .decode(text.as_bytes())
                .map_err(|e| CipherError::DecodeFailed(format!("{e}"))),
            StringOutputType::Hexadecimal => {
                hex::decode(text).map_err(|e| CipherError::DecodeFailed(format!("{e}")))
            }
        }
    }
}

impl Encryptor for PbeEncryptor {
    fn encrypt(&self, plaintext: &str, password: &str) -> Result<String, CipherError> {
        let salt = self.salt();
        let keys = self.derive_keys(password, &salt)?;
        let (cipher_key, nonce_key) = keys.split_at(KEY_LEN);
        let nonce = self.nonce(nonce_key, plaintext)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(cipher_key));

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(self.encode(&out))
    }

    fn decrypt(&self, ciphertext: &str, password: &str) -> Result<String, CipherError> {
        let bytes = self.decode(ciphertext.trim())?;
        if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed(
                "ciphertext shorter than salt, nonce and authentication tag".to_string(),
            ));
        }

        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let keys = self.derive_keys(password, salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&keys[..KEY_LEN]));

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                CipherError::DecryptionFailed("wrong password or corrupted ciphertext".to_string())
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            drop(Zeroizing::new(e.into_bytes()));
            CipherError::DecryptionFailed("plaintext is not valid UTF-8".to_string())
        })
    }
}
