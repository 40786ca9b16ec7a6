use super::*;
use propcrypt_core::{EncryptorConfig, IvGenerator, SaltGenerator, StringOutputType};

/// Cheap key derivation so the suite stays fast
fn fast_config() -> EncryptorConfig {
    EncryptorConfig {
        key_obtention_iterations: 1,
        memory_cost_kib: 64,
        ..EncryptorConfig::default()
    }
}

fn deterministic_config() -> EncryptorConfig {
    EncryptorConfig {
        salt_generator: SaltGenerator::Zero,
        iv_generator: IvGenerator::Fixed("0123456789123456789".to_string()),
        ..fast_config()
    }
}

#[test]
fn test_round_trip() {
    let encryptor = PbeEncryptor::new(fast_config()).unwrap();
    let ciphertext = encryptor.encrypt("value-to-encrypt", "super_secret_passw0rd").unwrap();
    assert_ne!(ciphertext, "value-to-encrypt");

    let plaintext = encryptor.decrypt(&ciphertext, "super_secret_passw0rd").unwrap();
    assert_eq!(plaintext, "value-to-encrypt");
}

#[test]
fn test_wrong_password_fails() {
    let encryptor = PbeEncryptor::new(fast_config()).unwrap();
    let ciphertext = encryptor.encrypt("hi", "pw").unwrap();

    let err = encryptor.decrypt(&ciphertext, "not-pw").unwrap_err();
    assert!(matches!(err, CipherError::DecryptionFailed(_)));
}

#[test]
fn test_random_salt_and_nonce_differ_per_call() {
    let encryptor = PbeEncryptor::new(fast_config()).unwrap();
    let first = encryptor.encrypt("same", "pw").unwrap();
    let second = encryptor.encrypt("same", "pw").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_zero_salt_and_fixed_iv_are_deterministic() {
    let encryptor = PbeEncryptor::new(deterministic_config()).unwrap();
    let first = encryptor.encrypt("value-to-encrypt", "pw").unwrap();
    let second = encryptor.encrypt("value-to-encrypt", "pw").unwrap();
    assert_eq!(first, second);
    assert_eq!(encryptor.decrypt(&first, "pw").unwrap(), "value-to-encrypt");
}

#[test]
fn test_fixed_iv_never_shares_keystream_between_values() {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    let encryptor = PbeEncryptor::new(deterministic_config()).unwrap();
    assert_eq!(encryptor.config().salt_generator, SaltGenerator::Zero);

    let first_plain = "db-password-AAAA";
    let second_plain = "api-token-BBBBBB";
    let first = encryptor.encrypt(first_plain, "pw").unwrap();
    let second = encryptor.encrypt(second_plain, "pw").unwrap();
    let first_bytes = STANDARD.decode(&first).unwrap();
    let second_bytes = STANDARD.decode(&second).unwrap();

    // same zero salt, different nonces
    assert_eq!(first_bytes[..16], second_bytes[..16]);
    assert_ne!(first_bytes[16..28], second_bytes[16..28]);

    let body_xor: Vec<u8> = first_bytes[28..44]
        .iter()
        .zip(&second_bytes[28..44])
        .map(|(a, b)| a ^ b)
        .collect();
    let plain_xor: Vec<u8> = first_plain
        .bytes()
        .zip(second_plain.bytes())
        .map(|(a, b)| a ^ b)
        .collect();
    assert_ne!(body_xor, plain_xor);

    assert_eq!(encryptor.decrypt(&first, "pw").unwrap(), first_plain);
    assert_eq!(encryptor.decrypt(&second, "pw").unwrap(), second_plain);
}

#[test]
fn test_fixed_iv_nonce_depends_on_iv_text() {
    let other = PbeEncryptor::new(EncryptorConfig {
        iv_generator: IvGenerator::Fixed("another-iv".to_string()),
        ..deterministic_config()
    })
    .unwrap();
    let encryptor = PbeEncryptor::new(deterministic_config()).unwrap();

    let first = encryptor.encrypt("same", "pw").unwrap();
    let second = other.encrypt("same", "pw").unwrap();
    assert_ne!(first, second);
    assert_eq!(other.decrypt(&first, "pw").unwrap(), "same");
}

#[test]
fn test_hexadecimal_output() {
    let encryptor = PbeEncryptor::new(EncryptorConfig {
        string_output_type: StringOutputType::Hexadecimal,
        ..fast_config()
    })
    .unwrap();

    let ciphertext = encryptor.encrypt("hex me", "pw").unwrap();
    assert!(ciphertext.chars().all(|c| c.is_ascii_hexdigit()));
    // salt + nonce + plaintext + tag, two characters per byte
    assert_eq!(ciphertext.len(), (16 + 12 + "hex me".len() + 16) * 2);
    assert_eq!(encryptor.decrypt(&ciphertext, "pw").unwrap(), "hex me");
}

#[test]
fn test_output_type_mismatch_fails_to_decode() {
    let base64 = PbeEncryptor::new(fast_config()).unwrap();
    let hex = PbeEncryptor::new(EncryptorConfig {
        string_output_type: StringOutputType::Hexadecimal,
        ..fast_config()
    })
    .unwrap();

    let ciphertext = base64.encrypt("payload/with+chars", "pw").unwrap();
    assert!(hex.decrypt(&ciphertext, "pw").is_err());
}

#[test]
fn test_truncated_ciphertext() {
    let encryptor = PbeEncryptor::new(fast_config()).unwrap();
    let err = encryptor.decrypt("AAAA", "pw").unwrap_err();
    assert!(format!("{err}").contains("decryption failed"));

    let err = encryptor.decrypt("not base64 at all!", "pw").unwrap_err();
    assert!(matches!(err, CipherError::DecodeFailed(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let err = PbeEncryptor::new(EncryptorConfig {
        key_obtention_iterations: 0,
        ..fast_config()
    })
    .unwrap_err();
    assert!(matches!(err, CipherError::InvalidConfig(_)));
}

#[test]
fn test_marker_helpers() {
    assert!(is_marked("ENC(abc)"));
    assert!(is_marked("  ENC(abc)  "));
    assert!(!is_marked("ENC(abc"));
    assert!(!is_marked("enc(abc)"));
    assert!(!is_marked("prefix ENC(abc)"));

    assert_eq!(wrap("abc"), "ENC(abc)");
    assert_eq!(unwrap(" ENC(abc) "), Some("abc"));
    assert_eq!(unwrap("abc"), None);
}

#[test]
fn test_encrypt_and_decrypt_value() {
    let encryptor = PbeEncryptor::new(fast_config()).unwrap();
    let marked = encrypt_value(&encryptor, "hi", "pw").unwrap();
    assert!(encryptor.is_marked_encrypted(&marked));
    assert_eq!(decrypt_value(&encryptor, &marked, "pw").unwrap(), "hi");

    let err = decrypt_value(&encryptor, "plain", "pw").unwrap_err();
    assert!(matches!(err, CipherError::NotMarked(_)));
}
