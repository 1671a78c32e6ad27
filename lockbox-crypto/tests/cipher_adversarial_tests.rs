//! Adversarial tests for ChaCha20-Poly1305 wrapping and encryption.
//!
//! Tests wrong-key unwrapping, ciphertext tampering, nonce corruption,
//! truncation attacks and boundary conditions on the base64 wire form.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use lockbox_crypto::{
    decrypt, decrypt_string, encrypt, encrypt_string, generate_random_key, unwrap_key, wrap_key,
    CryptoError, EncryptedData, NONCE_SIZE, TAG_SIZE,
};

// ── Wrong Key ──

#[test]
fn unwrap_with_wrong_key_returns_integrity_error() {
    let key_a = generate_random_key();
    let key_b = generate_random_key();
    let inner = generate_random_key();

    let wrapped = wrap_key(inner.as_bytes(), &key_a).unwrap();
    let err = unwrap_key(&wrapped, &key_b).unwrap_err();

    match err {
        CryptoError::Integrity(msg) => {
            assert!(
                msg.contains("wrong key") || msg.contains("tampered"),
                "should indicate wrong key, got: {msg}"
            );
        }
        other => panic!("expected CryptoError::Integrity, got: {other:?}"),
    }
}

#[test]
fn decrypt_string_with_wrong_key_returns_error() {
    let key_a = generate_random_key();
    let key_b = generate_random_key();

    let encrypted = encrypt_string(&key_a, "secret text").unwrap();
    assert!(matches!(
        decrypt_string(&key_b, &encrypted),
        Err(CryptoError::Integrity(_))
    ));
}

// ── Ciphertext Tampering ──

#[test]
fn every_byte_position_tampering_detected() {
    let key = generate_random_key();
    let wrapped = wrap_key(&[0x11u8; 32], &key).unwrap();
    let bytes = BASE64.decode(&wrapped).unwrap();

    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0xFF;
        assert!(
            matches!(
                unwrap_key(&BASE64.encode(&tampered), &key),
                Err(CryptoError::Integrity(_))
            ),
            "tampering at byte {i} should be detected"
        );
    }
}

#[test]
fn appended_bytes_detected() {
    let key = generate_random_key();
    let mut encrypted = encrypt(&key, b"original data").unwrap();
    encrypted.ciphertext.push(0xFF);

    assert!(decrypt(&key, &encrypted).is_err());
}

#[test]
fn all_zero_nonce_decryption_fails() {
    let key = generate_random_key();
    let mut encrypted = encrypt(&key, b"nonce should be random").unwrap();
    encrypted.nonce = [0u8; NONCE_SIZE];

    assert!(decrypt(&key, &encrypted).is_err());
}

// ── Truncation ──

#[test]
fn truncated_wire_form_fails() {
    let key = generate_random_key();
    let wrapped = wrap_key(&[1u8; 32], &key).unwrap();
    let bytes = BASE64.decode(&wrapped).unwrap();

    for len in [0, 1, NONCE_SIZE, NONCE_SIZE + TAG_SIZE - 1] {
        let truncated = BASE64.encode(&bytes[..len]);
        assert!(
            matches!(unwrap_key(&truncated, &key), Err(CryptoError::Malformed(_))),
            "truncation to {len} bytes should be malformed"
        );
    }

    // Long enough to parse, so the tag check catches it.
    let truncated = BASE64.encode(&bytes[..bytes.len() - 1]);
    assert!(matches!(
        unwrap_key(&truncated, &key),
        Err(CryptoError::Integrity(_))
    ));
}

#[test]
fn empty_string_is_malformed() {
    let key = generate_random_key();
    assert!(matches!(unwrap_key("", &key), Err(CryptoError::Malformed(_))));
}

// ── Boundaries ──

#[test]
fn empty_plaintext_roundtrips() {
    let key = generate_random_key();
    let wire = encrypt_string(&key, "").unwrap();
    assert_eq!(decrypt_string(&key, &wire).unwrap().as_str(), "");
    assert_eq!(BASE64.decode(&wire).unwrap().len(), NONCE_SIZE + TAG_SIZE);
}

#[test]
fn unicode_plaintext_roundtrips() {
    let key = generate_random_key();
    let text = "pässwörd 🔐 パスワード";
    let wire = encrypt_string(&key, text).unwrap();
    assert_eq!(decrypt_string(&key, &wire).unwrap().as_str(), text);
}

#[test]
fn wire_roundtrip_preserves_structure() {
    let key = generate_random_key();
    let encrypted = encrypt(&key, b"structured").unwrap();
    let parsed = EncryptedData::from_wire(&encrypted.to_wire()).unwrap();
    assert_eq!(parsed, encrypted);
}

#[test]
fn same_plaintext_never_repeats_nonce() {
    let key = generate_random_key();
    let mut nonces = std::collections::HashSet::new();
    for _ in 0..512 {
        let encrypted = encrypt(&key, b"same").unwrap();
        assert!(nonces.insert(encrypted.nonce), "nonce reused");
    }
}
