//! ChaCha20-Poly1305 authenticated encryption and symmetric key wrapping.
//!
//! Every call draws a fresh 96-bit nonce. The wire form of a ciphertext is
//! a single base64 string of `nonce || ciphertext || tag`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SymmetricKey;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroizing;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Nonce plus ciphertext (tag appended).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Encodes as base64(`nonce || ciphertext || tag`).
    pub fn to_wire(&self) -> String {
        let mut buf = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        BASE64.encode(buf)
    }

    /// Parses the wire form.
    ///
    /// Anything that cannot be a wrapped value fails as `Malformed`; the tag
    /// is only checked later, by [`decrypt`].
    pub fn from_wire(wire: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(wire)
            .map_err(|e| CryptoError::Malformed(format!("ciphertext is not base64: {e}")))?;
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Malformed(format!(
                "ciphertext truncated: {} bytes",
                bytes.len()
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut nonce_arr = [0u8; NONCE_SIZE];
        nonce_arr.copy_from_slice(nonce);
        Ok(Self {
            nonce: nonce_arr,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

fn cipher_for(key: &SymmetricKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Encrypts `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher_for(key)
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(format!("aead seal failed: {e}")))?;

    let mut nonce_arr = [0u8; NONCE_SIZE];
    nonce_arr.copy_from_slice(nonce.as_slice());
    Ok(EncryptedData {
        nonce: nonce_arr,
        ciphertext,
    })
}

/// Decrypts and authenticates. Fails with `Integrity` on any tag mismatch.
pub fn decrypt(key: &SymmetricKey, data: &EncryptedData) -> CryptoResult<Zeroizing<Vec<u8>>> {
    cipher_for(key)
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Integrity("wrong key or tampered data".to_string()))
}

/// Encrypts a UTF-8 string straight to its wire form.
pub fn encrypt_string(key: &SymmetricKey, plaintext: &str) -> CryptoResult<String> {
    Ok(encrypt(key, plaintext.as_bytes())?.to_wire())
}

/// Decrypts a wire-form ciphertext back to a string.
pub fn decrypt_string(key: &SymmetricKey, wire: &str) -> CryptoResult<Zeroizing<String>> {
    let data = EncryptedData::from_wire(wire)?;
    let mut plaintext = decrypt(key, &data)?;
    let text = String::from_utf8(std::mem::take(&mut *plaintext))
        .map_err(|_| CryptoError::Integrity("decrypted field is not UTF-8".to_string()))?;
    Ok(Zeroizing::new(text))
}

/// Wraps raw key bytes under a wrapping key.
pub fn wrap_key(raw_key: &[u8], wrapping_key: &SymmetricKey) -> CryptoResult<String> {
    Ok(encrypt(wrapping_key, raw_key)?.to_wire())
}

/// Unwraps a value produced by [`wrap_key`].
pub fn unwrap_key(wrapped: &str, wrapping_key: &SymmetricKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let data = EncryptedData::from_wire(wrapped)?;
    decrypt(wrapping_key, &data)
}

/// Unwraps a value that must hold a 256-bit symmetric key.
pub fn unwrap_symmetric_key(
    wrapped: &str,
    wrapping_key: &SymmetricKey,
) -> CryptoResult<SymmetricKey> {
    let raw = unwrap_key(wrapped, wrapping_key)?;
    SymmetricKey::from_slice(&raw)
}
