//! Key material types and Argon2id parameters.
//!
//! Every symmetric key in the hierarchy is 256 bits. The three roles
//! (root, vault, item) get distinct newtypes so a vault key can never be
//! passed where an item key is expected. None of them implement `Serialize`
//! and their `Debug` output is redacted.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every symmetric key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a per-user salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Raw 256-bit symmetric key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a key from a decrypted buffer, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Lets a KDF write straight into the key so no loose copy is left.
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; KEY_SIZE] {
        &mut self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Generates a random 256-bit key.
pub fn generate_random_key() -> SymmetricKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    key
}

/// Passphrase-derived root key ("UMK"). Never persisted.
#[derive(Clone, Debug)]
pub struct RootKey(SymmetricKey);

/// Per-vault key ("OVK"), shared with members only in wrapped form.
#[derive(Clone, Debug)]
pub struct VaultKey(SymmetricKey);

/// Per-item key, persisted only wrapped under its vault key.
#[derive(Clone, Debug)]
pub struct ItemKey(SymmetricKey);

impl RootKey {
    pub fn from_key(key: SymmetricKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.0
    }
}

impl VaultKey {
    /// Generates a fresh vault key.
    pub fn generate() -> Self {
        Self(generate_random_key())
    }

    pub fn from_key(key: SymmetricKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()
    }
}

impl ItemKey {
    /// Generates a fresh item key.
    pub fn generate() -> Self {
        Self(generate_random_key())
    }

    pub fn from_key(key: SymmetricKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()
    }
}

/// Per-user random salt. Public; persisted in plaintext.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(format!("salt is not base64: {e}")))?;
        let arr: [u8; SALT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use for real accounts.
    pub fn for_tests() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub(crate) fn to_argon2(self) -> CryptoResult<argon2::Params> {
        argon2::Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_keys_differ() {
        let a = generate_random_key();
        let b = generate_random_key();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = SymmetricKey::from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength { expected: 32, actual: 31 }
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = VaultKey::from_key(SymmetricKey::from_bytes([0xAB; KEY_SIZE]));
        let printed = format!("{key:?}");
        assert!(!printed.contains("171"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn salt_base64_roundtrip() {
        let salt = Salt::random();
        let decoded = Salt::from_base64(&salt.to_base64()).unwrap();
        assert_eq!(salt, decoded);
    }

    #[test]
    fn salt_with_wrong_length_rejected() {
        let err = Salt::from_base64(&BASE64.encode([1u8; 8])).unwrap_err();
        assert!(matches!(err, CryptoError::Encoding(_)));
    }

    #[test]
    fn test_params_are_valid_for_argon2() {
        assert!(KdfParams::for_tests().to_argon2().is_ok());
        assert!(KdfParams::default().to_argon2().is_ok());
    }
}
