//! Passphrase to root key derivation.
//!
//! One Argon2id run over the normalized mnemonic produces `kdf_out`.
//! HKDF-SHA256 then expands two independent outputs from it:
//!
//! - the root key, used to wrap the private identity key and self-wrapped
//!   vault keys
//! - the verifier, persisted server-side for equality checks
//!
//! The two outputs use distinct HKDF info labels, so the verifier cannot be
//! computed from the root key and vice versa.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, KEY_SIZE, RootKey, Salt, SymmetricKey};
use argon2::{Algorithm, Argon2, Version};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Number of words in a passphrase.
pub const MNEMONIC_WORDS: usize = 24;

/// Size of the verifier in bytes.
pub const VERIFIER_SIZE: usize = 32;

const HKDF_INFO_ROOT_KEY: &[u8] = b"lockbox/v1/root-key";
const HKDF_INFO_VERIFIER: &[u8] = b"lockbox/v1/verifier";

/// One-way passphrase verifier. Safe to persist; compare only with
/// [`Verifier::matches`].
#[derive(Clone)]
pub struct Verifier([u8; VERIFIER_SIZE]);

impl Verifier {
    pub fn as_bytes(&self) -> &[u8; VERIFIER_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(format!("verifier is not base64: {e}")))?;
        let arr: [u8; VERIFIER_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "verifier must be {VERIFIER_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Constant-time comparison against a stored verifier.
    pub fn matches(&self, stored: &Verifier) -> bool {
        self.0.ct_eq(&stored.0).into()
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Verifier({})", self.to_base64())
    }
}

/// Output of one derivation run.
#[derive(Debug)]
pub struct RootMaterial {
    pub salt: Salt,
    pub root_key: RootKey,
    pub verifier: Verifier,
}

/// Generates a fresh 24-word BIP39 mnemonic (256 bits of entropy).
pub fn generate_mnemonic() -> CryptoResult<Zeroizing<String>> {
    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::rng().fill_bytes(entropy.as_mut());

    let mnemonic = bip39::Mnemonic::from_entropy(entropy.as_ref())
        .map_err(|e| CryptoError::KeyDerivation(format!("mnemonic generation failed: {e}")))?;

    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Validates the word count and BIP39 checksum, returning the canonical
/// form (lower-case, single-spaced) that is fed to the KDF.
pub fn normalize_mnemonic(passphrase: &str) -> CryptoResult<Zeroizing<String>> {
    let normalized = Zeroizing::new(
        passphrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    );

    let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if words != MNEMONIC_WORDS {
        return Err(CryptoError::WeakInput(format!(
            "passphrase must have {MNEMONIC_WORDS} words, got {words}"
        )));
    }

    bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &normalized)
        .map_err(|e| CryptoError::WeakInput(format!("passphrase is not a valid mnemonic: {e}")))?;

    Ok(normalized)
}

/// Derives the root key and verifier from a passphrase.
///
/// With `salt = None` a fresh salt is generated (account setup). With a
/// stored salt the result is reproducible (unlock).
pub fn derive(
    passphrase: &str,
    salt: Option<Salt>,
    params: &KdfParams,
) -> CryptoResult<RootMaterial> {
    let normalized = normalize_mnemonic(passphrase)?;
    let salt = salt.unwrap_or_else(Salt::random);

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let mut kdf_out = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(normalized.as_bytes(), salt.as_bytes(), kdf_out.as_mut())
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2id failed: {e}")))?;

    let hk = Hkdf::<Sha256>::new(Some(&salt.as_bytes()[..]), kdf_out.as_ref());

    let mut root = SymmetricKey::from_bytes([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO_ROOT_KEY, root.as_bytes_mut())
        .map_err(|_| CryptoError::KeyDerivation("hkdf expand failed".to_string()))?;

    let mut verifier = [0u8; VERIFIER_SIZE];
    hk.expand(HKDF_INFO_VERIFIER, &mut verifier)
        .map_err(|_| CryptoError::KeyDerivation("hkdf expand failed".to_string()))?;

    Ok(RootMaterial {
        salt,
        root_key: RootKey::from_key(root),
        verifier: Verifier(verifier),
    })
}

/// Re-derives with the stored salt and compares against the stored verifier.
pub fn verify(
    passphrase: &str,
    salt: Salt,
    stored: &Verifier,
    params: &KdfParams,
) -> CryptoResult<Option<RootKey>> {
    let material = derive(passphrase, Some(salt), params)?;
    if material.verifier.matches(stored) {
        Ok(Some(material.root_key))
    } else {
        Ok(None)
    }
}
