//! Identity key storage under the root key.
//!
//! Only the public key and the root-key-wrapped secret key are ever
//! persisted. The secret key becomes usable only after re-deriving the root
//! key from the passphrase.

use crate::cipher::{unwrap_key, wrap_key};
use crate::envelope::IdentityKeyPair;
use crate::error::{CryptoError, CryptoResult};
use crate::key::RootKey;
use zeroize::Zeroizing;

/// Generates the account's identity keypair (once, at setup).
pub fn generate_identity() -> IdentityKeyPair {
    IdentityKeyPair::generate()
}

/// Wraps the identity secret key under the root key.
pub fn wrap_private_key(identity: &IdentityKeyPair, root_key: &RootKey) -> CryptoResult<String> {
    wrap_key(identity.secret_bytes().as_ref(), root_key.key())
}

/// Unwraps the identity secret key and rebuilds the keypair.
pub fn unwrap_private_key(wrapped: &str, root_key: &RootKey) -> CryptoResult<IdentityKeyPair> {
    let plaintext = unwrap_key(wrapped, root_key.key())?;
    if plaintext.len() != 32 {
        return Err(CryptoError::InvalidKeyLength {
            expected: 32,
            actual: plaintext.len(),
        });
    }
    let mut bytes = Zeroizing::new([0u8; 32]);
    bytes.copy_from_slice(&plaintext);
    Ok(IdentityKeyPair::from_secret_bytes(*bytes))
}

/// Moves a wrapped secret key from one root key to another.
pub fn rewrap_private_key(
    wrapped: &str,
    old_root: &RootKey,
    new_root: &RootKey,
) -> CryptoResult<String> {
    let identity = unwrap_private_key(wrapped, old_root)?;
    wrap_private_key(&identity, new_root)
}
