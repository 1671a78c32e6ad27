//! Async passphrase derivation.
//!
//! Argon2id is deliberately slow, so derivation runs on tokio's blocking
//! pool and the caller's task simply awaits the result.

use crate::config::LockboxConfig;
use crate::error::{VaultError, VaultResult};
use lockbox_crypto::{KdfParams, RootKey, RootMaterial, Salt, Verifier};
use tracing::debug;
use zeroize::Zeroizing;

/// Turns a mnemonic passphrase into root key material.
#[derive(Clone, Debug)]
pub struct KeyDeriver {
    params: KdfParams,
}

impl KeyDeriver {
    /// Builds a deriver from validated configuration.
    pub fn new(config: &LockboxConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self { params: config.kdf })
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Generates a fresh 24-word mnemonic.
    pub fn generate_mnemonic(&self) -> VaultResult<Zeroizing<String>> {
        Ok(lockbox_crypto::generate_mnemonic()?)
    }

    /// Derives `{salt, root_key, verifier}`.
    ///
    /// Word-count and checksum validation happen before any KDF work.
    pub async fn derive(&self, passphrase: &str, salt: Option<Salt>) -> VaultResult<RootMaterial> {
        let normalized = lockbox_crypto::normalize_mnemonic(passphrase)?;
        let params = self.params;

        let material = tokio::task::spawn_blocking(move || {
            lockbox_crypto::derive(&normalized, salt, &params)
        })
        .await
        .map_err(|e| VaultError::Task(e.to_string()))??;

        debug!(fresh_salt = salt.is_none(), "derived root key material");
        Ok(material)
    }

    /// Re-derives with the stored salt and checks the stored verifier.
    ///
    /// Returns the root key only when the passphrase is correct.
    pub async fn verify(
        &self,
        passphrase: &str,
        salt: Salt,
        stored: &Verifier,
    ) -> VaultResult<RootKey> {
        let material = self.derive(passphrase, Some(salt)).await?;
        if material.verifier.matches(stored) {
            Ok(material.root_key)
        } else {
            Err(VaultError::WrongPassphrase)
        }
    }
}
