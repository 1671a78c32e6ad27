//! Passphrase rotation.
//!
//! Replaces a user's root material while a one-time code gates the change:
//!
//! ```text
//! Alert ──verify_otp──► OtpVerified ──generate──► NewKeyGenerated
//!                                                   │ acknowledge
//!                                                   ▼
//!                                 Confirmed ◄──confirm──
//! ```
//!
//! Confirmation re-wraps every root-bound artifact (the identity private key
//! and every self-wrapped vault key) under the new root key. If any re-wrap
//! fails, nothing is returned and the rotation stays where it was.

use crate::deriver::KeyDeriver;
use crate::error::{VaultError, VaultResult};
use crate::session::StoredCredentials;
use crate::types::Membership;
use crate::vault_key::rewrap_self;
use async_trait::async_trait;
use lockbox_crypto::{rewrap_private_key, RootKey, RootMaterial, Salt, Verifier};
use tracing::{info, warn};
use zeroize::Zeroizing;

/// External one-time-code check (authenticator app, email code).
#[async_trait]
pub trait OtpGate: Send + Sync {
    /// Returns whether `code` is currently valid for the user.
    async fn verify(&self, code: &str) -> VaultResult<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationState {
    Alert,
    OtpVerified,
    NewKeyGenerated,
    Confirmed,
}

impl RotationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::OtpVerified => "otp_verified",
            Self::NewKeyGenerated => "new_key_generated",
            Self::Confirmed => "confirmed",
        }
    }
}

/// Everything persisted under the old root key.
#[derive(Clone, Debug)]
pub struct RootBoundArtifacts {
    pub wrapped_private_key: String,
    /// Self-wrapped memberships of vaults the user owns.
    pub self_wraps: Vec<Membership>,
}

/// Result of a confirmed rotation. The caller persists all of it together.
#[derive(Debug)]
pub struct RotationOutcome {
    pub salt: Salt,
    pub verifier: Verifier,
    pub wrapped_private_key: String,
    pub self_wraps: Vec<Membership>,
    pub root_key: RootKey,
}

impl RotationOutcome {
    /// The new sign-in record.
    pub fn credentials(&self) -> StoredCredentials {
        StoredCredentials {
            salt: self.salt.to_base64(),
            verifier: self.verifier.to_base64(),
            wrapped_private_key: self.wrapped_private_key.clone(),
        }
    }
}

/// Drives one passphrase rotation.
#[derive(Debug)]
pub struct PassphraseRotation {
    state: RotationState,
    pending: Option<RootMaterial>,
    acknowledged: bool,
}

impl Default for PassphraseRotation {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseRotation {
    pub fn new() -> Self {
        Self {
            state: RotationState::Alert,
            pending: None,
            acknowledged: false,
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Checks the one-time code. A rejected code leaves the state at `Alert`.
    pub async fn verify_otp(&mut self, gate: &dyn OtpGate, code: &str) -> VaultResult<()> {
        self.require_state(RotationState::Alert, "verify otp")?;

        if !gate.verify(code).await? {
            warn!("passphrase rotation: one-time code rejected");
            return Err(VaultError::OtpRejected);
        }

        self.state = RotationState::OtpVerified;
        info!("passphrase rotation: one-time code accepted");
        Ok(())
    }

    /// Generates the new mnemonic, salt, root key and verifier.
    ///
    /// Returns the mnemonic for display; it is not kept.
    pub async fn generate(&mut self, deriver: &KeyDeriver) -> VaultResult<Zeroizing<String>> {
        self.require_state(RotationState::OtpVerified, "generate new key")?;

        let mnemonic = deriver.generate_mnemonic()?;
        let material = deriver.derive(&mnemonic, None).await?;

        self.pending = Some(material);
        self.state = RotationState::NewKeyGenerated;
        info!("passphrase rotation: new root material generated");
        Ok(mnemonic)
    }

    /// Records that the new mnemonic was written down.
    pub fn acknowledge(&mut self) -> VaultResult<()> {
        self.require_state(RotationState::NewKeyGenerated, "acknowledge")?;
        self.acknowledged = true;
        Ok(())
    }

    /// Re-wraps every root-bound artifact under the new root key.
    pub fn confirm(
        &mut self,
        old_root: &RootKey,
        artifacts: &RootBoundArtifacts,
    ) -> VaultResult<RotationOutcome> {
        self.require_state(RotationState::NewKeyGenerated, "confirm")?;
        if !self.acknowledged {
            return Err(VaultError::NotAcknowledged);
        }
        let Some(material) = self.pending.as_ref() else {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action: "confirm",
            });
        };

        let wrapped_private_key =
            rewrap_private_key(&artifacts.wrapped_private_key, old_root, &material.root_key)?;
        let self_wraps = artifacts
            .self_wraps
            .iter()
            .map(|record| {
                Ok(Membership {
                    wrapped_vault_key: rewrap_self(
                        &record.wrapped_vault_key,
                        old_root,
                        &material.root_key,
                    )?,
                    ..record.clone()
                })
            })
            .collect::<VaultResult<Vec<_>>>()?;

        let Some(material) = self.pending.take() else {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action: "confirm",
            });
        };
        self.state = RotationState::Confirmed;
        info!(vaults = self_wraps.len(), "passphrase rotation confirmed");

        Ok(RotationOutcome {
            salt: material.salt,
            verifier: material.verifier,
            wrapped_private_key,
            self_wraps,
            root_key: material.root_key,
        })
    }

    fn require_state(&self, state: RotationState, action: &'static str) -> VaultResult<()> {
        if self.state != state {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action,
            });
        }
        Ok(())
    }
}
