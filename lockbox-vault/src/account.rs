//! Account setup.
//!
//! `Start → MnemonicIssued → Acknowledged → Completed`. The mnemonic is shown
//! once, the user types it back, and only then are the persisted artifacts
//! (salt, verifier, public key, wrapped private key, personal vault) handed
//! out.

use crate::deriver::KeyDeriver;
use crate::error::{VaultError, VaultResult};
use crate::roster::VaultRoster;
use crate::session::{KeySession, StoredCredentials};
use crate::types::{UserId, VaultId};
use lockbox_crypto::{
    generate_identity, normalize_mnemonic, wrap_private_key, IdentityKeyPair, RootMaterial,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;
use zeroize::Zeroizing;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupState {
    Start,
    MnemonicIssued,
    Acknowledged,
    Completed,
}

impl SetupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::MnemonicIssued => "mnemonic_issued",
            Self::Acknowledged => "acknowledged",
            Self::Completed => "completed",
        }
    }
}

/// Everything the server stores for a new account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBundle {
    pub user_id: UserId,
    pub salt: String,
    pub verifier: String,
    pub public_key: String,
    pub wrapped_private_key: String,
    pub personal_vault: VaultRoster,
}

impl AccountBundle {
    /// The sign-in record for [`KeySession::unlock`].
    pub fn credentials(&self) -> StoredCredentials {
        StoredCredentials {
            salt: self.salt.clone(),
            verifier: self.verifier.clone(),
            wrapped_private_key: self.wrapped_private_key.clone(),
        }
    }
}

/// Setup wizard for one new account.
pub struct AccountSetup {
    user_id: UserId,
    state: SetupState,
    mnemonic: Option<Zeroizing<String>>,
    material: Option<RootMaterial>,
    identity: Option<IdentityKeyPair>,
}

impl std::fmt::Debug for AccountSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSetup")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl AccountSetup {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: SetupState::Start,
            mnemonic: None,
            material: None,
            identity: None,
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Generates the mnemonic, root material and identity keypair.
    ///
    /// Returns the mnemonic for display.
    pub async fn issue(&mut self, deriver: &KeyDeriver) -> VaultResult<Zeroizing<String>> {
        self.require_state(SetupState::Start, "issue mnemonic")?;

        let mnemonic = deriver.generate_mnemonic()?;
        let material = deriver.derive(&mnemonic, None).await?;

        self.mnemonic = Some(mnemonic.clone());
        self.material = Some(material);
        self.identity = Some(generate_identity());
        self.state = SetupState::MnemonicIssued;
        info!(user_id = %self.user_id, "issued account mnemonic");
        Ok(mnemonic)
    }

    /// Checks that the user re-entered the issued mnemonic.
    ///
    /// Case and spacing are ignored. A mismatch keeps the wizard waiting.
    pub fn acknowledge(&mut self, mnemonic_echo: &str) -> VaultResult<()> {
        self.require_state(SetupState::MnemonicIssued, "acknowledge")?;

        let echo = normalize_mnemonic(mnemonic_echo)?;
        let issued = self.mnemonic.as_ref().ok_or(VaultError::InvalidTransition {
            state: self.state.as_str(),
            action: "acknowledge",
        })?;
        if !bool::from(echo.as_bytes().ct_eq(issued.as_bytes())) {
            return Err(VaultError::NotAcknowledged);
        }

        self.mnemonic = None;
        self.state = SetupState::Acknowledged;
        Ok(())
    }

    /// Produces the persisted bundle and an unlocked session holding the
    /// personal vault key.
    pub fn complete(&mut self) -> VaultResult<(AccountBundle, KeySession)> {
        self.require_state(SetupState::Acknowledged, "complete")?;
        let (Some(material), Some(identity)) = (self.material.as_ref(), self.identity.as_ref())
        else {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action: "complete",
            });
        };

        let wrapped_private_key = wrap_private_key(identity, &material.root_key)?;
        let (personal_vault, ovk) =
            VaultRoster::create_personal(VaultId::new(), self.user_id, &material.root_key)?;

        let bundle = AccountBundle {
            user_id: self.user_id,
            salt: material.salt.to_base64(),
            verifier: material.verifier.to_base64(),
            public_key: identity.public_key_base64(),
            wrapped_private_key,
            personal_vault,
        };

        let (Some(material), Some(identity)) = (self.material.take(), self.identity.take()) else {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action: "complete",
            });
        };
        let mut session = KeySession::from_parts(material.root_key, identity);
        session.insert_vault_key(bundle.personal_vault.vault_id(), ovk);

        self.state = SetupState::Completed;
        info!(user_id = %self.user_id, vault_id = %bundle.personal_vault.vault_id(), "account setup completed");
        Ok((bundle, session))
    }

    fn require_state(&self, state: SetupState, action: &'static str) -> VaultResult<()> {
        if self.state != state {
            return Err(VaultError::InvalidTransition {
                state: self.state.as_str(),
                action,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockboxConfig;

    fn deriver() -> KeyDeriver {
        KeyDeriver::new(&LockboxConfig::for_tests()).unwrap()
    }

    #[tokio::test]
    async fn echo_ignores_case_and_spacing() {
        let mut setup = AccountSetup::new(UserId::new());
        let mnemonic = setup.issue(&deriver()).await.unwrap();

        let echo = format!("  {}  ", mnemonic.to_uppercase().replace(' ', "   "));
        setup.acknowledge(&echo).unwrap();
        assert_eq!(setup.state(), SetupState::Acknowledged);
    }

    #[tokio::test]
    async fn wrong_echo_is_not_acknowledged() {
        let deriver = deriver();
        let mut setup = AccountSetup::new(UserId::new());
        setup.issue(&deriver).await.unwrap();
        let other = deriver.generate_mnemonic().unwrap();

        assert!(matches!(
            setup.acknowledge(&other),
            Err(VaultError::NotAcknowledged)
        ));
        assert!(matches!(
            setup.acknowledge("not a mnemonic"),
            Err(VaultError::WeakInput(_))
        ));
        assert_eq!(setup.state(), SetupState::MnemonicIssued);
    }

    #[tokio::test]
    async fn complete_before_acknowledge_is_invalid() {
        let mut setup = AccountSetup::new(UserId::new());
        setup.issue(&deriver()).await.unwrap();

        assert!(matches!(
            setup.complete(),
            Err(VaultError::InvalidTransition { state: "mnemonic_issued", action: "complete" })
        ));
    }

    #[test]
    fn acknowledge_after_completion_is_invalid() {
        let mut setup = AccountSetup::new(UserId::new());
        setup.state = SetupState::Completed;
        assert!(matches!(
            setup.acknowledge("x"),
            Err(VaultError::InvalidTransition { state: "completed", .. })
        ));
    }
}
