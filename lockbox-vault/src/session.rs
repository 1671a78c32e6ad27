//! Unlocked key material for one signed-in user.
//!
//! A session is owned by a single caller and passed explicitly. Everything it
//! holds zeroizes on drop, and [`KeySession::clear`] drops it on demand.

use crate::deriver::KeyDeriver;
use crate::error::VaultResult;
use crate::types::{Membership, VaultId};
use crate::vault_key::{self, UnwrapContext};
use lockbox_crypto::{unwrap_private_key, IdentityKeyPair, RootKey, Salt, VaultKey, Verifier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// What the server stores for a user and hands back at sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Base64 salt.
    pub salt: String,
    /// Base64 verifier.
    pub verifier: String,
    /// Identity private key wrapped under the root key.
    pub wrapped_private_key: String,
}

/// Root key, identity keypair and resolved vault keys.
#[derive(Default)]
pub struct KeySession {
    root_key: Option<RootKey>,
    identity: Option<IdentityKeyPair>,
    vault_keys: HashMap<VaultId, VaultKey>,
}

impl std::fmt::Debug for KeySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySession")
            .field("unlocked", &self.is_unlocked())
            .field("vaults", &self.vault_keys.len())
            .finish()
    }
}

impl KeySession {
    /// Builds a session from material already in hand (account setup,
    /// passphrase rotation).
    pub fn from_parts(root_key: RootKey, identity: IdentityKeyPair) -> Self {
        Self {
            root_key: Some(root_key),
            identity: Some(identity),
            vault_keys: HashMap::new(),
        }
    }

    /// Derives the root key, checks it against the stored verifier, then
    /// unwraps the identity private key.
    pub async fn unlock(
        deriver: &KeyDeriver,
        passphrase: &str,
        credentials: &StoredCredentials,
    ) -> VaultResult<Self> {
        let salt = Salt::from_base64(&credentials.salt)?;
        let verifier = Verifier::from_base64(&credentials.verifier)?;

        let root_key = deriver.verify(passphrase, salt, &verifier).await?;
        let identity = unwrap_private_key(&credentials.wrapped_private_key, &root_key)?;

        info!("key session unlocked");
        Ok(Self::from_parts(root_key, identity))
    }

    pub fn is_unlocked(&self) -> bool {
        self.root_key.is_some()
    }

    pub fn root_key(&self) -> Option<&RootKey> {
        self.root_key.as_ref()
    }

    pub fn identity(&self) -> Option<&IdentityKeyPair> {
        self.identity.as_ref()
    }

    /// Current key material as an unwrap context.
    pub fn context(&self) -> UnwrapContext<'_> {
        UnwrapContext::new(self.root_key.as_ref(), self.identity.as_ref())
    }

    /// Resolves a membership and caches its vault key.
    pub fn resolve_vault(&mut self, membership: &Membership) -> VaultResult<&VaultKey> {
        let ovk = vault_key::resolve_membership(membership, self.context())?;
        debug!(vault_id = %membership.vault_id, "resolved vault key");
        Ok(self.vault_keys.entry(membership.vault_id).insert_entry(ovk).into_mut())
    }

    /// Caches a vault key obtained elsewhere (vault creation, rotation).
    pub fn insert_vault_key(&mut self, vault_id: VaultId, ovk: VaultKey) {
        self.vault_keys.insert(vault_id, ovk);
    }

    pub fn vault_key(&self, vault_id: VaultId) -> Option<&VaultKey> {
        self.vault_keys.get(&vault_id)
    }

    /// Drops one cached vault key. Returns whether it was held.
    pub fn forget_vault(&mut self, vault_id: VaultId) -> bool {
        self.vault_keys.remove(&vault_id).is_some()
    }

    /// Drops all key material.
    pub fn clear(&mut self) {
        self.vault_keys.clear();
        self.identity = None;
        self.root_key = None;
        info!("key session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::VaultRoster;
    use crate::types::UserId;
    use lockbox_crypto::generate_random_key;

    fn session() -> KeySession {
        KeySession::from_parts(
            RootKey::from_key(generate_random_key()),
            IdentityKeyPair::generate(),
        )
    }

    #[test]
    fn resolve_caches_vault_key() {
        let mut session = session();
        let owner = UserId::new();
        let (roster, ovk) = VaultRoster::create_personal(
            VaultId::new(),
            owner,
            session.root_key().unwrap(),
        )
        .unwrap();
        let record = roster.membership(owner).unwrap();

        let resolved = session.resolve_vault(record).unwrap();
        assert_eq!(resolved.as_bytes(), ovk.as_bytes());
        assert!(session.vault_key(roster.vault_id()).is_some());

        assert!(session.forget_vault(roster.vault_id()));
        assert!(session.vault_key(roster.vault_id()).is_none());
        assert!(!session.forget_vault(roster.vault_id()));
    }

    #[test]
    fn clear_drops_everything() {
        let mut session = session();
        session.insert_vault_key(VaultId::new(), VaultKey::generate());

        session.clear();

        assert!(!session.is_unlocked());
        assert!(session.identity().is_none());
        assert!(session.context().root_key.is_none());
        assert_eq!(format!("{session:?}"), "KeySession { unlocked: false, vaults: 0 }");
    }

    #[test]
    fn cleared_session_cannot_resolve() {
        let mut session = session();
        let owner = UserId::new();
        let (roster, _) =
            VaultRoster::create_personal(VaultId::new(), owner, session.root_key().unwrap())
                .unwrap();
        session.clear();

        assert!(session.resolve_vault(roster.membership(owner).unwrap()).is_err());
    }
}
