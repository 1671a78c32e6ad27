//! Per-vault membership set.
//!
//! The roster is the fan-out point for a vault key: it holds exactly one
//! wrapped record per (vault, user), admits members by peer wrap or external
//! provisioning, and rotates the vault key after a revocation.

use crate::error::{VaultError, VaultResult};
use crate::item::rewrap_item_key;
use crate::types::{Membership, UserId, VaultId, VaultKind, WrapMethod, WrappedVaultKey};
use crate::vault_key::{self, UnwrapContext};
use chrono::Utc;
use lockbox_crypto::{RootKey, VaultKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

/// All memberships of one vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRoster {
    vault_id: VaultId,
    kind: VaultKind,
    owner: UserId,
    members: BTreeMap<UserId, Membership>,
}

impl VaultRoster {
    /// Creates a personal vault: fresh key, self-wrapped for its only member.
    pub fn create_personal(
        vault_id: VaultId,
        owner: UserId,
        owner_root: &RootKey,
    ) -> VaultResult<(Self, VaultKey)> {
        Self::create(vault_id, VaultKind::Personal, owner, owner_root)
    }

    /// Creates an organization vault owned by `owner`.
    pub fn create_organization(
        vault_id: VaultId,
        owner: UserId,
        owner_root: &RootKey,
    ) -> VaultResult<(Self, VaultKey)> {
        Self::create(vault_id, VaultKind::Organization, owner, owner_root)
    }

    fn create(
        vault_id: VaultId,
        kind: VaultKind,
        owner: UserId,
        owner_root: &RootKey,
    ) -> VaultResult<(Self, VaultKey)> {
        let ovk = vault_key::create_vault_key();
        let wrapped = vault_key::grant_self(&ovk, owner_root)?;

        let mut members = BTreeMap::new();
        members.insert(owner, membership(vault_id, owner, wrapped));

        info!(%vault_id, %owner, ?kind, "created vault");
        Ok((
            Self {
                vault_id,
                kind,
                owner,
                members,
            },
            ovk,
        ))
    }

    pub fn vault_id(&self) -> VaultId {
        self.vault_id
    }

    pub fn kind(&self) -> VaultKind {
        self.kind
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Membership record for one user.
    pub fn membership(&self, user: UserId) -> Option<&Membership> {
        self.members.get(&user)
    }

    /// All records, ordered by user id.
    pub fn memberships(&self) -> impl Iterator<Item = &Membership> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Users provisioned externally who still have no key.
    pub fn pending_members(&self) -> Vec<UserId> {
        self.members
            .values()
            .filter(|m| m.wrapped_vault_key.is_pending())
            .map(|m| m.user_id)
            .collect()
    }

    /// Admits a collaborator by sealing the vault key to their public key.
    pub fn grant_peer(
        &mut self,
        user: UserId,
        ovk: &VaultKey,
        public_key: &str,
    ) -> VaultResult<&Membership> {
        self.ensure_shared("grant access")?;
        if self.members.contains_key(&user) {
            return Err(VaultError::DuplicateMembership(user));
        }

        let wrapped = vault_key::grant_peer(ovk, public_key)?;
        info!(vault_id = %self.vault_id, %user, "granted vault access");
        Ok(self
            .members
            .entry(user)
            .or_insert(membership(self.vault_id, user, wrapped)))
    }

    /// Records a membership created by directory provisioning. It holds no
    /// key until [`complete_provisioning`](Self::complete_provisioning).
    pub fn provision(&mut self, user: UserId) -> VaultResult<&Membership> {
        self.ensure_shared("provision a member")?;
        if self.members.contains_key(&user) {
            return Err(VaultError::DuplicateMembership(user));
        }

        info!(vault_id = %self.vault_id, %user, "provisioned member awaiting key exchange");
        Ok(self
            .members
            .entry(user)
            .or_insert(membership(self.vault_id, user, WrappedVaultKey::Pending)))
    }

    /// Replaces a pending record with a peer wrap, once the provisioned user
    /// has published a public key. Run by a member who holds the vault key.
    pub fn complete_provisioning(
        &mut self,
        user: UserId,
        ovk: &VaultKey,
        public_key: &str,
    ) -> VaultResult<&Membership> {
        let vault_id = self.vault_id;
        let record = self
            .members
            .get_mut(&user)
            .ok_or(VaultError::MembershipNotFound(user))?;
        if !record.wrapped_vault_key.is_pending() {
            return Err(VaultError::NotPending(user));
        }

        record.wrapped_vault_key = vault_key::grant_peer(ovk, public_key)?;
        record.granted_at = Utc::now();
        info!(%vault_id, %user, "completed provisioning");
        Ok(record)
    }

    /// Removes one user's record. Other records are untouched; the caller
    /// should follow with [`rotate_vault_key`](Self::rotate_vault_key).
    pub fn revoke(&mut self, user: UserId) -> VaultResult<Membership> {
        if user == self.owner {
            return Err(VaultError::OwnerRequired(
                "the vault owner cannot be revoked".to_string(),
            ));
        }
        let removed = self
            .members
            .remove(&user)
            .ok_or(VaultError::MembershipNotFound(user))?;
        info!(vault_id = %self.vault_id, %user, "revoked vault access");
        Ok(removed)
    }

    /// Resolves one user's copy of the vault key.
    pub fn resolve_for(&self, user: UserId, ctx: UnwrapContext<'_>) -> VaultResult<VaultKey> {
        let record = self
            .members
            .get(&user)
            .ok_or(VaultError::MembershipNotFound(user))?;
        vault_key::resolve_membership(record, ctx)
    }

    /// Replaces the vault key.
    ///
    /// `old_ovk` must be the key the owner's record opens to. A new key is
    /// wrapped for the owner under `owner_root`, sealed to every remaining
    /// peer through `public_keys`, and every wrapped item key is moved from
    /// `old_ovk` to it. Pending records stay pending. Nothing changes unless
    /// every step succeeds.
    pub fn rotate_vault_key(
        &mut self,
        old_ovk: &VaultKey,
        owner_root: &RootKey,
        public_keys: &HashMap<UserId, String>,
        wrapped_item_keys: &[String],
    ) -> VaultResult<(VaultKey, Vec<String>)> {
        let owner_record = self
            .members
            .get(&self.owner)
            .ok_or(VaultError::MembershipNotFound(self.owner))?;
        let current =
            vault_key::resolve_membership(owner_record, UnwrapContext::with_root(owner_root))
                .map_err(|_| {
                    VaultError::OwnerRequired(
                        "root key does not open the owner's record".to_string(),
                    )
                })?;
        if !bool::from(current.as_bytes().ct_eq(old_ovk.as_bytes())) {
            return Err(VaultError::Integrity(
                "vault key does not match the owner's record".to_string(),
            ));
        }

        let new_ovk = vault_key::create_vault_key();
        let now = Utc::now();
        let mut members = BTreeMap::new();

        for (user, record) in &self.members {
            let wrapped = if *user == self.owner {
                vault_key::grant_self(&new_ovk, owner_root)?
            } else if record.wrapped_vault_key.is_pending() {
                WrappedVaultKey::Pending
            } else {
                let public_key = public_keys.get(user).ok_or_else(|| {
                    VaultError::MissingKey(format!("no public key for member {user}"))
                })?;
                vault_key::grant_peer(&new_ovk, public_key)?
            };
            members.insert(
                *user,
                Membership {
                    vault_id: self.vault_id,
                    user_id: *user,
                    wrapped_vault_key: wrapped,
                    granted_at: now,
                },
            );
        }

        let items = wrapped_item_keys
            .iter()
            .map(|wrapped| rewrap_item_key(wrapped, old_ovk, &new_ovk))
            .collect::<VaultResult<Vec<_>>>()?;

        self.members = members;
        debug!(items = items.len(), "re-wrapped item keys");
        info!(
            vault_id = %self.vault_id,
            members = self.members.len(),
            "rotated vault key"
        );
        Ok((new_ovk, items))
    }

    /// Stores a record re-wrapped elsewhere (passphrase rotation) in place of
    /// the user's current one.
    ///
    /// The owner's record must stay self-wrapped and every other record must
    /// stay a peer wrap. A pending record can only replace a pending one.
    pub fn replace_membership(&mut self, record: Membership) -> VaultResult<()> {
        if record.vault_id != self.vault_id {
            return Err(VaultError::MembershipNotFound(record.user_id));
        }
        let is_owner = record.user_id == self.owner;
        let current = self
            .members
            .get_mut(&record.user_id)
            .ok_or(VaultError::MembershipNotFound(record.user_id))?;

        let allowed = match record.method() {
            WrapMethod::SelfWrap => is_owner,
            WrapMethod::PeerWrap => !is_owner,
            WrapMethod::Pending => !is_owner && current.wrapped_vault_key.is_pending(),
        };
        if !allowed {
            return Err(VaultError::InvalidWrap {
                user_id: record.user_id,
                method: record.method(),
            });
        }

        *current = record;
        Ok(())
    }

    fn ensure_shared(&self, action: &'static str) -> VaultResult<()> {
        if self.kind == VaultKind::Personal {
            return Err(VaultError::InvalidTransition {
                state: "personal vault",
                action,
            });
        }
        Ok(())
    }
}

fn membership(vault_id: VaultId, user_id: UserId, wrapped: WrappedVaultKey) -> Membership {
    Membership {
        vault_id,
        user_id,
        wrapped_vault_key: wrapped,
        granted_at: Utc::now(),
    }
}
