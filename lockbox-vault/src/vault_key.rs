//! Vault key creation, granting and resolution.
//!
//! A vault has one logical key and one wrapped copy per member. Owners hold
//! a copy wrapped under their root key; collaborators hold a copy sealed to
//! their identity public key. Resolution is a `match` over the record's tag,
//! never a guess from whatever key material happens to be available.

use crate::error::{ResolveFailure, VaultError, VaultResult};
use crate::types::{Membership, WrappedVaultKey};
use lockbox_crypto::{
    decrypt_with, encrypt_for, unwrap_key, wrap_key, CryptoError, IdentityKeyPair, RootKey,
    SymmetricKey, VaultKey,
};

/// Key material the caller currently holds for resolving a vault key.
#[derive(Clone, Copy, Default)]
pub struct UnwrapContext<'a> {
    pub root_key: Option<&'a RootKey>,
    pub identity: Option<&'a IdentityKeyPair>,
}

impl<'a> UnwrapContext<'a> {
    pub fn new(root_key: Option<&'a RootKey>, identity: Option<&'a IdentityKeyPair>) -> Self {
        Self { root_key, identity }
    }

    pub fn with_root(root_key: &'a RootKey) -> Self {
        Self {
            root_key: Some(root_key),
            identity: None,
        }
    }

    pub fn with_identity(identity: &'a IdentityKeyPair) -> Self {
        Self {
            root_key: None,
            identity: Some(identity),
        }
    }
}

/// Creates a fresh random vault key.
pub fn create_vault_key() -> VaultKey {
    VaultKey::generate()
}

/// Wraps the vault key for its owner under the owner's root key.
pub fn grant_self(ovk: &VaultKey, owner_root: &RootKey) -> VaultResult<WrappedVaultKey> {
    Ok(WrappedVaultKey::SelfWrapped(wrap_key(
        ovk.as_bytes(),
        owner_root.key(),
    )?))
}

/// Seals the vault key to a member's persisted public key.
///
/// Fails with `MissingKey` when the member has not published a public key.
pub fn grant_peer(ovk: &VaultKey, member_public_key: &str) -> VaultResult<WrappedVaultKey> {
    Ok(WrappedVaultKey::PeerWrapped(encrypt_for(
        ovk.as_bytes(),
        member_public_key,
    )?))
}

/// Recovers the raw vault key from one wrapped record.
///
/// A record that opens but fails its tag check (wrong key, tampering) is
/// `Integrity`; only missing key material and empty or malformed records are
/// resolve failures.
///
/// `Pending` records are reported as `ProvisioningIncomplete` by
/// [`resolve_membership`]; here they have no owner to name, so they fail
/// as an empty wrap.
pub fn resolve(wrapped: &WrappedVaultKey, ctx: UnwrapContext<'_>) -> VaultResult<VaultKey> {
    let raw = match wrapped {
        WrappedVaultKey::Pending => return Err(VaultError::Resolve(ResolveFailure::EmptyWrap)),
        WrappedVaultKey::SelfWrapped(value) => {
            ensure_present(value)?;
            let root = ctx
                .root_key
                .ok_or(VaultError::Resolve(ResolveFailure::NoRootKey))?;
            unwrap_key(value, root.key()).map_err(resolve_failure)?
        }
        WrappedVaultKey::PeerWrapped(value) => {
            ensure_present(value)?;
            let identity = ctx
                .identity
                .ok_or(VaultError::Resolve(ResolveFailure::NoPrivateKey))?;
            decrypt_with(value, identity).map_err(resolve_failure)?
        }
    };

    let key = SymmetricKey::from_slice(&raw)
        .map_err(|_| VaultError::Resolve(ResolveFailure::Malformed))?;
    Ok(VaultKey::from_key(key))
}

/// Resolves a membership, naming the vault and user if it is still pending.
pub fn resolve_membership(membership: &Membership, ctx: UnwrapContext<'_>) -> VaultResult<VaultKey> {
    if membership.wrapped_vault_key.is_pending() {
        return Err(VaultError::ProvisioningIncomplete {
            vault_id: membership.vault_id,
            user_id: membership.user_id,
        });
    }
    resolve(&membership.wrapped_vault_key, ctx)
}

/// Moves a self-wrapped record from one root key to another.
pub fn rewrap_self(
    wrapped: &WrappedVaultKey,
    old_root: &RootKey,
    new_root: &RootKey,
) -> VaultResult<WrappedVaultKey> {
    let ovk = resolve(wrapped, UnwrapContext::with_root(old_root))?;
    grant_self(&ovk, new_root)
}

fn ensure_present(value: &str) -> VaultResult<()> {
    if value.trim().is_empty() {
        return Err(VaultError::Resolve(ResolveFailure::EmptyWrap));
    }
    Ok(())
}

fn resolve_failure(err: CryptoError) -> VaultError {
    match err {
        CryptoError::Malformed(_) | CryptoError::InvalidKeyLength { .. } => {
            VaultError::Resolve(ResolveFailure::Malformed)
        }
        other => other.into(),
    }
}
