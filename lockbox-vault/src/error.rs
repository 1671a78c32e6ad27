//! Vault error types.

use crate::types::{UserId, VaultId, WrapMethod};
use lockbox_crypto::CryptoError;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Why a wrapped vault key could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    /// Self-wrapped record, but the caller holds no root key.
    #[error("self-wrapped key needs the root key")]
    NoRootKey,
    /// Peer-wrapped record, but the caller holds no unwrapped identity.
    #[error("peer-wrapped key needs the identity private key")]
    NoPrivateKey,
    #[error("wrapped key record is empty")]
    EmptyWrap,
    /// Not base64, too short, or opens to something that is not a key.
    #[error("wrapped key record is malformed")]
    Malformed,
}

/// Errors returned across the vault crate's public boundary.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("weak input: {0}")]
    WeakInput(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("cannot resolve vault key: {0}")]
    Resolve(ResolveFailure),

    /// Membership was created by external provisioning and has no key yet.
    #[error("membership of {user_id} in vault {vault_id} awaits key exchange")]
    ProvisioningIncomplete { vault_id: VaultId, user_id: UserId },

    #[error("passphrase does not match the stored verifier")]
    WrongPassphrase,

    #[error("one-time code rejected")]
    OtpRejected,

    #[error("new mnemonic has not been acknowledged")]
    NotAcknowledged,

    #[error("cannot {action} while in state {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("user {0} already has a membership in this vault")]
    DuplicateMembership(UserId),

    #[error("user {0} has no membership in this vault")]
    MembershipNotFound(UserId),

    #[error("membership of {0} is not awaiting provisioning")]
    NotPending(UserId),

    /// The record's wrap method does not fit the member's role.
    #[error("user {user_id} cannot hold a {method:?} record in this vault")]
    InvalidWrap {
        user_id: UserId,
        method: WrapMethod,
    },

    #[error("operation requires the vault owner: {0}")]
    OwnerRequired(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::WeakInput(msg) => Self::WeakInput(msg),
            CryptoError::Integrity(msg) | CryptoError::Malformed(msg) => Self::Integrity(msg),
            CryptoError::MissingKey(msg) => Self::MissingKey(msg),
            other => Self::Crypto(other),
        }
    }
}
