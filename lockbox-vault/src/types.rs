//! Shared types for vault key distribution and item encryption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// New time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_type!(
    /// Identifies a personal or organization vault.
    VaultId
);
id_type!(
    /// Identifies an account.
    UserId
);
id_type!(
    /// Identifies one item inside a vault.
    ItemId
);

/// Personal vaults have exactly one member; organization vaults many.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultKind {
    Personal,
    Organization,
}

/// How a membership's copy of the vault key is wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMethod {
    /// Under the member's own root key.
    SelfWrap,
    /// Under the member's identity public key.
    PeerWrap,
    /// No key yet (external provisioning).
    Pending,
}

/// One member's persisted copy of a vault key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "wrapped", rename_all = "snake_case")]
pub enum WrappedVaultKey {
    SelfWrapped(String),
    PeerWrapped(String),
    Pending,
}

impl WrappedVaultKey {
    pub fn method(&self) -> WrapMethod {
        match self {
            Self::SelfWrapped(_) => WrapMethod::SelfWrap,
            Self::PeerWrapped(_) => WrapMethod::PeerWrap,
            Self::Pending => WrapMethod::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Binds a user to one wrapped copy of a vault's key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub vault_id: VaultId,
    pub user_id: UserId,
    pub wrapped_vault_key: WrappedVaultKey,
    pub granted_at: DateTime<Utc>,
}

impl Membership {
    pub fn method(&self) -> WrapMethod {
        self.wrapped_vault_key.method()
    }
}

/// Sensitive fields of a vault item. Each is encrypted independently.
///
/// Serialized as its display name so it can key a JSON object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FieldKind {
    Username,
    Password,
    TotpSeed,
    Note,
    Url,
    Custom(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Password => f.write_str("password"),
            Self::TotpSeed => f.write_str("totp_seed"),
            Self::Note => f.write_str("note"),
            Self::Url => f.write_str("url"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for FieldKind {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        match name.as_str() {
            "username" => Ok(Self::Username),
            "password" => Ok(Self::Password),
            "totp_seed" => Ok(Self::TotpSeed),
            "note" => Ok(Self::Note),
            "url" => Ok(Self::Url),
            other => other
                .strip_prefix("custom:")
                .filter(|custom| !custom.is_empty())
                .map(|custom| Self::Custom(custom.to_string()))
                .ok_or_else(|| format!("unknown field kind: {other}")),
        }
    }
}

/// An item as persisted: wrapped item key plus one ciphertext per field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedItem {
    pub item_id: ItemId,
    pub vault_id: VaultId,
    pub wrapped_item_key: String,
    pub fields: BTreeMap<FieldKind, String>,
}
