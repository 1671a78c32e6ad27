//! Vault key distribution and key workflows for Lockbox.
//!
//! Builds on `lockbox-crypto`:
//! - [`KeyDeriver`]: async passphrase derivation on the blocking pool
//! - [`vault_key`] and [`VaultRoster`]: one vault key per vault, one wrapped
//!   copy per member (self wrap, peer wrap, or pending provisioning)
//! - [`item`]: per-item keys and independent field ciphertexts
//! - [`AccountSetup`] and [`PassphraseRotation`]: guarded state machines
//! - [`KeySession`]: unlocked key material with an explicit `clear()`
//!
//! # Unlock flow
//!
//! ```text
//! passphrase + salt ─► KeyDeriver ─► root key ─► identity keypair
//!                                       │              │
//!                              SelfWrapped OVK   PeerWrapped OVK
//!                                       └──────┬───────┘
//!                                              ▼
//!                                  item key ─► fields
//! ```

pub mod account;
pub mod config;
pub mod deriver;
pub mod error;
pub mod item;
pub mod roster;
pub mod rotation;
pub mod session;
pub mod types;
pub mod vault_key;

pub use account::{AccountBundle, AccountSetup, SetupState};
pub use config::{LockboxConfig, KDF_FLOOR};
pub use deriver::KeyDeriver;
pub use error::{ResolveFailure, VaultError, VaultResult};
pub use item::{
    create_item, decrypt_field, encrypt_field, open_item, open_item_key, rewrap_item_key,
    seal_item, update_field,
};
pub use roster::VaultRoster;
pub use rotation::{
    OtpGate, PassphraseRotation, RootBoundArtifacts, RotationOutcome, RotationState,
};
pub use session::{KeySession, StoredCredentials};
pub use types::{
    EncryptedItem, FieldKind, ItemId, Membership, UserId, VaultId, VaultKind, WrapMethod,
    WrappedVaultKey,
};
pub use vault_key::UnwrapContext;
