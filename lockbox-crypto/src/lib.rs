//! Encryption primitives for Lockbox.
//!
//! Provides the client-side key hierarchy using:
//! - Argon2id + HKDF-SHA256 for passphrase derivation (root key and verifier)
//! - ChaCha20-Poly1305 for symmetric key wrapping and field encryption
//! - X25519 + XSalsa20-Poly1305 sealed envelopes for sharing keys between users
//! - Zeroization of all key material on drop
//!
//! # Architecture
//!
//! ```text
//! passphrase ─► root key ─► wrapped identity secret key
//!                   │                 │
//!                   ▼                 ▼
//!         self-wrapped vault key   peer-wrapped vault key
//!                   └──────┬──────────┘
//!                          ▼
//!                 wrapped item key ─► field ciphertexts
//! ```
//!
//! Every persisted artifact is a single base64 string. The server only ever
//! stores these strings, the salt, the verifier and the public key.

mod cipher;
pub mod derivation;
pub mod envelope;
mod error;
pub mod identity;
mod key;

pub use cipher::{
    decrypt, decrypt_string, encrypt, encrypt_string, unwrap_key, unwrap_symmetric_key, wrap_key,
    EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use derivation::{
    derive, generate_mnemonic, normalize_mnemonic, verify, RootMaterial, Verifier, MNEMONIC_WORDS,
};
pub use envelope::{
    decode_public_key, decrypt_with, encode_public_key, encrypt_for, open_key, seal_key,
    IdentityKeyPair,
};
pub use error::{CryptoError, CryptoResult};
pub use identity::{generate_identity, rewrap_private_key, unwrap_private_key, wrap_private_key};
pub use key::{
    generate_random_key, ItemKey, KdfParams, RootKey, Salt, SymmetricKey, VaultKey, KEY_SIZE,
    SALT_SIZE,
};

/// Re-exported so callers can hold public keys without depending on crypto_box.
pub use crypto_box::PublicKey;
