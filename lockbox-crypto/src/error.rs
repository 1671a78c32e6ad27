//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while deriving, wrapping or encrypting.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The passphrase is not a well-formed 24-word mnemonic.
    #[error("weak input: {0}")]
    WeakInput(String),

    /// Authentication tag check failed (wrong key or tampered data).
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// The payload cannot be a wrapped value: not base64, or too short to
    /// hold a nonce and tag.
    #[error("malformed wrapped value: {0}")]
    Malformed(String),

    /// A public or private key needed for the operation is not available.
    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}
