//! Envelope encryption for vault key sharing.
//!
//! Uses X25519 key exchange + XSalsa20-Poly1305 to seal raw key bytes for a
//! recipient's public key. Each seal generates an ephemeral keypair, so the
//! sender's identity is not revealed and no two envelopes share a shared
//! secret. The wire form is base64(`ephemeral_pk || nonce || ciphertext || tag`).

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use zeroize::Zeroizing;

/// X25519 public key size in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// XSalsa20 nonce size in bytes.
pub const ENVELOPE_NONCE_SIZE: usize = 24;

const ENVELOPE_TAG_SIZE: usize = 16;

/// X25519 identity keypair.
///
/// The secret key implements `ZeroizeOnDrop` automatically (from crypto_box).
pub struct IdentityKeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl IdentityKeyPair {
    /// Generates a new keypair.
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Reconstructs a keypair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = SecretKey::from(bytes);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Returns the public key as raw 32-byte array.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// Returns the secret key bytes in a zeroizing buffer.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Public key in its persisted form.
    pub fn public_key_base64(&self) -> String {
        encode_public_key(&self.public)
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &encode_public_key(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub fn encode_public_key(pk: &PublicKey) -> String {
    BASE64.encode(pk.as_bytes())
}

/// Parses a persisted public key.
///
/// An empty value means the user never completed setup and is reported as
/// `MissingKey`.
pub fn decode_public_key(encoded: &str) -> CryptoResult<PublicKey> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(CryptoError::MissingKey(
            "recipient has no public key".to_string(),
        ));
    }
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::Encoding(format!("public key is not base64: {e}")))?;
    let arr: [u8; PUBLIC_KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
        CryptoError::Encoding(format!(
            "public key must be {PUBLIC_KEY_SIZE} bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(arr))
}

/// Seals raw key bytes for a recipient.
pub fn seal_key(raw_key: &[u8], recipient_pk: &PublicKey) -> CryptoResult<String> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let ephemeral_pk = ephemeral.public_key();

    let salsa_box = SalsaBox::new(recipient_pk, &ephemeral);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);

    let ciphertext = salsa_box
        .encrypt(&nonce, raw_key)
        .map_err(|e| CryptoError::Encryption(format!("envelope seal failed: {e}")))?;

    let mut buf = Vec::with_capacity(PUBLIC_KEY_SIZE + ENVELOPE_NONCE_SIZE + ciphertext.len());
    buf.extend_from_slice(ephemeral_pk.as_bytes());
    buf.extend_from_slice(nonce.as_slice());
    buf.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(buf))
}

/// Opens an envelope produced by [`seal_key`] with the recipient's secret key.
pub fn open_key(envelope: &str, recipient_sk: &SecretKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let bytes = BASE64
        .decode(envelope)
        .map_err(|e| CryptoError::Malformed(format!("envelope is not base64: {e}")))?;
    if bytes.len() < PUBLIC_KEY_SIZE + ENVELOPE_NONCE_SIZE + ENVELOPE_TAG_SIZE {
        return Err(CryptoError::Malformed(format!(
            "envelope truncated: {} bytes",
            bytes.len()
        )));
    }

    let (ephemeral, rest) = bytes.split_at(PUBLIC_KEY_SIZE);
    let (nonce, ciphertext) = rest.split_at(ENVELOPE_NONCE_SIZE);

    // X25519 ignores bit 255 of a public key, so a flipped top bit would
    // otherwise still open. Honest ephemeral keys always have it clear.
    if ephemeral[PUBLIC_KEY_SIZE - 1] & 0x80 != 0 {
        return Err(CryptoError::Integrity(
            "envelope carries a non-canonical ephemeral key".to_string(),
        ));
    }

    let mut ephemeral_arr = [0u8; PUBLIC_KEY_SIZE];
    ephemeral_arr.copy_from_slice(ephemeral);
    let ephemeral_pk = PublicKey::from(ephemeral_arr);
    let salsa_box = SalsaBox::new(&ephemeral_pk, recipient_sk);

    salsa_box
        .decrypt(crypto_box::Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| {
            CryptoError::Integrity("envelope open failed (wrong key or tampered data)".to_string())
        })
}

/// Seals for a recipient identified by their persisted public key.
pub fn encrypt_for(raw_key: &[u8], recipient_public_key: &str) -> CryptoResult<String> {
    let pk = decode_public_key(recipient_public_key)?;
    seal_key(raw_key, &pk)
}

/// Opens with the caller's own unwrapped identity.
pub fn decrypt_with(envelope: &str, own: &IdentityKeyPair) -> CryptoResult<Zeroizing<Vec<u8>>> {
    open_key(envelope, &own.secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout_starts_with_ephemeral_key() {
        let recipient = IdentityKeyPair::generate();
        let sealed = seal_key(&[1u8; 32], &recipient.public).unwrap();
        let raw = BASE64.decode(&sealed).unwrap();

        assert_eq!(
            raw.len(),
            PUBLIC_KEY_SIZE + ENVELOPE_NONCE_SIZE + 32 + ENVELOPE_TAG_SIZE
        );
        assert_ne!(&raw[..PUBLIC_KEY_SIZE], recipient.public.as_bytes());
    }

    #[test]
    fn empty_public_key_is_missing_key() {
        let err = encrypt_for(&[0u8; 32], "  ").unwrap_err();
        assert!(matches!(err, CryptoError::MissingKey(_)));
    }

    #[test]
    fn short_public_key_is_encoding_error() {
        let err = encrypt_for(&[0u8; 32], &BASE64.encode([9u8; 16])).unwrap_err();
        assert!(matches!(err, CryptoError::Encoding(_)));
    }

    #[test]
    fn keypair_roundtrip_from_secret_bytes() {
        let kp1 = IdentityKeyPair::generate();
        let kp2 = IdentityKeyPair::from_secret_bytes(*kp1.secret_bytes());
        assert_eq!(kp1.public_bytes(), kp2.public_bytes());
    }

    #[test]
    fn debug_hides_secret() {
        let kp = IdentityKeyPair::generate();
        let printed = format!("{kp:?}");
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains(&kp.public_key_base64()));
    }
}
