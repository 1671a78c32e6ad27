//! Item keys and per-field encryption.
//!
//! Each item has its own key, persisted only wrapped under the vault key.
//! Every sensitive field is a separate AEAD ciphertext with its own nonce,
//! so one damaged field never prevents reading the others.

use crate::error::VaultResult;
use crate::types::{EncryptedItem, FieldKind, ItemId, VaultId};
use lockbox_crypto::{
    decrypt_string, encrypt_string, unwrap_symmetric_key, wrap_key, ItemKey, VaultKey,
};
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroizing;

/// Creates a fresh item key and its wrap under the vault key.
pub fn create_item(ovk: &VaultKey) -> VaultResult<(ItemKey, String)> {
    let item_key = ItemKey::generate();
    let wrapped = wrap_key(item_key.as_bytes(), ovk.key())?;
    Ok((item_key, wrapped))
}

/// Unwraps an item key. A wrong vault key or tampering is `Integrity`.
pub fn open_item_key(wrapped: &str, ovk: &VaultKey) -> VaultResult<ItemKey> {
    Ok(ItemKey::from_key(unwrap_symmetric_key(wrapped, ovk.key())?))
}

/// Moves a wrapped item key from one vault key to another.
pub fn rewrap_item_key(wrapped: &str, old_ovk: &VaultKey, new_ovk: &VaultKey) -> VaultResult<String> {
    let item_key = open_item_key(wrapped, old_ovk)?;
    Ok(wrap_key(item_key.as_bytes(), new_ovk.key())?)
}

/// Encrypts one field under a fresh nonce.
pub fn encrypt_field(plaintext: &str, item_key: &ItemKey) -> VaultResult<String> {
    Ok(encrypt_string(item_key.key(), plaintext)?)
}

/// Decrypts one field.
pub fn decrypt_field(ciphertext: &str, item_key: &ItemKey) -> VaultResult<Zeroizing<String>> {
    Ok(decrypt_string(item_key.key(), ciphertext)?)
}

/// Creates an item in `vault_id` and encrypts each supplied field.
pub fn seal_item<'a, I>(vault_id: VaultId, ovk: &VaultKey, fields: I) -> VaultResult<EncryptedItem>
where
    I: IntoIterator<Item = (FieldKind, &'a str)>,
{
    let (item_key, wrapped_item_key) = create_item(ovk)?;
    let fields = fields
        .into_iter()
        .map(|(kind, plaintext)| Ok((kind, encrypt_field(plaintext, &item_key)?)))
        .collect::<VaultResult<BTreeMap<_, _>>>()?;

    let item = EncryptedItem {
        item_id: ItemId::new(),
        vault_id,
        wrapped_item_key,
        fields,
    };
    debug!(item_id = %item.item_id, %vault_id, fields = item.fields.len(), "sealed item");
    Ok(item)
}

/// Sets or replaces one field of an existing item.
pub fn update_field(
    item: &mut EncryptedItem,
    ovk: &VaultKey,
    kind: FieldKind,
    plaintext: &str,
) -> VaultResult<()> {
    let item_key = open_item_key(&item.wrapped_item_key, ovk)?;
    item.fields.insert(kind, encrypt_field(plaintext, &item_key)?);
    Ok(())
}

/// Opens every field of an item.
///
/// Fails outright only if the item key cannot be unwrapped; each field then
/// carries its own result.
pub fn open_item(
    item: &EncryptedItem,
    ovk: &VaultKey,
) -> VaultResult<BTreeMap<FieldKind, VaultResult<Zeroizing<String>>>> {
    let item_key = open_item_key(&item.wrapped_item_key, ovk)?;
    Ok(item
        .fields
        .iter()
        .map(|(kind, ciphertext)| (kind.clone(), decrypt_field(ciphertext, &item_key)))
        .collect())
}
