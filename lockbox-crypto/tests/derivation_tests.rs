//! Passphrase derivation: determinism, salt sensitivity, input validation
//! and separation between the root key and the verifier.

use lockbox_crypto::{
    derive, generate_mnemonic, wrap_key, CryptoError, KdfParams, Salt, Verifier, MNEMONIC_WORDS,
};
use pretty_assertions::assert_eq;

fn params() -> KdfParams {
    KdfParams::for_tests()
}

#[test]
fn same_passphrase_and_salt_is_deterministic() {
    let phrase = generate_mnemonic().unwrap();
    let salt = Salt::from_bytes(*b"s1-fixed-salt-01");

    let a = derive(&phrase, Some(salt), &params()).unwrap();
    let b = derive(&phrase, Some(salt), &params()).unwrap();

    assert_eq!(a.root_key.key().as_bytes(), b.root_key.key().as_bytes());
    assert_eq!(a.verifier.to_base64(), b.verifier.to_base64());
    assert_eq!(a.salt, salt);
}

#[test]
fn verifier_changes_with_salt() {
    let phrase = generate_mnemonic().unwrap();
    let s1 = Salt::from_bytes(*b"s1-fixed-salt-01");
    let s2 = Salt::from_bytes(*b"s2-fixed-salt-02");

    let v1 = derive(&phrase, Some(s1), &params()).unwrap().verifier;
    let v1_again = derive(&phrase, Some(s1), &params()).unwrap().verifier;
    let v2 = derive(&phrase, Some(s2), &params()).unwrap().verifier;

    assert!(v1.matches(&v1_again));
    assert!(!v1.matches(&v2));
}

#[test]
fn omitted_salt_generates_fresh_one() {
    let phrase = generate_mnemonic().unwrap();
    let a = derive(&phrase, None, &params()).unwrap();
    let b = derive(&phrase, None, &params()).unwrap();

    assert_ne!(a.salt, b.salt);
    assert!(!a.verifier.matches(&b.verifier));
}

#[test]
fn kdf_cost_parameters_change_output() {
    let phrase = generate_mnemonic().unwrap();
    let salt = Salt::random();
    let heavier = KdfParams {
        iterations: 2,
        ..params()
    };

    let a = derive(&phrase, Some(salt), &params()).unwrap();
    let b = derive(&phrase, Some(salt), &heavier).unwrap();
    assert!(!a.verifier.matches(&b.verifier));
}

#[test]
fn wrong_word_count_is_weak_input() {
    for count in [0, 1, 12, 23, 25] {
        let phrase = vec!["abandon"; count].join(" ");
        let err = derive(&phrase, None, &params()).unwrap_err();
        assert!(
            matches!(err, CryptoError::WeakInput(_)),
            "{count} words should be rejected"
        );
    }
}

#[test]
fn unknown_word_is_weak_input() {
    let mut words: Vec<String> = generate_mnemonic()
        .unwrap()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    words[3] = "notaword".to_string();
    assert_eq!(words.len(), MNEMONIC_WORDS);

    let err = derive(&words.join(" "), None, &params()).unwrap_err();
    assert!(matches!(err, CryptoError::WeakInput(_)));
}

#[test]
fn verifier_is_not_a_function_of_the_root_key_alone() {
    let phrase = generate_mnemonic().unwrap();
    let material = derive(&phrase, None, &params()).unwrap();
    let root_bytes = material.root_key.key().as_bytes();

    assert_ne!(root_bytes, material.verifier.as_bytes());

    // Neither a wrap of the root key nor the raw key encodes the verifier.
    let wrapped = wrap_key(root_bytes, material.root_key.key()).unwrap();
    assert!(!wrapped.contains(&material.verifier.to_base64()));
}

#[test]
fn verifier_survives_persistence() {
    let phrase = generate_mnemonic().unwrap();
    let material = derive(&phrase, None, &params()).unwrap();

    let stored_salt = material.salt.to_base64();
    let stored_verifier = material.verifier.to_base64();

    let salt = Salt::from_base64(&stored_salt).unwrap();
    let again = derive(&phrase, Some(salt), &params()).unwrap();
    assert!(again.verifier.matches(&Verifier::from_base64(&stored_verifier).unwrap()));
}
