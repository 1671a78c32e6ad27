//! Shared fixtures for vault integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lockbox_vault::{
    AccountBundle, AccountSetup, KeyDeriver, KeySession, LockboxConfig, OtpGate, UserId,
    VaultResult,
};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call per test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Deriver with cheap Argon2 parameters.
pub fn test_deriver() -> KeyDeriver {
    KeyDeriver::new(&LockboxConfig::for_tests()).expect("test config must validate")
}

/// A freshly set-up account.
pub struct TestAccount {
    pub user_id: UserId,
    pub mnemonic: String,
    pub bundle: AccountBundle,
    pub session: KeySession,
}

/// Runs the full setup wizard for a new user.
pub async fn new_account(deriver: &KeyDeriver) -> TestAccount {
    let user_id = UserId::new();
    let mut setup = AccountSetup::new(user_id);
    let mnemonic = setup.issue(deriver).await.expect("issue must succeed");
    setup.acknowledge(&mnemonic).expect("echo must match");
    let (bundle, session) = setup.complete().expect("setup must complete");

    TestAccount {
        user_id,
        mnemonic: mnemonic.to_string(),
        bundle,
        session,
    }
}

/// Accepts exactly one code.
pub struct FixedOtp(pub &'static str);

#[async_trait]
impl OtpGate for FixedOtp {
    async fn verify(&self, code: &str) -> VaultResult<bool> {
        Ok(code == self.0)
    }
}
