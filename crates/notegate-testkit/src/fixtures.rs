//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: an issuer keypair, a verifier
//! trusting it, a memory store, and a gateway over both.

use notegate::Gateway;
use notegate_auth::{AccessToken, IssuerKeypair, TokenVerifier};
use notegate_core::{Credits, ResourceId, UserId};
use notegate_store::{CreditLedger, MemoryStore, Store};

/// How long fixture credentials stay valid (one hour).
const CREDENTIAL_TTL_MS: i64 = 60 * 60 * 1000;

/// A test fixture wiring a gateway over a memory store with a local issuer.
pub struct TestFixture {
    /// The credential issuer. Tests mint through [`TestFixture::credential`].
    pub issuer: IssuerKeypair,
    /// The gateway under test.
    pub gateway: Gateway<TokenVerifier, MemoryStore>,
}

impl TestFixture {
    /// Create a new fixture with a random issuer.
    pub fn new() -> Self {
        Self::build(IssuerKeypair::generate())
    }

    /// Create with a deterministic issuer from a seed.
    pub fn with_seed(seed: &[u8; 32]) -> Self {
        Self::build(IssuerKeypair::from_seed(seed))
    }

    fn build(issuer: IssuerKeypair) -> Self {
        let verifier = TokenVerifier::new(issuer.public_key());
        Self {
            issuer,
            gateway: Gateway::new(verifier, MemoryStore::new()),
        }
    }

    /// A deterministic user identity from a single byte.
    pub fn user(byte: u8) -> UserId {
        UserId::from_bytes([byte; 32])
    }

    /// Mint a valid credential for a user.
    pub fn credential(&self, user: UserId) -> String {
        AccessToken::new(user, now_millis() + CREDENTIAL_TTL_MS).mint(&self.issuer)
    }

    /// Mint a credential that expired one hour ago.
    pub fn expired_credential(&self, user: UserId) -> String {
        AccessToken::new(user, now_millis() - CREDENTIAL_TTL_MS).mint(&self.issuer)
    }

    /// Seed a user's credit balance.
    pub async fn seed_user(&self, user: UserId, credits: Credits) {
        self.gateway
            .store()
            .add_credits(&user, credits)
            .await
            .expect("seed_user");
    }

    /// Seed a resource's protected field.
    pub async fn seed_resource(&self, resource: u64, notes: &str) {
        self.gateway
            .store()
            .put_resource(ResourceId::new(resource), notes)
            .await
            .expect("seed_resource");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
