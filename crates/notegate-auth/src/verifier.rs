//! The identity verifier: credential in, user identity out.
//!
//! The gateway depends on the [`IdentityVerifier`] trait and never on a
//! concrete verifier, so tests can substitute their own.

use std::collections::HashSet;
use std::sync::RwLock;

use notegate_core::UserId;

use crate::crypto::IssuerPublicKey;
use crate::error::AuthError;
use crate::token::AccessToken;

/// Resolves a bearer credential to a stable user identity.
///
/// Verification is pure: no side effects, no storage access. A failure is
/// a stable outcome for the same credential and clock.
pub trait IdentityVerifier: Send + Sync {
    /// Verify a credential, resolving it to the identity it was minted for.
    fn verify(&self, credential: &str) -> Result<UserId, AuthError>;
}

/// Verifies signed bearer tokens against the issuer's public key.
///
/// Checks, in order: format, signature, expiry, revocation. The revocation
/// set is in-memory; revoking an identity invalidates every outstanding
/// credential minted for it.
pub struct TokenVerifier {
    issuer: IssuerPublicKey,
    revoked: RwLock<HashSet<UserId>>,
}

impl TokenVerifier {
    /// Create a verifier trusting the given issuer key.
    pub fn new(issuer: IssuerPublicKey) -> Self {
        Self {
            issuer,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Revoke an identity. All its credentials fail verification afterwards.
    pub fn revoke(&self, user: UserId) {
        self.revoked.write().unwrap().insert(user);
    }

    /// Verify against an explicit clock (Unix ms). Used by tests.
    pub fn verify_at(&self, credential: &str, now: i64) -> Result<UserId, AuthError> {
        let (token, sig) = AccessToken::parse(credential)?;

        self.issuer.verify(&token.signing_bytes(), &sig)?;

        if now > token.expires_at {
            return Err(AuthError::Expired);
        }

        if self.revoked.read().unwrap().contains(&token.user) {
            return Err(AuthError::Revoked);
        }

        Ok(token.user)
    }
}

impl IdentityVerifier for TokenVerifier {
    fn verify(&self, credential: &str) -> Result<UserId, AuthError> {
        self.verify_at(credential, now_millis())
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
