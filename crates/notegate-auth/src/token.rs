//! Bearer token format.
//!
//! A credential is the string `v1.<user-hex>.<expires-at-ms>.<sig-hex>`,
//! where the signature covers everything before the final dot. The format
//! is versioned so it can evolve without breaking outstanding tokens.

use notegate_core::UserId;

use crate::crypto::{CredentialSignature, IssuerKeypair};
use crate::error::AuthError;

/// Version tag of the current credential format.
const VERSION: &str = "v1";

/// The claims carried by a credential: who, and until when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessToken {
    /// The identity this credential resolves to.
    pub user: UserId,

    /// Expiry, Unix milliseconds. A token is valid through this instant.
    pub expires_at: i64,
}

impl AccessToken {
    /// Create a token for a user with the given expiry.
    pub fn new(user: UserId, expires_at: i64) -> Self {
        Self { user, expires_at }
    }

    /// The bytes the issuer signs: the credential string minus the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        format!("{}.{}.{}", VERSION, self.user.to_hex(), self.expires_at).into_bytes()
    }

    /// Mint the full credential string, signed by the issuer.
    pub fn mint(&self, issuer: &IssuerKeypair) -> String {
        let sig = issuer.sign(&self.signing_bytes());
        format!(
            "{}.{}.{}.{}",
            VERSION,
            self.user.to_hex(),
            self.expires_at,
            sig.to_hex()
        )
    }

    /// Parse a credential string into its claims and signature.
    ///
    /// Parsing performs no verification; callers must check the signature
    /// against the issuer key and the expiry against a clock.
    pub fn parse(credential: &str) -> Result<(Self, CredentialSignature), AuthError> {
        let parts: Vec<&str> = credential.split('.').collect();
        let [version, user_hex, expires, sig_hex] = parts.as_slice() else {
            return Err(AuthError::Malformed(format!(
                "expected 4 dot-separated parts, got {}",
                parts.len()
            )));
        };

        if *version != VERSION {
            return Err(AuthError::Malformed(format!(
                "unsupported credential version: {version}"
            )));
        }

        let user = UserId::from_hex(user_hex)
            .map_err(|e| AuthError::Malformed(format!("bad user id: {e}")))?;

        let expires_at: i64 = expires
            .parse()
            .map_err(|_| AuthError::Malformed("bad expiry".to_string()))?;

        let sig = CredentialSignature::from_hex(sig_hex)
            .map_err(|e| AuthError::Malformed(format!("bad signature encoding: {e}")))?;

        Ok((Self { user, expires_at }, sig))
    }
}
