//! Error types for identity verification.

use thiserror::Error;

/// Why a bearer credential was refused.
///
/// Every variant is a stable outcome for the same input: retrying an
/// identical credential yields the same refusal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("credential expired")]
    Expired,

    #[error("identity revoked")]
    Revoked,
}
