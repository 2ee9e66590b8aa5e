//! Error taxonomy for the access gateway.

use notegate_auth::AuthError;
use notegate_core::ResourceId;
use notegate_store::StoreError;
use thiserror::Error;

/// A structured refusal from the access gateway.
///
/// Every refusal is surfaced to the caller as one of these; none are
/// swallowed. All variants except [`Transaction`](GatewayError::Transaction)
/// are stable outcomes for the same input state - retrying them without a
/// state change yields the same refusal.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The bearer credential was missing, malformed, or did not resolve to
    /// a known, non-revoked identity.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// The request carried no resource identifier.
    #[error("resource_id is required")]
    MissingResourceId,

    /// The resource identifier is not a positive integer.
    #[error("invalid resource_id: {0}")]
    InvalidResourceId(u64),

    /// The resource identifier does not resolve.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// No grant exists and the request did not opt into spending a credit.
    #[error("credit required")]
    CreditRequired,

    /// No grant exists, the request opted in, and the balance is exhausted.
    #[error("insufficient credit")]
    InsufficientCredit,

    /// The grant transaction aborted at the storage layer. No partial
    /// effect is observable; retrying is safe.
    #[error("transaction failed: {0}")]
    Transaction(#[from] StoreError),
}

impl GatewayError {
    /// Whether a caller-level retry is worthwhile.
    ///
    /// Only storage aborts are transient; consumption is idempotent, so
    /// the retry can be applied blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transaction(_))
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
