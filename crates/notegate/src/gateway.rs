//! The access gateway: orchestrates one inbound request.
//!
//! The gateway verifies identity, checks the entitlement store, and
//! conditionally invokes the grant transaction, returning the protected
//! field or a structured refusal. Side effects are confined to the grant
//! transaction; every other step is a pure read.

use std::sync::Arc;

use notegate_auth::{AuthError, IdentityVerifier};
use notegate_core::{AccessRequest, Credits, ResourceId, UserId};
use notegate_store::{ConsumeOutcome, Store};

use crate::error::{GatewayError, Result};

/// A successful view of a resource's protected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessView {
    /// The protected field.
    pub notes: String,

    /// The balance after this call, if this call consumed a credit.
    /// `None` for free views (existing grant, or a race lost to a
    /// concurrent consumer who paid).
    pub balance: Option<Credits>,
}

impl AccessView {
    /// Whether this view spent a credit.
    pub fn consumed(&self) -> bool {
        self.balance.is_some()
    }
}

/// The access gateway.
///
/// Holds its collaborators by explicit injection: an identity verifier and
/// a store. No ambient globals, no process-wide singletons.
pub struct Gateway<V: IdentityVerifier, S: Store> {
    verifier: V,
    store: Arc<S>,
}

impl<V: IdentityVerifier, S: Store> Gateway<V, S> {
    /// Create a gateway over the given verifier and store.
    pub fn new(verifier: V, store: S) -> Self {
        Self {
            verifier,
            store: Arc::new(store),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the verifier reference.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Handle one access request.
    ///
    /// Decision tree, in order:
    /// 1. no/invalid credential - refuse, no storage access
    /// 2. missing or non-positive `resource_id` - refuse, no storage access
    /// 3. unknown resource - refuse before any ledger interaction
    /// 4. grant exists - return the protected field, ledger untouched
    /// 5. no grant, `use_credit` false - refuse with credit-required
    /// 6. no grant, `use_credit` true - run the grant transaction
    pub async fn check_access(
        &self,
        credential: Option<&str>,
        request: &AccessRequest,
    ) -> Result<AccessView> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;
        let user = self.verifier.verify(credential)?;

        let resource = validate_resource_id(request.resource_id)?;

        // Resolving the resource first means an unknown id can never
        // consume a credit.
        let notes = self
            .store
            .protected_notes(resource)
            .await?
            .ok_or(GatewayError::ResourceNotFound(resource))?;

        if self.store.lookup_grant(&user, resource).await?.is_some() {
            tracing::debug!(%user, %resource, "existing grant, free view");
            return Ok(AccessView {
                notes,
                balance: None,
            });
        }

        if !request.use_credit {
            return Err(GatewayError::CreditRequired);
        }

        self.consume(&user, resource, notes).await
    }

    /// Run the grant transaction and map its outcome.
    async fn consume(&self, user: &UserId, resource: ResourceId, notes: String) -> Result<AccessView> {
        match self.store.consume_and_grant(user, resource).await {
            Ok(ConsumeOutcome::Granted { balance }) => {
                tracing::debug!(%user, %resource, balance, "credit consumed, grant created");
                Ok(AccessView {
                    notes,
                    balance: Some(balance),
                })
            }
            // A concurrent request won the race and paid; this caller
            // gets the view free, exactly as if the grant had existed.
            Ok(ConsumeOutcome::AlreadyGranted) => Ok(AccessView {
                notes,
                balance: None,
            }),
            Ok(ConsumeOutcome::InsufficientCredit) => Err(GatewayError::InsufficientCredit),
            Err(e) => {
                tracing::warn!(%user, %resource, error = %e, "grant transaction aborted");
                Err(GatewayError::Transaction(e))
            }
        }
    }
}

/// Check the wire-level resource id: required, positive.
fn validate_resource_id(raw: Option<u64>) -> Result<ResourceId> {
    match raw {
        None => Err(GatewayError::MissingResourceId),
        Some(0) => Err(GatewayError::InvalidResourceId(0)),
        Some(id) => Ok(ResourceId::new(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegate_store::{CreditLedger, MemoryStore};

    /// Verifier for unit tests: "user-<hex>" resolves, anything else fails.
    struct PrefixVerifier;

    impl IdentityVerifier for PrefixVerifier {
        fn verify(&self, credential: &str) -> std::result::Result<UserId, AuthError> {
            let hex = credential
                .strip_prefix("user-")
                .ok_or(AuthError::InvalidSignature)?;
            UserId::from_hex(hex).map_err(|e| AuthError::Malformed(e.to_string()))
        }
    }

    fn credential(byte: u8) -> String {
        format!("user-{}", UserId::from_bytes([byte; 32]).to_hex())
    }

    async fn gateway_with_resource() -> Gateway<PrefixVerifier, MemoryStore> {
        let store = MemoryStore::new();
        store.put_resource(ResourceId::new(1), "12.3").await.unwrap();
        Gateway::new(PrefixVerifier, store)
    }

    #[tokio::test]
    async fn test_missing_credential_refused() {
        let gateway = gateway_with_resource().await;
        let err = gateway
            .check_access(None, &AccessRequest::read(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Authentication(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_missing_resource_id_refused() {
        let gateway = gateway_with_resource().await;
        let request = AccessRequest {
            resource_id: None,
            use_credit: false,
        };
        let err = gateway
            .check_access(Some(&credential(1)), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingResourceId));
    }

    #[tokio::test]
    async fn test_zero_resource_id_refused() {
        let gateway = gateway_with_resource().await;
        let err = gateway
            .check_access(Some(&credential(1)), &AccessRequest::read(0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResourceId(0)));
    }

    #[tokio::test]
    async fn test_unknown_resource_never_charges() {
        let gateway = gateway_with_resource().await;
        let user = UserId::from_bytes([1; 32]);
        gateway.store().add_credits(&user, 1).await.unwrap();

        let err = gateway
            .check_access(Some(&credential(1)), &AccessRequest::spend(999))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ResourceNotFound(_)));
        assert_eq!(gateway.store().credit_balance(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_credit_required_without_opt_in() {
        let gateway = gateway_with_resource().await;
        let err = gateway
            .check_access(Some(&credential(1)), &AccessRequest::read(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CreditRequired));
    }

    #[tokio::test]
    async fn test_spend_then_free_view() {
        let gateway = gateway_with_resource().await;
        let user = UserId::from_bytes([1; 32]);
        gateway.store().add_credits(&user, 3).await.unwrap();

        let view = gateway
            .check_access(Some(&credential(1)), &AccessRequest::spend(1))
            .await
            .unwrap();
        assert_eq!(view.notes, "12.3");
        assert_eq!(view.balance, Some(2));
        assert!(view.consumed());

        // Second view is free regardless of use_credit.
        let view = gateway
            .check_access(Some(&credential(1)), &AccessRequest::spend(1))
            .await
            .unwrap();
        assert_eq!(view.balance, None);
        assert_eq!(gateway.store().credit_balance(&user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_credit_refused() {
        let gateway = gateway_with_resource().await;

        let err = gateway
            .check_access(Some(&credential(1)), &AccessRequest::spend(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientCredit));
        assert!(!err.is_retryable());
    }
}
