//! A call-recording store wrapper.
//!
//! Several gateway properties are about what the gateway does NOT do: an
//! unauthenticated request performs no storage access, a granted view never
//! touches the ledger. [`RecordingStore`] wraps any store and counts calls
//! per component so tests can assert on the absence of traffic.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use notegate_core::{Credits, Grant, ResourceId, UserId};
use notegate_store::{
    ConsumeOutcome, CreditLedger, DecrementOutcome, EntitlementStore, InsertOutcome, Store,
};

/// Store wrapper counting calls by component.
pub struct RecordingStore<S> {
    inner: S,
    ledger_calls: AtomicUsize,
    entitlement_calls: AtomicUsize,
    catalog_calls: AtomicUsize,
    consume_calls: AtomicUsize,
}

impl<S> RecordingStore<S> {
    /// Wrap a store, starting all counters at zero.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ledger_calls: AtomicUsize::new(0),
            entitlement_calls: AtomicUsize::new(0),
            catalog_calls: AtomicUsize::new(0),
            consume_calls: AtomicUsize::new(0),
        }
    }

    /// Calls into the credit ledger (balance, decrement, top-up).
    pub fn ledger_calls(&self) -> usize {
        self.ledger_calls.load(Ordering::SeqCst)
    }

    /// Calls into the entitlement store (lookup, insert, listing).
    pub fn entitlement_calls(&self) -> usize {
        self.entitlement_calls.load(Ordering::SeqCst)
    }

    /// Calls into the resource catalog (notes fetch, upsert).
    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    /// Grant transaction invocations.
    pub fn consume_calls(&self) -> usize {
        self.consume_calls.load(Ordering::SeqCst)
    }

    /// Every storage call of any kind.
    pub fn total_calls(&self) -> usize {
        self.ledger_calls() + self.entitlement_calls() + self.catalog_calls() + self.consume_calls()
    }

    /// Zero all counters; used after seeding.
    pub fn reset(&self) {
        self.ledger_calls.store(0, Ordering::SeqCst);
        self.entitlement_calls.store(0, Ordering::SeqCst);
        self.catalog_calls.store(0, Ordering::SeqCst);
        self.consume_calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: Store> CreditLedger for RecordingStore<S> {
    async fn credit_balance(&self, user: &UserId) -> notegate_store::Result<Credits> {
        self.ledger_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.credit_balance(user).await
    }

    async fn try_decrement(&self, user: &UserId) -> notegate_store::Result<DecrementOutcome> {
        self.ledger_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.try_decrement(user).await
    }

    async fn add_credits(&self, user: &UserId, amount: Credits) -> notegate_store::Result<Credits> {
        self.ledger_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.add_credits(user, amount).await
    }
}

#[async_trait]
impl<S: Store> EntitlementStore for RecordingStore<S> {
    async fn lookup_grant(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> notegate_store::Result<Option<Grant>> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_grant(user, resource).await
    }

    async fn insert_grant_if_absent(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> notegate_store::Result<InsertOutcome> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_grant_if_absent(user, resource).await
    }

    async fn grants_for(&self, user: &UserId) -> notegate_store::Result<Vec<Grant>> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.grants_for(user).await
    }
}

#[async_trait]
impl<S: Store> Store for RecordingStore<S> {
    async fn consume_and_grant(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> notegate_store::Result<ConsumeOutcome> {
        self.consume_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.consume_and_grant(user, resource).await
    }

    async fn protected_notes(&self, resource: ResourceId) -> notegate_store::Result<Option<String>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.protected_notes(resource).await
    }

    async fn put_resource(&self, resource: ResourceId, notes: &str) -> notegate_store::Result<()> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.put_resource(resource, notes).await
    }
}
