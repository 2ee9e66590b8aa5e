//! Store traits: the abstract interface for ledger and entitlement
//! persistence.
//!
//! These traits allow the gateway to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use notegate_core::{Credits, Grant, ResourceId, UserId};

use crate::error::Result;

/// Result of an atomic decrement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// One credit was subtracted; `balance` is the new value.
    Decremented {
        /// Balance after the decrement.
        balance: Credits,
    },
    /// Balance was below one; nothing was mutated.
    InsufficientCredit,
}

/// Result of inserting a grant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The grant was created; this caller won any race.
    Created,
    /// A grant for the pair already exists (not an error).
    AlreadyExists,
}

/// Result of the grant transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// One credit was spent and the grant recorded, atomically.
    Granted {
        /// Balance after the spend.
        balance: Credits,
    },
    /// A grant already existed (possibly created by a concurrent racer);
    /// the ledger was not touched.
    AlreadyGranted,
    /// Balance was below one; no grant was created, nothing was mutated.
    InsufficientCredit,
}

/// Per-user spendable credit balances.
///
/// Balances are non-negative integers. The only decrement path is
/// [`try_decrement`](CreditLedger::try_decrement), which is atomic and
/// composes into the grant transaction; the gateway never calls it
/// standalone. Increments come from the out-of-scope purchase flow through
/// [`add_credits`](CreditLedger::add_credits).
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance for a user. Unknown users have balance zero.
    async fn credit_balance(&self, user: &UserId) -> Result<Credits>;

    /// Atomically check `balance >= 1` and subtract one.
    ///
    /// On `InsufficientCredit` the balance is untouched. Never drives a
    /// balance negative.
    async fn try_decrement(&self, user: &UserId) -> Result<DecrementOutcome>;

    /// Add credits to a user's balance, creating the user if absent.
    /// Returns the new balance.
    async fn add_credits(&self, user: &UserId, amount: Credits) -> Result<Credits>;
}

/// Permanent grant records keyed by (user, resource).
///
/// Uniqueness on the pair is enforced at the storage layer, not merely
/// checked in application logic: of two concurrent inserts for the same
/// pair, exactly one observes `Created` and the other `AlreadyExists`.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Look up the grant for a (user, resource) pair.
    async fn lookup_grant(&self, user: &UserId, resource: ResourceId) -> Result<Option<Grant>>;

    /// Insert a grant if none exists for the pair.
    async fn insert_grant_if_absent(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<InsertOutcome>;

    /// All grants held by a user, oldest first.
    async fn grants_for(&self, user: &UserId) -> Result<Vec<Grant>>;
}

/// The full storage surface: ledger, entitlements, the grant transaction,
/// and the resource catalog holding the protected field.
///
/// # Design Notes
///
/// - **Atomicity**: [`consume_and_grant`](Store::consume_and_grant) is one
///   unit of work. No observable state has a decrement without the
///   corresponding grant, or a grant without its decrement.
/// - **Insert-first**: the grant insert runs before any ledger statement,
///   so a caller that loses the race is never charged.
/// - **Idempotency**: retrying a consumption converges - the retry finds
///   the grant already created and reports `AlreadyGranted` at no cost.
#[async_trait]
pub trait Store: CreditLedger + EntitlementStore {
    /// The grant transaction: within one atomic unit, insert the grant for
    /// (user, resource) and decrement the user's balance by one.
    ///
    /// # Returns
    /// - `Granted { balance }` if both steps committed.
    /// - `AlreadyGranted` if a grant already existed; the ledger is
    ///   untouched, including when a concurrent racer created it first.
    /// - `InsufficientCredit` if the balance was below one; the unit is
    ///   rolled back entirely, no grant remains.
    ///
    /// Any storage failure aborts with no partial effect.
    async fn consume_and_grant(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<ConsumeOutcome>;

    /// Fetch a resource's protected field. Pure read.
    async fn protected_notes(&self, resource: ResourceId) -> Result<Option<String>>;

    /// Create or replace a resource's protected field. Used by the
    /// out-of-scope content layer and by tests.
    async fn put_resource(&self, resource: ResourceId, notes: &str) -> Result<()>;
}
