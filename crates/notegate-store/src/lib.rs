//! # Notegate Store
//!
//! Storage for the Notegate system: the credit ledger, the entitlement
//! store, and the grant transaction that ties them together. Provides a
//! trait-based interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Three traits describe the storage surface:
//!
//! - [`CreditLedger`] - per-user spendable balances, atomic decrement
//! - [`EntitlementStore`] - permanent (user, resource) grant records
//! - [`Store`] - both of the above plus [`Store::consume_and_grant`], the
//!   single atomic unit that spends one credit and records the grant
//!
//! The primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! tests. Both give the consume path isolation equivalent to a serializable
//! transaction on the (user, resource) key: concurrent consumptions of the
//! same pair yield exactly one `Granted` and at most one decrement.
//!
//! ## The critical rule
//!
//! Losing the race to create a grant must never leave the balance
//! decremented. Both backends attempt the grant insert first and only touch
//! the ledger once the insert is known to be the winner; an insufficient
//! balance rolls the insert back. See [`Store::consume_and_grant`].

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ConsumeOutcome, CreditLedger, DecrementOutcome, EntitlementStore, InsertOutcome, Store,
};
