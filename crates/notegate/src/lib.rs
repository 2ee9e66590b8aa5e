//! # Notegate
//!
//! The unified API for the Notegate system - gating a resource's protected
//! field behind a consumable credit and a permanent view grant.
//!
//! ## Overview
//!
//! A user may view a resource's protected field exactly once "for free"
//! after spending one credit; every later view of the same resource is free,
//! because the spend is permanently recorded as a grant. The core promise:
//! under concurrent or retried requests, a (user, resource) pair is charged
//! at most once and holds at most one grant.
//!
//! ## Key Concepts
//!
//! - **Credit**: a per-user spendable integer unit.
//! - **Grant**: permanent, monotonic; never expires, never evicted.
//! - **Grant transaction**: the single atomic unit that spends a credit and
//!   records the grant. Losing the race to create the grant never charges.
//! - **Gateway**: verifies identity, then walks the decision tree; side
//!   effects are confined to the grant transaction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notegate::{Gateway, AccessRequest};
//! use notegate::auth::{IssuerKeypair, TokenVerifier};
//! use notegate::store::SqliteStore;
//!
//! async fn example(credential: &str) {
//!     let issuer = IssuerKeypair::generate();
//!     let verifier = TokenVerifier::new(issuer.public_key());
//!     let store = SqliteStore::open("notegate.db").unwrap();
//!
//!     let gateway = Gateway::new(verifier, store);
//!
//!     let view = gateway
//!         .check_access(Some(credential), &AccessRequest::spend(17))
//!         .await
//!         .unwrap();
//!     let _ = view.notes;
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `notegate::core` - Core types (UserId, ResourceId, Grant, ...)
//! - `notegate::auth` - Identity verification
//! - `notegate::store` - Storage abstraction, SQLite and memory backends

pub mod error;
pub mod gateway;
pub mod wire;

// Re-export component crates
pub use notegate_auth as auth;
pub use notegate_core as core;
pub use notegate_store as store;

// Re-export main types for convenience
pub use error::{GatewayError, Result};
pub use gateway::{AccessView, Gateway};
pub use wire::{ErrorBody, NotesBody, StatusClass};

// Re-export commonly used core types
pub use notegate_core::{AccessRequest, Credits, Grant, ResourceId, UserId};
