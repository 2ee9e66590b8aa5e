//! # Notegate Testkit
//!
//! Testing utilities for the Notegate workspace: a ready-made fixture
//! (issuer, verifier, memory store, gateway), proptest generators, and a
//! call-recording store probe for proving "no storage access" properties.
//!
//! This crate also hosts the end-to-end and property tests that exercise
//! the whole stack through signed credentials.

pub mod fixtures;
pub mod generators;
pub mod probe;

pub use fixtures::{init_tracing, TestFixture};
pub use probe::RecordingStore;
