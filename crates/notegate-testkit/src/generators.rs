//! Proptest strategies for Notegate types.

use proptest::prelude::*;

use notegate_core::{Credits, ResourceId, UserId};

/// Any 32-byte user identity.
pub fn arb_user_id() -> impl Strategy<Value = UserId> {
    any::<[u8; 32]>().prop_map(UserId::from_bytes)
}

/// A wire-valid (positive) resource identifier.
pub fn arb_resource_id() -> impl Strategy<Value = ResourceId> {
    (1u64..1_000).prop_map(ResourceId::new)
}

/// A small starting balance, including the interesting zero case.
pub fn arb_starting_balance() -> impl Strategy<Value = Credits> {
    0u64..5
}
