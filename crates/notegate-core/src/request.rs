//! The inbound access request body.
//!
//! The presentation layer sends this alongside a bearer credential. The
//! gateway validates the fields; this module only carries them.

use serde::{Deserialize, Serialize};

/// Body of a protected-field access request.
///
/// `resource_id` is required on the wire but modeled as `Option` so the
/// gateway can refuse a missing field as a validation failure instead of a
/// deserialization error. `use_credit` defaults to false: a plain request
/// never spends anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// The resource whose protected field is requested.
    pub resource_id: Option<u64>,

    /// Whether the caller opts into spending one credit if no grant exists.
    #[serde(default)]
    pub use_credit: bool,
}

impl AccessRequest {
    /// A request that only reads, never spends.
    pub fn read(resource_id: u64) -> Self {
        Self {
            resource_id: Some(resource_id),
            use_credit: false,
        }
    }

    /// A request that opts into consuming one credit.
    pub fn spend(resource_id: u64) -> Self {
        Self {
            resource_id: Some(resource_id),
            use_credit: true,
        }
    }
}
