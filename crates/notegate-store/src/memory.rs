//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite but
//! keeps everything in memory with no persistence. Holding the write lock
//! across the whole consume unit gives it the same isolation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use notegate_core::{Credits, Grant, ResourceId, UserId};

use crate::error::Result;
use crate::traits::{
    ConsumeOutcome, CreditLedger, DecrementOutcome, EntitlementStore, InsertOutcome, Store,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Credit balances per user.
    credits: HashMap<UserId, Credits>,

    /// Grants keyed by (user, resource). The map key is the uniqueness
    /// guarantee: an occupied entry is `AlreadyExists`.
    grants: BTreeMap<(UserId, ResourceId), Grant>,

    /// Protected fields per resource.
    resources: HashMap<ResourceId, String>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                credits: HashMap::new(),
                grants: BTreeMap::new(),
                resources: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CreditLedger for MemoryStore {
    async fn credit_balance(&self, user: &UserId) -> Result<Credits> {
        let inner = self.inner.read().unwrap();
        Ok(inner.credits.get(user).copied().unwrap_or(0))
    }

    async fn try_decrement(&self, user: &UserId) -> Result<DecrementOutcome> {
        let mut inner = self.inner.write().unwrap();

        match inner.credits.get_mut(user) {
            Some(balance) if *balance >= 1 => {
                *balance -= 1;
                Ok(DecrementOutcome::Decremented { balance: *balance })
            }
            _ => Ok(DecrementOutcome::InsufficientCredit),
        }
    }

    async fn add_credits(&self, user: &UserId, amount: Credits) -> Result<Credits> {
        let mut inner = self.inner.write().unwrap();
        let balance = inner.credits.entry(*user).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn lookup_grant(&self, user: &UserId, resource: ResourceId) -> Result<Option<Grant>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.grants.get(&(*user, resource)).copied())
    }

    async fn insert_grant_if_absent(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<InsertOutcome> {
        let mut inner = self.inner.write().unwrap();

        if inner.grants.contains_key(&(*user, resource)) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        inner.grants.insert(
            (*user, resource),
            Grant {
                user: *user,
                resource,
                created_at: now_millis(),
            },
        );

        Ok(InsertOutcome::Created)
    }

    async fn grants_for(&self, user: &UserId) -> Result<Vec<Grant>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .grants
            .range((*user, ResourceId::new(0))..=(*user, ResourceId::new(u64::MAX)))
            .map(|(_, grant)| *grant)
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn consume_and_grant(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<ConsumeOutcome> {
        // One write lock spans the whole unit: lookup, decrement, and
        // insert are indivisible to every other caller.
        let mut inner = self.inner.write().unwrap();

        if inner.grants.contains_key(&(*user, resource)) {
            return Ok(ConsumeOutcome::AlreadyGranted);
        }

        let balance = match inner.credits.get_mut(user) {
            Some(balance) if *balance >= 1 => {
                *balance -= 1;
                *balance
            }
            _ => return Ok(ConsumeOutcome::InsufficientCredit),
        };

        inner.grants.insert(
            (*user, resource),
            Grant {
                user: *user,
                resource,
                created_at: now_millis(),
            },
        );

        Ok(ConsumeOutcome::Granted { balance })
    }

    async fn protected_notes(&self, resource: ResourceId) -> Result<Option<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.resources.get(&resource).cloned())
    }

    async fn put_resource(&self, resource: ResourceId, notes: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.resources.insert(resource, notes.to_owned());
        Ok(())
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
