//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for Notegate. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking. A single
//! connection behind a mutex serializes all units of work, which gives the
//! grant transaction the isolation the ledger invariants require.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use notegate_core::{Credits, Grant, ResourceId, UserId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    ConsumeOutcome, CreditLedger, DecrementOutcome, EntitlementStore, InsertOutcome, Store,
};

/// SQLite-based store implementation.
///
/// Thread-safe via an internal mutex. All operations run on the blocking
/// pool to avoid stalling the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a read-style operation on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }

    /// Run an operation that needs a transaction on the blocking pool.
    async fn with_conn_mut<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

#[async_trait]
impl CreditLedger for SqliteStore {
    async fn credit_balance(&self, user: &UserId) -> Result<Credits> {
        let user = *user;
        self.with_conn(move |conn| {
            let balance: Option<i64> = conn
                .query_row(
                    "SELECT credits FROM users WHERE user_id = ?1",
                    params![user.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(balance.unwrap_or(0) as Credits)
        })
        .await
    }

    async fn try_decrement(&self, user: &UserId) -> Result<DecrementOutcome> {
        let user = *user;
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET credits = credits - 1
                 WHERE user_id = ?1 AND credits >= 1",
                params![user.as_bytes().as_slice()],
            )?;

            if changed == 0 {
                return Ok(DecrementOutcome::InsufficientCredit);
            }

            let balance: i64 = conn.query_row(
                "SELECT credits FROM users WHERE user_id = ?1",
                params![user.as_bytes().as_slice()],
                |row| row.get(0),
            )?;

            Ok(DecrementOutcome::Decremented {
                balance: balance as Credits,
            })
        })
        .await
    }

    async fn add_credits(&self, user: &UserId, amount: Credits) -> Result<Credits> {
        let user = *user;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, credits) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET credits = credits + excluded.credits",
                params![user.as_bytes().as_slice(), amount as i64],
            )?;

            let balance: i64 = conn.query_row(
                "SELECT credits FROM users WHERE user_id = ?1",
                params![user.as_bytes().as_slice()],
                |row| row.get(0),
            )?;

            Ok(balance as Credits)
        })
        .await
    }
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    async fn lookup_grant(&self, user: &UserId, resource: ResourceId) -> Result<Option<Grant>> {
        let user = *user;
        self.with_conn(move |conn| {
            let created_at: Option<i64> = conn
                .query_row(
                    "SELECT created_at FROM grants WHERE user_id = ?1 AND resource_id = ?2",
                    params![user.as_bytes().as_slice(), resource.get() as i64],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(created_at.map(|created_at| Grant {
                user,
                resource,
                created_at,
            }))
        })
        .await
    }

    async fn insert_grant_if_absent(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<InsertOutcome> {
        let user = *user;
        self.with_conn(move |conn| {
            // The composite primary key turns the race into a no-op insert:
            // exactly one of two concurrent callers changes a row.
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO grants (user_id, resource_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    user.as_bytes().as_slice(),
                    resource.get() as i64,
                    now_millis()
                ],
            )?;

            if inserted == 0 {
                Ok(InsertOutcome::AlreadyExists)
            } else {
                Ok(InsertOutcome::Created)
            }
        })
        .await
    }

    async fn grants_for(&self, user: &UserId) -> Result<Vec<Grant>> {
        let user = *user;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT resource_id, created_at FROM grants
                 WHERE user_id = ?1
                 ORDER BY created_at, resource_id",
            )?;

            let grants = stmt
                .query_map(params![user.as_bytes().as_slice()], |row| {
                    let resource_id: i64 = row.get(0)?;
                    let created_at: i64 = row.get(1)?;
                    Ok(Grant {
                        user,
                        resource: ResourceId::new(resource_id as u64),
                        created_at,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(grants)
        })
        .await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn consume_and_grant(
        &self,
        user: &UserId,
        resource: ResourceId,
    ) -> Result<ConsumeOutcome> {
        let user = *user;
        self.with_conn_mut(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // Insert first: a caller that loses the race returns here
            // without ever running a ledger statement.
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO grants (user_id, resource_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    user.as_bytes().as_slice(),
                    resource.get() as i64,
                    now_millis()
                ],
            )?;

            if inserted == 0 {
                return Ok(ConsumeOutcome::AlreadyGranted);
            }

            let decremented = tx.execute(
                "UPDATE users SET credits = credits - 1
                 WHERE user_id = ?1 AND credits >= 1",
                params![user.as_bytes().as_slice()],
            )?;

            if decremented == 0 {
                // Dropping the uncommitted transaction rolls the grant
                // insert back; the unit leaves no trace.
                return Ok(ConsumeOutcome::InsufficientCredit);
            }

            let balance: i64 = tx.query_row(
                "SELECT credits FROM users WHERE user_id = ?1",
                params![user.as_bytes().as_slice()],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(ConsumeOutcome::Granted {
                balance: balance as Credits,
            })
        })
        .await
    }

    async fn protected_notes(&self, resource: ResourceId) -> Result<Option<String>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT notes FROM resources WHERE resource_id = ?1",
                params![resource.get() as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn put_resource(&self, resource: ResourceId, notes: &str) -> Result<()> {
        let notes = notes.to_owned();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO resources (resource_id, notes) VALUES (?1, ?2)
                 ON CONFLICT(resource_id) DO UPDATE SET notes = excluded.notes",
                params![resource.get() as i64, notes],
            )?;
            Ok(())
        })
        .await
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

#[cfg(test)]
mod tests {
    use super::*;

    fn user(byte: u8) -> UserId {
        UserId::from_bytes([byte; 32])
    }

    #[tokio::test]
    async fn test_balance_defaults_to_zero() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.credit_balance(&user(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_credits_and_balance() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);

        assert_eq!(store.add_credits(&u, 3).await.unwrap(), 3);
        assert_eq!(store.add_credits(&u, 2).await.unwrap(), 5);
        assert_eq!(store.credit_balance(&u).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_decrement_at_zero_never_mutates() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);

        assert_eq!(
            store.try_decrement(&u).await.unwrap(),
            DecrementOutcome::InsufficientCredit
        );
        assert_eq!(store.credit_balance(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrement_returns_new_balance() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);
        store.add_credits(&u, 2).await.unwrap();

        assert_eq!(
            store.try_decrement(&u).await.unwrap(),
            DecrementOutcome::Decremented { balance: 1 }
        );
        assert_eq!(
            store.try_decrement(&u).await.unwrap(),
            DecrementOutcome::Decremented { balance: 0 }
        );
        assert_eq!(
            store.try_decrement(&u).await.unwrap(),
            DecrementOutcome::InsufficientCredit
        );
    }

    #[tokio::test]
    async fn test_grant_insert_is_unique() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);
        let r = ResourceId::new(7);

        assert_eq!(
            store.insert_grant_if_absent(&u, r).await.unwrap(),
            InsertOutcome::Created
        );
        assert_eq!(
            store.insert_grant_if_absent(&u, r).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        let grant = store.lookup_grant(&u, r).await.unwrap().unwrap();
        assert_eq!(grant.user, u);
        assert_eq!(grant.resource, r);
    }

    #[tokio::test]
    async fn test_consume_decrements_once_then_reuses_grant() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);
        let r = ResourceId::new(7);
        store.add_credits(&u, 3).await.unwrap();

        assert_eq!(
            store.consume_and_grant(&u, r).await.unwrap(),
            ConsumeOutcome::Granted { balance: 2 }
        );
        assert!(store.lookup_grant(&u, r).await.unwrap().is_some());

        // Retrying the identical consumption converges with no further charge.
        assert_eq!(
            store.consume_and_grant(&u, r).await.unwrap(),
            ConsumeOutcome::AlreadyGranted
        );
        assert_eq!(store.credit_balance(&u).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_consume_with_empty_balance_leaves_no_grant() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);
        let r = ResourceId::new(7);

        assert_eq!(
            store.consume_and_grant(&u, r).await.unwrap(),
            ConsumeOutcome::InsufficientCredit
        );

        // The whole unit rolled back: no grant, balance still zero.
        assert!(store.lookup_grant(&u, r).await.unwrap().is_none());
        assert_eq!(store.credit_balance(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consume_distinct_resources_spend_separately() {
        let store = SqliteStore::open_memory().unwrap();
        let u = user(1);
        store.add_credits(&u, 2).await.unwrap();

        assert_eq!(
            store
                .consume_and_grant(&u, ResourceId::new(1))
                .await
                .unwrap(),
            ConsumeOutcome::Granted { balance: 1 }
        );
        assert_eq!(
            store
                .consume_and_grant(&u, ResourceId::new(2))
                .await
                .unwrap(),
            ConsumeOutcome::Granted { balance: 0 }
        );
        assert_eq!(
            store
                .consume_and_grant(&u, ResourceId::new(3))
                .await
                .unwrap(),
            ConsumeOutcome::InsufficientCredit
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_charges_once() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let u = user(1);
        let r = ResourceId::new(9);
        store.add_credits(&u, 1).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.consume_and_grant(&u, r).await.unwrap()
            }));
        }

        let mut granted = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ConsumeOutcome::Granted { balance } => {
                    granted += 1;
                    assert_eq!(balance, 0);
                }
                ConsumeOutcome::AlreadyGranted => already += 1,
                ConsumeOutcome::InsufficientCredit => panic!("balance was sufficient"),
            }
        }

        assert_eq!(granted, 1);
        assert_eq!(already, 7);
        assert_eq!(store.credit_balance(&u).await.unwrap(), 0);
        assert_eq!(store.grants_for(&u).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resource_notes_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let r = ResourceId::new(42);

        assert_eq!(store.protected_notes(r).await.unwrap(), None);

        store.put_resource(r, "14.5").await.unwrap();
        assert_eq!(
            store.protected_notes(r).await.unwrap().as_deref(),
            Some("14.5")
        );

        store.put_resource(r, "15.0").await.unwrap();
        assert_eq!(
            store.protected_notes(r).await.unwrap().as_deref(),
            Some("15.0")
        );
    }

    #[tokio::test]
    async fn test_grants_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notegate.db");
        let u = user(1);
        let r = ResourceId::new(5);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.add_credits(&u, 1).await.unwrap();
            assert_eq!(
                store.consume_and_grant(&u, r).await.unwrap(),
                ConsumeOutcome::Granted { balance: 0 }
            );
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.lookup_grant(&u, r).await.unwrap().is_some());
        assert_eq!(store.credit_balance(&u).await.unwrap(), 0);
    }
}
