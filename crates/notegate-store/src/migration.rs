//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL
//! string that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Get current version
    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Apply migrations
    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            tracing::debug!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Per-user spendable balances. The CHECK backs the ledger's
        -- never-negative invariant at the storage layer.
        CREATE TABLE users (
            user_id BLOB PRIMARY KEY,          -- 32 bytes, opaque identity
            credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0)
        );

        -- Gated content records. Only the protected field lives here;
        -- public attributes belong to the presentation layer's store.
        CREATE TABLE resources (
            resource_id INTEGER PRIMARY KEY,
            notes TEXT NOT NULL               -- the protected field
        );

        -- Permanent entitlements. The composite primary key enforces
        -- at-most-one grant per (user, resource) pair; rows are never
        -- updated or deleted.
        CREATE TABLE grants (
            user_id BLOB NOT NULL,
            resource_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,      -- Unix ms
            PRIMARY KEY (user_id, resource_id)
        );

        CREATE INDEX idx_grants_user ON grants(user_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
