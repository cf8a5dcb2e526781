//! Schema migrations.
//!
//! Numbered SQL files are embedded at compile time. Each runs exactly once,
//! tracked by the `schema_version` table.

use crate::domain::errors::StoreError;
use rusqlite::Connection;
use tracing::info;

struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/001_initial.sql"),
}];

fn ensure_schema_version_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| StoreError::Storage(format!("Failed to create schema_version table: {}", e)))
}

/// Highest applied version, 0 for a fresh database.
pub(crate) fn current_version(conn: &Connection) -> Result<i32, StoreError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Storage(format!("Failed to read schema version: {}", e)))
}

/// Apply pending migrations. Returns how many were applied.
///
/// A database newer than this build is refused.
pub fn run_migrations(conn: &mut Connection) -> Result<usize, StoreError> {
    ensure_schema_version_table(conn)?;

    let current = current_version(conn)?;
    let max_known = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
    if current > max_known {
        return Err(StoreError::Storage(format!(
            "Database schema version ({}) is newer than supported ({})",
            current, max_known
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    for migration in &pending {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            StoreError::Storage(format!("Migration v{} failed: {}", migration.version, e))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
        tx.commit()?;
        info!(version = migration.version, "Applied schema migration");
    }

    Ok(pending.len())
}
