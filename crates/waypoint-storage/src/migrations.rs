//! Schema migrations
//!
//! Each entry upgrades the schema by one version. Steps run in order, each
//! in its own transaction.

use crate::error::StorageError;
use crate::Result;
use rusqlite::{Connection, OptionalExtension};

const MIGRATIONS: &[(i32, &str, &str)] = &[(1, "settings and saved sets", V1)];

const V1: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    -- One row per save; markers holds the exported JSON array
    CREATE TABLE IF NOT EXISTS saved_sets (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL,
        saved_at TEXT NOT NULL,
        marker_count INTEGER NOT NULL,
        markers TEXT NOT NULL DEFAULT '[]'
    );

    CREATE INDEX IF NOT EXISTS idx_saved_sets_session ON saved_sets(session_id);
    CREATE INDEX IF NOT EXISTS idx_saved_sets_saved_at ON saved_sets(saved_at);
"#;

pub(crate) fn latest_version() -> i32 {
    MIGRATIONS.last().map(|(v, _, _)| *v).unwrap_or(0)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = get_schema_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(StorageError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current, latest
        )));
    }

    for (version, name, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
        tracing::info!(version, name, "Running migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| StorageError::Migration(format!("v{} ({}): {}", version, name, e)))?;
        set_schema_version(&tx, *version)?;
        tx.commit()?;
    }

    Ok(())
}

pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

pub(crate) fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}
