//! Schema setup for writable dictionaries

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::error::DatabaseError;

/// Current schema version
const SCHEMA_VERSION: i64 = 1;

/// Run all pending migrations
pub fn run_all(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!("running migrations from v{} to v{}", current_version, SCHEMA_VERSION);

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Check that a read-only dictionary has the table lookups need
pub fn verify(conn: &Connection) -> Result<()> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'items'",
        [],
        |row| row.get(0),
    )?;

    if tables == 0 {
        return Err(DatabaseError::InvalidData("missing items table".into()).into());
    }
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Initial schema (v1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("applying migration v1: dictionary items");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            word TEXT,
            mean TEXT
        );

        -- Lookups are case-insensitive exact matches
        CREATE INDEX IF NOT EXISTS idx_items_word ON items(word COLLATE NOCASE);
        "#,
    )?;

    Ok(())
}
