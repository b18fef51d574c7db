//! SQLite schema migrations for the local memo store

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    tracing::debug!("Memo store schema at version {}", CURRENT_VERSION);
    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Migration to version 1: one table per collection
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS temporary_memos (
            id TEXT PRIMARY KEY,
            content TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS permanent_memos (
            id TEXT PRIMARY KEY,
            content TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        COMMIT;",
    )?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", params![1])?;
    Ok(())
}

/// Migration to version 2: list ordering indexes
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE INDEX IF NOT EXISTS idx_temporary_memos_updated
            ON temporary_memos(updated_at DESC, id ASC);
        CREATE INDEX IF NOT EXISTS idx_permanent_memos_updated
            ON permanent_memos(updated_at DESC, id ASC);
        COMMIT;",
    )?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", params![2])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_both_collection_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        for table in ["temporary_memos", "permanent_memos"] {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "{table} should exist");
        }
    }
}
