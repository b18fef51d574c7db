//! SQLite-backed memo store for local-only use

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::{migrations, now_millis, MemoStore};
use crate::error::{Error, Result};
use crate::models::{Collection, Memo, MemoId};

/// Local file store with one table per collection.
pub struct SqliteMemoStore {
    conn: Mutex<Connection>,
}

impl SqliteMemoStore {
    /// Open a store at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL is unavailable for some filesystems; keep the default journal then.
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        migrations::run(&conn)?;
        tracing::debug!("Opened memo store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Parse a memo from a database row
    fn parse_memo(collection: Collection, row: &rusqlite::Row<'_>) -> rusqlite::Result<Memo> {
        let id: String = row.get(0)?;
        let id = id.parse::<MemoId>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(error))
        })?;
        Ok(Memo {
            id,
            collection,
            content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

#[async_trait]
impl MemoStore for SqliteMemoStore {
    async fn create(&self, collection: Collection, content: &str) -> Result<Memo> {
        let memo = Memo::new(collection, content);
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, content, created_at, updated_at) VALUES (?, ?, ?, ?)",
                collection.table_name()
            ),
            params![memo.id.as_str(), memo.content, memo.created_at, memo.updated_at],
        )?;
        Ok(memo)
    }

    async fn get(&self, collection: Collection, id: &MemoId) -> Result<Memo> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!(
                "SELECT id, content, created_at, updated_at FROM {} WHERE id = ?",
                collection.table_name()
            ),
            params![id.as_str()],
            |row| Self::parse_memo(collection, row),
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn update(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()> {
        let now = now_millis();
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            &format!(
                "UPDATE {} SET content = ?, updated_at = MAX(?, updated_at) WHERE id = ?",
                collection.table_name()
            ),
            params![content, now, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &MemoId) -> Result<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", collection.table_name()),
            params![id.as_str()],
        )?;
        if rows == 0 {
            tracing::debug!("Delete of absent {} memo {} treated as success", collection, id);
        }
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Memo>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, content, created_at, updated_at
             FROM {}
             ORDER BY updated_at DESC, id ASC",
            collection.table_name()
        ))?;

        let memos = stmt
            .query_map([], |row| Self::parse_memo(collection, row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(memos)
    }
}
