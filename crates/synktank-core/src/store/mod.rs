//! Persistence contract for memo collections and its implementations

mod memory;
mod migrations;
mod sqlite;
mod supabase;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Collection, Memo, MemoId};

pub use memory::{MemoryStore, StoreOp};
pub use sqlite::SqliteMemoStore;
pub use supabase::{normalize_rest_url, SupabaseMemoStore};

/// Wall-clock time stamped on local writes.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// CRUD + list over the temporary and permanent collections.
///
/// Every call may fail with a store error (`Error::is_store_error`).
#[async_trait]
pub trait MemoStore: Send + Sync {
    /// Create a memo with a fresh id and `created_at = updated_at = now`.
    async fn create(&self, collection: Collection, content: &str) -> Result<Memo>;

    /// Fetch a memo, `Error::NotFound` when absent.
    async fn get(&self, collection: Collection, id: &MemoId) -> Result<Memo>;

    /// Replace a memo's content and bump `updated_at`.
    ///
    /// Fails with `Error::NotFound` if the memo no longer exists.
    /// `updated_at` never moves backwards for an id.
    async fn update(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()>;

    /// Delete a memo. Deleting an absent id succeeds.
    async fn delete(&self, collection: Collection, id: &MemoId) -> Result<()>;

    /// All memos of a collection, `updated_at` descending.
    async fn list(&self, collection: Collection) -> Result<Vec<Memo>>;
}
