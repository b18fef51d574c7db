//! Cached, ordered view of one memo collection

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::models::{sort_newest_first, Collection, Memo, MemoId};
use crate::notify::Notifier;
use crate::store::MemoStore;

#[derive(Default)]
struct ListState {
    memos: Arc<Vec<Memo>>,
    /// Last refresh ticket handed out
    issued: u64,
    /// Newest ticket whose result may still be applied is above this
    applied: u64,
    loaded: bool,
}

/// Last successfully loaded list of one collection.
///
/// Readers get `Arc` snapshots; a refresh swaps the whole sequence at once.
pub struct ListCache {
    collection: Collection,
    store: Arc<dyn MemoStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ListState>,
}

impl ListCache {
    pub fn new(
        collection: Collection,
        store: Arc<dyn MemoStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            collection,
            store,
            notifier,
            state: Mutex::new(ListState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Current sequence, newest first.
    pub fn snapshot(&self) -> Arc<Vec<Memo>> {
        Arc::clone(&self.state().memos)
    }

    /// Whether at least one refresh has been applied.
    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    pub fn len(&self) -> usize {
        self.state().memos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().memos.is_empty()
    }

    pub fn find(&self, id: &MemoId) -> Option<Memo> {
        self.state().memos.iter().find(|memo| memo.id == *id).cloned()
    }

    /// Reload the collection and replace the cached sequence.
    ///
    /// Returns the snapshot in effect afterwards. A result that was
    /// overtaken by a newer refresh or a local delete is dropped.
    pub async fn refresh(&self) -> Result<Arc<Vec<Memo>>> {
        let ticket = self.begin_refresh();
        match self.store.list(self.collection).await {
            Ok(memos) => {
                if !self.apply_refresh(ticket, memos) {
                    tracing::debug!(
                        "Discarded stale {} list refresh (ticket {})",
                        self.collection,
                        ticket
                    );
                }
                Ok(self.snapshot())
            }
            Err(error) => {
                tracing::warn!("Failed to load {} memos: {}", self.collection, error);
                self.notifier
                    .notify(&format!("Failed to load memos: {error}"));
                Err(error)
            }
        }
    }

    fn begin_refresh(&self) -> u64 {
        let mut state = self.state();
        state.issued += 1;
        state.issued
    }

    fn apply_refresh(&self, ticket: u64, mut memos: Vec<Memo>) -> bool {
        let mut state = self.state();
        if ticket <= state.applied {
            return false;
        }
        sort_newest_first(&mut memos);
        state.memos = Arc::new(memos);
        state.applied = ticket;
        state.loaded = true;
        true
    }

    /// Drop `id` from the cached sequence without touching the store.
    ///
    /// Returns the removed memo; absent ids are a no-op. Refreshes already
    /// under way are invalidated so they cannot bring the entry back.
    pub fn apply_local_delete(&self, id: &MemoId) -> Option<Memo> {
        let mut state = self.state();
        state.applied = state.issued;

        let position = state.memos.iter().position(|memo| memo.id == *id)?;
        let mut memos = state.memos.as_ref().clone();
        let removed = memos.remove(position);
        state.memos = Arc::new(memos);
        Some(removed)
    }

    /// Optimistically remove `id`, then delete it from the store.
    ///
    /// On failure the user is notified and the list is reloaded so the
    /// entry reappears.
    pub async fn delete_local(&self, id: &MemoId) -> Result<()> {
        self.apply_local_delete(id);

        match self.store.delete(self.collection, id).await {
            Ok(()) => {
                tracing::debug!("Deleted {} memo {}", self.collection, id);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Failed to delete {} memo {}: {}", self.collection, id, error);
                self.notifier
                    .notify(&format!("Failed to delete memo: {error}"));
                if let Err(refresh_error) = self.refresh().await {
                    tracing::warn!("Could not restore list after failed delete: {}", refresh_error);
                }
                Err(error)
            }
        }
    }
}
