//! Locally edited copy of one open memo

use crate::models::{Collection, Memo, MemoId};

/// The content the user currently sees for one memo.
///
/// Seeded from the store once at load time and never overwritten by
/// background refreshes afterwards. Every edit bumps `revision`; a persist
/// acknowledges the revision it captured, which clears `dirty` only when no
/// newer edit has landed in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBuffer {
    id: MemoId,
    collection: Collection,
    content: String,
    dirty: bool,
    revision: u64,
}

impl DocumentBuffer {
    /// Start a clean buffer from the stored memo.
    pub fn from_memo(memo: &Memo) -> Self {
        Self {
            id: memo.id,
            collection: memo.collection,
            content: memo.content.clone(),
            dirty: false,
            revision: 0,
        }
    }

    pub const fn id(&self) -> MemoId {
        self.id
    }

    pub const fn collection(&self) -> Collection {
        self.collection
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the content and mark the buffer dirty. Returns the new revision.
    pub fn set_content(&mut self, content: impl Into<String>) -> u64 {
        self.content = content.into();
        self.dirty = true;
        self.revision += 1;
        self.revision
    }

    /// Acknowledge that `revision` reached the store.
    ///
    /// Returns whether the buffer is now clean.
    pub fn mark_persisted(&mut self, revision: u64) -> bool {
        if revision == self.revision {
            self.dirty = false;
        }
        !self.dirty
    }
}
