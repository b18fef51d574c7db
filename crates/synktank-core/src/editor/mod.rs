//! Editing surface for one open memo: buffer plus debounced autosave

mod buffer;
mod debounce;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub use buffer::DocumentBuffer;
pub use debounce::{DebounceScheduler, PersistCallback};

use crate::error::{Error, Result};
use crate::models::{Collection, Memo, MemoId};
use crate::promotion::PromotionCoordinator;

/// One open memo as seen by a presentation layer.
///
/// `set_content` returns immediately and arms an autosave; the buffer stays
/// dirty until a write of its latest revision succeeds.
pub struct MemoEditor {
    buffer: Arc<Mutex<DocumentBuffer>>,
    scheduler: DebounceScheduler,
    delay: Duration,
}

impl MemoEditor {
    /// Load `id` from the store and start editing it.
    pub async fn open(
        scheduler: DebounceScheduler,
        collection: Collection,
        id: &MemoId,
        delay: Duration,
    ) -> Result<Self> {
        let memo = match scheduler.store().get(collection, id).await {
            Ok(memo) => memo,
            Err(error) => {
                if error.is_store_error() {
                    scheduler
                        .notifier()
                        .notify(&format!("Failed to load memo: {error}"));
                }
                return Err(error);
            }
        };
        Ok(Self::from_memo(&memo, scheduler, delay))
    }

    /// Start editing an already loaded memo.
    pub fn from_memo(memo: &Memo, scheduler: DebounceScheduler, delay: Duration) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(DocumentBuffer::from_memo(memo))),
            scheduler,
            delay,
        }
    }

    fn buffer(&self) -> MutexGuard<'_, DocumentBuffer> {
        lock_buffer(&self.buffer)
    }

    pub fn id(&self) -> MemoId {
        self.buffer().id()
    }

    pub fn collection(&self) -> Collection {
        self.buffer().collection()
    }

    pub fn content(&self) -> String {
        self.buffer().content().to_string()
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer().is_dirty()
    }

    /// Whether an autosave timer is armed for this memo.
    pub fn has_pending_save(&self) -> bool {
        self.scheduler.is_pending(&self.id())
    }

    /// Replace the visible content and (re)arm the autosave.
    pub fn set_content(&self, content: impl Into<String>) {
        let content = content.into();
        let (id, collection, revision) = {
            let mut buffer = self.buffer();
            let revision = buffer.set_content(content.clone());
            (buffer.id(), buffer.collection(), revision)
        };

        let buffer = Arc::clone(&self.buffer);
        self.scheduler.schedule_with(
            collection,
            id,
            content,
            self.delay,
            Some(Box::new(move |result: &Result<()>| {
                if result.is_ok() {
                    lock_buffer(&buffer).mark_persisted(revision);
                }
            })),
        );
    }

    /// Persist the current content now, skipping the quiet period.
    ///
    /// A clean buffer is not written.
    pub async fn flush(&self) -> Result<()> {
        let (id, collection, content, revision, dirty) = {
            let buffer = self.buffer();
            (
                buffer.id(),
                buffer.collection(),
                buffer.content().to_string(),
                buffer.revision(),
                buffer.is_dirty(),
            )
        };
        if !dirty {
            return Ok(());
        }

        self.scheduler.flush(collection, id, &content).await?;
        self.buffer().mark_persisted(revision);
        Ok(())
    }

    /// Promote this temporary memo with its current content.
    ///
    /// The pending autosave is dropped since the source is about to be
    /// deleted. If nothing was created the autosave is re-armed so edits are
    /// not lost.
    pub async fn promote(&self, coordinator: &PromotionCoordinator) -> Result<Memo> {
        let id = self.id();
        if self.collection() != Collection::Temporary {
            return Err(Error::InvalidInput(format!(
                "memo {id} is already permanent"
            )));
        }

        self.scheduler.cancel(&id);
        self.scheduler.wait_for_in_flight(&id).await;

        let content = self.content();
        match coordinator.promote(id, &content).await {
            Ok(permanent) => Ok(permanent),
            Err(error @ (Error::PartialPromotion(_) | Error::PromotionInProgress(_))) => Err(error),
            Err(error) => {
                if self.is_dirty() {
                    self.set_content(content);
                }
                Err(error)
            }
        }
    }
}

fn lock_buffer(buffer: &Mutex<DocumentBuffer>) -> MutexGuard<'_, DocumentBuffer> {
    buffer
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;
    use crate::store::{MemoStore, MemoryStore, StoreOp};
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(500);

    async fn open_temporary(store: &MemoryStore, content: &str) -> (MemoEditor, CollectingNotifier) {
        let memo = store.create(Collection::Temporary, content).await.unwrap();
        let notifier = CollectingNotifier::new();
        let scheduler =
            DebounceScheduler::new(Arc::new(store.clone()), Arc::new(notifier.clone()));
        let editor = MemoEditor::open(scheduler, Collection::Temporary, &memo.id, QUIET)
            .await
            .unwrap();
        (editor, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn edit_then_quiet_period_persists_and_cleans_buffer() {
        let store = MemoryStore::new();
        let (editor, _) = open_temporary(&store, "").await;
        assert!(!editor.is_dirty());

        editor.set_content("draft");
        assert_eq!(editor.content(), "draft");
        assert!(editor.is_dirty());
        assert!(editor.has_pending_save());

        sleep(Duration::from_millis(600)).await;

        let stored = store.get(Collection::Temporary, &editor.id()).await.unwrap();
        assert_eq!(stored.content, "draft");
        assert!(!editor.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_autosave_leaves_buffer_dirty_until_flush() {
        let store = MemoryStore::new();
        let (editor, notifier) = open_temporary(&store, "").await;
        store.fail_next(StoreOp::Update, 1);

        editor.set_content("keep me");
        sleep(Duration::from_millis(600)).await;
        assert!(editor.is_dirty());
        assert_eq!(notifier.messages().len(), 1);

        editor.flush().await.unwrap();
        assert!(!editor.is_dirty());
        let stored = store.get(Collection::Temporary, &editor.id()).await.unwrap();
        assert_eq!(stored.content, "keep me");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_of_clean_buffer_does_not_write() {
        let store = MemoryStore::new();
        let (editor, _) = open_temporary(&store, "same").await;

        editor.flush().await.unwrap();
        assert_eq!(store.calls(StoreOp::Update), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn open_missing_memo_is_not_found_without_notification() {
        let store = MemoryStore::new();
        let notifier = CollectingNotifier::new();
        let scheduler = DebounceScheduler::new(Arc::new(store), Arc::new(notifier.clone()));

        let result = MemoEditor::open(scheduler, Collection::Temporary, &MemoId::new(), QUIET).await;
        assert!(result.is_err_and(|error| error.is_not_found()));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn promote_uses_latest_buffer_content_and_drops_pending_save() {
        let store = MemoryStore::new();
        let (editor, notifier) = open_temporary(&store, "").await;
        let coordinator = PromotionCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
        );

        editor.set_content("hello");
        let permanent = editor.promote(&coordinator).await.unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(permanent.content, "hello");
        assert_eq!(permanent.collection, Collection::Permanent);
        assert!(!store.contains(Collection::Temporary, &editor.id()));
        assert_eq!(store.calls(StoreOp::Update), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_promotion_rearms_autosave() {
        let store = MemoryStore::new();
        let (editor, _) = open_temporary(&store, "").await;
        let coordinator =
            PromotionCoordinator::new(Arc::new(store.clone()), Arc::new(CollectingNotifier::new()));
        store.fail_next(StoreOp::Create, 1);

        editor.set_content("not lost");
        assert!(editor.promote(&coordinator).await.is_err());
        assert!(editor.has_pending_save());

        sleep(Duration::from_millis(600)).await;
        let stored = store.get(Collection::Temporary, &editor.id()).await.unwrap();
        assert_eq!(stored.content, "not lost");
    }

    #[tokio::test(start_paused = true)]
    async fn promote_rejects_permanent_memo() {
        let store = MemoryStore::new();
        let memo = store.create(Collection::Permanent, "x").await.unwrap();
        let notifier = Arc::new(CollectingNotifier::new());
        let scheduler = DebounceScheduler::new(Arc::new(store.clone()), notifier.clone());
        let coordinator = PromotionCoordinator::new(Arc::new(store), notifier);
        let editor = MemoEditor::from_memo(&memo, scheduler, QUIET);

        let error = editor.promote(&coordinator).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }
}
