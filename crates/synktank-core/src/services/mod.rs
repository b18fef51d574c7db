//! Service facade that wires a store, notifier, and the editing engine.

use std::sync::Arc;

use crate::config::{EngineConfig, StoreConfig};
use crate::editor::{DebounceScheduler, MemoEditor};
use crate::error::Result;
use crate::list::ListCache;
use crate::models::{Collection, Memo, MemoId};
use crate::notify::{Notifier, TracingNotifier};
use crate::promotion::PromotionCoordinator;
use crate::store::MemoStore;

/// Thread-safe entry point shared by clients.
///
/// Clones share the debounce scheduler and the promotion state, so every
/// editor opened through one service is serialized per memo id.
#[derive(Clone)]
pub struct MemoService {
    store: Arc<dyn MemoStore>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    scheduler: DebounceScheduler,
    coordinator: Arc<PromotionCoordinator>,
}

impl MemoService {
    pub fn new(
        store: Arc<dyn MemoStore>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let scheduler = DebounceScheduler::new(Arc::clone(&store), Arc::clone(&notifier));
        let coordinator = Arc::new(PromotionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
        ));
        Self {
            store,
            notifier,
            config,
            scheduler,
            coordinator,
        }
    }

    /// Open the configured store and report failures through `tracing`.
    pub fn open(store_config: &StoreConfig, config: EngineConfig) -> Result<Self> {
        let store = store_config.open()?;
        Ok(Self::new(store, Arc::new(TracingNotifier), config))
    }

    pub fn store(&self) -> &Arc<dyn MemoStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn scheduler(&self) -> &DebounceScheduler {
        &self.scheduler
    }

    pub fn coordinator(&self) -> &PromotionCoordinator {
        &self.coordinator
    }

    /// Create a memo, notifying on store failure.
    pub async fn create_memo(&self, collection: Collection, content: &str) -> Result<Memo> {
        match self.store.create(collection, content).await {
            Ok(memo) => {
                tracing::debug!("Created {} memo {}", collection, memo.id);
                Ok(memo)
            }
            Err(error) => {
                self.notifier
                    .notify(&format!("Failed to create memo: {error}"));
                Err(error)
            }
        }
    }

    /// Fetch one memo, notifying on store failure but not on `NotFound`.
    pub async fn get_memo(&self, collection: Collection, id: &MemoId) -> Result<Memo> {
        let result = self.store.get(collection, id).await;
        if let Err(error) = &result {
            if error.is_store_error() {
                self.notifier
                    .notify(&format!("Failed to load memo: {error}"));
            }
        }
        result
    }

    /// Load `id` into a new editor using the configured quiet period.
    pub async fn open_editor(&self, collection: Collection, id: &MemoId) -> Result<MemoEditor> {
        MemoEditor::open(self.scheduler.clone(), collection, id, self.config.debounce).await
    }

    /// Fresh, unloaded list cache for `collection`.
    pub fn list_cache(&self, collection: Collection) -> ListCache {
        ListCache::new(
            collection,
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
        )
    }

    /// Promote a temporary memo with its latest content.
    ///
    /// An autosave still pending for the memo is written first, so an edit
    /// made through another open editor is carried over. If that write fails
    /// nothing is promoted.
    pub async fn promote(&self, temporary_id: MemoId) -> Result<Memo> {
        self.scheduler.flush_pending(&temporary_id).await?;
        let editor = self.open_editor(Collection::Temporary, &temporary_id).await?;
        editor.promote(&self.coordinator).await
    }

    /// Delete the temporary source of an earlier partial promotion.
    pub async fn finish_promotion(&self, temporary_id: MemoId) -> Result<()> {
        self.coordinator.finish(temporary_id).await
    }
}
