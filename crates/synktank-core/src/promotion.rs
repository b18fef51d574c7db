//! Two-step move of a temporary memo into the permanent collection

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, PartialPromotion, Result};
use crate::models::{Collection, Memo, MemoId};
use crate::notify::Notifier;
use crate::store::MemoStore;

/// Where a promotion of one temporary memo currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionState {
    /// Step 1 (create permanent copy) is running
    Creating,
    /// Step 2 (delete temporary source) is running
    Deleting { permanent: Memo },
    /// The permanent copy exists; only the delete remains
    AwaitingDelete { permanent: Memo },
}

/// Runs promotions and remembers half-finished ones.
///
/// A promotion that already created its permanent copy is never repeated:
/// promoting the same temporary id again only retries the delete.
pub struct PromotionCoordinator {
    store: Arc<dyn MemoStore>,
    notifier: Arc<dyn Notifier>,
    states: Arc<Mutex<HashMap<MemoId, PromotionState>>>,
}

/// Restores the map if the owning future is dropped mid-promotion.
struct InFlight {
    states: Arc<Mutex<HashMap<MemoId, PromotionState>>>,
    id: MemoId,
    settled: bool,
}

impl InFlight {
    fn set(&self, state: PromotionState) {
        lock_states(&self.states).insert(self.id, state);
    }

    fn settle(mut self, state: Option<PromotionState>) {
        let mut states = lock_states(&self.states);
        match state {
            Some(state) => states.insert(self.id, state),
            None => states.remove(&self.id),
        };
        self.settled = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut states = lock_states(&self.states);
        match states.remove(&self.id) {
            Some(
                PromotionState::Deleting { permanent }
                | PromotionState::AwaitingDelete { permanent },
            ) => {
                states.insert(self.id, PromotionState::AwaitingDelete { permanent });
            }
            Some(PromotionState::Creating) | None => {}
        }
    }
}

fn lock_states(
    states: &Mutex<HashMap<MemoId, PromotionState>>,
) -> MutexGuard<'_, HashMap<MemoId, PromotionState>> {
    states
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl PromotionCoordinator {
    pub fn new(store: Arc<dyn MemoStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current promotion state of `temporary_id`, if any.
    pub fn state(&self, temporary_id: &MemoId) -> Option<PromotionState> {
        lock_states(&self.states).get(temporary_id).cloned()
    }

    /// Permanent copy waiting for its temporary source to be deleted.
    pub fn pending_permanent(&self, temporary_id: &MemoId) -> Option<Memo> {
        match self.state(temporary_id)? {
            PromotionState::AwaitingDelete { permanent } => Some(permanent),
            _ => None,
        }
    }

    /// Create a permanent copy of `content`, then delete `temporary_id`.
    ///
    /// Fails with `PartialPromotion` when the copy exists but the delete
    /// failed. Calling again for the same id after that only retries the
    /// delete.
    pub async fn promote(&self, temporary_id: MemoId, content: &str) -> Result<Memo> {
        let (guard, resumed) = self.claim(temporary_id)?;

        let permanent = match resumed {
            Some(permanent) => {
                tracing::info!(
                    "Resuming promotion of memo {} (permanent copy {})",
                    temporary_id,
                    permanent.id
                );
                permanent
            }
            None => match self.store.create(Collection::Permanent, content).await {
                Ok(permanent) => permanent,
                Err(error) => {
                    tracing::warn!("Promotion of memo {} failed to create: {}", temporary_id, error);
                    guard.settle(None);
                    self.notifier
                        .notify(&format!("Failed to promote memo: {error}"));
                    return Err(error);
                }
            },
        };

        guard.set(PromotionState::Deleting {
            permanent: permanent.clone(),
        });
        self.delete_source(guard, temporary_id, permanent).await
    }

    /// Retry only the delete of a partially promoted memo.
    pub async fn complete(&self, partial: &PartialPromotion) -> Result<Memo> {
        let (guard, _) = self.claim(partial.temporary_id)?;
        guard.set(PromotionState::Deleting {
            permanent: partial.permanent.clone(),
        });
        self.delete_source(guard, partial.temporary_id, partial.permanent.clone())
            .await
    }

    /// Delete the temporary source of a promotion whose permanent copy is
    /// known to exist, e.g. after a restart lost the in-memory state.
    pub async fn finish(&self, temporary_id: MemoId) -> Result<()> {
        let (guard, resumed) = self.claim(temporary_id)?;
        match self.store.delete(Collection::Temporary, &temporary_id).await {
            Ok(()) => {
                tracing::info!("Finished promotion of memo {}", temporary_id);
                guard.settle(None);
                Ok(())
            }
            Err(error) => {
                guard.settle(resumed.map(|permanent| PromotionState::AwaitingDelete { permanent }));
                self.notifier
                    .notify(&format!("Failed to remove promoted memo: {error}"));
                Err(error)
            }
        }
    }

    /// Mark `temporary_id` busy. Returns the permanent copy of an earlier
    /// half-finished promotion, if there is one.
    fn claim(&self, temporary_id: MemoId) -> Result<(InFlight, Option<Memo>)> {
        let mut states = lock_states(&self.states);
        let resumed = match states.remove(&temporary_id) {
            None => None,
            Some(PromotionState::AwaitingDelete { permanent }) => Some(permanent),
            Some(busy) => {
                states.insert(temporary_id, busy);
                return Err(Error::PromotionInProgress(temporary_id));
            }
        };
        let state = match &resumed {
            Some(permanent) => PromotionState::Deleting {
                permanent: permanent.clone(),
            },
            None => PromotionState::Creating,
        };
        states.insert(temporary_id, state);

        let guard = InFlight {
            states: Arc::clone(&self.states),
            id: temporary_id,
            settled: false,
        };
        Ok((guard, resumed))
    }

    async fn delete_source(
        &self,
        guard: InFlight,
        temporary_id: MemoId,
        permanent: Memo,
    ) -> Result<Memo> {
        match self.store.delete(Collection::Temporary, &temporary_id).await {
            Ok(()) => {
                tracing::info!("Promoted memo {} to {}", temporary_id, permanent.id);
                guard.settle(None);
                Ok(permanent)
            }
            Err(error) => {
                tracing::warn!(
                    "Promotion of memo {} created {} but delete failed: {}",
                    temporary_id,
                    permanent.id,
                    error
                );
                guard.settle(Some(PromotionState::AwaitingDelete {
                    permanent: permanent.clone(),
                }));
                let partial = PartialPromotion {
                    temporary_id,
                    permanent,
                    reason: error.to_string(),
                };
                self.notifier.notify(&partial.to_string());
                Err(Error::PartialPromotion(Box::new(partial)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;
    use crate::store::{MemoryStore, StoreOp};
    use pretty_assertions::assert_eq;

    async fn setup(store: &MemoryStore) -> (PromotionCoordinator, CollectingNotifier, Memo) {
        let notifier = CollectingNotifier::new();
        let coordinator =
            PromotionCoordinator::new(Arc::new(store.clone()), Arc::new(notifier.clone()));
        let temporary = store.create(Collection::Temporary, "hello").await.unwrap();
        (coordinator, notifier, temporary)
    }

    #[tokio::test]
    async fn promote_moves_memo_to_permanent() {
        let store = MemoryStore::new();
        let (coordinator, notifier, temporary) = setup(&store).await;

        let permanent = coordinator.promote(temporary.id, "hello").await.unwrap();

        assert_eq!(permanent.content, "hello");
        assert_eq!(permanent.collection, Collection::Permanent);
        let temporaries = store.list(Collection::Temporary).await.unwrap();
        assert!(temporaries.iter().all(|memo| memo.id != temporary.id));
        assert!(store.contains(Collection::Permanent, &permanent.id));
        assert!(coordinator.state(&temporary.id).is_none());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn failed_create_leaves_temporary_untouched() {
        let store = MemoryStore::new();
        let (coordinator, notifier, temporary) = setup(&store).await;
        store.fail_next(StoreOp::Create, 1);

        let error = coordinator.promote(temporary.id, "hello").await.unwrap_err();

        assert!(error.is_store_error());
        assert!(store.contains(Collection::Temporary, &temporary.id));
        assert!(store.list(Collection::Permanent).await.unwrap().is_empty());
        assert_eq!(store.calls(StoreOp::Delete), 0);
        assert!(coordinator.state(&temporary.id).is_none());
        assert_eq!(notifier.messages().len(), 1);

        let permanent = coordinator.promote(temporary.id, "hello").await.unwrap();
        assert_eq!(permanent.content, "hello");
    }

    #[tokio::test]
    async fn failed_delete_is_partial_and_keeps_both_memos() {
        let store = MemoryStore::new();
        let (coordinator, notifier, temporary) = setup(&store).await;
        store.fail_next(StoreOp::Delete, 1);

        let error = coordinator.promote(temporary.id, "hello").await.unwrap_err();
        let partial = error.as_partial_promotion().cloned().unwrap();

        assert_eq!(partial.temporary_id, temporary.id);
        assert!(store.contains(Collection::Temporary, &temporary.id));
        assert!(store.contains(Collection::Permanent, &partial.permanent.id));
        assert_eq!(
            coordinator.pending_permanent(&temporary.id),
            Some(partial.permanent.clone())
        );
        assert_eq!(notifier.messages().len(), 1);

        let permanent = coordinator.complete(&partial).await.unwrap();
        assert_eq!(permanent, partial.permanent);
        assert!(!store.contains(Collection::Temporary, &temporary.id));
        assert!(coordinator.state(&temporary.id).is_none());
        assert_eq!(store.calls(StoreOp::Create), 2);
    }

    #[tokio::test]
    async fn promote_after_partial_only_retries_delete() {
        let store = MemoryStore::new();
        let (coordinator, _, temporary) = setup(&store).await;
        store.fail_next(StoreOp::Delete, 1);
        let creates_before = store.calls(StoreOp::Create);

        let first = coordinator.promote(temporary.id, "hello").await.unwrap_err();
        let partial = first.as_partial_promotion().cloned().unwrap();
        let permanent = coordinator.promote(temporary.id, "hello").await.unwrap();

        assert_eq!(permanent.id, partial.permanent.id);
        assert_eq!(store.calls(StoreOp::Create) - creates_before, 1);
        assert_eq!(store.list(Collection::Permanent).await.unwrap().len(), 1);
        assert!(!store.contains(Collection::Temporary, &temporary.id));
    }

    #[tokio::test]
    async fn finish_deletes_source_without_create() {
        let store = MemoryStore::new();
        let (coordinator, _, temporary) = setup(&store).await;
        let creates_before = store.calls(StoreOp::Create);

        coordinator.finish(temporary.id).await.unwrap();

        assert!(!store.contains(Collection::Temporary, &temporary.id));
        assert_eq!(store.calls(StoreOp::Create), creates_before);
    }

    #[tokio::test]
    async fn failed_finish_keeps_pending_permanent() {
        let store = MemoryStore::new();
        let (coordinator, _, temporary) = setup(&store).await;
        store.fail_next(StoreOp::Delete, 2);

        let partial = coordinator
            .promote(temporary.id, "hello")
            .await
            .unwrap_err()
            .as_partial_promotion()
            .cloned()
            .unwrap();
        assert!(coordinator.finish(temporary.id).await.is_err());

        assert_eq!(
            coordinator.pending_permanent(&temporary.id),
            Some(partial.permanent)
        );
    }

    #[tokio::test]
    async fn concurrent_promote_is_rejected() {
        let store = MemoryStore::new();
        let (coordinator, _, temporary) = setup(&store).await;
        let (guard, _) = coordinator.claim(temporary.id).unwrap();

        let error = coordinator.promote(temporary.id, "hello").await.unwrap_err();
        assert!(matches!(error, Error::PromotionInProgress(id) if id == temporary.id));

        guard.settle(None);
        assert!(coordinator.promote(temporary.id, "hello").await.is_ok());
    }

    #[tokio::test]
    async fn dropped_promotion_during_delete_awaits_delete() {
        let store = MemoryStore::new();
        let (coordinator, _, temporary) = setup(&store).await;
        let permanent = Memo::new(Collection::Permanent, "hello");
        {
            let (guard, _) = coordinator.claim(temporary.id).unwrap();
            guard.set(PromotionState::Deleting {
                permanent: permanent.clone(),
            });
        }

        assert_eq!(
            coordinator.state(&temporary.id),
            Some(PromotionState::AwaitingDelete { permanent })
        );
    }
}
