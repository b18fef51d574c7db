//! Per-memo debounced persistence.
//!
//! Each memo id owns a slot with the generation of its latest request, the
//! timer task armed for it (if any), and a gate that every `update` for the
//! id must hold. Re-scheduling aborts a timer that has not fired yet; a timer
//! that already fired is never aborted and the next write queues on the gate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{Collection, MemoId};
use crate::notify::Notifier;
use crate::store::MemoStore;

/// Invoked once with the outcome of the write a `schedule_with` call produced.
pub type PersistCallback = Box<dyn FnOnce(&Result<()>) + Send + 'static>;

/// The write a pending timer will perform when it fires.
struct PendingWrite {
    collection: Collection,
    content: String,
    on_settled: Option<PersistCallback>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
    pending: Option<PendingWrite>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

/// A write taken off its slot, holding the gate if it was free.
struct DueWrite {
    gate: Arc<tokio::sync::Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
    pending: PendingWrite,
}

impl Slot {
    /// Take the pending write, locking the gate now when it is free so that
    /// a concurrent waiter cannot slip in ahead of it.
    fn take_due(&mut self) -> Option<DueWrite> {
        let pending = self.pending.take()?;
        Some(DueWrite {
            gate: Arc::clone(&self.gate),
            held: Arc::clone(&self.gate).try_lock_owned().ok(),
            pending,
        })
    }
}

#[derive(Default)]
struct Slots {
    next_generation: u64,
    by_id: HashMap<MemoId, Slot>,
}

impl Slots {
    /// Supersede whatever is pending for `id` and return the new generation.
    fn supersede(&mut self, id: MemoId) -> (u64, &mut Slot) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let slot = self.by_id.entry(id).or_default();
        slot.generation = generation;
        slot.pending = None;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        (generation, slot)
    }

    fn remove_if_idle(&mut self, id: &MemoId) {
        let idle = self
            .by_id
            .get(id)
            .is_some_and(|slot| slot.timer.is_none() && Arc::strong_count(&slot.gate) == 1);
        if idle {
            self.by_id.remove(id);
        }
    }
}

struct SchedulerInner {
    store: Arc<dyn MemoStore>,
    notifier: Arc<dyn Notifier>,
    slots: Mutex<Slots>,
}

impl SchedulerInner {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Called by a timer after its delay. Returns the write to perform when
    /// the timer is still current, clearing the pending marker.
    fn fire(&self, id: &MemoId, generation: u64) -> Option<DueWrite> {
        let mut slots = self.slots();
        let slot = slots.by_id.get_mut(id)?;
        if slot.generation != generation {
            return None;
        }
        slot.timer = None;
        slot.take_due()
    }

    /// Write behind the gate, then report and release the slot.
    async fn run(&self, id: MemoId, due: DueWrite) -> Result<()> {
        let DueWrite {
            gate,
            held,
            pending:
                PendingWrite {
                    collection,
                    content,
                    on_settled,
                },
        } = due;

        let result = {
            let _in_flight = match held {
                Some(guard) => guard,
                None => Arc::clone(&gate).lock_owned().await,
            };
            self.persist(collection, &id, &content).await
        };
        drop(gate);
        self.release(&id);

        if let Some(on_settled) = on_settled {
            on_settled(&result);
        }
        result
    }

    /// Drop the slot once nothing is armed, running, or queued for it.
    fn release(&self, id: &MemoId) {
        self.slots().remove_if_idle(id);
    }

    async fn persist(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()> {
        tracing::debug!(
            "Persisting {} memo {} ({} chars)",
            collection,
            id,
            content.chars().count()
        );
        match self.store.update(collection, id, content).await {
            Ok(()) => {
                tracing::debug!("Auto-saved memo: {}", id);
                Ok(())
            }
            Err(error) => {
                tracing::error!("Failed to save memo {}: {}", id, error);
                self.notifier
                    .notify(&format!("Failed to save memo: {error}"));
                Err(error)
            }
        }
    }
}

/// Coalesces bursts of edits into one `update` per quiet period and keeps
/// writes for the same id strictly sequential.
///
/// Must be used from within a tokio runtime. Clones share their timers.
#[derive(Clone)]
pub struct DebounceScheduler {
    inner: Arc<SchedulerInner>,
}

impl DebounceScheduler {
    pub fn new(store: Arc<dyn MemoStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                notifier,
                slots: Mutex::new(Slots::default()),
            }),
        }
    }

    /// The store every write goes to.
    pub fn store(&self) -> &Arc<dyn MemoStore> {
        &self.inner.store
    }

    /// The sink failed writes are reported to.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Arm (or re-arm) the timer for `id`; `content` is captured now.
    pub fn schedule(&self, collection: Collection, id: MemoId, content: String, delay: Duration) {
        self.schedule_with(collection, id, content, delay, None);
    }

    /// Like [`schedule`](Self::schedule), reporting the write's outcome to
    /// `on_settled`. A superseded request never calls its callback.
    pub fn schedule_with(
        &self,
        collection: Collection,
        id: MemoId,
        content: String,
        delay: Duration,
        on_settled: Option<PersistCallback>,
    ) {
        let mut slots = self.inner.slots();
        let (generation, slot) = slots.supersede(id);
        let inner = Arc::clone(&self.inner);

        slot.pending = Some(PendingWrite {
            collection,
            content,
            on_settled,
        });
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(due) = inner.fire(&id, generation) {
                let _ = inner.run(id, due).await;
            }
        }));
        tracing::debug!("Armed save timer for memo {} ({:?})", id, delay);
    }

    /// Cancel any pending timer for `id` and write `content` now.
    ///
    /// Waits behind an in-flight write for the same id.
    pub async fn flush(&self, collection: Collection, id: MemoId, content: &str) -> Result<()> {
        let gate = {
            let mut slots = self.inner.slots();
            let (_, slot) = slots.supersede(id);
            Arc::clone(&slot.gate)
        };

        let result = {
            let _in_flight = gate.lock().await;
            self.inner.persist(collection, &id, content).await
        };
        drop(gate);
        self.inner.release(&id);
        result
    }

    /// Perform the pending write for `id` now instead of waiting for its
    /// timer, then wait for any write still in flight.
    ///
    /// Returns the outcome of that write; `Ok` when nothing was pending.
    pub async fn flush_pending(&self, id: &MemoId) -> Result<()> {
        let due = {
            let mut slots = self.inner.slots();
            let due = slots.by_id.get_mut(id).and_then(Slot::take_due);
            if due.is_some() {
                slots.supersede(*id);
            }
            due
        };

        match due {
            Some(due) => {
                tracing::debug!("Flushing pending save for memo {}", id);
                self.inner.run(*id, due).await
            }
            None => {
                self.wait_for_in_flight(id).await;
                Ok(())
            }
        }
    }

    /// Drop the pending timer for `id` without writing.
    ///
    /// Returns whether a timer was pending. In-flight writes are unaffected.
    pub fn cancel(&self, id: &MemoId) -> bool {
        let mut slots = self.inner.slots();
        let pending = slots
            .by_id
            .get(id)
            .is_some_and(|slot| slot.timer.is_some());
        if pending {
            slots.supersede(*id);
            slots.remove_if_idle(id);
            tracing::debug!("Cancelled pending save for memo {}", id);
        }
        pending
    }

    /// Wait until no write for `id` is running or queued ahead of this call.
    pub async fn wait_for_in_flight(&self, id: &MemoId) {
        let gate = self
            .inner
            .slots()
            .by_id
            .get(id)
            .map(|slot| Arc::clone(&slot.gate));
        if let Some(gate) = gate {
            drop(gate.lock().await);
            drop(gate);
            self.inner.release(id);
        }
    }

    /// Whether a timer is armed and has not fired yet for `id`.
    pub fn is_pending(&self, id: &MemoId) -> bool {
        self.inner
            .slots()
            .by_id
            .get(id)
            .is_some_and(|slot| slot.timer.is_some())
    }

    /// Number of ids with an armed timer.
    pub fn pending_count(&self) -> usize {
        self.inner
            .slots()
            .by_id
            .values()
            .filter(|slot| slot.timer.is_some())
            .count()
    }
}
