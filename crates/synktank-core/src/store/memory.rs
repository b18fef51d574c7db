//! In-process memo store with fault injection, used by tests and demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{now_millis, MemoStore};
use crate::error::{Error, Result};
use crate::models::{sort_newest_first, Collection, Memo, MemoId};

/// Store operation, used to target injected faults and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Get,
    Update,
    Delete,
    List,
}

#[derive(Default)]
struct MemoryState {
    temporary: HashMap<MemoId, Memo>,
    permanent: HashMap<MemoId, Memo>,
    faults: HashMap<StoreOp, usize>,
    calls: HashMap<StoreOp, usize>,
    updates: Vec<(MemoId, String)>,
    in_flight_updates: HashMap<MemoId, usize>,
    max_in_flight_updates: usize,
}

impl MemoryState {
    fn collection_mut(&mut self, collection: Collection) -> &mut HashMap<MemoId, Memo> {
        match collection {
            Collection::Temporary => &mut self.temporary,
            Collection::Permanent => &mut self.permanent,
        }
    }

    fn collection(&self, collection: Collection) -> &HashMap<MemoId, Memo> {
        match collection {
            Collection::Temporary => &self.temporary,
            Collection::Permanent => &self.permanent,
        }
    }

    /// Count the call and consume one injected fault for `op`, if any.
    fn enter(&mut self, op: StoreOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.faults.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::Store(format!("injected {op:?} failure")))
            }
            _ => Ok(()),
        }
    }
}

/// Thread-safe in-memory implementation of `MemoStore`.
///
/// Clones share state, so a test can keep a handle for inspection while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `update` by `latency` to keep calls in flight.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `times` calls of `op` fail with a store error.
    pub fn fail_next(&self, op: StoreOp, times: usize) {
        *self.lock().faults.entry(op).or_default() += times;
    }

    /// Drop all pending injected faults.
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every successful `update` in completion order.
    pub fn updates(&self) -> Vec<(MemoId, String)> {
        self.lock().updates.clone()
    }

    /// Highest number of concurrent `update` calls observed for a single id.
    pub fn max_in_flight_updates(&self) -> usize {
        self.lock().max_in_flight_updates
    }

    /// Put a memo in place as-is, bypassing id and timestamp assignment.
    pub fn insert(&self, memo: Memo) {
        self.lock().collection_mut(memo.collection).insert(memo.id, memo);
    }

    /// Whether `id` currently exists in `collection`.
    pub fn contains(&self, collection: Collection, id: &MemoId) -> bool {
        self.lock().collection(collection).contains_key(id)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn finish_update(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some(count) = state.in_flight_updates.get_mut(id) {
            *count = count.saturating_sub(1);
        }

        let now = now_millis();
        let memo = state
            .collection_mut(collection)
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        memo.content = content.to_string();
        memo.updated_at = now.max(memo.updated_at);
        state.updates.push((*id, content.to_string()));
        Ok(())
    }
}

#[async_trait]
impl MemoStore for MemoryStore {
    async fn create(&self, collection: Collection, content: &str) -> Result<Memo> {
        let mut state = self.lock();
        state.enter(StoreOp::Create)?;
        let memo = Memo::new(collection, content);
        state.collection_mut(collection).insert(memo.id, memo.clone());
        Ok(memo)
    }

    async fn get(&self, collection: Collection, id: &MemoId) -> Result<Memo> {
        let mut state = self.lock();
        state.enter(StoreOp::Get)?;
        state
            .collection(collection)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn update(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()> {
        {
            let mut state = self.lock();
            state.enter(StoreOp::Update)?;
            let count = {
                let entry = state.in_flight_updates.entry(*id).or_default();
                *entry += 1;
                *entry
            };
            state.max_in_flight_updates = state.max_in_flight_updates.max(count);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.finish_update(collection, id, content)
    }

    async fn delete(&self, collection: Collection, id: &MemoId) -> Result<()> {
        let mut state = self.lock();
        state.enter(StoreOp::Delete)?;
        state.collection_mut(collection).remove(id);
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Memo>> {
        let mut state = self.lock();
        state.enter(StoreOp::List)?;
        let mut memos = state.collection(collection).values().cloned().collect::<Vec<_>>();
        sort_newest_first(&mut memos);
        Ok(memos)
    }
}
