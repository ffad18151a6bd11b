// Queue Store Port (Interface)

use crate::domain::{EntryStatus, QueueEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence of queue entries, partitioned by business
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a new entry
    async fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Find entry by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>>;

    /// Write a transition only if the stored status is still `expected`
    ///
    /// Touches the status, its timestamps and the actual wait. Fails with
    /// `InvalidStateTransition` when another writer moved the entry first,
    /// NotFound when it is gone.
    async fn update_status(&self, entry: &QueueEntry, expected: EntryStatus) -> Result<()>;

    /// Write a recomputed estimate and stamp `last_updated`
    async fn update_wait_time(
        &self,
        id: &str,
        minutes: u32,
        ml_predicted: bool,
        updated_at: i64,
    ) -> Result<()>;

    /// Waiting entries of a business, ordered by (position, joined_at)
    async fn find_waiting(&self, business_id: &str) -> Result<Vec<QueueEntry>>;

    /// Entries of a business in the given status (unordered)
    async fn find_by_status(&self, business_id: &str, status: EntryStatus)
        -> Result<Vec<QueueEntry>>;

    /// Number of waiting entries
    async fn count_waiting(&self, business_id: &str) -> Result<u32>;

    /// Highest position among waiting entries (0 when none)
    async fn max_waiting_position(&self, business_id: &str) -> Result<u32>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::DomainError;
    use crate::error::AppError;
    use crate::port::transaction::{QueueStoreTransaction, Transaction, TransactionalQueueStore};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        entries: HashMap<String, QueueEntry>,
        position_writes: usize,
        wait_time_writes: usize,
        failing_wait_time_ids: HashSet<String>,
        call_on_begin: Option<String>,
    }

    /// In-memory QueueStore with write counters
    #[derive(Clone, Default)]
    pub struct InMemoryQueueStore {
        inner: Arc<Mutex<Inner>>,
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Position rows written by committed transactions
        pub fn position_writes(&self) -> usize {
            self.inner.lock().unwrap().position_writes
        }

        pub fn wait_time_writes(&self) -> usize {
            self.inner.lock().unwrap().wait_time_writes
        }

        /// Make `update_wait_time` fail for this entry
        pub fn fail_wait_time_for(&self, id: impl Into<String>) {
            self.inner
                .lock()
                .unwrap()
                .failing_wait_time_ids
                .insert(id.into());
        }

        /// Flip this entry to called when the next transaction opens, as a
        /// staff call landing between a read and a batch write would
        pub fn call_on_next_transaction(&self, id: impl Into<String>) {
            self.inner.lock().unwrap().call_on_begin = Some(id.into());
        }

        /// Overwrite an entry as-is (seeding gaps and collisions)
        pub fn put(&self, entry: QueueEntry) {
            self.inner
                .lock()
                .unwrap()
                .entries
                .insert(entry.id.clone(), entry);
        }

        pub fn get(&self, id: &str) -> Option<QueueEntry> {
            self.inner.lock().unwrap().entries.get(id).cloned()
        }
    }

    fn waiting_sorted(entries: &HashMap<String, QueueEntry>, business_id: &str) -> Vec<QueueEntry> {
        let mut waiting: Vec<QueueEntry> = entries
            .values()
            .filter(|e| e.business_id == business_id && e.status == EntryStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|e| (e.position, e.joined_at));
        waiting
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn insert(&self, entry: &QueueEntry) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if inner.entries.contains_key(&entry.id) {
                return Err(AppError::Conflict(format!("duplicate entry id {}", entry.id)));
            }
            inner.entries.insert(entry.id.clone(), entry.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
            Ok(self.get(id))
        }

        async fn update_status(&self, entry: &QueueEntry, expected: EntryStatus) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            let existing = inner
                .entries
                .get_mut(&entry.id)
                .ok_or_else(|| AppError::NotFound(entry.id.clone()))?;
            if existing.status != expected {
                return Err(DomainError::InvalidStateTransition {
                    from: existing.status.to_string(),
                    to: entry.status.to_string(),
                }
                .into());
            }
            existing.status = entry.status;
            existing.called_at = entry.called_at;
            existing.served_at = entry.served_at;
            existing.cancelled_at = entry.cancelled_at;
            existing.actual_wait_time = entry.actual_wait_time;
            Ok(())
        }

        async fn update_wait_time(
            &self,
            id: &str,
            minutes: u32,
            ml_predicted: bool,
            updated_at: i64,
        ) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if inner.failing_wait_time_ids.contains(id) {
                return Err(AppError::Database(format!("injected failure for {}", id)));
            }
            let entry = inner
                .entries
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            entry.estimated_wait_time = minutes;
            entry.ml_predicted = ml_predicted;
            entry.last_updated = updated_at;
            inner.wait_time_writes += 1;
            Ok(())
        }

        async fn find_waiting(&self, business_id: &str) -> Result<Vec<QueueEntry>> {
            Ok(waiting_sorted(&self.inner.lock().unwrap().entries, business_id))
        }

        async fn find_by_status(
            &self,
            business_id: &str,
            status: EntryStatus,
        ) -> Result<Vec<QueueEntry>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .entries
                .values()
                .filter(|e| e.business_id == business_id && e.status == status)
                .cloned()
                .collect())
        }

        async fn count_waiting(&self, business_id: &str) -> Result<u32> {
            Ok(waiting_sorted(&self.inner.lock().unwrap().entries, business_id).len() as u32)
        }

        async fn max_waiting_position(&self, business_id: &str) -> Result<u32> {
            Ok(waiting_sorted(&self.inner.lock().unwrap().entries, business_id)
                .iter()
                .map(|e| e.position)
                .max()
                .unwrap_or(0))
        }
    }

    /// Buffered position writes, applied on commit
    pub struct InMemoryTransaction {
        store: InMemoryQueueStore,
        pending: Vec<(String, u32)>,
    }

    #[async_trait]
    impl Transaction for InMemoryTransaction {
        async fn commit(self: Box<Self>) -> Result<()> {
            let mut inner = self.store.inner.lock().unwrap();
            for (id, position) in &self.pending {
                if let Some(entry) = inner.entries.get_mut(id) {
                    entry.position = *position;
                }
            }
            inner.position_writes += self.pending.len();
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueueStoreTransaction for InMemoryTransaction {
        async fn update_position(
            &mut self,
            id: &str,
            position: u32,
            _updated_at: i64,
        ) -> Result<bool> {
            let waiting = self
                .store
                .get(id)
                .is_some_and(|e| e.status == EntryStatus::Waiting);
            if waiting {
                self.pending.push((id.to_string(), position));
            }
            Ok(waiting)
        }
    }

    #[async_trait]
    impl TransactionalQueueStore for InMemoryQueueStore {
        async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(id) = inner.call_on_begin.take() {
                    if let Some(entry) = inner.entries.get_mut(&id) {
                        entry.status = EntryStatus::Called;
                    }
                }
            }
            Ok(Box::new(InMemoryTransaction {
                store: self.clone(),
                pending: Vec::new(),
            }))
        }
    }
}
