// Transaction port for atomic operations

use crate::error::Result;
use crate::port::QueueStore;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// QueueStore that can open write batches
#[async_trait]
pub trait TransactionalQueueStore: QueueStore {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>>;
}

/// QueueStore operations within a transaction
#[async_trait]
pub trait QueueStoreTransaction: Transaction {
    /// Renumber one waiting entry (within transaction)
    ///
    /// Returns false, writing nothing, when the entry has left the waiting
    /// set since it was read.
    async fn update_position(&mut self, id: &str, position: u32, updated_at: i64)
        -> Result<bool>;
}
