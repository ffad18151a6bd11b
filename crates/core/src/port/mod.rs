// Port Layer - Interfaces for external dependencies

pub mod analytics;
pub mod business_registry;
pub mod id_provider; // For deterministic testing
pub mod prediction;
pub mod queue_store;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use analytics::WaitTimeRecorder;
pub use business_registry::BusinessRegistry;
pub use id_provider::{IdProvider, UuidProvider};
pub use prediction::{DisabledPrediction, PredictionAdapter, PredictionError, PredictionRequest};
pub use queue_store::QueueStore;
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use transaction::{QueueStoreTransaction, Transaction, TransactionalQueueStore};
