// Waitline Infrastructure - SQLite Adapter
// Implements: QueueStore, TransactionalQueueStore, BusinessRegistry, WaitTimeRecorder

mod analytics;
mod business_registry;
mod connection;
mod error;
mod migration;
mod queue_store;
mod transaction;

pub use analytics::SqliteWaitTimeRecorder;
pub use business_registry::SqliteBusinessRegistry;
pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use transaction::SqliteQueueTransaction;

// Note: sqlx::Error conversion goes through error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
