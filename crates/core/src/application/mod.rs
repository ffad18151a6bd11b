// Application Layer - Use Cases and Business Logic

pub mod business;
pub mod change_feed;
pub mod constants;
pub mod queue_engine;
pub mod shutdown;
pub mod updater;
pub mod wait_time;

// Re-exports
pub use business::{BusinessService, CongestionStatus, WaitTimeSummary};
pub use change_feed::{ChangeFeed, QueueEvent, QueueEventKind};
pub use queue_engine::{BusinessSummary, EngineConfig, QueueBoard, QueueEngine, Subscription};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use updater::{UpdaterHandle, UpdaterStats, WaitTimeUpdater};
pub use wait_time::WaitTimeEstimator;
