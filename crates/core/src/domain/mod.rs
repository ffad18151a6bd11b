// Domain Layer - Pure business logic and entities

pub mod business;
pub mod entry;
pub mod error;
pub mod sample;

// Re-exports
pub use business::{
    Business, BusinessDefaults, BusinessSettings, CongestionLevel, DEFAULT_SERVICE_MINUTES,
};
pub use entry::{
    BusinessId, EntryId, EntryStatus, QueueEntry, UserInfo, WaitEstimate, DEFAULT_PARTY_SIZE,
};
pub use error::DomainError;
pub use sample::WaitTimeSample;
