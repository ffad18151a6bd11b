// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid queue entry transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Business not found: {0}")]
    BusinessNotFound(String),

    #[error("Invalid congestion level: {0} (expected low, moderate or high)")]
    InvalidCongestionLevel(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
