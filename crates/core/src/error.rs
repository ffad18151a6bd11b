// Central Error Type for the Application

use crate::domain::DomainError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Caller-visible error class, independent of transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing field or invalid enum value (400-equivalent)
    Validation,
    /// Unknown identifier (404-equivalent)
    NotFound,
    /// Status precondition violated (409-equivalent)
    Conflict,
    /// Store or unexpected failure (500-equivalent)
    Internal,
}

impl AppError {
    /// Classify this error for the outer API layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::Serialization(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Domain(e) => match e {
                DomainError::InvalidStateTransition { .. } => ErrorKind::Conflict,
                DomainError::EntryNotFound(_) | DomainError::BusinessNotFound(_) => {
                    ErrorKind::NotFound
                }
                DomainError::InvalidCongestionLevel(_) | DomainError::ValidationError(_) => {
                    ErrorKind::Validation
                }
            },
            AppError::Database(_) | AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

// From implementations for infra crates (to avoid circular dependency)
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Database(err)
    }
}

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
