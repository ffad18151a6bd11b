// Prediction Adapter Port (Interface)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inputs of one wait-time prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub queue_size: u32,
    pub current_hour: u32,
    pub party_size: u32,
}

/// Prediction failures; never surfaced to API callers
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Prediction service unavailable: {0}")]
    Unavailable(String),

    #[error("Prediction timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),
}

/// External wait-time estimator
#[async_trait]
pub trait PredictionAdapter: Send + Sync {
    /// Health probe; any failure yields false
    async fn is_available(&self) -> bool;

    /// Predicted wait in minutes
    async fn predict_wait_time(&self, req: PredictionRequest) -> Result<u32, PredictionError>;
}

/// Adapter used when no prediction service is configured
pub struct DisabledPrediction;

#[async_trait]
impl PredictionAdapter for DisabledPrediction {
    async fn is_available(&self) -> bool {
        false
    }

    async fn predict_wait_time(&self, _req: PredictionRequest) -> Result<u32, PredictionError> {
        Err(PredictionError::Unavailable("prediction disabled".to_string()))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock prediction behavior
    #[derive(Debug, Clone)]
    pub enum MockPrediction {
        /// Always answer with this many minutes
        Fixed(u32),
        /// `queue_size * minutes_per_person`
        PerPerson(u32),
        /// Available but every prediction fails
        Fail,
        /// Available but every prediction hangs for this long
        Hang(Duration),
    }

    /// Mock PredictionAdapter for testing
    pub struct MockPredictionAdapter {
        available: Arc<Mutex<bool>>,
        behavior: Arc<Mutex<MockPrediction>>,
        requests: Arc<Mutex<Vec<PredictionRequest>>>,
    }

    impl MockPredictionAdapter {
        pub fn new(behavior: MockPrediction) -> Self {
            Self {
                available: Arc::new(Mutex::new(true)),
                behavior: Arc::new(Mutex::new(behavior)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn unavailable() -> Self {
            let adapter = Self::new(MockPrediction::Fail);
            adapter.set_available(false);
            adapter
        }

        pub fn set_available(&self, available: bool) {
            *self.available.lock().unwrap() = available;
        }

        pub fn requests(&self) -> Vec<PredictionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PredictionAdapter for MockPredictionAdapter {
        async fn is_available(&self) -> bool {
            *self.available.lock().unwrap()
        }

        async fn predict_wait_time(&self, req: PredictionRequest) -> Result<u32, PredictionError> {
            self.requests.lock().unwrap().push(req);
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockPrediction::Fixed(minutes) => Ok(minutes),
                MockPrediction::PerPerson(minutes) => Ok(req.queue_size * minutes),
                MockPrediction::Fail => {
                    Err(PredictionError::InvalidResponse("mock failure".to_string()))
                }
                MockPrediction::Hang(duration) => {
                    tokio::time::sleep(duration).await;
                    Ok(0)
                }
            }
        }
    }
}
