// Wait-time estimation: prediction service with timeout, fallback formula otherwise

use crate::application::constants::{PREDICTION_HEALTH_TIMEOUT, PREDICTION_TIMEOUT};
use crate::domain::{Business, WaitEstimate};
use crate::port::{PredictionAdapter, PredictionRequest, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Estimator shared by join, recompute and the board
///
/// Prediction failures are absorbed here and never reach the caller.
#[derive(Clone)]
pub struct WaitTimeEstimator {
    prediction: Arc<dyn PredictionAdapter>,
    time_provider: Arc<dyn TimeProvider>,
    health_timeout: Duration,
    predict_timeout: Duration,
}

impl WaitTimeEstimator {
    pub fn new(prediction: Arc<dyn PredictionAdapter>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            prediction,
            time_provider,
            health_timeout: PREDICTION_HEALTH_TIMEOUT,
            predict_timeout: PREDICTION_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, health_timeout: Duration, predict_timeout: Duration) -> Self {
        self.health_timeout = health_timeout;
        self.predict_timeout = predict_timeout;
        self
    }

    /// Health probe bounded by the health timeout; never fails
    pub async fn prediction_available(&self) -> bool {
        match timeout(self.health_timeout, self.prediction.is_available()).await {
            Ok(available) => available,
            Err(_) => {
                warn!(
                    timeout_ms = self.health_timeout.as_millis() as u64,
                    "Prediction health check timed out"
                );
                false
            }
        }
    }

    /// One prediction bounded by the predict timeout; None on any failure
    pub async fn predict(&self, queue_size: u32, party_size: u32) -> Option<u32> {
        let req = PredictionRequest {
            queue_size,
            current_hour: self.time_provider.current_hour(),
            party_size,
        };

        match timeout(self.predict_timeout, self.prediction.predict_wait_time(req)).await {
            Ok(Ok(minutes)) => {
                debug!(queue_size, party_size, minutes, "Prediction succeeded");
                Some(minutes)
            }
            Ok(Err(e)) => {
                warn!(error = %e, queue_size, party_size, "Prediction failed, using fallback");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.predict_timeout.as_millis() as u64,
                    "Prediction timed out, using fallback"
                );
                None
            }
        }
    }

    /// Estimate for a newly joining customer
    ///
    /// The prediction service is only consulted when it is up and the party
    /// size is known; otherwise `position * service minutes`.
    pub async fn estimate_for_join(
        &self,
        business: &Business,
        position: u32,
        queue_size: u32,
        party_size: Option<u32>,
    ) -> WaitEstimate {
        if let Some(party_size) = party_size {
            if self.prediction_available().await {
                if let Some(minutes) = self.predict(queue_size, party_size).await {
                    return WaitEstimate::predicted(minutes);
                }
            }
        }
        WaitEstimate::fallback(business.fallback_wait_minutes(position))
    }
}
