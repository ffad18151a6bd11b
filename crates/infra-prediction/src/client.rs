// HTTP PredictionAdapter Implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{PredictionAdapter, PredictionError, PredictionRequest};

/// Minutes reported when the service answers without an estimate
const MISSING_ESTIMATE_MINUTES: u32 = 10;

#[derive(Debug, Clone)]
pub struct PredictionConfig {
    pub base_url: String,
    pub health_timeout: Duration,
    pub predict_timeout: Duration,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            health_timeout: Duration::from_secs(5),
            predict_timeout: Duration::from_secs(2),
        }
    }
}

/// Body of POST /predict_wait_time
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictBody {
    queue_size: u32,
    current_hour: u32,
    party_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    estimated_wait: Option<f64>,
}

/// Client of the external prediction service
#[derive(Debug, Clone)]
pub struct HttpPredictionAdapter {
    client: reqwest::Client,
    config: PredictionConfig,
}

impl HttpPredictionAdapter {
    pub fn new(config: PredictionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> PredictionError {
    if err.is_timeout() {
        PredictionError::Timeout(timeout.as_millis() as u64)
    } else {
        PredictionError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl PredictionAdapter for HttpPredictionAdapter {
    async fn is_available(&self) -> bool {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(self.config.health_timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "Prediction service unhealthy");
                false
            }
            Err(e) => {
                warn!(error = %e, "Prediction service not reachable, falling back to simple estimates");
                false
            }
        }
    }

    async fn predict_wait_time(
        &self,
        req: PredictionRequest,
    ) -> std::result::Result<u32, PredictionError> {
        let body = PredictBody {
            queue_size: req.queue_size,
            current_hour: req.current_hour,
            party_size: req.party_size,
        };

        let response = self
            .client
            .post(self.url("/predict_wait_time"))
            .timeout(self.config.predict_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify(e, self.config.predict_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::Unavailable(format!(
                "prediction service returned {}",
                status
            )));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;

        let minutes = match parsed.estimated_wait {
            Some(value) if value.is_finite() && value > 0.0 => value.round() as u32,
            Some(value) if value.is_finite() && value == 0.0 => MISSING_ESTIMATE_MINUTES,
            Some(value) => {
                return Err(PredictionError::InvalidResponse(format!(
                    "estimatedWait out of range: {}",
                    value
                )))
            }
            None => MISSING_ESTIMATE_MINUTES,
        };

        debug!(
            queue_size = req.queue_size,
            party_size = req.party_size,
            minutes,
            "Prediction received"
        );
        Ok(minutes)
    }
}
