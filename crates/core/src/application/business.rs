// Business Service - staff-facing business state (congestion, open flag, wait summary)

use crate::domain::{Business, CongestionLevel, DomainError};
use crate::error::Result;
use crate::port::{BusinessRegistry, QueueStore, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CongestionStatus {
    pub business_id: String,
    pub level: CongestionLevel,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitTimeSummary {
    pub business_id: String,
    pub queue_length: u32,
    /// `queue_length * service minutes`
    pub estimated_wait_time: u32,
    pub last_updated: i64,
}

pub struct BusinessService {
    registry: Arc<dyn BusinessRegistry>,
    store: Arc<dyn QueueStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BusinessService {
    pub fn new(
        registry: Arc<dyn BusinessRegistry>,
        store: Arc<dyn QueueStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            registry,
            store,
            time_provider,
        }
    }

    async fn require(&self, business_id: &str) -> Result<Business> {
        self.registry
            .get_business(business_id)
            .await?
            .ok_or_else(|| DomainError::BusinessNotFound(business_id.to_string()).into())
    }

    /// Set the staff-reported congestion level
    ///
    /// The level is validated before anything is read or written.
    pub async fn set_congestion(&self, business_id: &str, level: &str) -> Result<CongestionStatus> {
        let level: CongestionLevel = level.parse()?;
        let now = self.time_provider.now_millis();
        self.registry.set_congestion(business_id, level, now).await?;

        info!(business_id = %business_id, level = %level, "Congestion level updated");
        Ok(CongestionStatus {
            business_id: business_id.to_string(),
            level,
            updated_at: now,
        })
    }

    pub async fn get_congestion(&self, business_id: &str) -> Result<CongestionStatus> {
        let business = self.require(business_id).await?;
        Ok(CongestionStatus {
            business_id: business.id,
            level: business.congestion_level,
            updated_at: business
                .congestion_updated_at
                .unwrap_or_else(|| self.time_provider.now_millis()),
        })
    }

    pub async fn set_open(&self, business_id: &str, is_open: bool) -> Result<()> {
        self.registry
            .set_open(business_id, is_open, self.time_provider.now_millis())
            .await?;
        info!(business_id = %business_id, is_open, "Business open flag updated");
        Ok(())
    }

    /// Current line length and the wait a new customer would face
    pub async fn wait_time_summary(&self, business_id: &str) -> Result<WaitTimeSummary> {
        let business = self.require(business_id).await?;
        let queue_length = self.store.count_waiting(business_id).await?;
        Ok(WaitTimeSummary {
            business_id: business.id.clone(),
            queue_length,
            estimated_wait_time: business.fallback_wait_minutes(queue_length),
            last_updated: self.time_provider.now_millis(),
        })
    }

    pub async fn get_business(&self, business_id: &str) -> Result<Business> {
        self.require(business_id).await
    }
}
