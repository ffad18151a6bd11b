// Queue board: one read of everything a staff dashboard shows

use super::{require_business_id, QueueEngine};
use crate::application::constants::{BOARD_RECENT_CALLED, BOARD_RECENT_SERVED};
use crate::domain::{Business, BusinessDefaults, CongestionLevel, EntryStatus, QueueEntry};
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessSummary {
    pub name: String,
    pub is_open: bool,
    pub average_service_time: u32,
    pub congestion_level: CongestionLevel,
}

impl From<&Business> for BusinessSummary {
    fn from(business: &Business) -> Self {
        Self {
            name: business.name.clone(),
            is_open: business.is_open,
            average_service_time: business.service_minutes(),
            congestion_level: business.congestion_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueBoard {
    pub business_id: String,
    pub queue_length: u32,
    /// Wait a customer joining now would face under the fallback formula
    pub estimated_wait_time: u32,
    pub total_served: u32,
    pub waiting: Vec<QueueEntry>,
    /// Most recently called first
    pub called: Vec<QueueEntry>,
    /// Most recently served first
    pub served: Vec<QueueEntry>,
    pub last_updated: i64,
    pub business: BusinessSummary,
}

fn most_recent(
    mut entries: Vec<QueueEntry>,
    at: impl Fn(&QueueEntry) -> Option<i64>,
    limit: usize,
) -> Vec<QueueEntry> {
    entries.sort_by_key(|e| std::cmp::Reverse(at(e).unwrap_or(0)));
    entries.truncate(limit);
    entries
}

impl QueueEngine {
    /// Snapshot of waiting, recently called and recently served entries
    ///
    /// Unknown businesses are reported with default settings rather than
    /// created.
    pub async fn board(&self, business_id: &str) -> Result<QueueBoard> {
        require_business_id(business_id)?;

        let now = self.time_provider.now_millis();
        let business = match self.registry.get_business(business_id).await? {
            Some(business) => business,
            None => Business::from_defaults(
                business_id,
                &BusinessDefaults::for_business(business_id),
                now,
            ),
        };

        let waiting = self.store.find_waiting(business_id).await?;
        let called = self
            .store
            .find_by_status(business_id, EntryStatus::Called)
            .await?;
        let served = self
            .store
            .find_by_status(business_id, EntryStatus::Served)
            .await?;

        let queue_length = waiting.len() as u32;
        let total_served = served.len() as u32;

        Ok(QueueBoard {
            business_id: business_id.to_string(),
            queue_length,
            estimated_wait_time: business.fallback_wait_minutes(queue_length),
            total_served,
            waiting,
            called: most_recent(called, |e| e.called_at, BOARD_RECENT_CALLED),
            served: most_recent(served, |e| e.served_at, BOARD_RECENT_SERVED),
            last_updated: now,
            business: BusinessSummary::from(&business),
        })
    }
}
