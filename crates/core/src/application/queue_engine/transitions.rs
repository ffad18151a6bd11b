// Staff transitions: call, serve, cancel

use super::QueueEngine;
use crate::application::change_feed::{QueueEvent, QueueEventKind};
use crate::domain::{QueueEntry, WaitTimeSample};
use crate::error::Result;
use tracing::{info, warn};

impl QueueEngine {
    /// WAITING -> CALLED
    pub async fn call(&self, entry_id: &str) -> Result<QueueEntry> {
        let mut entry = self.get_status(entry_id).await?;
        let from = entry.status;
        entry.call(self.time_provider.now_millis())?;
        self.store.update_status(&entry, from).await?;

        info!(entry_id = %entry.id, business_id = %entry.business_id, "Customer called");
        self.after_transition(&entry, QueueEventKind::Called);
        Ok(entry)
    }

    /// CALLED -> SERVED, recording the observed wait
    pub async fn serve(&self, entry_id: &str) -> Result<QueueEntry> {
        let mut entry = self.get_status(entry_id).await?;
        let from = entry.status;
        let now = self.time_provider.now_millis();
        let waited = entry.serve(now)?;
        self.store.update_status(&entry, from).await?;

        info!(
            entry_id = %entry.id,
            business_id = %entry.business_id,
            actual_wait = waited,
            "Customer served"
        );

        let sample = WaitTimeSample {
            business_id: entry.business_id.clone(),
            entry_id: entry.id.clone(),
            recorded_at: now,
            queue_length: entry.position,
            actual_wait_minutes: waited,
            day_of_week: self.time_provider.day_of_week(),
            hour_of_day: self.time_provider.current_hour(),
        };
        if let Err(e) = self.recorder.record(&sample).await {
            warn!(entry_id = %entry.id, error = %e, "Failed to record wait-time sample");
        }

        self.after_transition(&entry, QueueEventKind::Served);
        Ok(entry)
    }

    /// WAITING | CALLED -> CANCELLED
    pub async fn cancel(&self, entry_id: &str) -> Result<QueueEntry> {
        let mut entry = self.get_status(entry_id).await?;
        let from = entry.status;
        entry.cancel(self.time_provider.now_millis())?;
        self.store.update_status(&entry, from).await?;

        info!(entry_id = %entry.id, business_id = %entry.business_id, "Queue entry cancelled");
        self.after_transition(&entry, QueueEventKind::Cancelled);
        Ok(entry)
    }

    fn after_transition(&self, entry: &QueueEntry, kind: QueueEventKind) {
        self.publish(QueueEvent::entry(&entry.business_id, &entry.id, kind));
        self.spawn_queue_length_refresh(&entry.business_id);
        self.schedule_recompute(&entry.business_id);
    }
}
