// Wait-time recompute for the remaining waiting entries

use super::QueueEngine;
use crate::application::change_feed::{QueueEvent, QueueEventKind};
use crate::domain::{Business, BusinessDefaults, QueueEntry, WaitEstimate};
use crate::error::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

impl QueueEngine {
    /// Refresh `estimated_wait_time` of every waiting entry
    ///
    /// Entry at index `i` (by position) is estimated with a remaining queue of
    /// `max(1, N - i)` and its party size (2 when unknown). Estimates within the
    /// threshold of the stored value are not written. Per-entry failures are
    /// logged and skipped. Returns the number of entries rewritten.
    pub async fn recompute_wait_times(&self, business_id: &str) -> Result<u32> {
        let business = match self.registry.get_business(business_id).await? {
            Some(business) => business,
            None => Business::from_defaults(
                business_id,
                &BusinessDefaults::for_business(business_id),
                self.time_provider.now_millis(),
            ),
        };

        let waiting = self.store.find_waiting(business_id).await?;
        if waiting.is_empty() {
            return Ok(0);
        }

        let available = self.estimator.prediction_available().await;
        let total = waiting.len() as u32;

        let estimates = join_all(waiting.iter().enumerate().map(|(index, entry)| {
            let remaining = total.saturating_sub(index as u32).max(1);
            let fallback = business.fallback_wait_minutes(index as u32 + 1);
            async move {
                if available {
                    if let Some(minutes) = self
                        .estimator
                        .predict(remaining, entry.party_size_or_default())
                        .await
                    {
                        return WaitEstimate::predicted(minutes);
                    }
                }
                WaitEstimate::fallback(fallback)
            }
        }))
        .await;

        let now = self.time_provider.now_millis();
        let mut updated = 0u32;
        for (entry, estimate) in waiting.iter().zip(estimates) {
            if !self.exceeds_threshold(entry, estimate.minutes) {
                continue;
            }
            match self
                .store
                .update_wait_time(&entry.id, estimate.minutes, estimate.ml_predicted, now)
                .await
            {
                Ok(()) => {
                    debug!(
                        entry_id = %entry.id,
                        old = entry.estimated_wait_time,
                        new = estimate.minutes,
                        "Wait time updated"
                    );
                    updated += 1;
                }
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "Failed to update wait time, skipping");
                }
            }
        }

        if updated > 0 {
            self.publish(QueueEvent::business(business_id, QueueEventKind::WaitTimesUpdated));
        }
        info!(
            business_id = %business_id,
            updated,
            total,
            ml_available = available,
            "Wait times recomputed"
        );

        Ok(updated)
    }

    fn exceeds_threshold(&self, entry: &QueueEntry, minutes: u32) -> bool {
        entry.estimated_wait_time.abs_diff(minutes) > self.config.recompute_threshold_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{QueueEntry, UserInfo, WaitEstimate};
    use crate::port::prediction::mocks::{MockPrediction, MockPredictionAdapter};

    fn seeded(id: &str, position: u32, estimate: u32) -> QueueEntry {
        let mut entry = QueueEntry::new(
            id,
            "b1",
            UserInfo::new(id),
            position,
            WaitEstimate::fallback(estimate),
            position as i64,
        );
        entry.id = id.to_string();
        entry
    }

    #[tokio::test]
    async fn test_fallback_recompute_after_front_leaves() {
        let h = harness();
        h.store.put(seeded("b", 2, 20));
        h.store.put(seeded("c", 3, 30));

        let updated = h.engine.recompute_wait_times("b1").await.unwrap();
        assert_eq!(updated, 2);
        assert_eq!(h.store.get("b").unwrap().estimated_wait_time, 10);
        assert_eq!(h.store.get("c").unwrap().estimated_wait_time, 20);
        assert!(!h.store.get("b").unwrap().ml_predicted);
    }

    #[tokio::test]
    async fn test_small_changes_are_not_written() {
        let h = harness();
        h.store.put(seeded("a", 1, 12));
        h.store.put(seeded("b", 2, 18));

        let updated = h.engine.recompute_wait_times("b1").await.unwrap();
        assert_eq!(updated, 0);
        assert_eq!(h.store.wait_time_writes(), 0);
        assert_eq!(h.store.get("a").unwrap().estimated_wait_time, 12);
    }

    #[tokio::test]
    async fn test_prediction_uses_remaining_queue_and_default_party() {
        let h = harness_with(MockPredictionAdapter::new(MockPrediction::PerPerson(7)));
        h.store.put(seeded("a", 1, 0));
        h.store.put(seeded("b", 2, 0));
        h.store.put(seeded("c", 3, 0));

        h.engine.recompute_wait_times("b1").await.unwrap();

        assert_eq!(h.store.get("a").unwrap().estimated_wait_time, 21);
        assert_eq!(h.store.get("b").unwrap().estimated_wait_time, 14);
        assert_eq!(h.store.get("c").unwrap().estimated_wait_time, 7);
        assert!(h.store.get("c").unwrap().ml_predicted);
        assert!(h.prediction.requests().iter().all(|r| r.party_size == 2));
    }

    #[tokio::test]
    async fn test_one_failed_write_does_not_stop_others() {
        let h = harness();
        h.store.put(seeded("a", 1, 50));
        h.store.put(seeded("b", 2, 50));
        h.store.fail_wait_time_for("a");

        let updated = h.engine.recompute_wait_times("b1").await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(h.store.get("a").unwrap().estimated_wait_time, 50);
        assert_eq!(h.store.get("b").unwrap().estimated_wait_time, 20);
    }

    #[tokio::test]
    async fn test_call_triggers_background_recompute() {
        let h = harness();
        let alice = h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();
        let bob = h.engine.join("b1", UserInfo::new("Bob")).await.unwrap();
        let cara = h.engine.join("b1", UserInfo::new("Cara")).await.unwrap();
        assert_eq!(cara.estimated_wait_time, 30);

        h.engine.call(&alice.id).await.unwrap();
        settle().await;

        assert_eq!(h.engine.get_status(&bob.id).await.unwrap().estimated_wait_time, 10);
        assert_eq!(h.engine.get_status(&cara.id).await.unwrap().estimated_wait_time, 20);
    }
}
