// Join use case

use super::{require_business_id, QueueEngine};
use crate::application::change_feed::{QueueEvent, QueueEventKind};
use crate::domain::{BusinessDefaults, QueueEntry, UserInfo};
use crate::error::Result;
use tracing::info;

impl QueueEngine {
    /// Add a customer to the end of a business's line
    ///
    /// Unknown businesses are created with default settings. The position is
    /// `max(waiting positions) + 1`, read without a lock: two concurrent joins
    /// may receive the same position until the next renumbering.
    pub async fn join(&self, business_id: &str, user_info: UserInfo) -> Result<QueueEntry> {
        require_business_id(business_id)?;
        user_info.validate()?;

        let business = self
            .registry
            .ensure_business(
                business_id,
                &BusinessDefaults::for_business(business_id),
                self.time_provider.now_millis(),
            )
            .await?;

        let position = self.store.max_waiting_position(business_id).await? + 1;
        let queue_size = self.store.count_waiting(business_id).await?;

        let estimate = self
            .estimator
            .estimate_for_join(&business, position, queue_size, user_info.party_size)
            .await;

        let entry = QueueEntry::new(
            self.id_provider.generate_id(),
            business_id,
            user_info,
            position,
            estimate,
            self.time_provider.now_millis(),
        );

        self.store.insert(&entry).await?;

        info!(
            entry_id = %entry.id,
            business_id = %business_id,
            position,
            estimated_wait = entry.estimated_wait_time,
            ml_predicted = entry.ml_predicted,
            "Customer joined queue"
        );

        self.publish(QueueEvent::entry(business_id, &entry.id, QueueEventKind::Joined));
        self.spawn_queue_length_refresh(business_id);

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{Business, BusinessDefaults, EntryStatus, UserInfo};
    use crate::error::ErrorKind;
    use crate::port::prediction::mocks::{MockPrediction, MockPredictionAdapter};

    #[tokio::test]
    async fn test_first_join_gets_position_one() {
        let h = harness();
        let entry = h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();

        assert_eq!(entry.position, 1);
        assert_eq!(entry.estimated_wait_time, 10);
        assert_eq!(entry.status, EntryStatus::Waiting);
        assert!(!entry.ml_predicted);

        let fetched = h.engine.get_status(&entry.id).await.unwrap();
        assert_eq!(fetched, entry);
    }

    #[tokio::test]
    async fn test_join_creates_business_lazily() {
        let h = harness();
        assert!(h.registry.get("b1").is_none());

        h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();
        settle().await;

        let business = h.registry.get("b1").unwrap();
        assert_eq!(business.name, "Sample Business");
        assert_eq!(business.current_queue_length, 1);
    }

    #[tokio::test]
    async fn test_fallback_uses_business_service_time() {
        let h = harness();
        let defaults = BusinessDefaults::for_business("b1").with_average_service_time(6);
        h.registry.put(Business::from_defaults("b1", &defaults, 0));

        let first = h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();
        let second = h.engine.join("b1", UserInfo::new("Bob")).await.unwrap();
        let third = h.engine.join("b1", UserInfo::new("Cara")).await.unwrap();

        assert_eq!(first.estimated_wait_time, 6);
        assert_eq!(second.estimated_wait_time, 12);
        assert_eq!(third.position, 3);
        assert_eq!(third.estimated_wait_time, 18);
    }

    #[tokio::test]
    async fn test_position_follows_max_not_count() {
        let h = harness();
        let mut gap = crate::domain::QueueEntry::new_test("b1", "Gap", 5);
        gap.id = "seeded".to_string();
        h.store.put(gap);

        let entry = h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();
        assert_eq!(entry.position, 6);
    }

    #[tokio::test]
    async fn test_join_with_prediction() {
        let h = harness_with(MockPredictionAdapter::new(MockPrediction::Fixed(17)));
        h.engine.join("b1", UserInfo::new("Alice")).await.unwrap();

        let entry = h
            .engine
            .join("b1", UserInfo::new("Bob").with_party_size(4))
            .await
            .unwrap();

        assert_eq!(entry.estimated_wait_time, 17);
        assert!(entry.ml_predicted);
        let req = h.prediction.requests()[0];
        assert_eq!(req.queue_size, 1);
        assert_eq!(req.party_size, 4);
    }

    #[tokio::test]
    async fn test_missing_name_is_validation_error() {
        let h = harness();
        let err = h.engine.join("b1", UserInfo::new("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = h.engine.join("", UserInfo::new("Alice")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_queue_length_failure_does_not_fail_join() {
        let h = harness();
        h.registry.fail_queue_length_updates();
        assert!(h.engine.join("b1", UserInfo::new("Alice")).await.is_ok());
        settle().await;
    }

    #[tokio::test]
    async fn test_unknown_entry_is_not_found() {
        let h = harness();
        let err = h.engine.get_status("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
