// Queue Engine - entry lifecycle, positions, wait times and change notification
//
// One engine per deployment. Operations for the same business run
// concurrently without a lock; `recalculate_positions` repairs collisions.

mod board;
mod join;
mod recalculate;
mod recompute;
mod subscribe;
mod transitions;

pub use board::{BusinessSummary, QueueBoard};
pub use subscribe::Subscription;

use crate::application::change_feed::{ChangeFeed, QueueEvent};
use crate::application::constants::*;
use crate::application::wait_time::WaitTimeEstimator;
use crate::domain::{DomainError, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{
    BusinessRegistry, IdProvider, PredictionAdapter, TimeProvider, TransactionalQueueStore,
    WaitTimeRecorder,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Engine tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wait between a transition and the recompute it triggers
    pub recompute_delay: Duration,
    /// Debounce of listener-triggered renumbering
    pub heal_debounce: Duration,
    /// Estimates changing by at most this many minutes are not rewritten
    pub recompute_threshold_minutes: u32,
    pub prediction_health_timeout: Duration,
    pub prediction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recompute_delay: DEFAULT_RECOMPUTE_DELAY,
            heal_debounce: DEFAULT_HEAL_DEBOUNCE,
            recompute_threshold_minutes: RECOMPUTE_THRESHOLD_MINUTES,
            prediction_health_timeout: PREDICTION_HEALTH_TIMEOUT,
            prediction_timeout: PREDICTION_TIMEOUT,
        }
    }
}

/// Queue Engine
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct QueueEngine {
    store: Arc<dyn TransactionalQueueStore>,
    registry: Arc<dyn BusinessRegistry>,
    recorder: Arc<dyn WaitTimeRecorder>,
    estimator: WaitTimeEstimator,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    feed: ChangeFeed,
    config: EngineConfig,
}

impl QueueEngine {
    pub fn new(
        store: Arc<dyn TransactionalQueueStore>,
        registry: Arc<dyn BusinessRegistry>,
        recorder: Arc<dyn WaitTimeRecorder>,
        prediction: Arc<dyn PredictionAdapter>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: EngineConfig,
    ) -> Self {
        let estimator = WaitTimeEstimator::new(prediction, time_provider.clone())
            .with_timeouts(config.prediction_health_timeout, config.prediction_timeout);

        Self {
            store,
            registry,
            recorder,
            estimator,
            id_provider,
            time_provider,
            feed: ChangeFeed::default(),
            config,
        }
    }

    /// Change feed (for adapters that bridge notifications outward)
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn estimator(&self) -> &WaitTimeEstimator {
        &self.estimator
    }

    /// Pure read of one entry
    pub async fn get_status(&self, entry_id: &str) -> Result<QueueEntry> {
        self.store
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.to_string()).into())
    }

    /// Waiting entries ordered by position
    pub async fn waiting_entries(&self, business_id: &str) -> Result<Vec<QueueEntry>> {
        self.store.find_waiting(business_id).await
    }

    /// Store connectivity probe
    pub async fn ping_store(&self) -> Result<()> {
        self.store.count_waiting("").await.map(|_| ())
    }

    fn publish(&self, event: QueueEvent) {
        debug!(business_id = %event.business_id, kind = ?event.kind, "Queue event");
        self.feed.publish(event);
    }

    /// Best-effort refresh of the cached waiting count (fire-and-forget)
    fn spawn_queue_length_refresh(&self, business_id: &str) {
        let engine = self.clone();
        let business_id = business_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = engine.refresh_queue_length(&business_id).await {
                warn!(business_id = %business_id, error = %e, "Failed to update queue length");
            }
        });
    }

    async fn refresh_queue_length(&self, business_id: &str) -> Result<()> {
        let length = self.store.count_waiting(business_id).await?;
        self.registry
            .record_queue_length(business_id, length, self.time_provider.now_millis())
            .await
    }

    /// Delayed recompute after a transition (fire-and-forget)
    fn schedule_recompute(&self, business_id: &str) {
        let engine = self.clone();
        let business_id = business_id.to_string();
        let delay = self.config.recompute_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = engine.recompute_wait_times(&business_id).await {
                warn!(business_id = %business_id, error = %e, "Background wait-time recompute failed");
            }
        });
    }
}

fn require_business_id(business_id: &str) -> Result<()> {
    if business_id.trim().is_empty() {
        return Err(AppError::Validation("business_id is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::port::analytics::mocks::InMemoryRecorder;
    use crate::port::business_registry::mocks::InMemoryBusinessRegistry;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::prediction::mocks::MockPredictionAdapter;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::time_provider::mocks::MockTimeProvider;

    pub struct Harness {
        pub engine: QueueEngine,
        pub store: InMemoryQueueStore,
        pub registry: InMemoryBusinessRegistry,
        pub recorder: InMemoryRecorder,
        pub prediction: Arc<MockPredictionAdapter>,
        pub clock: Arc<MockTimeProvider>,
    }

    pub fn test_config() -> EngineConfig {
        EngineConfig {
            recompute_delay: Duration::ZERO,
            heal_debounce: Duration::from_millis(20),
            recompute_threshold_minutes: RECOMPUTE_THRESHOLD_MINUTES,
            prediction_health_timeout: Duration::from_millis(50),
            prediction_timeout: Duration::from_millis(50),
        }
    }

    pub fn harness_with(prediction: MockPredictionAdapter) -> Harness {
        let store = InMemoryQueueStore::new();
        let registry = InMemoryBusinessRegistry::new();
        let recorder = InMemoryRecorder::new();
        let prediction = Arc::new(prediction);
        let clock = Arc::new(MockTimeProvider::new(1_000_000));

        let engine = QueueEngine::new(
            Arc::new(store.clone()),
            Arc::new(registry.clone()),
            Arc::new(recorder.clone()),
            prediction.clone(),
            Arc::new(SequentialIdProvider::new("q")),
            clock.clone(),
            test_config(),
        );

        Harness {
            engine,
            store,
            registry,
            recorder,
            prediction,
            clock,
        }
    }

    pub fn harness() -> Harness {
        harness_with(MockPredictionAdapter::unavailable())
    }

    /// Let spawned fire-and-forget tasks run to completion
    pub async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
