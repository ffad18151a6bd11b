// Periodic wait-time updater (background task with an owning handle)

use crate::application::constants::{DEFAULT_UPDATER_INTERVAL, MIN_UPDATER_INTERVAL};
use crate::application::queue_engine::QueueEngine;
use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::error::Result;
use crate::port::BusinessRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Outcome of one updater pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdaterStats {
    pub businesses: u32,
    pub positions_fixed: u32,
    pub wait_times_updated: u32,
    pub failures: u32,
}

/// Renumbers positions and recomputes estimates of every open business
pub struct WaitTimeUpdater {
    engine: QueueEngine,
    registry: Arc<dyn BusinessRegistry>,
    interval: Duration,
}

impl WaitTimeUpdater {
    /// Create a new updater
    ///
    /// # Arguments
    /// * `engine` - Queue engine to drive
    /// * `registry` - Source of the business list
    /// * `interval` - Time between passes, raised to `MIN_UPDATER_INTERVAL` if shorter
    pub fn new(engine: QueueEngine, registry: Arc<dyn BusinessRegistry>, interval: Duration) -> Self {
        if interval < MIN_UPDATER_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Updater interval too short, using the minimum"
            );
        }
        Self {
            engine,
            registry,
            interval: interval.max(MIN_UPDATER_INTERVAL),
        }
    }

    pub fn with_default_interval(engine: QueueEngine, registry: Arc<dyn BusinessRegistry>) -> Self {
        Self::new(engine, registry, DEFAULT_UPDATER_INTERVAL)
    }

    /// One pass over all open businesses; per-business failures are counted, not returned
    pub async fn run_once(&self) -> Result<UpdaterStats> {
        let mut stats = UpdaterStats::default();

        for business in self.registry.list_businesses().await? {
            if !business.is_open {
                continue;
            }
            stats.businesses += 1;

            match self.engine.recalculate_positions(&business.id).await {
                Ok(fixed) => stats.positions_fixed += fixed,
                Err(e) => {
                    warn!(business_id = %business.id, error = %e, "Periodic recalculation failed");
                    stats.failures += 1;
                }
            }
            match self.engine.recompute_wait_times(&business.id).await {
                Ok(updated) => stats.wait_times_updated += updated,
                Err(e) => {
                    warn!(business_id = %business.id, error = %e, "Periodic recompute failed");
                    stats.failures += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Spawn the periodic loop; the first pass runs one interval from now
    pub fn start(self) -> UpdaterHandle {
        let (shutdown_tx, shutdown) = shutdown_channel();
        let task = tokio::spawn(self.run(shutdown));
        UpdaterHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Wait-time updater started"
        );

        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }

            match self.run_once().await {
                Ok(stats) => info!(
                    businesses = stats.businesses,
                    positions_fixed = stats.positions_fixed,
                    wait_times_updated = stats.wait_times_updated,
                    failures = stats.failures,
                    "Periodic wait-time update completed"
                ),
                Err(e) => error!(error = %e, "Periodic wait-time update failed"),
            }
        }

        info!("Wait-time updater stopped");
    }
}

/// Owning handle of a running updater
pub struct UpdaterHandle {
    shutdown: ShutdownSender,
    task: Option<JoinHandle<()>>,
}

impl UpdaterHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for it (idempotent)
    pub async fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Wait-time updater task failed");
            }
        }
    }
}

impl Drop for UpdaterHandle {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
