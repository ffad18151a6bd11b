// Live subscriptions over the change feed

use super::recalculate::is_sequential;
use super::QueueEngine;
use crate::application::change_feed::QueueEvent;
use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::domain::QueueEntry;
use crate::error::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

const SNAPSHOT_BUFFER: usize = 16;

/// Handle of a live subscription
///
/// Delivers an initial snapshot, then one snapshot per observed change.
/// `unsubscribe` stops the listener task and waits for it; dropping the
/// handle aborts it.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    shutdown: ShutdownSender,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    /// Next snapshot; None once the listener has stopped
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop listening; no snapshot is delivered afterwards
    pub async fn unsubscribe(mut self) {
        self.shutdown.shutdown();
        self.rx.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "Subscription listener panicked");
                }
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Outcome of waiting for the next feed item
enum Wake {
    Changed,
    Ignored,
    Heal,
    Stop,
}

fn classify(received: std::result::Result<QueueEvent, RecvError>, matches: impl Fn(&QueueEvent) -> bool) -> Wake {
    match received {
        Ok(event) if matches(&event) => Wake::Changed,
        Ok(_) => Wake::Ignored,
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Subscription lagged behind change feed, re-reading");
            Wake::Changed
        }
        Err(RecvError::Closed) => Wake::Stop,
    }
}

/// Send unless the subscriber is gone or shutdown fires first
async fn deliver<T>(tx: &mpsc::Sender<T>, value: T, shutdown: &mut ShutdownToken) -> bool {
    tokio::select! {
        sent = tx.send(value) => sent.is_ok(),
        _ = shutdown.wait() => false,
    }
}

impl QueueEngine {
    /// Live view of a business's waiting entries, ordered by position
    ///
    /// A snapshot whose positions are not exactly 1..N schedules a debounced
    /// `recalculate_positions`; the timer lives in the listener task.
    pub async fn subscribe(&self, business_id: &str) -> Result<Subscription<Vec<QueueEntry>>> {
        super::require_business_id(business_id)?;

        let events = self.feed.subscribe();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let (shutdown_tx, shutdown) = shutdown_channel();

        let task = tokio::spawn(self.clone().run_queue_listener(
            business_id.to_string(),
            events,
            tx,
            shutdown,
        ));

        debug!(business_id = %business_id, "Queue subscription started");
        Ok(Subscription {
            rx,
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }

    /// Live view of a single entry (None when it does not exist)
    pub async fn subscribe_to_entry(
        &self,
        entry_id: &str,
    ) -> Result<Subscription<Option<QueueEntry>>> {
        let events = self.feed.subscribe();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let (shutdown_tx, shutdown) = shutdown_channel();

        let task = tokio::spawn(self.clone().run_entry_listener(
            entry_id.to_string(),
            events,
            tx,
            shutdown,
        ));

        debug!(entry_id = %entry_id, "Entry subscription started");
        Ok(Subscription {
            rx,
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }

    async fn run_queue_listener(
        self,
        business_id: String,
        mut events: broadcast::Receiver<QueueEvent>,
        tx: mpsc::Sender<Vec<QueueEntry>>,
        mut shutdown: ShutdownToken,
    ) {
        let debounce = self.config.heal_debounce;
        let mut last: Option<Vec<QueueEntry>> = None;
        let mut heal_at: Option<Instant> = None;
        let mut dirty = true;

        loop {
            if dirty {
                dirty = false;
                match self.store.find_waiting(&business_id).await {
                    Ok(entries) => {
                        heal_at = if is_sequential(&entries) {
                            None
                        } else {
                            Some(Instant::now() + debounce)
                        };
                        if last.as_ref() != Some(&entries) {
                            last = Some(entries.clone());
                            if !deliver(&tx, entries, &mut shutdown).await {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(business_id = %business_id, error = %e, "Queue snapshot read failed");
                    }
                }
            }

            let wake = tokio::select! {
                _ = shutdown.wait() => Wake::Stop,
                _ = tx.closed() => Wake::Stop,
                received = events.recv() => classify(received, |e| e.business_id == business_id),
                _ = sleep_until(heal_at.unwrap_or_else(Instant::now)), if heal_at.is_some() => Wake::Heal,
            };

            match wake {
                Wake::Changed => dirty = true,
                Wake::Ignored => {}
                Wake::Heal => {
                    heal_at = None;
                    match self.recalculate_positions(&business_id).await {
                        Ok(updated) => {
                            debug!(business_id = %business_id, updated, "Listener repaired positions")
                        }
                        Err(e) => {
                            warn!(business_id = %business_id, error = %e, "Listener position repair failed")
                        }
                    }
                }
                Wake::Stop => break,
            }
        }

        debug!(business_id = %business_id, "Queue subscription stopped");
    }

    async fn run_entry_listener(
        self,
        entry_id: String,
        mut events: broadcast::Receiver<QueueEvent>,
        tx: mpsc::Sender<Option<QueueEntry>>,
        mut shutdown: ShutdownToken,
    ) {
        let mut business_id: Option<String> = None;
        let mut last: Option<Option<QueueEntry>> = None;
        let mut dirty = true;

        loop {
            if dirty {
                dirty = false;
                match self.store.find_by_id(&entry_id).await {
                    Ok(entry) => {
                        if let Some(found) = &entry {
                            business_id = Some(found.business_id.clone());
                        }
                        if last.as_ref() != Some(&entry) {
                            last = Some(entry.clone());
                            if !deliver(&tx, entry, &mut shutdown).await {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(entry_id = %entry_id, error = %e, "Entry snapshot read failed");
                    }
                }
            }

            let wake = tokio::select! {
                _ = shutdown.wait() => Wake::Stop,
                _ = tx.closed() => Wake::Stop,
                received = events.recv() => {
                    classify(received, |e| e.touches_entry(business_id.as_deref(), &entry_id))
                }
            };

            match wake {
                Wake::Changed => dirty = true,
                Wake::Ignored | Wake::Heal => {}
                Wake::Stop => break,
            }
        }

        debug!(entry_id = %entry_id, "Entry subscription stopped");
    }
}
