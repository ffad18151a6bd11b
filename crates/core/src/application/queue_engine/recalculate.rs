// Position renumbering (self-healing of join races and removals)

use super::{require_business_id, QueueEngine};
use crate::application::constants::RECALCULATE_ATTEMPTS;
use crate::application::change_feed::{QueueEvent, QueueEventKind};
use crate::domain::QueueEntry;
use crate::error::Result;
use tracing::{debug, info, warn};

/// Whether waiting positions (already sorted) are exactly 1..N
pub(crate) fn is_sequential(entries: &[QueueEntry]) -> bool {
    entries
        .iter()
        .enumerate()
        .all(|(index, entry)| entry.position == index as u32 + 1)
}

impl QueueEngine {
    /// Renumber waiting entries to 1..N in (position, joined_at) order
    ///
    /// Only entries whose position changes are written, as one transaction.
    /// Returns the number of entries rewritten (0 when already dense).
    pub async fn recalculate_positions(&self, business_id: &str) -> Result<u32> {
        require_business_id(business_id)?;

        let mut attempt = 1;
        loop {
            let final_attempt = attempt >= RECALCULATE_ATTEMPTS;
            match self.renumber_once(business_id, final_attempt).await? {
                Some(updated) => return Ok(updated),
                None => {
                    debug!(business_id = %business_id, attempt, "Waiting set moved under renumbering, rereading");
                    attempt += 1;
                }
            }
        }
    }

    /// One read-then-write pass; `None` when an entry left the waiting set
    /// mid-batch and the pass was rolled back to be retried. On the final
    /// attempt such entries are skipped and the rest is committed.
    async fn renumber_once(&self, business_id: &str, final_attempt: bool) -> Result<Option<u32>> {
        let waiting = self.store.find_waiting(business_id).await?;
        let changes: Vec<(&QueueEntry, u32)> = waiting
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry, index as u32 + 1))
            .filter(|(entry, position)| entry.position != *position)
            .collect();

        if changes.is_empty() {
            return Ok(Some(0));
        }

        let now = self.time_provider.now_millis();
        let mut tx = self.store.begin_transaction().await?;
        let mut updated = 0u32;
        for (entry, position) in &changes {
            match tx.update_position(&entry.id, *position, now).await {
                Ok(true) => updated += 1,
                Ok(false) if final_attempt => {
                    warn!(entry_id = %entry.id, "Entry left the waiting set, position skipped");
                }
                Ok(false) => {
                    tx.rollback().await?;
                    return Ok(None);
                }
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "Position update failed, rolling back");
                    tx.rollback().await?;
                    return Err(e);
                }
            }
        }
        tx.commit().await?;

        info!(business_id = %business_id, updated, total = waiting.len(), "Queue positions recalculated");
        self.publish(QueueEvent::business(business_id, QueueEventKind::Repositioned));

        Ok(Some(updated))
    }
}
