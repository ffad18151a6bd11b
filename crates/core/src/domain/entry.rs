// Queue Entry Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue entry ID (UUID v4)
pub type EntryId = String;

/// Business identifier (foreign key of every entry)
pub type BusinessId = String;

/// Entry status
///
/// ```text
/// WAITING -> CALLED -> SERVED
///    |          |
///    +----------+----> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Called,
    Served,
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Called => "called",
            EntryStatus::Served => "served",
            EntryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Served | EntryStatus::Cancelled)
    }

    /// Whether `self -> next` is an edge of the entry state machine
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Waiting, EntryStatus::Called)
                | (EntryStatus::Called, EntryStatus::Served)
                | (EntryStatus::Waiting, EntryStatus::Cancelled)
                | (EntryStatus::Called, EntryStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(EntryStatus::Waiting),
            "called" => Ok(EntryStatus::Called),
            "served" => Ok(EntryStatus::Served),
            "cancelled" => Ok(EntryStatus::Cancelled),
            other => Err(DomainError::ValidationError(format!(
                "unknown entry status: {}",
                other
            ))),
        }
    }
}

/// Customer details captured at join time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
}

impl UserInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            email: None,
            party_size: None,
        }
    }

    pub fn with_party_size(mut self, party_size: u32) -> Self {
        self.party_size = Some(party_size);
        self
    }

    /// Name is required; a party, when given, has at least one person
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "user name is required".to_string(),
            ));
        }
        if self.party_size == Some(0) {
            return Err(DomainError::ValidationError(
                "party size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A wait-time estimate and where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEstimate {
    pub minutes: u32,
    /// true when produced by the prediction service, false for the fallback formula
    pub ml_predicted: bool,
}

impl WaitEstimate {
    pub fn fallback(minutes: u32) -> Self {
        Self {
            minutes,
            ml_predicted: false,
        }
    }

    pub fn predicted(minutes: u32) -> Self {
        Self {
            minutes,
            ml_predicted: true,
        }
    }
}

/// One customer's place in a business's line
///
/// Entries are never deleted: serving and cancelling are terminal status
/// changes, so `joined_at` history stays available for analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub business_id: BusinessId,
    pub position: u32,
    pub estimated_wait_time: u32, // minutes
    pub status: EntryStatus,
    pub user_info: UserInfo,

    pub joined_at: i64, // epoch ms
    pub called_at: Option<i64>,
    pub served_at: Option<i64>,
    pub cancelled_at: Option<i64>,

    /// Whole minutes between join and service, set on serve
    pub actual_wait_time: Option<u32>,
    pub ml_predicted: bool,
    /// Last time `estimated_wait_time` was computed
    pub last_updated: i64,
}

impl QueueEntry {
    /// Create a new waiting entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (injected, not generated)
    /// * `business_id` - Owning business
    /// * `user_info` - Customer details
    /// * `position` - Assigned place in line
    /// * `estimate` - Initial wait-time estimate
    /// * `joined_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        business_id: impl Into<String>,
        user_info: UserInfo,
        position: u32,
        estimate: WaitEstimate,
        joined_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            business_id: business_id.into(),
            position,
            estimated_wait_time: estimate.minutes,
            status: EntryStatus::Waiting,
            user_info,
            joined_at,
            called_at: None,
            served_at: None,
            cancelled_at: None,
            actual_wait_time: None,
            ml_predicted: estimate.ml_predicted,
            last_updated: joined_at,
        }
    }

    /// Create a test entry with deterministic ID and timestamp (for tests only)
    ///
    /// IDs are `entry-1, entry-2, ...`; timestamps start at 1000 and grow by 1000.
    pub fn new_test(business_id: impl Into<String>, name: &str, position: u32) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("entry-{}", counter),
            business_id,
            UserInfo::new(name),
            position,
            WaitEstimate::fallback(position * 10),
            (counter * 1000) as i64,
        )
    }

    fn transition(&mut self, next: EntryStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// WAITING -> CALLED
    pub fn call(&mut self, now_millis: i64) -> Result<()> {
        self.transition(EntryStatus::Called)?;
        self.called_at = Some(now_millis);
        Ok(())
    }

    /// CALLED -> SERVED, returns the actual wait in whole minutes
    pub fn serve(&mut self, now_millis: i64) -> Result<u32> {
        self.transition(EntryStatus::Served)?;
        self.served_at = Some(now_millis);
        let waited = ((now_millis - self.joined_at).max(0) / 60_000) as u32;
        self.actual_wait_time = Some(waited);
        Ok(waited)
    }

    /// WAITING | CALLED -> CANCELLED
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        self.transition(EntryStatus::Cancelled)?;
        self.cancelled_at = Some(now_millis);
        Ok(())
    }

    /// Party size used for predictions (2 when the customer did not say)
    pub fn party_size_or_default(&self) -> u32 {
        self.user_info.party_size.unwrap_or(DEFAULT_PARTY_SIZE)
    }
}

/// Party size assumed when recomputing estimates for entries that gave none
pub const DEFAULT_PARTY_SIZE: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_entry() -> QueueEntry {
        QueueEntry::new(
            "q-1",
            "b1",
            UserInfo::new("Alice"),
            1,
            WaitEstimate::fallback(10),
            0,
        )
    }

    #[test]
    fn test_new_entry_is_waiting() {
        let entry = waiting_entry();
        assert_eq!(entry.status, EntryStatus::Waiting);
        assert_eq!(entry.estimated_wait_time, 10);
        assert!(!entry.ml_predicted);
        assert_eq!(entry.last_updated, entry.joined_at);
    }

    #[test]
    fn test_call_then_serve_records_actual_wait() {
        let mut entry = waiting_entry();
        entry.call(60_000).unwrap();
        assert_eq!(entry.called_at, Some(60_000));

        let waited = entry.serve(25 * 60_000 + 59_000).unwrap();
        assert_eq!(waited, 25);
        assert_eq!(entry.status, EntryStatus::Served);
        assert_eq!(entry.actual_wait_time, Some(25));
    }

    #[test]
    fn test_serve_from_waiting_is_rejected() {
        let mut entry = waiting_entry();
        let err = entry.serve(1000).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(entry.status, EntryStatus::Waiting);
        assert!(entry.served_at.is_none());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut cancelled = waiting_entry();
        cancelled.cancel(1000).unwrap();
        assert!(cancelled.call(2000).is_err());
        assert!(cancelled.cancel(2000).is_err());
        assert_eq!(cancelled.cancelled_at, Some(1000));

        let mut served = waiting_entry();
        served.call(1000).unwrap();
        served.serve(2000).unwrap();
        assert!(served.cancel(3000).is_err());
        assert!(served.call(3000).is_err());
    }

    #[test]
    fn test_called_can_be_cancelled() {
        let mut entry = waiting_entry();
        entry.call(1000).unwrap();
        assert!(entry.cancel(2000).is_ok());
        assert_eq!(entry.status, EntryStatus::Cancelled);
    }

    #[test]
    fn test_user_info_validation() {
        assert!(UserInfo::new("Bob").validate().is_ok());
        assert!(UserInfo::new("   ").validate().is_err());
        assert!(UserInfo::new("Bob").with_party_size(0).validate().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&EntryStatus::Waiting).unwrap();
        assert_eq!(json, "\"waiting\"");
        assert_eq!("called".parse::<EntryStatus>().unwrap(), EntryStatus::Called);
    }
}
