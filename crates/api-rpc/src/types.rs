//! RPC Request/Response Types
//!
//! Parameters are passed by name (JSON objects). Entries, boards and
//! business summaries are serialized straight from the core types.

use serde::{Deserialize, Serialize};
use waitline_core::domain::{EntryStatus, QueueEntry, UserInfo};

/// queue.join.v1
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub business_id: String,
    pub user_info: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub queue_id: String,
    pub entry: QueueEntry,
}

/// queue.status.v1, queue.call.v1, queue.serve.v1, queue.cancel.v1,
/// queue.entry.subscribe.v1
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub queue_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub queue_id: String,
    pub status: EntryStatus,
}

/// Any method addressed to a single business
#[derive(Debug, Deserialize)]
pub struct BusinessRequest {
    pub business_id: String,
}

/// queue.recalculate.v1
#[derive(Debug, Clone, Serialize)]
pub struct RecalculateResponse {
    pub business_id: String,
    pub updated_count: u32,
}

/// business.congestion.set.v1
#[derive(Debug, Deserialize)]
pub struct SetCongestionRequest {
    pub business_id: String,
    pub level: String,
}

/// business.open.set.v1
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SetOpenRequest {
    pub business_id: String,
    pub is_open: bool,
}

pub type SetOpenResponse = SetOpenRequest;

/// admin.health.v1
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "ok" when the store answers, "degraded" otherwise
    pub status: String,
    pub store: String,
    pub prediction_available: bool,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_optional_fields() {
        let req: JoinRequest = serde_json::from_value(json!({
            "business_id": "cafe",
            "user_info": { "name": "Ann" }
        }))
        .unwrap();

        assert_eq!(req.business_id, "cafe");
        assert_eq!(req.user_info.name, "Ann");
        assert_eq!(req.user_info.party_size, None);
    }

    #[test]
    fn test_transition_status_is_lowercase() {
        let resp = TransitionResponse {
            queue_id: "q-1".into(),
            status: EntryStatus::Called,
        };
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({ "queue_id": "q-1", "status": "called" })
        );
    }
}
