//! SDK Request/Response Types
//!
//! Mirrors the daemon's JSON-RPC types. Timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Called,
    Served,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
}

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
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub business_id: String,
    pub position: u32,
    pub estimated_wait_time: u32,
    pub status: EntryStatus,
    pub user_info: UserInfo,
    pub joined_at: i64,
    pub called_at: Option<i64>,
    pub served_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub actual_wait_time: Option<u32>,
    #[serde(default)]
    pub ml_predicted: bool,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JoinRequest<'a> {
    pub business_id: &'a str,
    pub user_info: &'a UserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinResponse {
    pub queue_id: String,
    pub entry: QueueEntry,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EntryRequest<'a> {
    pub queue_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BusinessRequest<'a> {
    pub business_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SetCongestionRequest<'a> {
    pub business_id: &'a str,
    pub level: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStatus {
    pub business_id: String,
    pub is_open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionResponse {
    pub queue_id: String,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecalculateResponse {
    pub business_id: String,
    pub updated_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessSummary {
    pub name: String,
    pub is_open: bool,
    pub average_service_time: u32,
    pub congestion_level: CongestionLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueBoard {
    pub business_id: String,
    pub queue_length: u32,
    pub estimated_wait_time: u32,
    pub total_served: u32,
    pub waiting: Vec<QueueEntry>,
    pub called: Vec<QueueEntry>,
    pub served: Vec<QueueEntry>,
    pub last_updated: i64,
    pub business: BusinessSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CongestionStatus {
    pub business_id: String,
    pub level: CongestionLevel,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitTimeSummary {
    pub business_id: String,
    pub queue_length: u32,
    pub estimated_wait_time: u32,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub prediction_available: bool,
    pub uptime_seconds: u64,
}
