// Wait-time analytics sample

use serde::{Deserialize, Serialize};

/// Observed wait of one served customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitTimeSample {
    pub business_id: String,
    pub entry_id: String,
    pub recorded_at: i64,
    /// Position the customer held in line when served
    pub queue_length: u32,
    pub actual_wait_minutes: u32,
    /// 0 = Sunday
    pub day_of_week: u32,
    pub hour_of_day: u32,
}
