// SQLite WaitTimeRecorder Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::WaitTimeSample;
use waitline_core::error::Result;
use waitline_core::port::WaitTimeRecorder;

#[derive(Clone)]
pub struct SqliteWaitTimeRecorder {
    pool: SqlitePool,
}

impl SqliteWaitTimeRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mean observed wait of a business, if any samples exist
    pub async fn average_wait_minutes(&self, business_id: &str) -> Result<Option<f64>> {
        sqlx::query_scalar("SELECT AVG(actual_wait_minutes) FROM wait_time_samples WHERE business_id = ?")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl WaitTimeRecorder for SqliteWaitTimeRecorder {
    async fn record(&self, sample: &WaitTimeSample) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wait_time_samples (
                business_id, entry_id, recorded_at, queue_length,
                actual_wait_minutes, day_of_week, hour_of_day
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sample.business_id)
        .bind(&sample.entry_id)
        .bind(sample.recorded_at)
        .bind(sample.queue_length as i64)
        .bind(sample.actual_wait_minutes as i64)
        .bind(sample.day_of_week as i64)
        .bind(sample.hour_of_day as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    fn sample(minutes: u32) -> WaitTimeSample {
        WaitTimeSample {
            business_id: "b1".to_string(),
            entry_id: format!("q-{}", minutes),
            recorded_at: 1_000,
            queue_length: 2,
            actual_wait_minutes: minutes,
            day_of_week: 3,
            hour_of_day: 12,
        }
    }

    #[tokio::test]
    async fn test_record_and_average() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let recorder = SqliteWaitTimeRecorder::new(pool);

        assert_eq!(recorder.average_wait_minutes("b1").await.unwrap(), None);

        recorder.record(&sample(10)).await.unwrap();
        recorder.record(&sample(20)).await.unwrap();

        assert_eq!(recorder.average_wait_minutes("b1").await.unwrap(), Some(15.0));
    }
}
