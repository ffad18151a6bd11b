// SQLite BusinessRegistry Implementation

use crate::error::{map_sqlx_error, to_u32};
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::{
    Business, BusinessDefaults, BusinessSettings, CongestionLevel, DomainError,
};
use waitline_core::error::{AppError, Result};
use waitline_core::port::BusinessRegistry;

const SELECT_BUSINESS: &str = r#"
    SELECT id, name, category, description, average_service_time, current_queue_length,
           is_open, congestion_level, congestion_updated_at,
           max_queue_size, estimated_service_time,
           allow_phone_notifications, allow_email_notifications,
           created_at, updated_at
    FROM businesses
"#;

#[derive(Clone)]
pub struct SqliteBusinessRegistry {
    pool: SqlitePool,
}

impl SqliteBusinessRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn not_found_if_untouched(rows_affected: u64, id: &str) -> Result<()> {
        if rows_affected == 0 {
            return Err(DomainError::BusinessNotFound(id.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl BusinessRegistry for SqliteBusinessRegistry {
    async fn get_business(&self, id: &str) -> Result<Option<Business>> {
        let row = sqlx::query_as::<_, BusinessRow>(&format!("{} WHERE id = ?", SELECT_BUSINESS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(BusinessRow::into_business).transpose()
    }

    async fn ensure_business(
        &self,
        id: &str,
        defaults: &BusinessDefaults,
        now_millis: i64,
    ) -> Result<Business> {
        // Concurrent first joins both land here; the loser's insert is ignored
        let created = Business::from_defaults(id, defaults, now_millis);
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO businesses (
                id, name, category, description, average_service_time, current_queue_length,
                is_open, congestion_level, congestion_updated_at,
                max_queue_size, estimated_service_time,
                allow_phone_notifications, allow_email_notifications,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(&created.category)
        .bind(&created.description)
        .bind(created.average_service_time as i64)
        .bind(created.current_queue_length as i64)
        .bind(created.is_open)
        .bind(created.congestion_level.as_str())
        .bind(created.congestion_updated_at)
        .bind(created.settings.max_queue_size as i64)
        .bind(created.settings.estimated_service_time as i64)
        .bind(created.settings.allow_phone_notifications)
        .bind(created.settings.allow_email_notifications)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.get_business(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("business {} vanished after insert", id)))
    }

    async fn set_congestion(&self, id: &str, level: CongestionLevel, at: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET congestion_level = ?, congestion_updated_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(level.as_str())
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Self::not_found_if_untouched(result.rows_affected(), id)
    }

    async fn set_open(&self, id: &str, is_open: bool, at: i64) -> Result<()> {
        let result = sqlx::query("UPDATE businesses SET is_open = ?, updated_at = ? WHERE id = ?")
            .bind(is_open)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Self::not_found_if_untouched(result.rows_affected(), id)
    }

    async fn record_queue_length(&self, id: &str, length: u32, at: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE businesses SET current_queue_length = ?, updated_at = ? WHERE id = ?",
        )
        .bind(length as i64)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Self::not_found_if_untouched(result.rows_affected(), id)
    }

    async fn list_businesses(&self) -> Result<Vec<Business>> {
        let rows: Vec<BusinessRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_BUSINESS))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(BusinessRow::into_business).collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: String,
    name: String,
    category: String,
    description: String,
    average_service_time: i64,
    current_queue_length: i64,
    is_open: bool,
    congestion_level: String,
    congestion_updated_at: Option<i64>,
    max_queue_size: i64,
    estimated_service_time: i64,
    allow_phone_notifications: bool,
    allow_email_notifications: bool,
    created_at: i64,
    updated_at: i64,
}

impl BusinessRow {
    fn into_business(self) -> Result<Business> {
        let congestion_level: CongestionLevel = self.congestion_level.parse()?;

        Ok(Business {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            average_service_time: to_u32(self.average_service_time),
            current_queue_length: to_u32(self.current_queue_length),
            is_open: self.is_open,
            congestion_level,
            congestion_updated_at: self.congestion_updated_at,
            settings: BusinessSettings {
                max_queue_size: to_u32(self.max_queue_size),
                estimated_service_time: to_u32(self.estimated_service_time),
                allow_phone_notifications: self.allow_phone_notifications,
                allow_email_notifications: self.allow_email_notifications,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use waitline_core::error::ErrorKind;

    async fn setup_test_db() -> SqliteBusinessRegistry {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteBusinessRegistry::new(pool)
    }

    #[tokio::test]
    async fn test_ensure_business_is_idempotent() {
        let registry = setup_test_db().await;
        let defaults = BusinessDefaults::for_business("demo-business");

        let first = registry.ensure_business("demo-business", &defaults, 100).await.unwrap();
        assert_eq!(first.name, "Demo Restaurant");
        assert_eq!(first.settings.max_queue_size, 50);

        registry.set_congestion("demo-business", CongestionLevel::High, 200).await.unwrap();
        let second = registry.ensure_business("demo-business", &defaults, 300).await.unwrap();
        assert_eq!(second.created_at, 100);
        assert_eq!(second.congestion_level, CongestionLevel::High);
    }

    #[tokio::test]
    async fn test_updates_on_missing_business_are_not_found() {
        let registry = setup_test_db().await;
        let err = registry
            .set_congestion("ghost", CongestionLevel::Low, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(registry.set_open("ghost", true, 1).await.is_err());
        assert!(registry.record_queue_length("ghost", 3, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_open_flag_and_queue_length() {
        let registry = setup_test_db().await;
        registry
            .ensure_business("b1", &BusinessDefaults::for_business("b1"), 0)
            .await
            .unwrap();

        registry.set_open("b1", false, 10).await.unwrap();
        registry.record_queue_length("b1", 7, 20).await.unwrap();

        let business = registry.get_business("b1").await.unwrap().unwrap();
        assert!(!business.is_open);
        assert_eq!(business.current_queue_length, 7);
        assert_eq!(business.updated_at, 20);
        assert_eq!(business.congestion_updated_at, None);
    }

    #[tokio::test]
    async fn test_list_businesses() {
        let registry = setup_test_db().await;
        for id in ["b2", "b1"] {
            registry
                .ensure_business(id, &BusinessDefaults::for_business(id), 0)
                .await
                .unwrap();
        }
        let ids: Vec<String> = registry
            .list_businesses()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }
}
