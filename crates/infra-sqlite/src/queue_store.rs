// SQLite QueueStore Implementation

use crate::error::{map_sqlx_error, to_u32};
use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::{DomainError, EntryStatus, QueueEntry, UserInfo};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{QueueStore, QueueStoreTransaction, TransactionalQueueStore};

const SELECT_ENTRY: &str = r#"
    SELECT id, business_id, position, estimated_wait_time, status,
           user_name, user_phone, user_email, party_size,
           joined_at, called_at, served_at, cancelled_at,
           actual_wait_time, ml_predicted, last_updated
    FROM queue_entries
"#;

#[derive(Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn insert(&self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queue_entries (
                id, business_id, position, estimated_wait_time, status,
                user_name, user_phone, user_email, party_size,
                joined_at, called_at, served_at, cancelled_at,
                actual_wait_time, ml_predicted, last_updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.business_id)
        .bind(entry.position as i64)
        .bind(entry.estimated_wait_time as i64)
        .bind(entry.status.as_str())
        .bind(&entry.user_info.name)
        .bind(&entry.user_info.phone)
        .bind(&entry.user_info.email)
        .bind(entry.user_info.party_size.map(i64::from))
        .bind(entry.joined_at)
        .bind(entry.called_at)
        .bind(entry.served_at)
        .bind(entry.cancelled_at)
        .bind(entry.actual_wait_time.map(i64::from))
        .bind(entry.ml_predicted)
        .bind(entry.last_updated)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, QueueEntryRow>(&format!("{} WHERE id = ?", SELECT_ENTRY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(QueueEntryRow::into_entry).transpose()
    }

    async fn update_status(&self, entry: &QueueEntry, expected: EntryStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = ?, called_at = ?, served_at = ?, cancelled_at = ?,
                actual_wait_time = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(entry.status.as_str())
        .bind(entry.called_at)
        .bind(entry.served_at)
        .bind(entry.cancelled_at)
        .bind(entry.actual_wait_time.map(i64::from))
        .bind(&entry.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // Lost the race, or the entry is gone
            return match self.find_by_id(&entry.id).await? {
                Some(current) => Err(DomainError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: entry.status.to_string(),
                }
                .into()),
                None => Err(AppError::NotFound(format!("queue entry {}", entry.id))),
            };
        }
        Ok(())
    }

    async fn update_wait_time(
        &self,
        id: &str,
        minutes: u32,
        ml_predicted: bool,
        updated_at: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE queue_entries
            SET estimated_wait_time = ?, ml_predicted = ?, last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(minutes as i64)
        .bind(ml_predicted)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("queue entry {}", id)));
        }
        Ok(())
    }

    async fn find_waiting(&self, business_id: &str) -> Result<Vec<QueueEntry>> {
        let rows: Vec<QueueEntryRow> = sqlx::query_as(&format!(
            "{} WHERE business_id = ? AND status = 'waiting' ORDER BY position ASC, joined_at ASC",
            SELECT_ENTRY
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(QueueEntryRow::into_entry).collect()
    }

    async fn find_by_status(
        &self,
        business_id: &str,
        status: EntryStatus,
    ) -> Result<Vec<QueueEntry>> {
        let rows: Vec<QueueEntryRow> = sqlx::query_as(&format!(
            "{} WHERE business_id = ? AND status = ?",
            SELECT_ENTRY
        ))
        .bind(business_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(QueueEntryRow::into_entry).collect()
    }

    async fn count_waiting(&self, business_id: &str) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entries WHERE business_id = ? AND status = 'waiting'",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(to_u32(count))
    }

    async fn max_waiting_position(&self, business_id: &str) -> Result<u32> {
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(position) FROM queue_entries WHERE business_id = ? AND status = 'waiting'",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(max.map(to_u32).unwrap_or(0))
    }
}

#[async_trait]
impl TransactionalQueueStore for SqliteQueueStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(tx)))
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct QueueEntryRow {
    id: String,
    business_id: String,
    position: i64,
    estimated_wait_time: i64,
    status: String,
    user_name: String,
    user_phone: Option<String>,
    user_email: Option<String>,
    party_size: Option<i64>,
    joined_at: i64,
    called_at: Option<i64>,
    served_at: Option<i64>,
    cancelled_at: Option<i64>,
    actual_wait_time: Option<i64>,
    ml_predicted: bool,
    last_updated: i64,
}

impl QueueEntryRow {
    fn into_entry(self) -> Result<QueueEntry> {
        let status: EntryStatus = self
            .status
            .parse()
            .map_err(|_| AppError::Database(format!("corrupt status '{}' on {}", self.status, self.id)))?;

        Ok(QueueEntry {
            id: self.id,
            business_id: self.business_id,
            position: to_u32(self.position),
            estimated_wait_time: to_u32(self.estimated_wait_time),
            status,
            user_info: UserInfo {
                name: self.user_name,
                phone: self.user_phone,
                email: self.user_email,
                party_size: self.party_size.map(to_u32),
            },
            joined_at: self.joined_at,
            called_at: self.called_at,
            served_at: self.served_at,
            cancelled_at: self.cancelled_at,
            actual_wait_time: self.actual_wait_time.map(to_u32),
            ml_predicted: self.ml_predicted,
            last_updated: self.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, SqliteBusinessRegistry};
    use waitline_core::domain::{BusinessDefaults, WaitEstimate};
    use waitline_core::port::BusinessRegistry;

    async fn setup_test_db() -> SqliteQueueStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        for id in ["b1", "b2"] {
            SqliteBusinessRegistry::new(pool.clone())
                .ensure_business(id, &BusinessDefaults::for_business(id), 0)
                .await
                .unwrap();
        }
        SqliteQueueStore::new(pool)
    }

    fn entry(id: &str, business_id: &str, position: u32, joined_at: i64) -> QueueEntry {
        QueueEntry::new(
            id,
            business_id,
            UserInfo::new(id),
            position,
            WaitEstimate::fallback(position * 10),
            joined_at,
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = setup_test_db().await;
        let mut original = entry("q-1", "b1", 1, 100);
        original.user_info.phone = Some("555-0100".to_string());
        original.user_info.party_size = Some(3);
        store.insert(&original).await.unwrap();

        let found = store.find_by_id("q-1").await.unwrap().unwrap();
        assert_eq!(found, original);
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let store = setup_test_db().await;
        store.insert(&entry("q-1", "b1", 1, 100)).await.unwrap();
        let err = store.insert(&entry("q-1", "b1", 2, 200)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_waiting_orders_by_position_then_join_time() {
        let store = setup_test_db().await;
        store.insert(&entry("late", "b1", 1, 200)).await.unwrap();
        store.insert(&entry("early", "b1", 1, 100)).await.unwrap();
        store.insert(&entry("first", "b1", 0, 300)).await.unwrap();
        store.insert(&entry("other", "b2", 1, 50)).await.unwrap();

        let ids: Vec<String> = store
            .find_waiting("b1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["first", "early", "late"]);
    }

    #[tokio::test]
    async fn test_update_and_status_queries() {
        let store = setup_test_db().await;
        let mut a = entry("a", "b1", 1, 100);
        store.insert(&a).await.unwrap();
        store.insert(&entry("b", "b1", 4, 200)).await.unwrap();

        assert_eq!(store.count_waiting("b1").await.unwrap(), 2);
        assert_eq!(store.max_waiting_position("b1").await.unwrap(), 4);

        a.call(500).unwrap();
        store.update_status(&a, EntryStatus::Waiting).await.unwrap();

        assert_eq!(store.count_waiting("b1").await.unwrap(), 1);
        let called = store.find_by_status("b1", EntryStatus::Called).await.unwrap();
        assert_eq!(called.len(), 1);
        assert_eq!(called[0].called_at, Some(500));

        assert_eq!(store.max_waiting_position("b2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_requires_expected_status() {
        let store = setup_test_db().await;
        let mut a = entry("a", "b1", 1, 100);
        store.insert(&a).await.unwrap();

        a.call(500).unwrap();
        store.update_status(&a, EntryStatus::Waiting).await.unwrap();

        // Same transition again from a stale copy: the row is already called
        let err = store
            .update_status(&a, EntryStatus::Waiting)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidStateTransition { .. })
        ));

        let mut ghost = entry("ghost", "b1", 1, 100);
        ghost.cancel(600).unwrap();
        let err = store
            .update_status(&ghost, EntryStatus::Waiting)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status_leaves_position_and_estimate() {
        let store = setup_test_db().await;
        let mut a = entry("a", "b1", 3, 100);
        store.insert(&a).await.unwrap();
        store.update_wait_time("a", 42, true, 200).await.unwrap();

        a.cancel(300).unwrap();
        a.position = 99;
        store.update_status(&a, EntryStatus::Waiting).await.unwrap();

        let found = store.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(found.status, EntryStatus::Cancelled);
        assert_eq!(found.cancelled_at, Some(300));
        assert_eq!(found.position, 3);
        assert_eq!(found.estimated_wait_time, 42);
    }

    #[tokio::test]
    async fn test_update_wait_time() {
        let store = setup_test_db().await;
        store.insert(&entry("a", "b1", 1, 100)).await.unwrap();

        store.update_wait_time("a", 33, true, 900).await.unwrap();
        let found = store.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(found.estimated_wait_time, 33);
        assert!(found.ml_predicted);
        assert_eq!(found.last_updated, 900);

        let err = store.update_wait_time("nope", 1, false, 0).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = setup_test_db().await;
        store.insert(&entry("a", "b1", 3, 100)).await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.update_position("a", 1, 1_000).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.find_by_id("a").await.unwrap().unwrap().position, 3);

        let mut tx = store.begin_transaction().await.unwrap();
        assert!(tx.update_position("a", 1, 1_000).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.find_by_id("a").await.unwrap().unwrap().position, 1);
    }

    #[tokio::test]
    async fn test_update_position_skips_entries_no_longer_waiting() {
        let store = setup_test_db().await;
        let mut a = entry("a", "b1", 3, 100);
        store.insert(&a).await.unwrap();
        store.insert(&entry("b", "b1", 5, 200)).await.unwrap();
        a.call(300).unwrap();
        store.update_status(&a, EntryStatus::Waiting).await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        assert!(!tx.update_position("a", 1, 1_000).await.unwrap());
        assert!(tx.update_position("b", 1, 1_000).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.find_by_id("a").await.unwrap().unwrap().position, 3);
        assert_eq!(store.find_by_id("b").await.unwrap().unwrap().position, 1);
    }
}
