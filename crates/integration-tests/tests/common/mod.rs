//! Shared wiring for end-to-end tests: a real SQLite file per test

#![allow(dead_code)]

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use waitline_core::application::{BusinessService, EngineConfig, QueueEngine};
use waitline_core::port::{DisabledPrediction, PredictionAdapter, SystemTimeProvider, UuidProvider};
use waitline_infra_sqlite::{
    create_pool, run_migrations, SqliteBusinessRegistry, SqliteQueueStore, SqliteWaitTimeRecorder,
};

pub struct TestApp {
    pub engine: QueueEngine,
    pub business: BusinessService,
    pub store: Arc<SqliteQueueStore>,
    pub registry: Arc<SqliteBusinessRegistry>,
    pub recorder: Arc<SqliteWaitTimeRecorder>,
    pub pool: SqlitePool,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        recompute_delay: Duration::ZERO,
        heal_debounce: Duration::from_millis(50),
        prediction_health_timeout: Duration::from_millis(500),
        prediction_timeout: Duration::from_millis(500),
        ..EngineConfig::default()
    }
}

/// Prediction service down: every estimate uses the fallback formula
pub async fn app() -> TestApp {
    app_with(Arc::new(DisabledPrediction)).await
}

pub async fn app_with(prediction: Arc<dyn PredictionAdapter>) -> TestApp {
    let db_path = std::env::temp_dir().join(format!("waitline-test-{}.db", uuid::Uuid::new_v4()));
    let pool = create_pool(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let registry = Arc::new(SqliteBusinessRegistry::new(pool.clone()));
    let recorder = Arc::new(SqliteWaitTimeRecorder::new(pool.clone()));

    let engine = QueueEngine::new(
        store.clone(),
        registry.clone(),
        recorder.clone(),
        prediction,
        Arc::new(UuidProvider),
        time_provider.clone(),
        test_config(),
    );
    let business = BusinessService::new(registry.clone(), store.clone(), time_provider);

    TestApp {
        engine,
        business,
        store,
        registry,
        recorder,
        pool,
        db_path,
    }
}

/// Give fire-and-forget tasks (queue length refresh, recompute) time to land
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
