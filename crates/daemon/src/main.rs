//! Waitline Daemon - Main Entry Point
//!
//! Composition root: SQLite store, prediction client, queue engine,
//! background wait-time updater and the JSON-RPC server.

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use settings::DaemonConfig;
use std::path::Path;
use std::sync::Arc;
use telemetry::TelemetryStatus;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use waitline_api_rpc::RpcServer;
use waitline_core::application::{BusinessService, QueueEngine, WaitTimeUpdater};
use waitline_core::port::{DisabledPrediction, PredictionAdapter, SystemTimeProvider, UuidProvider};
use waitline_infra_prediction::HttpPredictionAdapter;
use waitline_infra_sqlite::{
    create_pool, run_migrations, SqliteBusinessRegistry, SqliteQueueStore, SqliteWaitTimeRecorder,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "waitline=info";

/// Console layer (pretty or JSON) plus an optional rolling file layer
fn init_logging(config: &DaemonConfig) -> Result<(Option<WorkerGuard>, TelemetryStatus)> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let console = match config.log_format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().pretty().boxed(),
    };

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "waitline.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(writer).boxed()),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let (otel, status) = telemetry::layer()?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .with(otel)
        .init();

    Ok((guard, status))
}

fn prediction_adapter(config: &DaemonConfig) -> Result<Arc<dyn PredictionAdapter>> {
    if !config.prediction.enabled {
        info!("Prediction service disabled; using fallback wait times");
        return Ok(Arc::new(DisabledPrediction));
    }
    let adapter = HttpPredictionAdapter::new(config.prediction_config())
        .context("Failed to build prediction client")?;
    info!(base_url = %config.prediction.base_url, "Prediction service configured");
    Ok(Arc::new(adapter))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::load().context("Failed to load configuration")?;
    let (_log_guard, telemetry_status) = init_logging(&config)?;

    info!("Waitline daemon v{} starting...", VERSION);
    match telemetry_status {
        TelemetryStatus::Enabled { endpoint } => {
            info!(endpoint = %endpoint, "OpenTelemetry export enabled")
        }
        TelemetryStatus::FeatureDisabled => {
            warn!("OTLP endpoint set but the 'telemetry' feature is not enabled; ignoring")
        }
        TelemetryStatus::NotConfigured => {}
    }

    // 2. Database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }
    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.database_url())
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let registry = Arc::new(SqliteBusinessRegistry::new(pool.clone()));
    let recorder = Arc::new(SqliteWaitTimeRecorder::new(pool.clone()));

    let engine = QueueEngine::new(
        store.clone(),
        registry.clone(),
        recorder,
        prediction_adapter(&config)?,
        Arc::new(UuidProvider),
        time_provider.clone(),
        config.engine_config(),
    );
    let business = BusinessService::new(registry.clone(), store, time_provider);

    // 4. Background wait-time updater
    let mut updater = if config.updater.enabled {
        let interval = config.updater_interval();
        info!(interval_secs = interval.as_secs(), "Starting wait-time updater...");
        Some(WaitTimeUpdater::new(engine.clone(), registry, interval).start())
    } else {
        info!("Wait-time updater disabled");
        None
    };

    // 5. JSON-RPC server
    let (addr, rpc_handle) = RpcServer::new(config.rpc_config(), engine, business)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shut down");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    if let Some(updater) = updater.as_mut() {
        updater.stop().await;
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}
