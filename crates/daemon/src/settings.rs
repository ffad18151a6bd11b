//! Daemon configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `WAITLINE_*`
//! environment variables (`__` separates nested keys, e.g.
//! `WAITLINE_RPC__PORT=9700`). Paths may start with `~`.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::time::Duration;
use waitline_api_rpc::RpcServerConfig;
use waitline_core::application::EngineConfig;
use waitline_infra_prediction::PredictionConfig;

const ENV_PREFIX: &str = "WAITLINE";
const CONFIG_PATH_VAR: &str = "WAITLINE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.waitline/config.toml";
const DEFAULT_DB_PATH: &str = "~/.waitline/waitline.db";

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub db_path: String,
    /// "pretty" or "json"
    pub log_format: String,
    /// Daily-rolled JSON log files are written here when set
    pub log_dir: Option<String>,
    pub rpc: RpcSection,
    pub prediction: PredictionSection,
    pub engine: EngineSection,
    pub updater: UpdaterSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcSection {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionSection {
    pub enabled: bool,
    pub base_url: String,
    pub health_timeout_ms: u64,
    pub predict_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    pub recompute_delay_ms: u64,
    pub heal_debounce_ms: u64,
    pub recompute_threshold_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterSection {
    pub enabled: bool,
    pub interval_minutes: u64,
}

impl DaemonConfig {
    /// Load from the file named by `WAITLINE_CONFIG` (or the default path)
    /// and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(&path, None)
    }

    /// `env` replaces the process environment when given
    pub fn load_from(path: &str, env: Option<Map<String, String>>) -> Result<Self> {
        let path = shellexpand::tilde(path).into_owned();

        let settings = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("log_format", "pretty")?
            .set_default("rpc.host", "127.0.0.1")?
            .set_default("rpc.port", 9627)?
            .set_default("rpc.rate_limit_burst", 200)?
            .set_default("rpc.rate_limit_rate", 100)?
            .set_default("prediction.enabled", true)?
            .set_default("prediction.base_url", "http://127.0.0.1:8000")?
            .set_default("prediction.health_timeout_ms", 5000)?
            .set_default("prediction.predict_timeout_ms", 2000)?
            .set_default("engine.recompute_delay_ms", 1000)?
            .set_default("engine.heal_debounce_ms", 500)?
            .set_default("engine.recompute_threshold_minutes", 2)?
            .set_default("updater.enabled", true)?
            .set_default("updater.interval_minutes", 2)?
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read configuration (file: {})", path))?;

        let mut config: DaemonConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.db_path = shellexpand::tilde(&config.db_path).into_owned();
        config.log_dir = config
            .log_dir
            .map(|dir| shellexpand::tilde(&dir).into_owned());

        if config.updater.enabled && config.updater.interval_minutes == 0 {
            bail!("updater.interval_minutes must be at least 1 when the updater is enabled");
        }
        Ok(config)
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path)
    }

    pub fn rpc_config(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
            rate_limit_burst: self.rpc.rate_limit_burst,
            rate_limit_per_sec: self.rpc.rate_limit_rate,
        }
    }

    pub fn prediction_config(&self) -> PredictionConfig {
        PredictionConfig {
            base_url: self.prediction.base_url.clone(),
            health_timeout: Duration::from_millis(self.prediction.health_timeout_ms),
            predict_timeout: Duration::from_millis(self.prediction.predict_timeout_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            recompute_delay: Duration::from_millis(self.engine.recompute_delay_ms),
            heal_debounce: Duration::from_millis(self.engine.heal_debounce_ms),
            recompute_threshold_minutes: self.engine.recompute_threshold_minutes,
            prediction_health_timeout: Duration::from_millis(self.prediction.health_timeout_ms),
            prediction_timeout: Duration::from_millis(self.prediction.predict_timeout_ms),
        }
    }

    pub fn updater_interval(&self) -> Duration {
        Duration::from_secs(self.updater.interval_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MISSING: &str = "/nonexistent/waitline/config.toml";

    fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_file() {
        let config = DaemonConfig::load_from(MISSING, env(&[])).unwrap();

        assert_eq!(config.rpc.host, "127.0.0.1");
        assert_eq!(config.rpc.port, 9627);
        assert_eq!(config.rpc.rate_limit_burst, 200);
        assert!(config.prediction.enabled);
        assert_eq!(config.prediction.predict_timeout_ms, 2000);
        assert_eq!(config.engine.recompute_threshold_minutes, 2);
        assert_eq!(config.updater_interval(), Duration::from_secs(120));
        assert_eq!(config.log_format, "pretty");
        assert!(config.log_dir.is_none());
        assert!(!config.db_path.starts_with('~'));
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let config = DaemonConfig::load_from(
            MISSING,
            env(&[
                ("WAITLINE_RPC__PORT", "9700"),
                ("WAITLINE_PREDICTION__ENABLED", "false"),
                ("WAITLINE_LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.rpc.port, 9700);
        assert!(!config.prediction.enabled);
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_zero_updater_interval_is_rejected() {
        let err =
            DaemonConfig::load_from(MISSING, env(&[("WAITLINE_UPDATER__INTERVAL_MINUTES", "0")]))
                .unwrap_err();
        assert!(err.to_string().contains("interval_minutes"));

        let config = DaemonConfig::load_from(
            MISSING,
            env(&[
                ("WAITLINE_UPDATER__INTERVAL_MINUTES", "0"),
                ("WAITLINE_UPDATER__ENABLED", "false"),
            ]),
        )
        .unwrap();
        assert!(!config.updater.enabled);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let path = std::env::temp_dir().join(format!("waitline-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "db_path = \"/tmp/w.db\"\n[rpc]\nport = 9800\nhost = \"0.0.0.0\"\n[engine]\nrecompute_delay_ms = 0"
        )
        .unwrap();

        let config = DaemonConfig::load_from(
            path.to_str().unwrap(),
            env(&[("WAITLINE_RPC__PORT", "9900")]),
        )
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.db_path, "/tmp/w.db");
        assert_eq!(config.database_url(), "sqlite:///tmp/w.db");
        assert_eq!(config.rpc.host, "0.0.0.0");
        assert_eq!(config.rpc.port, 9900);
        assert_eq!(config.engine_config().recompute_delay, Duration::ZERO);
    }
}
