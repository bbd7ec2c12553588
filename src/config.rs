//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;
use std::env;
use std::time::Duration;
use log::{info, warn};

use crate::error::{LedgerError, Result};
use crate::logsink::config::LogSinkConfig;
use crate::snapshot::config::SnapshotConfig;
use crate::storage::config::ObjectStoreConfig;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "BUCKET_LEDGER_CONFIG";

/// How deleted-object size recovery picks among several matching records
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOrder {
    /// The last matching record returned by the sink wins
    #[default]
    SinkOrder,
    /// The matching record with the newest timestamp wins
    LatestTimestamp,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Object store configuration
    pub object_store: ObjectStoreConfig,
    /// Snapshot store configuration
    pub snapshots: SnapshotConfig,
    /// Structured log sink configuration
    pub log_sink: LogSinkConfig,
    /// Size ledger behaviour
    pub ledger: LedgerConfig,
    /// Largest-object cleaner
    pub cleaner: CleanerConfig,
    /// History queries
    pub history: HistoryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum request body size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 4 * 1024 * 1024,
        }
    }
}

/// Size ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How far back deleted-object size recovery searches, in seconds
    pub lookback_secs: u64,
    /// Upper bound for one blocking call into the stores, in seconds
    pub call_timeout_secs: u64,
    /// Skip events whose id was already logged
    pub dedupe_events: bool,
    /// Tie-break among several matching records during recovery
    pub recovery_order: RecoveryOrder,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 24 * 60 * 60,
            call_timeout_secs: 30,
            dedupe_events: false,
            recovery_order: RecoveryOrder::default(),
        }
    }
}

impl LedgerConfig {
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

/// Cleaner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Bucket the alarm-triggered cleaner prunes
    pub bucket_name: Option<String>,
}

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Default window for history queries, in seconds
    pub window_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window_secs: 30 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "log_config.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `BUCKET_LEDGER_CONFIG` or `config.yaml`, falling
    /// back to defaults when no file exists. Backend env overrides apply last.
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&config_path).exists() {
            let config = Self::from_file(&config_path)?;
            info!("Loaded configuration from {}", config_path);
            config
        } else {
            warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.object_store.apply_env();
        config.snapshots.apply_env();
        config.log_sink.apply_env();
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))
    }
}
