//! Configuration for log sink backends

use crate::error::Result;
use crate::logsink::{LogSink, sqlite_store::SqliteLogSink, mock_store::MockLogSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::env;
use log::{info, warn};

/// Available log sink backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum LogSinkBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for LogSinkBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(LogSinkBackend::SQLite),
            "mock" => Ok(LogSinkBackend::Mock),
            _ => Err(format!("Unknown log sink backend: {}", s)),
        }
    }
}

/// Configuration for the structured log sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Backend type
    pub backend: LogSinkBackend,
    /// Database file path
    pub db_path: String,
    /// Maximum events returned per query page
    pub page_size: usize,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            backend: LogSinkBackend::default(),
            db_path: "./data/size_log.db".to_string(),
            page_size: 100,
        }
    }
}

impl LogSinkConfig {
    /// Override the backend from the `LOG_SINK_BACKEND` environment variable
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("LOG_SINK_BACKEND") {
            match backend_str.parse::<LogSinkBackend>() {
                Ok(backend) => {
                    info!("Using log sink backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => warn!("Invalid log sink backend in environment: {}. Keeping {:?}.", e, self.backend),
            }
        }
    }

    /// Create a log sink instance based on the configuration
    pub fn create_sink(&self) -> Result<Arc<dyn LogSink>> {
        Ok(match self.backend {
            LogSinkBackend::SQLite => {
                info!("Creating SQLite log sink");
                Arc::new(SqliteLogSink::new(self)?)
            }
            LogSinkBackend::Mock => {
                info!("Creating mock log sink");
                Arc::new(MockLogSink::with_page_size(self.page_size))
            }
        })
    }
}
