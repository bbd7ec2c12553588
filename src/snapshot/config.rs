//! Configuration for snapshot storage backends

use crate::error::Result;
use crate::snapshot::{SnapshotStore, sqlite_store::SqliteSnapshotStore, mock_store::MockSnapshotStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::env;
use log::{info, warn};

/// Available snapshot storage backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum SnapshotBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for SnapshotBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(SnapshotBackend::SQLite),
            "mock" => Ok(SnapshotBackend::Mock),
            _ => Err(format!("Unknown snapshot backend: {}", s)),
        }
    }
}

/// Configuration for snapshot storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Backend type
    pub backend: SnapshotBackend,
    /// Database file path
    pub db_path: String,
    /// Enable WAL mode
    pub wal_mode: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            backend: SnapshotBackend::default(),
            db_path: "./data/size_history.db".to_string(),
            wal_mode: true,
        }
    }
}

impl SnapshotConfig {
    /// Override the backend from the `SNAPSHOT_BACKEND` environment variable
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("SNAPSHOT_BACKEND") {
            match backend_str.parse::<SnapshotBackend>() {
                Ok(backend) => {
                    info!("Using snapshot backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => warn!("Invalid snapshot backend in environment: {}. Keeping {:?}.", e, self.backend),
            }
        }
    }

    /// Create a snapshot store instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn SnapshotStore>> {
        Ok(match self.backend {
            SnapshotBackend::SQLite => {
                info!("Creating SQLite snapshot store");
                Arc::new(SqliteSnapshotStore::new(self)?)
            }
            SnapshotBackend::Mock => {
                info!("Creating mock snapshot store");
                Arc::new(MockSnapshotStore::new())
            }
        })
    }
}
