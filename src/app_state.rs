//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use std::sync::Arc;
use log::info;

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::config::AppConfig;
use crate::error::Result;
use crate::logsink::{LogSink, mock_store::MockLogSink};
use crate::service::cleaner_service::CleanerService;
use crate::service::history_service::HistoryService;
use crate::service::ledger_service::SizeLedger;
use crate::snapshot::{SnapshotStore, mock_store::MockSnapshotStore};
use crate::storage::{ObjectStore, mock_store::MockObjectStore};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<SizeLedger>,
    pub cleaner: Arc<CleanerService>,
    pub history: Arc<HistoryService>,
    pub objects: Arc<dyn ObjectStore>,
    pub config: AppConfig,
}

/// Handles onto the in-memory backends behind a testing `AppState`
#[derive(Clone)]
pub struct TestBackends {
    pub objects: MockObjectStore,
    pub snapshots: MockSnapshotStore,
    pub sink: MockLogSink,
    pub clock: ManualClock,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        info!("Initializing application state with configuration");

        let objects = config.object_store.create_store()?;
        let snapshots = config.snapshots.create_store()?;
        let sink = config.log_sink.create_sink()?;

        let state = Self::from_backends(objects, snapshots, sink, Arc::new(SystemClock), config);
        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wire services on top of already constructed backends
    pub fn from_backends(
        objects: Arc<dyn ObjectStore>,
        snapshots: Arc<dyn SnapshotStore>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        let ledger = Arc::new(SizeLedger::new(
            Arc::clone(&objects),
            Arc::clone(&snapshots),
            sink,
            Arc::clone(&clock),
            &config.ledger,
        ));
        let cleaner = Arc::new(CleanerService::new(Arc::clone(&objects)));
        let history = Arc::new(HistoryService::new(snapshots, clock));

        Self {
            ledger,
            cleaner,
            history,
            objects,
            config,
        }
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        Self::with_test_backends(AppConfig::default()).0
    }

    /// Mock-backed state plus handles for inspecting and driving the backends
    pub fn with_test_backends(config: AppConfig) -> (Self, TestBackends) {
        let backends = TestBackends {
            objects: MockObjectStore::with_page_size(config.object_store.page_size),
            snapshots: MockSnapshotStore::new(),
            sink: MockLogSink::with_page_size(config.log_sink.page_size),
            clock: ManualClock::new(1_700_000_000_000),
        };

        let state = Self::from_backends(
            Arc::new(backends.objects.clone()),
            Arc::new(backends.snapshots.clone()),
            Arc::new(backends.sink.clone()),
            Arc::new(backends.clock.clone()),
            config,
        );
        (state, backends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logsink::config::LogSinkBackend;
    use crate::snapshot::config::SnapshotBackend;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_with_durable_backends() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.object_store.base_path = dir.path().join("buckets").to_string_lossy().into_owned();
        config.snapshots.db_path = dir.path().join("history.db").to_string_lossy().into_owned();
        config.log_sink.db_path = dir.path().join("log.db").to_string_lossy().into_owned();
        assert_eq!(config.snapshots.backend, SnapshotBackend::SQLite);
        assert_eq!(config.log_sink.backend, LogSinkBackend::SQLite);

        let state = AppState::from_config(config).unwrap();
        state.objects.put_object("bucket", "a.txt", b"hello").unwrap();

        let snapshot = state.ledger.record_snapshot("bucket").unwrap();
        assert_eq!((snapshot.total_size, snapshot.object_count), (5, 1));
        assert!(!state.history.recent("bucket", 3600).unwrap().is_empty());
    }

    #[test]
    fn test_testing_state_shares_backends() {
        let (state, backends) = AppState::with_test_backends(AppConfig::default());
        backends.objects.insert_sized("bucket", "a", 7);

        let snapshot = state.ledger.record_snapshot("bucket").unwrap();
        assert_eq!(snapshot.timestamp, 1_700_000_000);
        assert_eq!(backends.snapshots.snapshots("bucket").len(), 1);
    }
}
