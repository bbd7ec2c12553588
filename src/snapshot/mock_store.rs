//! Mock implementation of SnapshotStore trait for testing

use crate::error::{LedgerError, Result};
use crate::snapshot::{SizeSnapshot, SnapshotStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock implementation of SnapshotStore for testing
#[derive(Clone, Default)]
pub struct MockSnapshotStore {
    // bucket -> snapshots in arrival order
    data: Arc<Mutex<HashMap<String, Vec<SizeSnapshot>>>>,
    failing: Arc<AtomicBool>,
}

impl MockSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn series(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<SizeSnapshot>>>> {
        self.data
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("mock snapshot store"))
    }

    /// Make every subsequent call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All snapshots recorded for a bucket, in arrival order
    pub fn snapshots(&self, bucket: &str) -> Vec<SizeSnapshot> {
        self.series()
            .map(|data| data.get(bucket).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::SnapshotStore("mock snapshot store unavailable".to_string()));
        }
        Ok(())
    }
}

impl SnapshotStore for MockSnapshotStore {
    fn put_snapshot(&self, snapshot: &SizeSnapshot) -> Result<()> {
        self.check_failing()?;
        let mut data = self.series()?;
        data.entry(snapshot.bucket_name.clone())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    fn query_snapshots(&self, bucket: &str, from: i64, to: i64) -> Result<Vec<SizeSnapshot>> {
        self.check_failing()?;
        let data = self.series()?;
        let mut matching: Vec<SizeSnapshot> = data
            .get(bucket)
            .map(|series| {
                series
                    .iter()
                    .filter(|s| s.timestamp >= from && s.timestamp <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps arrival order for equal timestamps
        matching.sort_by_key(|s| s.timestamp);
        Ok(matching)
    }
}
