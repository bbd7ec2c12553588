//! History service: recent snapshots of a bucket for charting

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Result;
use crate::snapshot::{SizeSnapshot, SnapshotStore};

/// Snapshots inside a time window plus the largest total seen in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketHistory {
    pub bucket_name: String,
    pub points: Vec<SizeSnapshot>,
    pub max_size: u64,
}

impl BucketHistory {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub struct HistoryService {
    snapshots: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl HistoryService {
    pub fn new(snapshots: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { snapshots, clock }
    }

    /// Snapshots of `bucket` stamped within the last `window_secs` seconds
    pub fn recent(&self, bucket: &str, window_secs: u64) -> Result<BucketHistory> {
        let now = self.clock.now_secs();
        let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
        let points = self.snapshots.query_snapshots(bucket, now.saturating_sub(window), now)?;
        let max_size = points.iter().map(|p| p.total_size).max().unwrap_or(0);

        Ok(BucketHistory {
            bucket_name: bucket.to_string(),
            points,
            max_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::snapshot::mock_store::MockSnapshotStore;

    #[test]
    fn test_recent_window_and_max() {
        let store = MockSnapshotStore::new();
        let clock = ManualClock::new(1_000_000);
        for (ts, size) in [(900, 70), (975, 10), (990, 40), (1_000, 25)] {
            store.put_snapshot(&SizeSnapshot::new("bucket", ts, size, 1)).unwrap();
        }
        store.put_snapshot(&SizeSnapshot::new("other", 995, 999, 1)).unwrap();

        let history = HistoryService::new(Arc::new(store), Arc::new(clock)).recent("bucket", 30).unwrap();
        let stamps: Vec<i64> = history.points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![975, 990, 1_000]);
        assert_eq!(history.max_size, 40);
    }

    #[test]
    fn test_no_points() {
        let service = HistoryService::new(Arc::new(MockSnapshotStore::new()), Arc::new(ManualClock::new(0)));
        let history = service.recent("bucket", 30).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.max_size, 0);
    }
}
