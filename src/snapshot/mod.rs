//! Snapshot Store Abstraction
//!
//! Persists the time series of bucket size snapshots. The store is append-only
//! from the ledger's point of view: two snapshots for the same bucket may share
//! a timestamp and both are kept.

pub mod sqlite_store;
pub mod mock_store;
pub mod config;


use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Aggregate state of one bucket at one instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeSnapshot {
    /// Bucket the snapshot describes
    pub bucket_name: String,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Sum of all object sizes in bytes
    pub total_size: u64,
    /// Number of objects in the bucket
    pub object_count: u64,
}

impl SizeSnapshot {
    pub fn new(bucket_name: &str, timestamp: i64, total_size: u64, object_count: u64) -> Self {
        Self {
            bucket_name: bucket_name.to_string(),
            timestamp,
            total_size,
            object_count,
        }
    }
}

/// Trait defining the snapshot storage interface
pub trait SnapshotStore: Send + Sync {
    /// Append a snapshot to the bucket's series
    fn put_snapshot(&self, snapshot: &SizeSnapshot) -> Result<()>;

    /// Snapshots of `bucket` with `from <= timestamp <= to`, ordered by timestamp
    /// and then by arrival
    fn query_snapshots(&self, bucket: &str, from: i64, to: i64) -> Result<Vec<SizeSnapshot>>;
}
