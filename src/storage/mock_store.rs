//! Mock implementation of ObjectStore trait for testing

use crate::error::{LedgerError, Result};
use crate::storage::{ListPage, ObjectStore, ObjectSummary};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use log::info;

const DEFAULT_PAGE_SIZE: usize = 1000;

type Buckets = HashMap<String, BTreeMap<String, u64>>;

/// In-memory object store. Only object sizes are kept; contents are discarded.
#[derive(Clone)]
pub struct MockObjectStore {
    // bucket -> key -> size, keys kept sorted so pages are stable
    data: Arc<Mutex<Buckets>>,
    page_size: usize,
    fail_listing: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store that returns at most `page_size` objects per listing page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            page_size: page_size.max(1),
            fail_listing: Arc::new(AtomicBool::new(false)),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn buckets(&self) -> Result<MutexGuard<'_, Buckets>> {
        self.data
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("mock object store"))
    }

    /// Record an object of the given size without materializing its bytes
    pub fn insert_sized(&self, bucket: &str, key: &str, size: u64) {
        if let Ok(mut data) = self.buckets() {
            data.entry(bucket.to_string())
                .or_default()
                .insert(key.to_string(), size);
        }
    }

    /// Make every subsequent listing call fail until reset
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of listing pages requested so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Get the number of objects in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets()
            .map(|data| data.get(bucket).map(|objects| objects.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Check if an object exists in a bucket
    pub fn object_exists(&self, bucket: &str, key: &str) -> bool {
        self.buckets()
            .map(|data| {
                data.get(bucket)
                    .map(|objects| objects.contains_key(key))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MockObjectStore {
    fn list_objects(&self, bucket: &str, continuation_token: Option<&str>) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(LedgerError::ObjectStore(format!(
                "listing of bucket {} failed",
                bucket
            )));
        }

        let data = self.buckets()?;
        let Some(objects) = data.get(bucket) else {
            return Ok(ListPage::default());
        };

        // The token is the last key of the previous page
        let remaining: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| continuation_token.map_or(true, |after| key.as_str() > after))
            .take(self.page_size + 1)
            .map(|(key, size)| ObjectSummary {
                key: key.clone(),
                size: *size,
            })
            .collect();

        let mut page = remaining;
        let next_token = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: page,
            next_token,
        })
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let mut store = self.buckets()?;
        store
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.len() as u64);
        info!("Mock: Stored object {} in bucket {} with size {}", key, bucket, data.len());
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut store = self.buckets()?;
        let removed = store
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key));

        match removed {
            Some(size) => {
                info!("Mock: Deleted object {} from bucket {} ({} bytes)", key, bucket, size);
                Ok(())
            }
            None => Err(LedgerError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
