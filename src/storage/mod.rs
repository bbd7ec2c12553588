//! Object Store Gateway
//!
//! This module provides an abstraction over object storage backends so the
//! ledger can list, upload and delete objects without knowing whether they
//! live in memory or on the local filesystem. Listing is always paginated;
//! callers follow continuation tokens until the backend reports no more pages.

pub mod local_store;
pub mod mock_store;
pub mod config;

#[cfg(test)]
mod comprehensive_test;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One object as reported by a listing page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Storage key of the object
    pub key: String,
    /// Size of the object in bytes
    pub size: u64,
}

/// A single page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Token to pass back for the next page, `None` when the listing is complete
    pub next_token: Option<String>,
}

/// Trait defining the object storage interface
pub trait ObjectStore: Send + Sync {
    /// List one page of objects in a bucket, resuming after `continuation_token`
    fn list_objects(&self, bucket: &str, continuation_token: Option<&str>) -> Result<ListPage>;

    /// Store an object, replacing any previous object under the same key
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()>;

    /// Delete an object
    fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Lazily walks every page of a bucket listing.
///
/// A page is only requested once the previous one has been consumed. After an
/// error is yielded the listing ends.
pub struct ObjectListing<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    buffer: std::vec::IntoIter<ObjectSummary>,
    next_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a> ObjectListing<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str) -> Self {
        Self {
            store,
            bucket,
            buffer: Vec::new().into_iter(),
            next_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Number of pages requested from the backend so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl Iterator for ObjectListing<'_> {
    type Item = Result<ObjectSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.buffer.next() {
                return Some(Ok(object));
            }
            if self.exhausted {
                return None;
            }

            let token = self.next_token.take();
            self.pages_fetched += 1;
            match self.store.list_objects(self.bucket, token.as_deref()) {
                Ok(page) => {
                    self.exhausted = page.next_token.is_none();
                    self.next_token = page.next_token;
                    self.buffer = page.objects.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Drain every page of a bucket listing into memory
pub fn list_all_objects(store: &dyn ObjectStore, bucket: &str) -> Result<Vec<ObjectSummary>> {
    ObjectListing::new(store, bucket).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock_store::MockObjectStore;

    #[test]
    fn test_listing_follows_every_page() {
        let store = MockObjectStore::with_page_size(2);
        for (i, size) in [10u64, 20, 30, 40, 50].iter().enumerate() {
            store.insert_sized("bucket", &format!("obj-{}", i), *size);
        }

        let mut listing = ObjectListing::new(&store, "bucket");
        let keys: Vec<String> = listing
            .by_ref()
            .map(|o| o.map(|o| o.key))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(keys, vec!["obj-0", "obj-1", "obj-2", "obj-3", "obj-4"]);
        assert_eq!(listing.pages_fetched(), 3);
    }

    #[test]
    fn test_listing_stops_after_error() {
        let store = MockObjectStore::new();
        store.insert_sized("bucket", "a", 1);
        store.set_fail_listing(true);

        let mut listing = ObjectListing::new(&store, "bucket");
        assert!(matches!(listing.next(), Some(Err(_))));
        assert!(listing.next().is_none());
        assert!(list_all_objects(&store, "bucket").is_err());
    }

    #[test]
    fn test_empty_bucket_lists_nothing() {
        let store = MockObjectStore::new();
        assert!(list_all_objects(&store, "empty").unwrap().is_empty());
    }
}
