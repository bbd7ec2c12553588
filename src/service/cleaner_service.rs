//! Cleaner service: deletes the largest object of a bucket when an alarm fires

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::storage::{ObjectListing, ObjectStore, ObjectSummary};

pub struct CleanerService {
    objects: Arc<dyn ObjectStore>,
}

impl CleanerService {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Largest object in the bucket. Ties keep the first object listed and
    /// zero-byte objects are never picked.
    pub fn find_largest(&self, bucket: &str) -> Result<Option<ObjectSummary>> {
        let mut largest: Option<ObjectSummary> = None;
        for object in ObjectListing::new(self.objects.as_ref(), bucket) {
            let object = object?;
            let current = largest.as_ref().map_or(0, |o| o.size);
            if object.size > current {
                largest = Some(object);
            }
        }
        Ok(largest)
    }

    /// Delete the largest object, returning what was deleted
    pub fn delete_largest(&self, bucket: &str) -> Result<Option<ObjectSummary>> {
        let Some(largest) = self.find_largest(bucket)? else {
            info!("No objects to delete in bucket {}", bucket);
            return Ok(None);
        };

        self.objects.delete_object(bucket, &largest.key)?;
        info!("Deleted {} ({} bytes) from bucket {}", largest.key, largest.size, bucket);
        Ok(Some(largest))
    }
}
