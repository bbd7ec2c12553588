//! Local filesystem object store implementation
//!
//! Each bucket is a directory under the base path and every object is a file
//! inside it. Keys containing `/` map onto nested directories.

use crate::error::{LedgerError, Result};
use crate::storage::{ListPage, ObjectStore, ObjectSummary};
use crate::storage::config::ObjectStoreConfig;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use log::{debug, info};

/// Local filesystem implementation of ObjectStore
pub struct LocalObjectStore {
    base_path: PathBuf,
    page_size: usize,
}

impl LocalObjectStore {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let base_path = PathBuf::from(&config.base_path);
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        info!("Using local object store at {}", base_path.display());

        Ok(Self {
            base_path,
            page_size: config.page_size.max(1),
        })
    }

    /// Create the directory for a bucket if it does not exist yet
    pub fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') || bucket == ".." || bucket == "." {
            return Err(LedgerError::ObjectStore(format!("invalid bucket name: {:?}", bucket)));
        }
        Ok(self.base_path.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(LedgerError::ObjectStore(format!("invalid object key: {:?}", key)));
        }
        Ok(self.bucket_path(bucket)?.join(relative))
    }

    /// Collect every file below `dir` as (key, size), keys relative to `root`
    fn collect_objects(root: &Path, dir: &Path, out: &mut Vec<ObjectSummary>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                Self::collect_objects(root, &path, out)?;
            } else if metadata.is_file() {
                let key = path
                    .strip_prefix(root)
                    .map_err(|e| LedgerError::ObjectStore(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(ObjectSummary {
                    key,
                    size: metadata.len(),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    fn list_objects(&self, bucket: &str, continuation_token: Option<&str>) -> Result<ListPage> {
        let root = self.bucket_path(bucket)?;
        if !root.is_dir() {
            return Err(LedgerError::ObjectStore(format!("bucket does not exist: {}", bucket)));
        }

        let mut objects = Vec::new();
        Self::collect_objects(&root, &root, &mut objects)?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        let mut page: Vec<ObjectSummary> = objects
            .into_iter()
            .filter(|o| continuation_token.map_or(true, |after| o.key.as_str() > after))
            .take(self.page_size + 1)
            .collect();

        let next_token = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        debug!("Listed {} objects from bucket {} (more: {})", page.len(), bucket, next_token.is_some());
        Ok(ListPage {
            objects: page,
            next_token,
        })
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(&path)?;
        file.write_all(data)?;
        file.flush()?;

        info!("Wrote object {} to bucket {} with size {}", key, bucket, data.len());
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted object {} from bucket {}", key, bucket);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LedgerError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
