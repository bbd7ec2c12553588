//! Configuration for object store backends

use crate::error::Result;
use crate::storage::{ObjectStore, local_store::LocalObjectStore, mock_store::MockObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::env;
use log::{info, warn};

/// Available object store backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum ObjectStoreBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for ObjectStoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(ObjectStoreBackend::Local),
            "mock" | "memory" => Ok(ObjectStoreBackend::Mock),
            _ => Err(format!("Unknown object store backend: {}", s)),
        }
    }
}

/// Configuration for the object store gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Backend type
    pub backend: ObjectStoreBackend,
    /// Root directory holding one directory per bucket
    pub base_path: String,
    /// Maximum objects returned per listing page
    pub page_size: usize,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            backend: ObjectStoreBackend::default(),
            base_path: "./data/buckets".to_string(),
            page_size: 1000,
        }
    }
}

impl ObjectStoreConfig {
    /// Override the backend from the `OBJECT_STORE_BACKEND` environment variable
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("OBJECT_STORE_BACKEND") {
            match backend_str.parse::<ObjectStoreBackend>() {
                Ok(backend) => {
                    info!("Using object store backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => warn!("Invalid object store backend in environment: {}. Keeping {:?}.", e, self.backend),
            }
        }
    }

    /// Create an object store instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn ObjectStore>> {
        Ok(match self.backend {
            ObjectStoreBackend::Local => Arc::new(LocalObjectStore::new(self)?),
            ObjectStoreBackend::Mock => Arc::new(MockObjectStore::with_page_size(self.page_size)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_object_store_backend_from_str() {
        assert_eq!("local".parse::<ObjectStoreBackend>().unwrap(), ObjectStoreBackend::Local);
        assert_eq!("FS".parse::<ObjectStoreBackend>().unwrap(), ObjectStoreBackend::Local);
        assert_eq!("mock".parse::<ObjectStoreBackend>().unwrap(), ObjectStoreBackend::Mock);
        assert_eq!("Memory".parse::<ObjectStoreBackend>().unwrap(), ObjectStoreBackend::Mock);

        assert!("invalid".parse::<ObjectStoreBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_object_store_config_from_env() {
        let mut config = ObjectStoreConfig::default();
        assert_eq!(config.backend, ObjectStoreBackend::Local);

        env::set_var("OBJECT_STORE_BACKEND", "mock");
        config.apply_env();
        assert_eq!(config.backend, ObjectStoreBackend::Mock);

        env::set_var("OBJECT_STORE_BACKEND", "invalid");
        config.apply_env();
        assert_eq!(config.backend, ObjectStoreBackend::Mock);

        env::remove_var("OBJECT_STORE_BACKEND");
    }

    #[test]
    fn test_create_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = ObjectStoreConfig {
            backend: ObjectStoreBackend::Local,
            base_path: dir.path().join("buckets").to_string_lossy().into_owned(),
            page_size: 10,
        };
        let mock = ObjectStoreConfig { backend: ObjectStoreBackend::Mock, ..local.clone() };

        let _local_store = local.create_store().unwrap();
        let mock_store = mock.create_store().unwrap();
        assert!(mock_store.list_objects("any", None).unwrap().objects.is_empty());
    }
}
