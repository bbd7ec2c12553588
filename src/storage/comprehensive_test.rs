//! Comprehensive tests for the object store abstraction

#[cfg(test)]
mod integration_tests {
    use crate::storage::config::{ObjectStoreBackend, ObjectStoreConfig};
    use crate::storage::{list_all_objects, ObjectStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_for(backend: ObjectStoreBackend, dir: &TempDir, page_size: usize) -> ObjectStoreConfig {
        ObjectStoreConfig {
            backend,
            base_path: dir.path().to_string_lossy().into_owned(),
            page_size,
        }
    }

    #[test]
    fn test_total_size_invariant_under_page_size() {
        for backend in [ObjectStoreBackend::Mock, ObjectStoreBackend::Local] {
            let mut totals = Vec::new();

            for page_size in [1, 2, 3, 7, 1000] {
                let dir = TempDir::new().unwrap();
                let store = config_for(backend.clone(), &dir, page_size).create_store().unwrap();
                for i in 0..10u64 {
                    let data = vec![b'x'; (i * 13 + 1) as usize];
                    store.put_object("bucket", &format!("object-{:02}", i), &data).unwrap();
                }

                let objects = list_all_objects(store.as_ref(), "bucket").unwrap();
                assert_eq!(objects.len(), 10, "backend {:?} page size {}", backend, page_size);
                totals.push(objects.iter().map(|o| o.size).sum::<u64>());
            }

            let expected: u64 = (0..10u64).map(|i| i * 13 + 1).sum();
            assert!(totals.iter().all(|t| *t == expected), "{:?}: {:?}", backend, totals);
        }
    }

    #[test]
    fn test_put_list_delete_end_to_end() {
        for backend in [ObjectStoreBackend::Mock, ObjectStoreBackend::Local] {
            let dir = TempDir::new().unwrap();
            let store = config_for(backend.clone(), &dir, 2).create_store().unwrap();

            store.put_object("bucket", "assignment1.txt", b"Empty Assignment 1").unwrap();
            store.put_object("bucket", "assignment1.txt", b"Empty Assignment 2222222222").unwrap();
            store.put_object("bucket", "assignment2.txt", b"33").unwrap();

            let objects = list_all_objects(store.as_ref(), "bucket").unwrap();
            assert_eq!(objects.iter().map(|o| o.size).sum::<u64>(), 29);

            store.delete_object("bucket", "assignment1.txt").unwrap();
            let objects = list_all_objects(store.as_ref(), "bucket").unwrap();
            assert_eq!(objects.len(), 1);
            assert_eq!(objects[0].key, "assignment2.txt");

            assert!(store.delete_object("bucket", "assignment1.txt").is_err());
        }
    }

    #[test]
    fn test_concurrent_operations() {
        use std::thread;

        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ObjectStore> = config_for(ObjectStoreBackend::Mock, &dir, 4)
            .create_store()
            .unwrap();

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let key = format!("concurrent_object_{}", i);
                    store.put_object("shared", &key, &vec![0u8; 100]).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let objects = list_all_objects(store.as_ref(), "shared").unwrap();
        assert_eq!(objects.len(), 5);
        assert_eq!(objects.iter().map(|o| o.size).sum::<u64>(), 500);
    }
}
