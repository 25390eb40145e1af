//! End-to-end behavior of the async caching decorator.

use std::sync::Arc;
use std::time::Duration;

use strata_storage::{AsyncCachedStorage, AsyncStorageTrait, InMemoryStorage};
use strata_test_utils::{
    assertions, fixtures, CacheConfig, FailingStorage, Operation, RecordingStorage, StorageError,
};

type Recorded = RecordingStorage<InMemoryStorage>;

fn recorded(config: CacheConfig) -> AsyncCachedStorage<Recorded> {
    let backend = Arc::new(RecordingStorage::new(InMemoryStorage::new()));
    AsyncCachedStorage::new(backend, config).expect("valid config")
}

#[tokio::test]
async fn read_through_hits_backend_once() {
    let storage = recorded(fixtures::small_config(10));
    storage.backend().inner().write("/notes.txt", "hello").await.unwrap();

    for _ in 0..5 {
        assert_eq!(storage.read("/notes.txt").await.unwrap(), "hello");
    }
    assert_eq!(storage.backend().count_for(Operation::Read, "/notes.txt"), 1);
}

#[tokio::test]
async fn lru_scenario_keeps_recent_entries() {
    let storage = recorded(fixtures::small_config(2));
    storage.write("/a", "1").await.unwrap();
    storage.write("/b", "2").await.unwrap();
    assert_eq!(storage.read("/a").await.unwrap(), "1");
    storage.write("/c", "3").await.unwrap();

    assertions::assert_cache_keys(&storage.stats().content, &["/a", "/c"]);
}

#[tokio::test]
async fn ttl_expiry_refetches() {
    let storage = recorded(fixtures::short_ttl_config(Duration::from_millis(10)));
    storage.write("/k", "v").await.unwrap();

    tokio::time::sleep(Duration::from_millis(15)).await;

    assert_eq!(storage.read("/k").await.unwrap(), "v");
    assert_eq!(storage.backend().count_for(Operation::Read, "/k"), 1);
}

#[tokio::test]
async fn write_invalidates_parent_listing() {
    let storage = recorded(fixtures::small_config(10));
    storage.ensure_directory("/d").await.unwrap();
    assert!(storage.list_directory("/d").await.unwrap().is_empty());

    storage.write("/d/file.txt", "x").await.unwrap();

    assert_eq!(storage.list_directory("/d").await.unwrap(), vec!["file.txt"]);
    assert_eq!(storage.backend().count(Operation::ListDirectory), 2);
}

#[tokio::test]
async fn subtree_invalidation_and_delete_directory() {
    let storage = recorded(fixtures::small_config(10));
    storage.write("/dir/a.txt", "a").await.unwrap();
    storage.write("/dir/b.txt", "b").await.unwrap();

    storage.invalidate_directory("/dir/");
    let content = storage.stats().content;
    assert!(!content.contains("/dir/a.txt"));
    assert!(!content.contains("/dir/b.txt"));

    assert_eq!(storage.read("/dir/a.txt").await.unwrap(), "a");
    storage.delete_directory("/dir").await.unwrap();
    assertions::assert_not_found(&storage.read("/dir/a.txt").await, "/dir/a.txt");
    assert!(!storage.exists("/dir").await.unwrap());
}

#[tokio::test]
async fn delete_of_unknown_path_propagates() {
    let storage = recorded(fixtures::small_config(10));

    let result = storage.delete("/never").await;

    assertions::assert_not_found(&result, "/never");
    assert_eq!(storage.backend().count(Operation::Delete), 1);
    assert_eq!(storage.stats().total_size(), 0);
}

#[tokio::test]
async fn failed_write_leaves_cache_untouched() {
    let backend = Arc::new(FailingStorage::new(fixtures::populated_storage()));
    let storage = AsyncCachedStorage::new(Arc::clone(&backend), fixtures::small_config(10)).unwrap();
    assert_eq!(storage.read("/src/main.rs").await.unwrap(), "fn main() {}");

    let outage = StorageError::Network {
        reason: "connection reset".to_string(),
    };
    backend.fail_on(Operation::Write, outage.clone());

    let result = storage.write("/src/main.rs", "fn main() { panic!() }").await;
    assertions::assert_storage_error(&result, &outage);
    assert_eq!(storage.read("/src/main.rs").await.unwrap(), "fn main() {}");
}

#[tokio::test]
async fn clear_cache_is_idempotent() {
    let storage = recorded(fixtures::small_config(10));
    storage.write("/a", "1").await.unwrap();

    storage.clear_cache();
    storage.clear_cache();

    let stats = storage.stats();
    assert_eq!(stats.total_size(), 0);
    assert!(stats.content.entries.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_share_one_cache() {
    let storage = recorded(fixtures::small_config(16));
    storage.write("/shared.txt", "same").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage.read("/shared.txt").await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "same");
    }

    assert_eq!(storage.backend().count(Operation::Read), 0);
}

#[tokio::test]
async fn unsupported_clear_subtree_keeps_cache() {
    let backend = Arc::new(FailingStorage::new(fixtures::populated_storage()));
    let storage = AsyncCachedStorage::new(Arc::clone(&backend), fixtures::small_config(10)).unwrap();
    assert_eq!(storage.read("/docs/readme.md").await.unwrap(), "# Readme");
    backend.fail_on(
        Operation::ClearSubtree,
        StorageError::Unsupported {
            operation: "clear_subtree".to_string(),
        },
    );

    let result = storage.clear_subtree("/docs").await;

    assertions::assert_unsupported(&result);
    assert!(storage.stats().content.contains("/docs/readme.md"));
}
