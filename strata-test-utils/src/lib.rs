//! Strata Test Utilities
//!
//! Centralized test infrastructure for the Strata workspace:
//! - Backend wrappers that record or inject failures
//! - Proptest generators for paths, content and configuration
//! - Test fixtures for common scenarios
//! - Custom assertions for Strata-specific validation

// Re-export the reference backend and traits from their source crate
pub use strata_storage::{AsyncStorageTrait, InMemoryStorage, StorageTrait, TtlCacheStats};

// Re-export core types for convenience
pub use strata_core::{
    CacheConfig, ConfigError, FileStat, StorageError, StrataError, StrataResult,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// OPERATIONS
// ============================================================================

/// A storage operation, as seen by a wrapping backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Read,
    Write,
    Delete,
    ListDirectory,
    EnsureDirectory,
    DeleteDirectory,
    SetPermissions,
    Stat,
    ClearSubtree,
}

impl Operation {
    /// Name of the trait method this operation corresponds to.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Exists => "exists",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::ListDirectory => "list_directory",
            Operation::EnsureDirectory => "ensure_directory",
            Operation::DeleteDirectory => "delete_directory",
            Operation::SetPermissions => "set_permissions",
            Operation::Stat => "stat",
            Operation::ClearSubtree => "clear_subtree",
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// RECORDING STORAGE
// ============================================================================

/// Backend wrapper that records every call before forwarding it.
///
/// Used to prove which operations a caching layer actually lets through to
/// the backend.
#[derive(Debug, Default)]
pub struct RecordingStorage<B> {
    inner: B,
    calls: Mutex<Vec<(Operation, String)>>,
}

impl<B> RecordingStorage<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped backend. Calls made on it directly are not recorded.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Every recorded call, oldest first.
    pub fn calls(&self) -> Vec<(Operation, String)> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls of `op`.
    pub fn count(&self, op: Operation) -> usize {
        lock(&self.calls).iter().filter(|(o, _)| *o == op).count()
    }

    /// Number of recorded calls of `op` on exactly `path`.
    pub fn count_for(&self, op: Operation, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(o, p)| *o == op && p == path)
            .count()
    }

    /// Forget all recorded calls.
    pub fn reset(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, op: Operation, path: &str) {
        lock(&self.calls).push((op, path.to_string()));
    }
}

impl<B: StorageTrait> StorageTrait for RecordingStorage<B> {
    fn exists(&self, path: &str) -> StrataResult<bool> {
        self.record(Operation::Exists, path);
        self.inner.exists(path)
    }

    fn read(&self, path: &str) -> StrataResult<String> {
        self.record(Operation::Read, path);
        self.inner.read(path)
    }

    fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        self.record(Operation::Write, path);
        self.inner.write(path, data)
    }

    fn delete(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::Delete, path);
        self.inner.delete(path)
    }

    fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        self.record(Operation::ListDirectory, path);
        self.inner.list_directory(path)
    }

    fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::EnsureDirectory, path);
        self.inner.ensure_directory(path)
    }

    fn delete_directory(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::DeleteDirectory, path);
        self.inner.delete_directory(path)
    }

    fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.record(Operation::SetPermissions, path);
        self.inner.set_permissions(path, mode)
    }

    fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.record(Operation::Stat, path);
        self.inner.stat(path)
    }

    fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::ClearSubtree, path);
        self.inner.clear_subtree(path)
    }
}

#[async_trait]
impl<B: AsyncStorageTrait> AsyncStorageTrait for RecordingStorage<B> {
    async fn exists(&self, path: &str) -> StrataResult<bool> {
        self.record(Operation::Exists, path);
        self.inner.exists(path).await
    }

    async fn read(&self, path: &str) -> StrataResult<String> {
        self.record(Operation::Read, path);
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        self.record(Operation::Write, path);
        self.inner.write(path, data).await
    }

    async fn delete(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::Delete, path);
        self.inner.delete(path).await
    }

    async fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        self.record(Operation::ListDirectory, path);
        self.inner.list_directory(path).await
    }

    async fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::EnsureDirectory, path);
        self.inner.ensure_directory(path).await
    }

    async fn delete_directory(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::DeleteDirectory, path);
        self.inner.delete_directory(path).await
    }

    async fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.record(Operation::SetPermissions, path);
        self.inner.set_permissions(path, mode).await
    }

    async fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.record(Operation::Stat, path);
        self.inner.stat(path).await
    }

    async fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        self.record(Operation::ClearSubtree, path);
        self.inner.clear_subtree(path).await
    }
}

// ============================================================================
// FAILING STORAGE
// ============================================================================

/// Backend wrapper that fails chosen operations with a chosen error.
///
/// Operations without a registered failure are forwarded. A failing call
/// never reaches the wrapped backend.
#[derive(Debug, Default)]
pub struct FailingStorage<B> {
    inner: B,
    failures: Mutex<HashMap<Operation, StorageError>>,
}

impl<B> FailingStorage<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Builder form of [`fail_on`](Self::fail_on).
    pub fn with_failure(self, op: Operation, error: StorageError) -> Self {
        self.fail_on(op, error);
        self
    }

    /// Make every subsequent `op` call fail with `error`.
    pub fn fail_on(&self, op: Operation, error: StorageError) {
        lock(&self.failures).insert(op, error);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        lock(&self.failures).remove(&op);
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn check(&self, op: Operation) -> StrataResult<()> {
        match lock(&self.failures).get(&op) {
            Some(error) => Err(StrataError::Storage(error.clone())),
            None => Ok(()),
        }
    }
}

impl<B: StorageTrait> StorageTrait for FailingStorage<B> {
    fn exists(&self, path: &str) -> StrataResult<bool> {
        self.check(Operation::Exists)?;
        self.inner.exists(path)
    }

    fn read(&self, path: &str) -> StrataResult<String> {
        self.check(Operation::Read)?;
        self.inner.read(path)
    }

    fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        self.check(Operation::Write)?;
        self.inner.write(path, data)
    }

    fn delete(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::Delete)?;
        self.inner.delete(path)
    }

    fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        self.check(Operation::ListDirectory)?;
        self.inner.list_directory(path)
    }

    fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::EnsureDirectory)?;
        self.inner.ensure_directory(path)
    }

    fn delete_directory(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::DeleteDirectory)?;
        self.inner.delete_directory(path)
    }

    fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.check(Operation::SetPermissions)?;
        self.inner.set_permissions(path, mode)
    }

    fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.check(Operation::Stat)?;
        self.inner.stat(path)
    }

    fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::ClearSubtree)?;
        self.inner.clear_subtree(path)
    }
}

#[async_trait]
impl<B: AsyncStorageTrait> AsyncStorageTrait for FailingStorage<B> {
    async fn exists(&self, path: &str) -> StrataResult<bool> {
        self.check(Operation::Exists)?;
        self.inner.exists(path).await
    }

    async fn read(&self, path: &str) -> StrataResult<String> {
        self.check(Operation::Read)?;
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        self.check(Operation::Write)?;
        self.inner.write(path, data).await
    }

    async fn delete(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::Delete)?;
        self.inner.delete(path).await
    }

    async fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        self.check(Operation::ListDirectory)?;
        self.inner.list_directory(path).await
    }

    async fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::EnsureDirectory)?;
        self.inner.ensure_directory(path).await
    }

    async fn delete_directory(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::DeleteDirectory)?;
        self.inner.delete_directory(path).await
    }

    async fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.check(Operation::SetPermissions)?;
        self.inner.set_permissions(path, mode).await
    }

    async fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.check(Operation::Stat)?;
        self.inner.stat(path).await
    }

    async fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        self.check(Operation::ClearSubtree)?;
        self.inner.clear_subtree(path).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for paths, content and configuration.

    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    /// A single path component, never empty and never containing `/`.
    pub fn arb_segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,7}"
    }

    /// An absolute file path one to four components deep.
    pub fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_segment(), 1..=4).prop_map(|parts| format!("/{}", parts.join("/")))
    }

    /// An absolute directory path, optionally with a trailing separator.
    pub fn arb_dir_path() -> impl Strategy<Value = String> {
        (arb_path(), any::<bool>()).prop_map(|(path, trailing)| {
            if trailing {
                format!("{}/", path)
            } else {
                path
            }
        })
    }

    /// Printable file content, possibly empty.
    pub fn arb_content() -> impl Strategy<Value = String> {
        "[ -~]{0,64}"
    }

    /// A configuration that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = CacheConfig> {
        (1usize..512, 1u64..600_000, any::<bool>(), any::<bool>()).prop_map(
            |(max_size, ttl_ms, cache_exists, cache_dir_listing)| CacheConfig {
                max_size,
                ttl: Duration::from_millis(ttl_ms),
                cache_exists,
                cache_dir_listing,
            },
        )
    }

    /// Any storage error a backend might report.
    pub fn arb_storage_error() -> impl Strategy<Value = StorageError> {
        prop_oneof![
            arb_path().prop_map(|path| StorageError::NotFound { path }),
            arb_path().prop_map(|path| StorageError::AlreadyExists { path }),
            arb_path().prop_map(|path| StorageError::PermissionDenied { path }),
            (arb_path(), "[a-z ]{1,20}").prop_map(|(path, reason)| StorageError::Io { path, reason }),
            "[a-z ]{1,20}".prop_map(|reason| StorageError::Network { reason }),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use std::time::Duration;

    /// Files written by [`populated_storage`], with their content.
    pub const SAMPLE_FILES: &[(&str, &str)] = &[
        ("/docs/readme.md", "# Readme"),
        ("/docs/guide/intro.md", "Welcome"),
        ("/docs/guide/setup.md", "Install it"),
        ("/src/main.rs", "fn main() {}"),
    ];

    /// A config with every sub-cache enabled and the given capacity.
    pub fn small_config(max_size: usize) -> CacheConfig {
        CacheConfig::new().with_max_size(max_size)
    }

    /// A config whose entries expire after `ttl`.
    pub fn short_ttl_config(ttl: Duration) -> CacheConfig {
        CacheConfig::new().with_ttl(ttl)
    }

    /// A config with only the content cache enabled.
    pub fn content_only_config() -> CacheConfig {
        CacheConfig::new()
            .with_cache_exists(false)
            .with_cache_dir_listing(false)
    }

    /// An in-memory backend holding [`SAMPLE_FILES`].
    pub fn populated_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        for (path, content) in SAMPLE_FILES {
            if let Err(e) = StorageTrait::write(&storage, path, content) {
                panic!("failed to seed {}: {}", path, e);
            }
        }
        storage
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for Strata-specific validation.

    use super::*;

    /// Assert that a StrataResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &StrataResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a StrataResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &StrataResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a StrataResult is exactly the given storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(
        result: &StrataResult<T>,
        expected: &StorageError,
    ) {
        match result.as_ref().err().and_then(StrataError::as_storage) {
            Some(e) => assert_eq!(e, expected, "Wrong storage error"),
            None => panic!("Expected Storage error {:?}, got: {:?}", expected, result),
        }
    }

    /// Assert that a StrataResult is a NotFound storage error for `path`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &StrataResult<T>, path: &str) {
        match result {
            Err(StrataError::Storage(StorageError::NotFound { path: p })) => {
                assert_eq!(p, path, "Wrong path in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", path, other),
        }
    }

    /// Assert that a StrataResult is an Unsupported storage error.
    #[track_caller]
    pub fn assert_unsupported<T: std::fmt::Debug>(result: &StrataResult<T>) {
        match result {
            Err(StrataError::Storage(StorageError::Unsupported { .. })) => {}
            other => panic!("Expected Unsupported error, got: {:?}", other),
        }
    }

    /// Assert that a StrataResult is a Config error naming `field`.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &StrataResult<T>, field: &str) {
        match result {
            Err(StrataError::Config(ConfigError::InvalidValue { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in Config error");
            }
            other => panic!("Expected Config error for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a config passes validation.
    #[track_caller]
    pub fn assert_config_valid(config: &CacheConfig) {
        if let Err(e) = config.validate() {
            panic!("Config should be valid, got: {}", e);
        }
    }

    /// Assert that a cache snapshot holds exactly `keys`, in LRU-first order.
    #[track_caller]
    pub fn assert_cache_keys(stats: &TtlCacheStats, keys: &[&str]) {
        let actual: Vec<&str> = stats.entries.iter().map(String::as_str).collect();
        assert_eq!(actual, keys, "Unexpected cache contents");
    }

    /// Assert that a cache snapshot never exceeds its capacity.
    #[track_caller]
    pub fn assert_within_capacity(stats: &TtlCacheStats) {
        assert!(
            stats.size <= stats.max_size,
            "Cache holds {} entries, capacity is {}",
            stats.size,
            stats.max_size
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
