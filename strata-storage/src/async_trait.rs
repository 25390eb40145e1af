//! Async storage trait for suspending backends.
//!
//! This trait provides an async alternative to the blocking `StorageTrait`.
//! It's designed for backends whose operations cross a network or file
//! boundary on a tokio runtime, such as cloud object stores.

use ::async_trait::async_trait;
use strata_core::{FileStat, StorageError, StrataError, StrataResult};

use crate::{InMemoryStorage, StorageTrait};

/// Async storage interface over a `/`-separated hierarchical namespace.
///
/// Same operations and error contract as [`StorageTrait`].
#[async_trait]
pub trait AsyncStorageTrait: Send + Sync {
    /// Check whether `path` names a file or directory.
    async fn exists(&self, path: &str) -> StrataResult<bool>;

    /// Read the content of file `path`.
    async fn read(&self, path: &str) -> StrataResult<String>;

    /// Create or replace file `path` with `data`.
    async fn write(&self, path: &str, data: &str) -> StrataResult<()>;

    /// Delete file `path`.
    async fn delete(&self, path: &str) -> StrataResult<()>;

    /// List the immediate children of directory `path`.
    async fn list_directory(&self, path: &str) -> StrataResult<Vec<String>>;

    /// Create directory `path` and any missing ancestors.
    async fn ensure_directory(&self, path: &str) -> StrataResult<()>;

    /// Delete directory `path` and everything beneath it.
    async fn delete_directory(&self, path: &str) -> StrataResult<()>;

    /// Set permission bits on `path`.
    async fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()>;

    /// Metadata for `path`.
    async fn stat(&self, path: &str) -> StrataResult<FileStat>;

    /// Remove everything beneath directory `path`, keeping `path` itself.
    async fn clear_subtree(&self, _path: &str) -> StrataResult<()> {
        Err(StrataError::Storage(StorageError::Unsupported {
            operation: "clear_subtree".to_string(),
        }))
    }
}

// The in-memory tree never waits on I/O, so each call completes without
// suspending.
#[async_trait]
impl AsyncStorageTrait for InMemoryStorage {
    async fn exists(&self, path: &str) -> StrataResult<bool> {
        StorageTrait::exists(self, path)
    }

    async fn read(&self, path: &str) -> StrataResult<String> {
        StorageTrait::read(self, path)
    }

    async fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        StorageTrait::write(self, path, data)
    }

    async fn delete(&self, path: &str) -> StrataResult<()> {
        StorageTrait::delete(self, path)
    }

    async fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        StorageTrait::list_directory(self, path)
    }

    async fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        StorageTrait::ensure_directory(self, path)
    }

    async fn delete_directory(&self, path: &str) -> StrataResult<()> {
        StorageTrait::delete_directory(self, path)
    }

    async fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        StorageTrait::set_permissions(self, path, mode)
    }

    async fn stat(&self, path: &str) -> StrataResult<FileStat> {
        StorageTrait::stat(self, path)
    }

    async fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        StorageTrait::clear_subtree(self, path)
    }
}
