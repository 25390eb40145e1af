//! Caching decorator for blocking backends.

use std::sync::Arc;

use strata_core::{CacheConfig, FileStat, StrataResult};
use tracing::debug;

use super::layer::CacheLayer;
use super::stats::CacheLayerStats;
use crate::StorageTrait;

/// Read-through, write-through cache in front of a [`StorageTrait`] backend.
///
/// The backend is always called first and the caches are updated only after
/// it succeeds; a failing backend call leaves every cache untouched and its
/// error reaches the caller as-is. Cache locks are never held across a
/// backend call.
///
/// # Example
///
/// ```ignore
/// let storage = CachedStorage::new(Arc::new(InMemoryStorage::new()), CacheConfig::default())?;
/// storage.write("/docs/a.txt", "hello")?;
/// assert_eq!(storage.read("/docs/a.txt")?, "hello"); // served from cache
/// ```
pub struct CachedStorage<B: StorageTrait> {
    backend: Arc<B>,
    caches: Arc<CacheLayer>,
}

impl<B: StorageTrait> CachedStorage<B> {
    /// Wrap `backend`. Fails if `config` does not validate.
    pub fn new(backend: Arc<B>, config: CacheConfig) -> StrataResult<Self> {
        Ok(Self {
            backend,
            caches: Arc::new(CacheLayer::new(config)?),
        })
    }

    /// Wrap `backend` with the default configuration.
    pub fn with_defaults(backend: Arc<B>) -> StrataResult<Self> {
        Self::new(backend, CacheConfig::default())
    }

    /// Get a reference to the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        self.caches.config()
    }

    /// Drop `path` from the content and existence caches and its parent's
    /// listing. The backend is not touched.
    pub fn invalidate_file(&self, path: &str) {
        self.caches.invalidate_file(path);
    }

    /// Drop every cached entry at or beneath directory `path`. The backend is
    /// not touched. Returns the number of content and existence entries removed.
    pub fn invalidate_directory(&self, path: &str) -> usize {
        self.caches.invalidate_directory(path)
    }

    /// Empty all caches. The backend is not touched.
    pub fn clear_cache(&self) {
        self.caches.clear();
    }

    /// Per-cache statistics.
    pub fn stats(&self) -> CacheLayerStats {
        self.caches.stats()
    }
}

impl<B: StorageTrait> Clone for CachedStorage<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            caches: Arc::clone(&self.caches),
        }
    }
}

impl<B: StorageTrait> StorageTrait for CachedStorage<B> {
    fn exists(&self, path: &str) -> StrataResult<bool> {
        if let Some(hit) = self.caches.cached_exists(path) {
            return Ok(hit);
        }
        let exists = self.backend.exists(path)?;
        self.caches.store_exists(path, exists);
        Ok(exists)
    }

    fn read(&self, path: &str) -> StrataResult<String> {
        if let Some(hit) = self.caches.cached_content(path) {
            return Ok(hit);
        }
        let data = self.backend.read(path)?;
        self.caches.store_content(path, &data);
        Ok(data)
    }

    fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        self.backend
            .write(path, data)
            .inspect_err(|error| {
                debug!(op = "write", path, %error, "backend failed, cache untouched")
            })?;
        self.caches.on_write(path, data);
        Ok(())
    }

    fn delete(&self, path: &str) -> StrataResult<()> {
        self.backend
            .delete(path)
            .inspect_err(|error| {
                debug!(op = "delete", path, %error, "backend failed, cache untouched")
            })?;
        self.caches.on_delete(path);
        Ok(())
    }

    fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        if let Some(hit) = self.caches.cached_listing(path) {
            return Ok(hit);
        }
        let listing = self.backend.list_directory(path)?;
        self.caches.store_listing(path, &listing);
        Ok(listing)
    }

    fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        self.backend
            .ensure_directory(path)
            .inspect_err(|error| {
                debug!(op = "ensure_directory", path, %error, "backend failed, cache untouched")
            })?;
        self.caches.on_ensure_directory(path);
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> StrataResult<()> {
        self.backend
            .delete_directory(path)
            .inspect_err(|error| {
                debug!(op = "delete_directory", path, %error, "backend failed, cache untouched")
            })?;
        self.caches.on_delete_directory(path);
        Ok(())
    }

    fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.backend.set_permissions(path, mode)
    }

    fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.backend.stat(path)
    }

    fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        self.backend
            .clear_subtree(path)
            .inspect_err(|error| {
                debug!(op = "clear_subtree", path, %error, "backend failed, cache untouched")
            })?;
        self.caches.on_clear_subtree(path);
        Ok(())
    }
}
