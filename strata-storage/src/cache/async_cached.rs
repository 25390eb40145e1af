//! Caching decorator for async backends.
//!
//! Identical cache semantics to [`CachedStorage`](super::CachedStorage); only
//! the backend calls suspend. No cache lock is held across an `.await`, so
//! concurrent operations on the same decorator interleave freely and the
//! last cache update to finish wins.

use std::sync::Arc;

use ::async_trait::async_trait;
use strata_core::{CacheConfig, FileStat, StrataResult};
use tracing::debug;

use super::layer::{CacheLayer, MutationScope};
use super::stats::CacheLayerStats;
use crate::AsyncStorageTrait;

/// Read-through, write-through cache in front of an [`AsyncStorageTrait`] backend.
///
/// This layer imposes no timeout and cannot abort a backend call. A caller
/// may still drop a mutating future mid-flight; the backend outcome is then
/// unknown, so every entry the mutation could have affected is invalidated.
pub struct AsyncCachedStorage<B: AsyncStorageTrait> {
    backend: Arc<B>,
    caches: Arc<CacheLayer>,
}

impl<B: AsyncStorageTrait> AsyncCachedStorage<B> {
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

    /// Drop `path` from the content and existence caches and its parent's listing.
    pub fn invalidate_file(&self, path: &str) {
        self.caches.invalidate_file(path);
    }

    /// Drop every cached entry at or beneath directory `path`.
    pub fn invalidate_directory(&self, path: &str) -> usize {
        self.caches.invalidate_directory(path)
    }

    /// Empty all caches.
    pub fn clear_cache(&self) {
        self.caches.clear();
    }

    /// Per-cache statistics.
    pub fn stats(&self) -> CacheLayerStats {
        self.caches.stats()
    }
}

impl<B: AsyncStorageTrait> Clone for AsyncCachedStorage<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            caches: Arc::clone(&self.caches),
        }
    }
}

#[async_trait]
impl<B: AsyncStorageTrait> AsyncStorageTrait for AsyncCachedStorage<B> {
    async fn exists(&self, path: &str) -> StrataResult<bool> {
        if let Some(hit) = self.caches.cached_exists(path) {
            return Ok(hit);
        }
        let exists = self.backend.exists(path).await?;
        self.caches.store_exists(path, exists);
        Ok(exists)
    }

    async fn read(&self, path: &str) -> StrataResult<String> {
        if let Some(hit) = self.caches.cached_content(path) {
            return Ok(hit);
        }
        let data = self.backend.read(path).await?;
        self.caches.store_content(path, &data);
        Ok(data)
    }

    async fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        let pending = self.caches.begin_mutation(path, MutationScope::Entry);
        let result = self.backend.write(path, data).await;
        pending.complete();
        result.inspect_err(|error| {
            debug!(op = "write", path, %error, "backend failed, cache untouched")
        })?;
        self.caches.on_write(path, data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StrataResult<()> {
        let pending = self.caches.begin_mutation(path, MutationScope::Entry);
        let result = self.backend.delete(path).await;
        pending.complete();
        result.inspect_err(|error| {
            debug!(op = "delete", path, %error, "backend failed, cache untouched")
        })?;
        self.caches.on_delete(path);
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        if let Some(hit) = self.caches.cached_listing(path) {
            return Ok(hit);
        }
        let listing = self.backend.list_directory(path).await?;
        self.caches.store_listing(path, &listing);
        Ok(listing)
    }

    async fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        let pending = self.caches.begin_mutation(path, MutationScope::Entry);
        let result = self.backend.ensure_directory(path).await;
        pending.complete();
        result.inspect_err(|error| {
            debug!(op = "ensure_directory", path, %error, "backend failed, cache untouched")
        })?;
        self.caches.on_ensure_directory(path);
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> StrataResult<()> {
        let pending = self.caches.begin_mutation(path, MutationScope::Subtree);
        let result = self.backend.delete_directory(path).await;
        pending.complete();
        result.inspect_err(|error| {
            debug!(op = "delete_directory", path, %error, "backend failed, cache untouched")
        })?;
        self.caches.on_delete_directory(path);
        Ok(())
    }

    async fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        self.backend.set_permissions(path, mode).await
    }

    async fn stat(&self, path: &str) -> StrataResult<FileStat> {
        self.backend.stat(path).await
    }

    async fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        let pending = self.caches.begin_mutation(path, MutationScope::Subtree);
        let result = self.backend.clear_subtree(path).await;
        pending.complete();
        result.inspect_err(|error| {
            debug!(op = "clear_subtree", path, %error, "backend failed, cache untouched")
        })?;
        self.caches.on_clear_subtree(path);
        Ok(())
    }
}
