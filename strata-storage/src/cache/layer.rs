//! The three sub-caches and the invalidation rules that tie them together.
//!
//! Both coordinators ([`CachedStorage`](super::CachedStorage) and
//! [`AsyncCachedStorage`](super::AsyncCachedStorage)) own one `CacheLayer`
//! and call into it only after the backend call has returned successfully.
//! Nothing here performs I/O, so the calling convention never leaks in.
//!
//! # Key space
//!
//! Every key is a path normalized with [`path::normalize_dir`], so `/d` and
//! `/d/` address the same entry. The caches never share a map; content,
//! existence and listing entries for one path evict independently.
//!
//! | Event | Content | Existence | Listing |
//! |---|---|---|---|
//! | write `p` | set `p` | set `p` true, drop ancestors | drop every ancestor |
//! | delete `p` | drop `p` | drop `p` | drop parent |
//! | ensure dir `p` | - | set `p` true, drop ancestors | drop every ancestor |
//! | delete dir `d` | drop under `d` | drop `d` and under | drop `d`, under `d`, parent |
//! | clear subtree `d` | drop under `d` | drop `d` and under | drop `d`, under `d` |
//! | invalidate file `p` | drop `p` | drop `p` | drop parent |
//! | invalidate dir `d` | drop under `d` | drop `d` and under | drop `d`, under `d` |

use std::num::NonZeroUsize;

use strata_core::path;
use strata_core::{CacheConfig, StrataResult};
use tracing::{debug, info};

use super::stats::CacheLayerStats;
use super::ttl_cache::TtlCache;

/// Content, existence and directory-listing caches under one configuration.
#[derive(Debug)]
pub struct CacheLayer {
    config: CacheConfig,
    content: TtlCache<String>,
    exists: TtlCache<bool>,
    dir_listing: TtlCache<Vec<String>>,
}

impl CacheLayer {
    /// Build the three caches, each with `config.max_size` capacity.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: CacheConfig) -> StrataResult<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            content: TtlCache::new("content", capacity, config.ttl),
            exists: TtlCache::new("exists", capacity, config.ttl),
            dir_listing: TtlCache::new("dir_listing", capacity, config.ttl),
            config,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Lookups and fills
    // ------------------------------------------------------------------------

    /// Cached existence for `path`, or `None` on miss or when disabled.
    pub fn cached_exists(&self, path: &str) -> Option<bool> {
        if !self.config.cache_exists {
            return None;
        }
        self.exists.get(path::normalize_dir(path))
    }

    /// Record the backend's answer for `path`, `false` included.
    pub fn store_exists(&self, path: &str, exists: bool) {
        if self.config.cache_exists {
            self.exists.set(path::normalize_dir(path), exists, None);
        }
    }

    /// Cached content for `path`.
    pub fn cached_content(&self, path: &str) -> Option<String> {
        self.content.get(path::normalize_dir(path))
    }

    /// Record content read from the backend.
    pub fn store_content(&self, path: &str, data: &str) {
        self.content.set(path::normalize_dir(path), data.to_string(), None);
    }

    /// Cached listing for directory `path`, or `None` on miss or when disabled.
    pub fn cached_listing(&self, path: &str) -> Option<Vec<String>> {
        if !self.config.cache_dir_listing {
            return None;
        }
        self.dir_listing.get(path::normalize_dir(path))
    }

    /// Record a listing returned by the backend.
    pub fn store_listing(&self, path: &str, listing: &[String]) {
        if self.config.cache_dir_listing {
            self.dir_listing
                .set(path::normalize_dir(path), listing.to_vec(), None);
        }
    }

    // ------------------------------------------------------------------------
    // Mutation rules
    // ------------------------------------------------------------------------

    /// A write to `path` succeeded with `data`.
    pub fn on_write(&self, path: &str, data: &str) {
        let key = path::normalize_dir(path);
        self.content.set(key, data.to_string(), None);
        self.store_exists(key, true);
        self.drop_ancestors(key);
    }

    /// A file delete of `path` succeeded.
    pub fn on_delete(&self, path: &str) {
        self.invalidate_file(path);
    }

    /// A directory was ensured at `path`.
    pub fn on_ensure_directory(&self, path: &str) {
        let key = path::normalize_dir(path);
        self.store_exists(key, true);
        self.drop_ancestors(key);
    }

    /// Directory `path` and everything under it were removed.
    pub fn on_delete_directory(&self, path: &str) {
        self.invalidate_directory(path);
        self.dir_listing.delete(path::parent_dir(path));
    }

    /// Everything under directory `path` was removed; `path` itself remains.
    pub fn on_clear_subtree(&self, path: &str) {
        self.invalidate_directory(path);
    }

    /// Forget `path` in the content and existence caches and drop its
    /// parent's listing.
    pub fn invalidate_file(&self, path: &str) {
        let key = path::normalize_dir(path);
        self.content.delete(key);
        self.exists.delete(key);
        self.dir_listing.delete(path::parent_dir(key));
    }

    /// Forget every entry at or under directory `path`.
    ///
    /// Returns the number of content and existence entries removed. Runs in
    /// time linear in the number of cached keys.
    pub fn invalidate_directory(&self, path: &str) -> usize {
        let dir = path::normalize_dir(path);
        let under = |key: &str| path::is_within(key, dir);

        let mut removed = self.content.delete_where(under);
        removed += self.exists.delete_where(|key| key == dir || under(key));
        self.dir_listing.delete_where(|key| key == dir || under(key));

        debug!(dir, removed, "invalidated directory subtree");
        removed
    }

    /// Empty all three caches.
    pub fn clear(&self) {
        self.content.clear();
        self.exists.clear();
        self.dir_listing.clear();
        info!("cleared storage caches");
    }

    /// Per-cache statistics.
    pub fn stats(&self) -> CacheLayerStats {
        CacheLayerStats {
            content: self.content.stats(),
            exists: self.exists.stats(),
            dir_listing: self.dir_listing.stats(),
        }
    }

    /// Start a backend mutation on `path` that may be abandoned mid-flight.
    ///
    /// If the returned guard is dropped without [`MutationGuard::complete`],
    /// whatever the mutation could have changed is invalidated.
    pub fn begin_mutation<'a>(&'a self, path: &'a str, scope: MutationScope) -> MutationGuard<'a> {
        MutationGuard {
            caches: self,
            path,
            scope,
            armed: true,
        }
    }

    fn forget(&self, path: &str, scope: MutationScope) {
        match scope {
            MutationScope::Entry => {
                self.invalidate_file(path);
                self.drop_ancestors(path::normalize_dir(path));
            }
            MutationScope::Subtree => self.on_delete_directory(path),
        }
    }

    /// Ancestors of a newly created path may have been created implicitly,
    /// so their listings and cached existence are no longer trustworthy.
    fn drop_ancestors(&self, key: &str) {
        for ancestor in path::ancestors(key) {
            self.dir_listing.delete(ancestor);
            self.exists.delete(ancestor);
        }
    }
}

/// How much of the key space an in-flight mutation can affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationScope {
    /// A single path, its existence and its ancestors' listings.
    Entry,
    /// A directory and everything beneath it.
    Subtree,
}

/// Guard held across an async backend mutation.
///
/// A future dropped while awaiting the backend leaves the backend outcome
/// unknown; the guard then drops every entry the mutation could have made
/// stale instead of leaving it cached.
#[must_use = "call complete() once the backend call has returned"]
#[derive(Debug)]
pub struct MutationGuard<'a> {
    caches: &'a CacheLayer,
    path: &'a str,
    scope: MutationScope,
    armed: bool,
}

impl MutationGuard<'_> {
    /// The backend call returned, successfully or not.
    pub fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(path = self.path, scope = ?self.scope, "mutation abandoned, invalidating");
            self.caches.forget(self.path, self.scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strata_core::{ConfigError, StrataError};

    fn layer() -> CacheLayer {
        CacheLayer::new(CacheConfig::default()).unwrap()
    }

    fn listing(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = CacheLayer::new(CacheConfig::new().with_max_size(0)).unwrap_err();
        assert!(matches!(
            err,
            StrataError::Config(ConfigError::InvalidValue { .. })
        ));
        assert!(CacheLayer::new(CacheConfig::new().with_ttl(Duration::ZERO)).is_err());
    }

    #[test]
    fn test_each_cache_gets_full_capacity() {
        let layer = CacheLayer::new(CacheConfig::new().with_max_size(7)).unwrap();
        let stats = layer.stats();
        assert_eq!(stats.content.max_size, 7);
        assert_eq!(stats.exists.max_size, 7);
        assert_eq!(stats.dir_listing.max_size, 7);
    }

    #[test]
    fn test_write_fills_and_invalidates_parent_listing() {
        let layer = layer();
        layer.store_listing("/d", &listing(&["old.txt"]));
        layer.store_listing("/", &listing(&["d/"]));

        layer.on_write("/d/file.txt", "hello");

        assert_eq!(layer.cached_content("/d/file.txt"), Some("hello".to_string()));
        assert_eq!(layer.cached_exists("/d/file.txt"), Some(true));
        assert_eq!(layer.cached_listing("/d"), None);
        assert_eq!(layer.cached_listing("/"), None);
    }

    #[test]
    fn test_write_drops_negative_existence_of_ancestors() {
        let layer = layer();
        layer.store_exists("/new", false);
        layer.on_write("/new/file.txt", "x");
        assert_eq!(layer.cached_exists("/new"), None);
    }

    #[test]
    fn test_delete_invalidates_file_and_parent_listing() {
        let layer = layer();
        layer.on_write("/d/a.txt", "a");
        layer.store_listing("/d", &listing(&["a.txt"]));
        layer.store_listing("/other", &listing(&["x"]));

        layer.on_delete("/d/a.txt");

        assert_eq!(layer.cached_content("/d/a.txt"), None);
        assert_eq!(layer.cached_exists("/d/a.txt"), None);
        assert_eq!(layer.cached_listing("/d"), None);
        assert!(layer.cached_listing("/other").is_some());
    }

    #[test]
    fn test_invalidate_directory_uses_component_boundary() {
        let layer = layer();
        layer.store_content("/foo/a.txt", "a");
        layer.store_content("/foo/sub/b.txt", "b");
        layer.store_content("/foobar/x.txt", "x");
        layer.store_exists("/foo", true);
        layer.store_listing("/foo", &listing(&["a.txt", "sub/"]));
        layer.store_listing("/foo/sub", &listing(&["b.txt"]));
        layer.store_listing("/foobar", &listing(&["x.txt"]));

        let removed = layer.invalidate_directory("/foo/");

        assert_eq!(removed, 3);
        assert_eq!(layer.cached_content("/foo/a.txt"), None);
        assert_eq!(layer.cached_content("/foo/sub/b.txt"), None);
        assert_eq!(layer.cached_content("/foobar/x.txt"), Some("x".to_string()));
        assert_eq!(layer.cached_exists("/foo"), None);
        assert_eq!(layer.cached_listing("/foo"), None);
        assert_eq!(layer.cached_listing("/foo/sub"), None);
        assert!(layer.cached_listing("/foobar").is_some());
    }

    #[test]
    fn test_delete_directory_also_drops_parent_listing() {
        let layer = layer();
        layer.store_listing("/", &listing(&["d/"]));
        layer.store_listing("/d", &listing(&[]));

        layer.on_delete_directory("/d");

        assert_eq!(layer.cached_listing("/"), None);
        assert_eq!(layer.cached_listing("/d"), None);
    }

    #[test]
    fn test_clear_subtree_keeps_parent_listing() {
        let layer = layer();
        layer.store_listing("/", &listing(&["d/"]));
        layer.store_content("/d/a", "a");

        layer.on_clear_subtree("/d");

        assert!(layer.cached_listing("/").is_some());
        assert_eq!(layer.cached_content("/d/a"), None);
    }

    #[test]
    fn test_ensure_directory() {
        let layer = layer();
        layer.store_listing("/a", &listing(&[]));
        layer.store_exists("/a/b", false);

        layer.on_ensure_directory("/a/b");

        assert_eq!(layer.cached_exists("/a/b"), Some(true));
        assert_eq!(layer.cached_listing("/a"), None);
    }

    #[test]
    fn test_disabled_caches_never_answer() {
        let layer = CacheLayer::new(
            CacheConfig::new()
                .with_cache_exists(false)
                .with_cache_dir_listing(false),
        )
        .unwrap();

        layer.store_exists("/a", true);
        layer.store_listing("/", &listing(&["a"]));
        layer.on_write("/b", "b");

        assert_eq!(layer.cached_exists("/a"), None);
        assert_eq!(layer.cached_exists("/b"), None);
        assert_eq!(layer.cached_listing("/"), None);
        assert_eq!(layer.stats().exists.size, 0);
        assert_eq!(layer.stats().dir_listing.size, 0);
        assert_eq!(layer.cached_content("/b"), Some("b".to_string()));
    }

    #[test]
    fn test_trailing_separator_addresses_same_entry() {
        let layer = layer();
        layer.store_listing("/d/", &listing(&["a"]));
        assert!(layer.cached_listing("/d").is_some());
        layer.on_write("/d/b", "b");
        assert_eq!(layer.cached_listing("/d/"), None);
    }

    #[test]
    fn test_abandoned_mutation_invalidates() {
        let layer = layer();
        layer.store_content("/d/a", "old");
        layer.store_listing("/d", &listing(&["a"]));
        {
            let _pending = layer.begin_mutation("/d/a", MutationScope::Entry);
        }
        assert_eq!(layer.cached_content("/d/a"), None);
        assert_eq!(layer.cached_listing("/d"), None);
    }

    #[test]
    fn test_completed_mutation_leaves_cache_alone() {
        let layer = layer();
        layer.store_content("/d/a", "old");
        layer.begin_mutation("/d", MutationScope::Subtree).complete();
        assert_eq!(layer.cached_content("/d/a"), Some("old".to_string()));
    }

    #[test]
    fn test_clear_twice() {
        let layer = layer();
        layer.on_write("/a", "1");
        layer.store_listing("/", &listing(&["a"]));
        layer.clear();
        layer.clear();

        let stats = layer.stats();
        assert_eq!(stats.content.size, 0);
        assert_eq!(stats.exists.size, 0);
        assert_eq!(stats.dir_listing.size, 0);
    }
}
