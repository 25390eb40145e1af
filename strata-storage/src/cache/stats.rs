//! Introspection types for the cache layer.

use serde::{Deserialize, Serialize};

/// Statistics for one bounded TTL cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlCacheStats {
    /// Number of entries currently held.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Cached keys, least recently used first.
    pub entries: Vec<String>,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing, or found an expired entry.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL had passed.
    pub expirations: u64,
}

impl TtlCacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Returns true if `key` is currently cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|k| k == key)
    }
}

/// Statistics for all three sub-caches of a caching decorator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLayerStats {
    pub content: TtlCacheStats,
    pub exists: TtlCacheStats,
    pub dir_listing: TtlCacheStats,
}

impl CacheLayerStats {
    /// Total entries across all sub-caches.
    pub fn total_size(&self) -> usize {
        self.content.size + self.exists.size + self.dir_listing.size
    }
}
