//! Caching decorators for storage backends.
//!
//! A coordinator wraps any backend and keeps three bounded, TTL-expiring
//! caches in front of it: file content, path existence and directory
//! listings. Reads are served from the caches when possible; mutations go to
//! the backend first and then update or invalidate the caches.
//!
//! # Calling conventions
//!
//! [`CachedStorage`] wraps a blocking [`StorageTrait`](crate::StorageTrait)
//! backend and [`AsyncCachedStorage`] wraps an
//! [`AsyncStorageTrait`](crate::AsyncStorageTrait) backend. Both share the
//! same [`CacheLayer`], so they cache and invalidate identically.
//!
//! # Example
//!
//! ```ignore
//! let config = CacheConfig::new().with_max_size(500).with_ttl(Duration::from_secs(60));
//! let storage = AsyncCachedStorage::new(Arc::new(backend), config)?;
//!
//! let listing = storage.list_directory("/projects").await?; // backend
//! let listing = storage.list_directory("/projects").await?; // cache
//!
//! storage.write("/projects/new.txt", "draft").await?; // drops the listing
//! ```

pub mod async_cached;
pub mod cached;
pub mod layer;
pub mod stats;
pub mod ttl_cache;

pub use async_cached::AsyncCachedStorage;
pub use cached::CachedStorage;
pub use layer::{CacheLayer, MutationGuard, MutationScope};
pub use stats::{CacheLayerStats, TtlCacheStats};
pub use ttl_cache::{CacheEntry, TtlCache};
