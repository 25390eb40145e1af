//! Bounded TTL cache with least-recently-used eviction.
//!
//! Each cache owns two maps kept in lockstep: the entries themselves and a
//! recency index mapping every key to the value of a strictly increasing
//! access counter at its last touch. The entry with the smallest counter is
//! the eviction victim. Expiry is lazy: an entry older than its TTL is
//! dropped when it is next looked up, never by a background task.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::stats::TtlCacheStats;

/// A cached value with its insertion time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// An entry is expired once its age strictly exceeds its TTL.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    recency: HashMap<String, u64>,
    counter: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> Inner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: HashMap::new(),
            counter: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    fn touch(&mut self, key: &str) {
        self.counter += 1;
        match self.recency.get_mut(key) {
            Some(slot) => *slot = self.counter,
            None => {
                self.recency.insert(key.to_string(), self.counter);
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        self.recency.remove(key);
        self.entries.remove(key).is_some()
    }

    fn least_recent(&self) -> Option<String> {
        self.recency
            .iter()
            .min_by_key(|(_, tick)| **tick)
            .map(|(key, _)| key.clone())
    }

    /// Look up `key`, expiring it lazily. Updates recency and counters.
    fn lookup(&mut self, key: &str, cache: &'static str) -> Option<&V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                trace!(cache, key, "cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove(key);
            self.expirations += 1;
            self.misses += 1;
            debug!(cache, key, "cache entry expired");
            return None;
        }

        self.touch(key);
        self.hits += 1;
        trace!(cache, key, "cache hit");
        self.entries.get(key).map(|entry| &entry.value)
    }
}

/// A keyed store with fixed capacity, LRU eviction and per-entry expiry.
///
/// All state sits behind one mutex. Operations never fail and never block on
/// anything but that mutex, so callers can use the cache freely around
/// backend I/O without holding it across the I/O itself.
#[derive(Debug)]
pub struct TtlCache<V> {
    name: &'static str,
    max_size: NonZeroUsize,
    default_ttl: Duration,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache. `name` only labels log events.
    pub fn new(name: &'static str, max_size: NonZeroUsize, default_ttl: Duration) -> Self {
        Self {
            name,
            max_size,
            default_ttl,
            inner: Mutex::new(Inner::new()),
        }
    }

    // The maps are consistent between any two statements, so a panic in
    // another thread never leaves them half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace `key`.
    ///
    /// A new key arriving at a full cache evicts exactly the least recently
    /// touched entry first. `ttl` overrides the default lifetime.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let mut inner = self.lock();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_size.get() {
            if let Some(victim) = inner.least_recent() {
                inner.remove(&victim);
                inner.evictions += 1;
                debug!(cache = self.name, key = %victim, "evicted least recently used entry");
            }
        }

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
            },
        );
        inner.touch(key);
    }

    /// Get the value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().lookup(key, self.name).cloned()
    }

    /// Same as `get(key).is_some()` without cloning the value.
    pub fn has(&self, key: &str) -> bool {
        self.lock().lookup(key, self.name).is_some()
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    /// Remove every entry whose key matches `pred`. Returns the number removed.
    pub fn delete_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| pred(key))
            .cloned()
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        doomed.len()
    }

    /// Remove all entries and reset the recency counter.
    ///
    /// Hit, miss, eviction and expiration totals are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.recency.clear();
        inner.counter = 0;
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of size, capacity, keys (least recently used first) and counters.
    pub fn stats(&self) -> TtlCacheStats {
        let inner = self.lock();
        let mut ordered: Vec<(&String, &u64)> = inner.recency.iter().collect();
        ordered.sort_by_key(|(_, tick)| **tick);

        TtlCacheStats {
            size: inner.entries.len(),
            max_size: self.max_size.get(),
            entries: ordered.into_iter().map(|(key, _)| key.clone()).collect(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8),
        Get(u8),
        Delete(u8),
        Clear,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..16).prop_map(Op::Set),
            3 => (0u8..16).prop_map(Op::Get),
            1 => (0u8..16).prop_map(Op::Delete),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Size never exceeds capacity and the recency index tracks entries exactly.
        #[test]
        fn prop_bounded_and_in_lockstep(
            max_size in 1usize..8,
            ops in prop::collection::vec(arb_op(), 0..64),
        ) {
            let cache: TtlCache<u8> =
                TtlCache::new("prop", NonZeroUsize::new(max_size).unwrap(), Duration::from_secs(60));

            for op in ops {
                match op {
                    Op::Set(k) => cache.set(&k.to_string(), k, None),
                    Op::Get(k) => { let _ = cache.get(&k.to_string()); }
                    Op::Delete(k) => { cache.delete(&k.to_string()); }
                    Op::Clear => cache.clear(),
                }

                prop_assert!(cache.len() <= max_size);
                let inner = cache.lock();
                let mut entry_keys: Vec<_> = inner.entries.keys().cloned().collect();
                let mut recency_keys: Vec<_> = inner.recency.keys().cloned().collect();
                entry_keys.sort();
                recency_keys.sort();
                prop_assert_eq!(entry_keys, recency_keys);
            }
        }

        /// A value just set is readable back before its TTL.
        #[test]
        fn prop_set_then_get(max_size in 1usize..8, key in "[a-z]{1,6}", value in any::<u32>()) {
            let cache: TtlCache<u32> =
                TtlCache::new("prop", NonZeroUsize::new(max_size).unwrap(), Duration::from_secs(60));
            cache.set(&key, value, None);
            prop_assert_eq!(cache.get(&key), Some(value));
        }
    }
}
