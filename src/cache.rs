use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Serialize;

/// Default number of entries each scanner cache may hold.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Fixed-capacity cache with least-recently-used eviction.
///
/// A lookup touches the entry; inserting past capacity evicts the entry
/// touched longest ago. Values may be negative results (e.g. `None` for a
/// commit that could not be resolved) so failed queries are not repeated.
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    hits: usize,
    misses: usize,
}

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub len: usize,
    pub capacity: usize,
    pub hits: usize,
    pub misses: usize,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// A capacity of 0 is raised to 1.
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up `key`, marking it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or replaces `key`, evicting the least recently used entry when full.
    pub fn put(&mut self, key: K, value: V) {
        self.entries.put(key, value);
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            len: self.len(),
            capacity: self.capacity(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    /// Returns the cached value, or computes, stores and returns it.
    pub fn get_or_insert_with(&mut self, key: &K, compute: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(key) {
            return v.clone();
        }
        let value = compute();
        self.put(key.clone(), value.clone());
        value
    }
}
