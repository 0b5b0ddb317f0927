//! LRU cache for raw objects.

use std::num::NonZeroUsize;

use lru::LruCache;
use rgit_hash::ObjectId;

use crate::RawObject;

/// Bounded LRU cache of materialised objects, keyed by id.
///
/// Entries are value-semantic: callers clone out, so a cached object stays
/// valid however long a reader holds it.
pub struct ObjectCache {
    cache: LruCache<ObjectId, RawObject>,
}

impl ObjectCache {
    /// Create with the given capacity (number of objects).
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("nonzero")),
            ),
        }
    }

    /// Get a cached object (promotes it to most-recently-used).
    pub fn get(&mut self, id: &ObjectId) -> Option<&RawObject> {
        self.cache.get(id)
    }

    /// Insert an object. Returns the evicted entry if the cache was full.
    pub fn insert(&mut self, id: ObjectId, obj: RawObject) -> Option<(ObjectId, RawObject)> {
        self.cache.push(id, obj)
    }

    /// Check membership without promoting.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.cache.contains(id)
    }

    /// Drop all cached objects.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Current number of cached objects.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
