//! Per-scan memoization of remote catalog lookups.
//!
//! Entries are write-once: the first value stored for a key wins and is never
//! replaced or evicted. Caches live for one scan and are dropped with it.

use dashmap::DashMap;
use episodex_common::{CanonicalMedia, EpisodeMap, MediaId, RelationEdge};
use std::hash::Hash;
use std::sync::Arc;

/// Thread-safe write-once cache.
pub struct Cache<K, V> {
    entries: DashMap<K, Arc<V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get a cached value.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a value unless the key is already present.
    ///
    /// Returns the value now held for the key, which is the earlier one when
    /// two writers race.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let entry = self.entries.entry(key).or_insert_with(|| Arc::new(value));
        Arc::clone(entry.value())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Media records by id.
pub type MediaCache = Cache<MediaId, CanonicalMedia>;

/// Relation edges by source media id.
pub type RelationCache = Cache<MediaId, Vec<RelationEdge>>;

/// Episode mappings by media id.
pub type EpisodeMapCache = Cache<MediaId, EpisodeMap>;

/// All caches of one scan, shared by the fetcher, tree builder and hydrator.
#[derive(Default)]
pub struct ScanCaches {
    pub media: MediaCache,
    pub relations: RelationCache,
    pub episodes: EpisodeMapCache,
}

impl ScanCaches {
    pub fn new() -> Self {
        Self::default()
    }
}
