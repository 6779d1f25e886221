//! Session-scoped LRU cache for derived remote values
//!
//! Remote lookups that are expensive but stable per connection (current
//! frame, document null-date, macro-execution mode) are cached here. Entries
//! are tagged with a generation counter; a reset bumps the generation and
//! stale entries are dropped lazily on the next lookup instead of eagerly
//! walking the map.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

/// Default bound on cached entries
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Bounded LRU cache keyed by string
///
/// Insertion order doubles as recency order: hits are moved to the back,
/// eviction pops the front. Thread-safe; shared between the session and its
/// reset subscriber.
pub struct SessionCache {
    capacity: usize,
    generation: AtomicU64,
    entries: Mutex<IndexMap<String, CacheEntry>>,
}

struct CacheEntry {
    generation: u64,
    value: Value,
}

impl SessionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            generation: AtomicU64::new(0),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Look up a live entry, refreshing its recency
    pub fn get(&self, key: &str) -> Option<Value> {
        let current = self.generation();
        // Intentional .unwrap() - poisoned mutex means a panic elsewhere,
        // propagating is correct
        let mut entries = self.entries.lock().unwrap();

        match entries.shift_remove(key) {
            Some(entry) if entry.generation == current => {
                let value = entry.value.clone();
                entries.insert(key.to_string(), entry);
                Some(value)
            }
            Some(_) => {
                trace!("Dropping stale cache entry: {}", key);
                None
            }
            None => None,
        }
    }

    /// Insert or refresh an entry, evicting the least recently used one
    /// when over capacity
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let generation = self.generation();
        // Intentional .unwrap() - poisoned mutex means a panic elsewhere,
        // propagating is correct
        let mut entries = self.entries.lock().unwrap();

        let key = key.into();
        entries.shift_remove(&key);
        entries.insert(key, CacheEntry { generation, value });

        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    /// Drop every entry by bumping the generation
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        trace!("Session cache invalidated (generation {})", self.generation());
    }

    /// Number of entries still live for the current generation
    pub fn live_len(&self) -> usize {
        let current = self.generation();
        // Intentional .unwrap() - poisoned mutex means a panic elsewhere,
        // propagating is correct
        let entries = self.entries.lock().unwrap();
        entries
            .values()
            .filter(|entry| entry.generation == current)
            .count()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
