//! Thread-safe cache for pairwise comparison data
//!
//! Keys are built from the two structural hashes in sorted order, so the
//! entry for (a, b) and (b, a) is shared. Only values that are fully
//! determined by the two hashes may be stored here.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::debug;

/// Default capacity when none is configured
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Order-independent cache key for a pair of structural hashes.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

/// Cache performance statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Lookups that found a score
    pub hits: usize,
    /// Lookups that found nothing
    pub misses: usize,
    /// Eviction passes performed
    pub evictions: usize,
}

impl CacheStatistics {
    /// Fraction of lookups that hit
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded concurrent map from pair key to a cached value
#[derive(Debug)]
pub struct SimilarityCache<V> {
    scores: DashMap<String, V>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
}

impl<V: Clone> SimilarityCache<V> {
    /// Create a cache with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_entries` entries
    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            scores: DashMap::with_capacity(max_entries.min(1024)),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    /// Cached value for the pair, or None if not cached
    pub fn get(&self, hash_a: &str, hash_b: &str) -> Option<V> {
        let key = pair_key(hash_a, hash_b);
        match self.scores.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store the value for a pair
    pub fn insert(&self, hash_a: &str, hash_b: &str, value: V) {
        let key = pair_key(hash_a, hash_b);
        if !self.scores.contains_key(&key) && self.scores.len() >= self.max_entries {
            self.evict();
        }
        self.scores.insert(key, value);
    }

    /// Snapshot of the counters
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Maximum number of cached entries
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        self.scores.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        debug!("Cleared similarity cache");
    }

    /// Remove 25% of the entries
    fn evict(&self) {
        let target_size = (self.max_entries * 3) / 4;
        let current_size = self.scores.len();
        if current_size <= target_size {
            return;
        }

        // Keys are collected first; removing while iterating would deadlock a shard.
        let keys_to_remove: Vec<String> = self
            .scores
            .iter()
            .take(current_size - target_size)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys_to_remove {
            self.scores.remove(&key);
        }

        self.evictions.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Evicted similarity cache entries: {} -> {}",
            current_size,
            self.scores.len()
        );
    }
}

impl<V: Clone> Default for SimilarityCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lookup_is_order_independent() {
        let cache = SimilarityCache::<f64>::new();
        assert!(cache.get("aaa", "bbb").is_none());

        cache.insert("bbb", "aaa", 0.42);
        assert_eq!(cache.get("aaa", "bbb"), Some(0.42));
        assert_eq!(cache.get("bbb", "aaa"), Some(0.42));
        assert_eq!(cache.len(), 1);

        let stats = cache.statistics();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!(stats.hit_rate() > 0.6);
    }

    #[test]
    fn test_pair_key_sorts_hashes() {
        assert_eq!(pair_key("b", "a"), "a|b");
        assert_eq!(pair_key("a", "b"), "a|b");
        assert_eq!(pair_key("x", "x"), "x|x");
    }

    #[test]
    fn test_eviction_keeps_cache_bounded() {
        let cache = SimilarityCache::<f64>::with_capacity(4);
        for i in 0..20 {
            cache.insert(&format!("h{i}"), "other", 0.5);
        }
        assert!(cache.len() <= 4, "cache size exceeded capacity");
        assert!(cache.statistics().evictions >= 1);
    }

    #[test]
    fn test_overwriting_existing_key_does_not_evict() {
        let cache = SimilarityCache::<f64>::with_capacity(1);
        cache.insert("a", "b", 0.1);
        cache.insert("b", "a", 0.2);
        assert_eq!(cache.statistics().evictions, 0);
        assert_eq!(cache.get("a", "b"), Some(0.2));
    }

    #[test]
    fn test_clear_resets_entries_and_stats() {
        let cache = SimilarityCache::<f64>::new();
        cache.insert("a", "b", 1.0);
        cache.get("a", "b");
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.statistics(), CacheStatistics::default());
        assert_eq!(CacheStatistics::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_concurrent_inserts_and_reads() {
        let cache = Arc::new(SimilarityCache::<f64>::with_capacity(10_000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        let a = format!("t{t}-{i}");
                        cache.insert(&a, "shared", i as f64 / 100.0);
                        assert!(cache.get("shared", &a).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
