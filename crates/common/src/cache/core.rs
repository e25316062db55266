//! Core cache implementation: insertion-order eviction with TTL expiry
//!
//! Expired entries are removed lazily on read and eagerly by
//! [`Cache::cleanup_expired`], which the sweeper calls on an interval.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use regex::Regex;

use super::config::CacheConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::error::{CommonError, CommonResult};
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
struct CacheStorage<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in insertion order; the front is evicted first
    insertion_order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> CacheStorage<K, V> {
    fn new() -> Self {
        Self { entries: HashMap::new(), insertion_order: VecDeque::new() }
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        if let Some(position) = self.insertion_order.iter().position(|k| k == key) {
            self.insertion_order.remove(position);
        }
        Some(entry)
    }

    fn retain<F: FnMut(&K, &CacheEntry<V>) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, entry| keep(k, entry));
        let entries = &self.entries;
        self.insertion_order.retain(|k| entries.contains_key(k));
        before - self.entries.len()
    }
}

/// Key matcher used by [`Cache::invalidate`]
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Matches keys containing the string
    Substring(String),
    /// Matches keys the expression finds a match in
    Regex(Regex),
}

impl KeyPattern {
    /// Compile a regular-expression pattern
    pub fn regex(pattern: &str) -> CommonResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| CommonError::validation("pattern", e.to_string()))
    }

    /// Check a key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Substring(needle) => key.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(key),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(value: &str) -> Self {
        Self::Substring(value.to_string())
    }
}

impl From<String> for KeyPattern {
    fn from(value: String) -> Self {
        Self::Substring(value)
    }
}

impl From<Regex> for KeyPattern {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

/// Generic thread-safe cache with TTL expiry and insertion-order eviction
///
/// Clones share storage and metrics.
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use mentorlink_common::cache::{Cache, CacheConfig};
///
/// let cache: Cache<String, i32> =
///     Cache::new(CacheConfig::ttl_bounded(Duration::from_secs(60), 100));
/// cache.insert("GET https://api.example.com/projects/42".to_string(), 42);
/// assert_eq!(cache.get(&"GET https://api.example.com/projects/42".to_string()), Some(42));
/// assert_eq!(cache.invalidate("projects"), 1);
/// ```
#[derive(Debug)]
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            config,
            metrics: MetricsCollector::default(),
            clock,
        }
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert a value, replacing any previous entry for the key
    ///
    /// A replaced entry takes a fresh timestamp and moves to the back of the
    /// eviction order. When the cache is full the oldest-inserted entry is
    /// evicted first.
    pub fn insert(&self, key: K, value: V) {
        let mut storage = self.storage.write();
        let replaced = storage.remove(&key).is_some();

        if let Some(max_size) = self.config.max_size {
            while !replaced && storage.entries.len() >= max_size {
                let Some(oldest) = storage.insertion_order.pop_front() else { break };
                storage.entries.remove(&oldest);
                if self.config.track_metrics {
                    self.metrics.record_eviction();
                }
            }
            if max_size == 0 {
                return;
            }
        }

        let entry = CacheEntry { value, inserted_at: self.clock.now() };
        storage.entries.insert(key.clone(), entry);
        storage.insertion_order.push_back(key);

        if self.config.track_metrics {
            self.metrics.record_insert();
        }
    }

    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or if the entry has expired;
    /// an expired entry is removed.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut storage = self.storage.write();

        let expired = match storage.entries.get(key) {
            None => {
                self.record_miss();
                return None;
            }
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            storage.remove(key);
            self.record_miss();
            if self.config.track_metrics {
                self.metrics.record_expirations(1);
            }
            return None;
        }

        if self.config.track_metrics {
            self.metrics.record_hit();
        }
        storage.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Check whether a live entry exists without touching metrics
    pub fn contains_key(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.storage.read().entries.get(key).is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Remove a value from the cache
    pub fn remove(&self, key: &K) -> Option<V> {
        self.storage.write().remove(key).map(|entry| entry.value)
    }

    /// Clear all entries and reset metrics
    pub fn clear(&self) {
        let mut storage = self.storage.write();
        storage.entries.clear();
        storage.insertion_order.clear();
        self.metrics.reset();
    }

    /// Get the current number of entries, including not-yet-swept expired ones
    pub fn len(&self) -> usize {
        self.storage.read().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        if self.config.ttl.is_none() {
            return 0;
        }
        let now = self.clock.now();
        let removed = self.storage.write().retain(|_, entry| !self.is_expired(entry, now));

        if self.config.track_metrics && removed > 0 {
            self.metrics.record_expirations(removed as u64);
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_size)
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }

    fn record_miss(&self) {
        if self.config.track_metrics {
            self.metrics.record_miss();
        }
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone + AsRef<str>,
    V: Clone,
    C: Clock,
{
    /// Remove every entry whose key matches `pattern`
    ///
    /// Plain strings match as substrings; pass a [`KeyPattern::Regex`] (or a
    /// compiled [`Regex`]) for expression matching. Returns the number of
    /// entries removed, so repeating an invalidation removes nothing.
    pub fn invalidate(&self, pattern: impl Into<KeyPattern>) -> usize {
        let pattern = pattern.into();
        let removed = self.storage.write().retain(|key, _| !pattern.matches(key.as_ref()));

        if self.config.track_metrics && removed > 0 {
            self.metrics.record_invalidations(removed as u64);
        }
        removed
    }

    /// Snapshot of the keys currently stored, oldest first
    pub fn keys(&self) -> Vec<K> {
        self.storage.read().insertion_order.iter().cloned().collect()
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::core.
    use std::time::Duration;

    use super::*;
    use crate::resilience::MockClock;

    fn ttl_cache(ttl_ms: u64) -> (Cache<String, i32, MockClock>, MockClock) {
        let clock = MockClock::new();
        let cache =
            Cache::with_clock(CacheConfig::ttl(Duration::from_millis(ttl_ms)), clock.clone());
        (cache, clock)
    }

    /// Validates the lazy expiry on read scenario.
    ///
    /// Assertions:
    /// - A read inside the TTL returns the value.
    /// - A read past the TTL returns `None` and removes the entry.
    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let (cache, clock) = ttl_cache(5_000);
        cache.insert("GET /projects/42".to_string(), 42);

        clock.advance_millis(2_000);
        assert_eq!(cache.get(&"GET /projects/42".to_string()), Some(42));

        clock.advance_millis(4_000);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"GET /projects/42".to_string()), None);
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.expirations), (1, 1, 1));
    }

    #[test]
    fn test_evicts_oldest_inserted_not_least_recent() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::bounded(2));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        // Reading "a" does not protect it from eviction.
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.keys(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_refreshes_position_and_timestamp() {
        let clock = MockClock::new();
        let cache = Cache::with_clock(
            CacheConfig::ttl_bounded(Duration::from_millis(1_000), 2),
            clock.clone(),
        );
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        clock.advance_millis(800);
        cache.insert("a".to_string(), 10);
        assert_eq!(cache.len(), 2);

        cache.insert("c".to_string(), 3);
        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);

        clock.advance_millis(500);
        assert_eq!(cache.get(&"a".to_string()), Some(10));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::bounded(0));
        cache.insert("a".to_string(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_substring_is_idempotent() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::default());
        cache.insert("GET https://api/projects/1".to_string(), 1);
        cache.insert("GET https://api/projects/2".to_string(), 2);
        cache.insert("GET https://api/mentors/1".to_string(), 3);

        assert_eq!(cache.invalidate("/projects/"), 2);
        assert_eq!(cache.invalidate("/projects/"), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_invalidate_regex() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::default());
        cache.insert("GET /projects/1".to_string(), 1);
        cache.insert("GET /projects/1/members".to_string(), 2);
        cache.insert("POST-like /projects/9".to_string(), 3);

        let pattern = KeyPattern::regex(r"^GET /projects/\d+$").unwrap();
        assert_eq!(cache.invalidate(pattern), 1);
        assert!(cache.contains_key(&"GET /projects/1/members".to_string()));

        assert!(KeyPattern::regex("(unclosed").is_err());
    }

    #[test]
    fn test_cleanup_expired() {
        let (cache, clock) = ttl_cache(1_000);
        cache.insert("old".to_string(), 1);
        clock.advance_millis(600);
        cache.insert("new".to_string(), 2);
        clock.advance_millis(500);

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.keys(), vec!["new".to_string()]);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_clear_resets_entries_and_metrics() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::default());
        cache.insert("a".to_string(), 1);
        cache.get(&"a".to_string());
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache: Cache<String, i32> = Cache::new(CacheConfig::default());
        let clone = cache.clone();
        clone.insert("k".to_string(), 7);
        assert_eq!(cache.get(&"k".to_string()), Some(7));
        assert!(cache.remove(&"k".to_string()).is_some());
        assert!(clone.is_empty());
    }
}
