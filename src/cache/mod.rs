//! Bounded, thread-safe caches with time-to-live expiry.
//!
//! [`TimedCache`] is the memoization layer shared by the embedding,
//! similarity, sentiment and dedup workloads. Eviction under capacity pressure
//! is FIFO by insertion order, not LRU: reading an entry never changes which
//! entry goes next. Expired entries are invisible to readers from the moment
//! their TTL elapses and are physically dropped on access, when space is
//! needed, or by [`TimedCache::purge_expired`].

mod memoize;
mod registry;
mod stats;

pub use memoize::{memoize, memoize_pair, Memoized, MemoizedPair};
pub use registry::{CacheRegistry, DedupCache, Embedding, EmbeddingCache, SentimentCache, SimilarityCache};
pub use stats::{hit_rate, CacheStats};

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::CacheConfig;
use stats::Counters;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    /// How long the value took to compute
    cost: Duration,
    /// Insertion sequence number; matches exactly one `order` slot
    seq: u64,
}

struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion order is eviction order. Slots whose key was removed or
    /// re-inserted since are stale and skipped.
    order: VecDeque<(K, u64)>,
    next_seq: u64,
    counters: Counters,
}

impl<K, V> CacheInner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn is_current(&self, key: &K, seq: u64) -> bool {
        self.entries.get(key).map(|entry| entry.seq == seq).unwrap_or(false)
    }

    /// Removes the oldest live insertion, skipping stale slots.
    fn pop_oldest(&mut self) -> Option<K> {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.is_current(&key, seq) {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    /// Drops stale slots once they outnumber the live entries.
    fn compact_order(&mut self) {
        if self.order.len() <= self.entries.len() * 2 + 16 {
            return;
        }
        let order = std::mem::take(&mut self.order);
        self.order = order
            .into_iter()
            .filter(|(key, seq)| self.is_current(key, *seq))
            .collect();
    }
}

/// Thread-safe cache with a capacity bound, optional TTL and statistics
///
/// Every instance owns its own lock; separate caches never contend.
///
/// # Examples
///
/// ```
/// use fakecheck_core::{CacheConfig, TimedCache};
/// use std::time::Duration;
///
/// let cache = TimedCache::new(CacheConfig::new(2, Some(Duration::from_secs(60))).unwrap());
/// cache.set("a".to_string(), 1);
/// cache.set("b".to_string(), 2);
/// cache.set("c".to_string(), 3); // evicts "a", the oldest insertion
///
/// assert_eq!(cache.get("a"), None);
/// assert_eq!(cache.get("c"), Some(3));
///
/// let stats = cache.get_stats();
/// assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 1, 1));
/// assert_eq!(stats.hit_rate, 0.5);
/// ```
pub struct TimedCache<K, V> {
    name: String,
    config: CacheConfig,
    inner: Mutex<CacheInner<K, V>>,
}

impl<K, V> TimedCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self::named("cache", config)
    }

    /// A cache whose log events carry `name`
    pub fn named(name: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(config.max_entries().min(1024)),
                order: VecDeque::with_capacity(config.max_entries().min(1024)),
                next_seq: 0,
                counters: Counters::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.config.max_entries()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.config.ttl()
    }

    fn is_live(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        match self.config.ttl() {
            Some(ttl) => now.saturating_duration_since(entry.inserted_at) <= ttl,
            None => true,
        }
    }

    /// Returns the value if present and live. Counts exactly one hit or miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let live = inner.entries.get(key).map(|entry| self.is_live(entry, now));
        match live {
            None => {
                inner.counters.record_miss();
                None
            }
            Some(false) => {
                if let Some((expired, _)) = inner.entries.remove_entry(key) {
                    tracing::trace!(cache = %self.name, key = ?expired, "expired entry dropped on access");
                }
                inner.compact_order();
                inner.counters.expirations += 1;
                inner.counters.record_miss();
                None
            }
            Some(true) => {
                let entry = inner.entries.get(key)?;
                inner.counters.record_hit(entry.cost);
                Some(entry.value.clone())
            }
        }
    }

    /// Live-entry check without touching the statistics
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let guard = self.inner.lock();
        guard
            .entries
            .get(key)
            .map(|entry| self.is_live(entry, now))
            .unwrap_or(false)
    }

    pub fn set(&self, key: K, value: V) {
        self.set_with_cost(key, value, Duration::ZERO);
    }

    /// Inserts or overwrites `key`, remembering how long `value` took to
    /// compute. Overwrites keep the key's original eviction position.
    pub fn set_with_cost(&self, key: K, value: V, cost: Duration) {
        let now = Instant::now();
        let mut guard = self.inner.lock();

        if let Some(entry) = guard.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            entry.cost = cost;
            return;
        }

        if guard.entries.len() >= self.capacity() {
            self.purge_expired_locked(&mut guard, now);
        }
        while guard.entries.len() >= self.capacity() {
            match guard.pop_oldest() {
                Some(evicted) => {
                    guard.counters.evictions += 1;
                    tracing::debug!(cache = %self.name, key = ?evicted, "evicted oldest entry");
                }
                None => break,
            }
        }

        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.order.push_back((key.clone(), seq));
        guard.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                cost,
                seq,
            },
        );
    }

    /// Looks `key` up and, on a miss, computes and stores the value.
    ///
    /// The computation runs without the cache lock held, so two threads that
    /// miss on the same key at once may both compute it; the later store wins.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let started = Instant::now();
        let value = compute();
        self.set_with_cost(key, value.clone(), started.elapsed());
        value
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.inner.lock();
        let removed = guard.entries.remove(key).map(|entry| entry.value);
        guard.compact_order();
        removed
    }

    /// Drops every expired entry now. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        self.purge_expired_locked(&mut guard, now)
    }

    fn purge_expired_locked(&self, inner: &mut CacheInner<K, V>, now: Instant) -> usize {
        if self.config.ttl().is_none() {
            return 0;
        }
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| self.is_live(entry, now));
        let purged = before - inner.entries.len();
        inner.compact_order();
        if purged > 0 {
            inner.counters.expirations += purged as u64;
            tracing::debug!(cache = %self.name, purged, "purged expired entries");
        }
        purged
    }

    /// Empties the cache. Statistics are kept; see [`reset_stats`](Self::reset_stats).
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let dropped = guard.entries.len();
        guard.entries.clear();
        guard.order.clear();
        tracing::info!(cache = %self.name, dropped, "cache cleared");
    }

    pub fn reset_stats(&self) {
        self.inner.lock().counters = Counters::default();
    }

    pub fn get_stats(&self) -> CacheStats {
        let guard = self.inner.lock();
        guard.counters.snapshot(guard.entries.len(), self.capacity())
    }

    /// Entries physically present, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> fmt::Debug for TimedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("name", &self.name)
            .field("max_entries", &self.config.max_entries())
            .field("ttl", &self.config.ttl())
            .finish()
    }
}
