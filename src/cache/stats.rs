//! Hit/miss accounting for timed caches.

use std::time::Duration;

use serde::Serialize;

/// Running counters kept under the cache lock
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub(crate) hits: u64,
    pub(crate) misses: u64,
    pub(crate) evictions: u64,
    pub(crate) expirations: u64,
    pub(crate) time_saved: Duration,
}

impl Counters {
    pub(crate) fn record_hit(&mut self, time_saved: Duration) {
        self.hits += 1;
        self.time_saved += time_saved;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn snapshot(&self, entries: usize, capacity: usize) -> CacheStats {
        CacheStats {
            entries,
            capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate: hit_rate(self.hits, self.misses),
            evictions: self.evictions,
            expirations: self.expirations,
            time_saved_secs: self.time_saved.as_secs_f64(),
        }
    }
}

/// `hits / (hits + misses)`, or 0 when nothing was looked up
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time statistics of one cache, suitable for monitoring export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries physically present, expired ones included until purged
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Fraction in `[0, 1]`
    pub hit_rate: f64,
    /// Entries dropped to make room for new keys
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Sum of the recorded compute cost of every value served from cache
    pub time_saved_secs: f64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(hit_rate(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        assert_eq!(hit_rate(10, 0), 1.0);
        assert!((hit_rate(10, 1) - 10.0 / 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_carries_time_saved() {
        let mut counters = Counters::default();
        counters.record_hit(Duration::from_millis(300));
        counters.record_hit(Duration::from_millis(200));
        counters.record_miss();

        let stats = counters.snapshot(2, 10);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.lookups(), 3);
        assert!((stats.time_saved_secs - 0.5).abs() < 1e-9);
    }
}
