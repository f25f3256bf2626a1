//! Memoizing wrappers around pure text computations.

use std::fmt;
use std::sync::Arc;

use super::TimedCache;
use crate::fingerprint::Fingerprint;

/// A deterministic text computation fronted by a [`TimedCache`]
///
/// The key is the [`Fingerprint`] of the normalized input, so inputs that
/// differ only in whitespace share one entry. The computation itself receives
/// the input as given.
///
/// # Examples
///
/// ```
/// use fakecheck_core::{memoize, CacheConfig, TimedCache};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let cache = Arc::new(TimedCache::new(CacheConfig::new(100, None).unwrap()));
///
/// let length = memoize(cache, move |text: &str| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     text.len()
/// });
///
/// assert_eq!(length.call("hello world"), 11);
/// assert_eq!(length.call("  hello   world "), 11);
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct Memoized<F, V> {
    cache: Arc<TimedCache<Fingerprint, V>>,
    compute: F,
}

impl<F, V> Memoized<F, V>
where
    F: Fn(&str) -> V,
    V: Clone,
{
    pub fn new(cache: Arc<TimedCache<Fingerprint, V>>, compute: F) -> Self {
        Self { cache, compute }
    }

    pub fn call(&self, input: &str) -> V {
        let key = Fingerprint::of(input);
        self.cache.get_or_insert_with(key, || (self.compute)(input))
    }

    pub fn cache(&self) -> &Arc<TimedCache<Fingerprint, V>> {
        &self.cache
    }
}

impl<F, V> fmt::Debug for Memoized<F, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized").field("cache", &self.cache).finish()
    }
}

/// Like [`Memoized`] for symmetric two-text computations such as similarity:
/// `call(a, b)` and `call(b, a)` share one entry.
pub struct MemoizedPair<F, V> {
    cache: Arc<TimedCache<Fingerprint, V>>,
    compute: F,
}

impl<F, V> MemoizedPair<F, V>
where
    F: Fn(&str, &str) -> V,
    V: Clone,
{
    pub fn new(cache: Arc<TimedCache<Fingerprint, V>>, compute: F) -> Self {
        Self { cache, compute }
    }

    pub fn call(&self, a: &str, b: &str) -> V {
        let key = Fingerprint::of_pair(a, b);
        self.cache.get_or_insert_with(key, || (self.compute)(a, b))
    }

    pub fn cache(&self) -> &Arc<TimedCache<Fingerprint, V>> {
        &self.cache
    }
}

impl<F, V> fmt::Debug for MemoizedPair<F, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedPair").field("cache", &self.cache).finish()
    }
}

/// Wraps `compute` so repeated calls on the same normalized text hit `cache`.
pub fn memoize<F, V>(cache: Arc<TimedCache<Fingerprint, V>>, compute: F) -> Memoized<F, V>
where
    F: Fn(&str) -> V,
    V: Clone,
{
    Memoized::new(cache, compute)
}

/// Wraps a symmetric two-text computation.
pub fn memoize_pair<F, V>(cache: Arc<TimedCache<Fingerprint, V>>, compute: F) -> MemoizedPair<F, V>
where
    F: Fn(&str, &str) -> V,
    V: Clone,
{
    MemoizedPair::new(cache, compute)
}
