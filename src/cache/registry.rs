//! The named caches shared by one application context.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::{CacheStats, TimedCache};
use crate::config::{CacheConfig, CacheSettings};
use crate::fingerprint::Fingerprint;
use crate::manager::Note;

/// Vector representation of a text
pub type Embedding = Arc<[f32]>;

pub type EmbeddingCache = TimedCache<Fingerprint, Embedding>;
pub type SimilarityCache = TimedCache<Fingerprint, f64>;
pub type SentimentCache = TimedCache<Fingerprint, f64>;
/// Processed notes keyed by content fingerprint
pub type DedupCache = TimedCache<Fingerprint, Arc<Note>>;

/// Lazily created, independently locked named caches
///
/// Each accessor returns the same instance on every call for the lifetime of
/// the registry. A cache that was never asked for is never allocated and does
/// not show up in [`all_stats`](Self::all_stats).
///
/// # Examples
///
/// ```
/// use fakecheck_core::CacheRegistry;
/// use std::sync::Arc;
///
/// let caches = CacheRegistry::default();
/// assert!(Arc::ptr_eq(&caches.similarity(), &caches.similarity()));
/// assert!(caches.all_stats().contains_key("similarity"));
/// assert!(!caches.all_stats().contains_key("embedding"));
/// ```
#[derive(Debug)]
pub struct CacheRegistry {
    settings: CacheSettings,
    embedding: OnceCell<Arc<EmbeddingCache>>,
    similarity: OnceCell<Arc<SimilarityCache>>,
    sentiment: OnceCell<Arc<SentimentCache>>,
    dedup: OnceCell<Arc<DedupCache>>,
}

fn init<V: Clone>(cell: &OnceCell<Arc<TimedCache<Fingerprint, V>>>, name: &str, config: CacheConfig) -> Arc<TimedCache<Fingerprint, V>> {
    cell.get_or_init(|| {
        tracing::debug!(cache = name, max_entries = config.max_entries(), ttl = ?config.ttl(), "initializing cache");
        Arc::new(TimedCache::named(name, config))
    })
    .clone()
}

impl CacheRegistry {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            embedding: OnceCell::new(),
            similarity: OnceCell::new(),
            sentiment: OnceCell::new(),
            dedup: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn embedding(&self) -> Arc<EmbeddingCache> {
        init(&self.embedding, "embedding", self.settings.embedding)
    }

    pub fn similarity(&self) -> Arc<SimilarityCache> {
        init(&self.similarity, "similarity", self.settings.similarity)
    }

    pub fn sentiment(&self) -> Arc<SentimentCache> {
        init(&self.sentiment, "sentiment", self.settings.sentiment)
    }

    pub fn dedup(&self) -> Arc<DedupCache> {
        init(&self.dedup, "dedup", self.settings.dedup)
    }

    /// Statistics of every cache created so far, keyed by name
    pub fn all_stats(&self) -> BTreeMap<String, CacheStats> {
        let mut stats = BTreeMap::new();
        if let Some(cache) = self.embedding.get() {
            stats.insert("embedding".to_string(), cache.get_stats());
        }
        if let Some(cache) = self.similarity.get() {
            stats.insert("similarity".to_string(), cache.get_stats());
        }
        if let Some(cache) = self.sentiment.get() {
            stats.insert("sentiment".to_string(), cache.get_stats());
        }
        if let Some(cache) = self.dedup.get() {
            stats.insert("dedup".to_string(), cache.get_stats());
        }
        stats
    }

    /// Empties every cache created so far; statistics are kept
    pub fn clear_all(&self) {
        if let Some(cache) = self.embedding.get() {
            cache.clear();
        }
        if let Some(cache) = self.similarity.get() {
            cache.clear();
        }
        if let Some(cache) = self.sentiment.get() {
            cache.clear();
        }
        if let Some(cache) = self.dedup.get() {
            cache.clear();
        }
        tracing::info!("all caches cleared");
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
