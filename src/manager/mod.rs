//! Orchestration of dedup, translation, evaluation, rating and persistence.
//!
//! [`ProcessingManager`] turns raw items into persisted [`Note`]s. Each item is
//! fingerprinted first; content seen before is served from the dedup cache or
//! the note store without touching the translator or evaluator. Everything
//! else goes through translate → evaluate → rate source → persist, and every
//! item, new or duplicate, leaves a [`ProcessingMetadata`] record behind.

mod batch;
pub mod collaborators;
mod note;

pub use batch::{BatchItem, BatchOptions, BatchOutcome, BatchProgress};
pub use collaborators::{
    EvaluationContext, Evaluator, GraphStore, NoteId, NoteStore, ScoreVector, SourceId, SourceRater, SourceRating,
    SourceRatingStore, Translator,
};
pub use note::{Note, ProcessOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::cache::CacheStats;
use crate::config::AppConfig;
use crate::container::context::AppContext;
use crate::container::ServiceContainer;
use crate::error::{CollaboratorError, CoreError, CoreResult, Stage};
use crate::fingerprint::{word_count, Fingerprint};
use crate::metrics::{PerformanceStats, PerformanceTracker, ProcessingMetadata};

/// Translated and scored content, ready to be rated and saved
#[derive(Debug, Clone)]
pub(crate) struct Evaluated {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) scores: ScoreVector,
}

/// Processes items against the collaborators it was built with.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
///
/// # Examples
///
/// ```
/// use fakecheck_core::manager::*;
/// use fakecheck_core::{AppConfig, AppContext, Fingerprint};
/// use std::sync::atomic::{AtomicI64, Ordering};
///
/// struct Passthrough;
/// impl Translator for Passthrough {
///     fn translate(&self, text: &str, _: &str, _: &str) -> anyhow::Result<String> {
///         Ok(text.to_string())
///     }
/// }
///
/// struct Length;
/// impl Evaluator for Length {
///     fn evaluate(&self, text: &str, _: &EvaluationContext) -> anyhow::Result<ScoreVector> {
///         Ok([("length".to_string(), text.len() as f64)].into_iter().collect())
///     }
/// }
///
/// struct Neutral;
/// impl SourceRater for Neutral {
///     fn rate_source(&self, source_id: SourceId) -> anyhow::Result<SourceRating> {
///         Ok(SourceRating { source_id, score: 0.5, notes_rated: 0 })
///     }
/// }
///
/// #[derive(Default)]
/// struct Store(AtomicI64);
/// impl NoteStore for Store {
///     fn save_note(&self, _: &Note) -> anyhow::Result<NoteId> {
///         Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
///     }
///     fn find_by_fingerprint(&self, _: &Fingerprint) -> anyhow::Result<Option<Note>> {
///         Ok(None)
///     }
/// }
/// impl SourceRatingStore for Store {
///     fn save_source_rating(&self, _: SourceId, _: &SourceRating) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// let store = std::sync::Arc::new(Store::default());
/// let manager = ProcessingManager::builder(AppContext::default())
///     .config(AppConfig::default())
///     .translator(std::sync::Arc::new(Passthrough))
///     .evaluator(std::sync::Arc::new(Length))
///     .source_rater(std::sync::Arc::new(Neutral))
///     .note_store(store.clone())
///     .source_rating_store(store)
///     .build()
///     .unwrap();
///
/// let first = manager.process("Headline", "Same words", 7, "english").unwrap();
/// let again = manager.process("Headline", "Same   words", 7, "english").unwrap();
/// assert!(!first.cache_hit);
/// assert!(again.cache_hit);
/// assert_eq!(again.note.id, Some(1));
/// assert_eq!(manager.get_performance_stats().total_processed, 2);
/// ```
pub struct ProcessingManager {
    context: AppContext,
    config: Arc<AppConfig>,
    translator: Arc<dyn Translator>,
    evaluator: Arc<dyn Evaluator>,
    source_rater: Arc<dyn SourceRater>,
    note_store: Arc<dyn NoteStore>,
    rating_store: Arc<dyn SourceRatingStore>,
    graph_store: Option<Arc<dyn GraphStore>>,
    pool: rayon::ThreadPool,
    tracker: PerformanceTracker,
}

/// Assembles a [`ProcessingManager`].
///
/// Collaborators not set explicitly are resolved from the context's container
/// under the names in [`collaborators`]. The graph store is optional and only
/// resolved when the container has one.
pub struct ProcessingManagerBuilder {
    context: AppContext,
    config: Option<AppConfig>,
    translator: Option<Arc<dyn Translator>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    source_rater: Option<Arc<dyn SourceRater>>,
    note_store: Option<Arc<dyn NoteStore>>,
    rating_store: Option<Arc<dyn SourceRatingStore>>,
    graph_store: Option<Arc<dyn GraphStore>>,
}

fn resolve<T>(container: &ServiceContainer, explicit: Option<Arc<T>>, name: &str) -> CoreResult<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    match explicit {
        Some(service) => Ok(service),
        None => Ok(container.get::<Arc<T>>(name)?.as_ref().clone()),
    }
}

impl ProcessingManagerBuilder {
    /// Uses `config` instead of the container's application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn source_rater(mut self, source_rater: Arc<dyn SourceRater>) -> Self {
        self.source_rater = Some(source_rater);
        self
    }

    pub fn note_store(mut self, note_store: Arc<dyn NoteStore>) -> Self {
        self.note_store = Some(note_store);
        self
    }

    pub fn source_rating_store(mut self, rating_store: Arc<dyn SourceRatingStore>) -> Self {
        self.rating_store = Some(rating_store);
        self
    }

    pub fn graph_store(mut self, graph_store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(graph_store);
        self
    }

    pub fn build(self) -> CoreResult<ProcessingManager> {
        let container = self.context.container().clone();
        let config = match self.config {
            Some(config) => Arc::new(config),
            None => container.app_config()?,
        };

        let workers = config.batch_workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("fakecheck-batch-{}", index))
            .build()
            .map_err(|e| CoreError::ServiceConstruction {
                name: "batch_pool".to_string(),
                source: Box::new(e),
            })?;

        let graph_store = match self.graph_store {
            Some(store) => Some(store),
            None if container.contains(collaborators::GRAPH_STORE) => {
                Some(resolve::<dyn GraphStore>(&container, None, collaborators::GRAPH_STORE)?)
            }
            None => None,
        };

        tracing::debug!(
            workers,
            cache_enabled = config.cache_enabled(),
            graph = graph_store.is_some(),
            "processing manager ready"
        );

        Ok(ProcessingManager {
            translator: resolve(&container, self.translator, collaborators::TRANSLATOR)?,
            evaluator: resolve(&container, self.evaluator, collaborators::EVALUATOR)?,
            source_rater: resolve(&container, self.source_rater, collaborators::SOURCE_RATER)?,
            note_store: resolve(&container, self.note_store, collaborators::NOTE_STORE)?,
            rating_store: resolve(&container, self.rating_store, collaborators::SOURCE_RATING_STORE)?,
            graph_store,
            tracker: PerformanceTracker::new(config.history_capacity()),
            context: self.context,
            config,
            pool,
        })
    }
}

impl ProcessingManager {
    pub fn builder(context: AppContext) -> ProcessingManagerBuilder {
        ProcessingManagerBuilder {
            context,
            config: None,
            translator: None,
            evaluator: None,
            source_rater: None,
            note_store: None,
            rating_store: None,
            graph_store: None,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Processes one item.
    ///
    /// Duplicates (same normalized content as an earlier item) return the
    /// existing note with `cache_hit` set. Translation, evaluation, rating and
    /// persistence failures are returned as [`CoreError::Collaborator`].
    pub fn process(&self, title: &str, content: &str, source_id: SourceId, language: &str) -> CoreResult<ProcessOutcome> {
        self.process_item(&BatchItem::new(title, content, source_id, language))
    }

    /// Like [`process`](Self::process), carrying the item's optional
    /// reposted-from source onto the note.
    pub fn process_item(&self, item: &BatchItem) -> CoreResult<ProcessOutcome> {
        let started = Instant::now();
        let fingerprint = Fingerprint::of(&item.content);

        if let Some(note) = self.find_duplicate(&fingerprint)? {
            return Ok(self.finish(item, note, true, started.elapsed()));
        }

        let evaluated = self.evaluate_item(item)?;
        let rating = self.rate_source(item.source_id)?;
        let note = self.persist(item, fingerprint, evaluated, rating)?;
        Ok(self.finish(item, note, false, started.elapsed()))
    }

    /// Dedup cache first, then the note store. A store hit is written back to
    /// the cache. Always `None` with caching disabled.
    pub(crate) fn find_duplicate(&self, fingerprint: &Fingerprint) -> CoreResult<Option<Arc<Note>>> {
        if !self.config.cache_enabled() {
            return Ok(None);
        }

        let dedup = self.context.caches().dedup();
        if let Some(note) = dedup.get(fingerprint) {
            tracing::debug!(fingerprint = fingerprint.short(), "duplicate found in cache");
            return Ok(Some(note));
        }

        let stored = self
            .note_store
            .find_by_fingerprint(fingerprint)
            .map_err(|e| CollaboratorError::new(Stage::DuplicateLookup, e))?;
        Ok(stored.map(|note| {
            tracing::debug!(fingerprint = fingerprint.short(), "duplicate found in note store");
            let note = Arc::new(note);
            dedup.set(fingerprint.clone(), note.clone());
            note
        }))
    }

    fn needs_translation(&self, language: &str) -> bool {
        let language = language.trim();
        !language.is_empty() && !language.eq_ignore_ascii_case(self.config.target_language())
    }

    pub(crate) fn translate(&self, text: &str, language: &str) -> CoreResult<String> {
        if !self.needs_translation(language) {
            return Ok(text.to_string());
        }
        self.translator
            .translate(text, language, self.config.target_language())
            .map_err(|e| CollaboratorError::new(Stage::Translation, e).into())
    }

    pub(crate) fn evaluation_context(&self, title: &str, item: &BatchItem) -> EvaluationContext {
        EvaluationContext {
            title: title.to_string(),
            source_id: item.source_id,
            original_language: item.language.clone(),
            similarity_threshold: self.config.similarity_threshold(),
            propaganda_threshold: self.config.propaganda_threshold(),
            average_news_simplicity: self.config.average_news_simplicity(),
            chatgpt_enabled: self.config.is_chatgpt_processor_enabled(),
        }
    }

    /// Translates title and content when needed, then scores the content.
    pub(crate) fn evaluate_item(&self, item: &BatchItem) -> CoreResult<Evaluated> {
        let title = self.translate(&item.title, &item.language)?;
        let content = self.translate(&item.content, &item.language)?;
        let scores = self
            .evaluator
            .evaluate(&content, &self.evaluation_context(&title, item))
            .map_err(|e| CollaboratorError::new(Stage::Evaluation, e))?;
        Ok(Evaluated { title, content, scores })
    }

    pub(crate) fn rate_source(&self, source_id: SourceId) -> CoreResult<SourceRating> {
        self.source_rater
            .rate_source(source_id)
            .map_err(|e| CollaboratorError::new(Stage::SourceRating, e).into())
    }

    /// Rates every distinct source in `source_ids` on the worker pool.
    ///
    /// Sources that fail to rate are logged and left out, as are sources
    /// whose rating covers no notes yet. Callers pass only visible sources.
    pub fn get_sources_with_ratings(&self, source_ids: &[SourceId]) -> BTreeMap<SourceId, SourceRating> {
        let sources: Vec<SourceId> = source_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if sources.is_empty() {
            return BTreeMap::new();
        }

        let ratings: BTreeMap<SourceId, SourceRating> = self.pool.install(|| {
            sources
                .par_iter()
                .filter_map(|&source_id| match self.rate_source(source_id) {
                    Ok(rating) if rating.notes_rated > 0 => Some((source_id, rating)),
                    Ok(_) => None,
                    Err(error) => {
                        tracing::warn!(source = source_id, %error, "skipping source that could not be rated");
                        None
                    }
                })
                .collect()
        });

        tracing::debug!(requested = sources.len(), rated = ratings.len(), "source ratings collected");
        ratings
    }

    /// Saves the note, then the source rating, then caches the note. The
    /// graph store, when present, is written last and never fails the item.
    pub(crate) fn persist(
        &self,
        item: &BatchItem,
        fingerprint: Fingerprint,
        evaluated: Evaluated,
        rating: SourceRating,
    ) -> CoreResult<Arc<Note>> {
        let mut note = Note {
            id: None,
            title: evaluated.title,
            content: evaluated.content,
            original_language: item.language.clone(),
            fingerprint,
            source_id: item.source_id,
            reposted_from: item.reposted_from,
            scores: evaluated.scores,
            source_rating: None,
        };

        let id = self
            .note_store
            .save_note(&note)
            .map_err(|e| CollaboratorError::new(Stage::Persistence, e))?;
        note.id = Some(id);

        self.rating_store
            .save_source_rating(item.source_id, &rating)
            .map_err(|e| CollaboratorError::new(Stage::Persistence, e))?;
        note.source_rating = Some(rating);

        if let Some(original) = note.reposted_from {
            tracing::info!(note = id, source = item.source_id, original, "note reposts another source");
        }
        if let Some(graph) = &self.graph_store {
            if let Err(error) = graph.save_note(&note, item.source_id, &item.title) {
                tracing::warn!(note = id, source = item.source_id, %error, "failed to save note to graph store");
            }
        }

        let note = Arc::new(note);
        if self.config.cache_enabled() {
            self.context.caches().dedup().set(note.fingerprint.clone(), note.clone());
        }
        Ok(note)
    }

    pub(crate) fn finish(&self, item: &BatchItem, note: Arc<Note>, cache_hit: bool, elapsed: Duration) -> ProcessOutcome {
        let metadata = ProcessingMetadata::new(item.title.clone(), word_count(&item.content), elapsed, cache_hit);
        tracing::debug!(
            item = %metadata.item_id,
            words = metadata.word_count,
            elapsed = ?metadata.elapsed,
            cache_hit,
            "item processed"
        );
        self.tracker.record(metadata.clone());
        ProcessOutcome {
            note,
            cache_hit,
            metadata,
        }
    }

    /// Totals over every processed item plus per-cache statistics.
    pub fn get_performance_stats(&self) -> PerformanceStats {
        let mut stats = self.tracker.summary();
        if self.config.cache_enabled() {
            stats.caches = self.get_cache_stats();
        }
        stats
    }

    pub fn get_cache_stats(&self) -> BTreeMap<String, CacheStats> {
        self.context.caches().all_stats()
    }

    pub fn clear_caches(&self) {
        self.context.caches().clear_all();
    }

    /// Retained processing records, oldest first
    pub fn history(&self) -> Vec<ProcessingMetadata> {
        self.tracker.history()
    }
}

impl fmt::Debug for ProcessingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingManager")
            .field("workers", &self.pool.current_num_threads())
            .field("cache_enabled", &self.config.cache_enabled())
            .field("target_language", &self.config.target_language())
            .field("graph_store", &self.graph_store.is_some())
            .finish()
    }
}
