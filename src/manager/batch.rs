//! Batch processing with per-item failure isolation.
//!
//! A batch runs in three passes:
//!
//! 1. In input order: check for cancellation, resolve duplicates, translate
//!    and evaluate. Content repeated inside the batch is evaluated once.
//! 2. On the worker pool: rate every distinct source still needed, once each.
//! 3. In input order: persist, cache and record each item, and report
//!    progress.
//!
//! A failure in any pass fails only the item it belongs to.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::{Evaluated, Note, ProcessOutcome, ProcessingManager, SourceId, SourceRating};
use crate::cancellation::CancellationToken;
use crate::error::{CoreError, CoreResult};
use crate::fingerprint::Fingerprint;

const PROGRESS_INTERVAL: usize = 10;

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub title: String,
    pub content: String,
    pub source_id: SourceId,
    /// Language the content is written in
    pub language: String,
    pub reposted_from: Option<SourceId>,
}

impl BatchItem {
    pub fn new(title: impl Into<String>, content: impl Into<String>, source_id: SourceId, language: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source_id,
            language: language.into(),
            reposted_from: None,
        }
    }

    pub fn reposted_from(mut self, source_id: SourceId) -> Self {
        self.reposted_from = Some(source_id);
        self
    }
}

/// Per-item batch result, in input order
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Succeeded(ProcessOutcome),
    Failed {
        /// The item's title
        item_id: String,
        error: Arc<CoreError>,
    },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded(_))
    }

    pub fn outcome(&self) -> Option<&ProcessOutcome> {
        match self {
            BatchOutcome::Succeeded(outcome) => Some(outcome),
            BatchOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            BatchOutcome::Succeeded(_) => None,
            BatchOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// True for items skipped because the batch was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error(), Some(CoreError::Cancelled))
    }
}

/// Progress report fired once per completed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items completed so far, this one included
    pub completed: usize,
    /// Items in the batch
    pub total: usize,
    /// Input position of the item just completed
    pub index: usize,
    pub succeeded: bool,
}

type ProgressCallback = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Options for [`ProcessingManager::process_batch_with`]
///
/// ```
/// use fakecheck_core::{BatchOptions, CancellationToken};
///
/// let token = CancellationToken::new();
/// let options = BatchOptions::new()
///     .show_progress(true)
///     .cancellation(token.clone())
///     .on_progress(|progress| println!("{}/{}", progress.completed, progress.total));
/// # let _ = options;
/// ```
#[derive(Default)]
pub struct BatchOptions {
    show_progress: bool,
    progress: Option<ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log progress every ten items and at the end
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("show_progress", &self.show_progress)
            .field("progress", &self.progress.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

/// State of one item between passes
enum Slot {
    Cancelled,
    Failed(Arc<CoreError>),
    Duplicate {
        note: Arc<Note>,
        elapsed: Duration,
    },
    Pending {
        fingerprint: Fingerprint,
        evaluated: Evaluated,
        /// Earlier position in this batch with the same content
        same_as: Option<usize>,
        elapsed: Duration,
    },
}

impl ProcessingManager {
    /// Processes `items` and returns one outcome per item, in input order.
    pub fn process_batch(&self, items: &[BatchItem], show_progress: bool) -> Vec<BatchOutcome> {
        self.process_batch_with(items, &BatchOptions::new().show_progress(show_progress))
    }

    /// [`process_batch`](Self::process_batch) with a progress callback and a
    /// cancellation token.
    ///
    /// Cancellation is checked before each item of the first pass. Items
    /// reached after the token fired are reported as failed with
    /// [`CoreError::Cancelled`]; items already past the check complete.
    #[tracing::instrument(skip_all, fields(items = items.len()))]
    pub fn process_batch_with(&self, items: &[BatchItem], options: &BatchOptions) -> Vec<BatchOutcome> {
        let started = Instant::now();
        let slots = self.prepare(items, options);
        let ratings = self.rate_sources(items, &slots);
        let outcomes = self.complete(items, slots, &ratings, options);

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let cancelled = outcomes.iter().filter(|o| o.is_cancelled()).count();
        tracing::info!(
            total = items.len(),
            succeeded,
            failed = items.len() - succeeded - cancelled,
            cancelled,
            elapsed = ?started.elapsed(),
            "batch finished"
        );
        outcomes
    }

    /// First pass: dedup, translate and evaluate in input order.
    fn prepare(&self, items: &[BatchItem], options: &BatchOptions) -> Vec<Slot> {
        let mut seen: HashMap<Fingerprint, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            if options.is_cancelled() {
                slots.push(Slot::Cancelled);
                continue;
            }

            let started = Instant::now();
            let fingerprint = Fingerprint::of(&item.content);

            let duplicate = match self.find_duplicate(&fingerprint) {
                Ok(duplicate) => duplicate,
                Err(error) => {
                    slots.push(Slot::Failed(Arc::new(error)));
                    continue;
                }
            };
            if let Some(note) = duplicate {
                slots.push(Slot::Duplicate {
                    note,
                    elapsed: started.elapsed(),
                });
                continue;
            }

            let earlier = seen.get(&fingerprint).copied();
            let evaluated = match earlier {
                Some(first) => self.reuse_evaluation(item, &slots[first]),
                None => self.evaluate_item(item),
            };
            match evaluated {
                Ok(evaluated) => {
                    seen.entry(fingerprint.clone()).or_insert(index);
                    slots.push(Slot::Pending {
                        fingerprint,
                        evaluated,
                        same_as: earlier,
                        elapsed: started.elapsed(),
                    });
                }
                Err(error) => slots.push(Slot::Failed(Arc::new(error))),
            }
        }
        slots
    }

    /// Scores of an earlier identical item, with this item's own title.
    fn reuse_evaluation(&self, item: &BatchItem, earlier: &Slot) -> CoreResult<Evaluated> {
        match earlier {
            Slot::Pending { evaluated, .. } => Ok(Evaluated {
                title: self.translate(&item.title, &item.language)?,
                content: evaluated.content.clone(),
                scores: evaluated.scores.clone(),
            }),
            _ => self.evaluate_item(item),
        }
    }

    /// Second pass: one rating per distinct source, on the worker pool.
    fn rate_sources(&self, items: &[BatchItem], slots: &[Slot]) -> HashMap<SourceId, (Result<SourceRating, Arc<CoreError>>, Duration)> {
        let mut sources: Vec<SourceId> = items
            .iter()
            .zip(slots)
            .filter(|(_, slot)| matches!(slot, Slot::Pending { .. }))
            .map(|(item, _)| item.source_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        sources.sort_unstable();

        if sources.is_empty() {
            return HashMap::new();
        }
        tracing::debug!(sources = sources.len(), workers = self.pool.current_num_threads(), "rating sources");

        self.pool.install(|| {
            sources
                .par_iter()
                .map(|&source_id| {
                    let started = Instant::now();
                    let rating = self.rate_source(source_id).map_err(Arc::new);
                    (source_id, (rating, started.elapsed()))
                })
                .collect()
        })
    }

    /// Third pass: persist and report in input order.
    fn complete(
        &self,
        items: &[BatchItem],
        slots: Vec<Slot>,
        ratings: &HashMap<SourceId, (Result<SourceRating, Arc<CoreError>>, Duration)>,
        options: &BatchOptions,
    ) -> Vec<BatchOutcome> {
        let total = items.len();
        let mut completed = 0;
        let mut persisted: HashMap<usize, Arc<Note>> = HashMap::new();
        let mut outcomes = Vec::with_capacity(total);

        for (index, (item, slot)) in items.iter().zip(slots).enumerate() {
            let outcome = match slot {
                Slot::Cancelled => {
                    outcomes.push(BatchOutcome::Failed {
                        item_id: item.title.clone(),
                        error: Arc::new(CoreError::Cancelled),
                    });
                    continue;
                }
                Slot::Failed(error) => Err(error),
                Slot::Duplicate { note, elapsed } => Ok(self.finish(item, note, true, elapsed)),
                Slot::Pending {
                    fingerprint,
                    evaluated,
                    same_as,
                    elapsed,
                } => {
                    let started = Instant::now();
                    let earlier = same_as
                        .filter(|_| self.config.cache_enabled())
                        .and_then(|first| persisted.get(&first).cloned());
                    match earlier {
                        Some(note) => Ok(self.finish(item, note, true, elapsed + started.elapsed())),
                        None => match ratings.get(&item.source_id) {
                            Some((Ok(rating), rating_elapsed)) => self
                                .persist(item, fingerprint, evaluated, rating.clone())
                                .map(|note| {
                                    persisted.insert(index, note.clone());
                                    self.finish(item, note, false, elapsed + *rating_elapsed + started.elapsed())
                                })
                                .map_err(Arc::new),
                            Some((Err(error), _)) => Err(error.clone()),
                            // Unreachable for pending items; rate inline rather than fail
                            None => self
                                .rate_source(item.source_id)
                                .and_then(|rating| self.persist(item, fingerprint, evaluated, rating))
                                .map(|note| {
                                    persisted.insert(index, note.clone());
                                    self.finish(item, note, false, elapsed + started.elapsed())
                                })
                                .map_err(Arc::new),
                        },
                    }
                }
            };

            completed += 1;
            let outcome = match outcome {
                Ok(outcome) => BatchOutcome::Succeeded(outcome),
                Err(error) => {
                    tracing::warn!(item = %item.title, stage = ?error.stage(), %error, "batch item failed");
                    BatchOutcome::Failed {
                        item_id: item.title.clone(),
                        error,
                    }
                }
            };

            if options.show_progress && (completed % PROGRESS_INTERVAL == 0 || index + 1 == total) {
                tracing::info!("Processing {}/{}...", index + 1, total);
            }
            if let Some(callback) = &options.progress {
                callback(BatchProgress {
                    completed,
                    total,
                    index,
                    succeeded: outcome.is_success(),
                });
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
