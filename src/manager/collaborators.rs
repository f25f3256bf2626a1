//! Boundaries to the external services the manager delegates to.
//!
//! Implementations may block. The manager never holds a cache lock across a
//! collaborator call, and batch processing calls [`SourceRater`] from several
//! worker threads at once, as does
//! [`ProcessingManager::get_sources_with_ratings`](super::ProcessingManager::get_sources_with_ratings).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

use super::Note;

/// Identifier of a publishing source
pub type SourceId = i64;

/// Identifier assigned to a note by the [`NoteStore`]
pub type NoteId = i64;

/// Dimension name to score, as produced by the [`Evaluator`]. The core never
/// interprets the scores.
pub type ScoreVector = BTreeMap<String, f64>;

/// Container names the manager builder resolves missing collaborators from.
///
/// Each is registered as an `Arc<dyn Trait>` value, for example
/// `container.register_instance(TRANSLATOR, translator as Arc<dyn Translator>)`.
pub const TRANSLATOR: &str = "translator";
pub const EVALUATOR: &str = "evaluator";
pub const SOURCE_RATER: &str = "source_rater";
pub const NOTE_STORE: &str = "note_store";
pub const SOURCE_RATING_STORE: &str = "source_rating_store";
/// Optional; the manager runs without a graph store when none is registered.
pub const GRAPH_STORE: &str = "graph_store";

/// Aggregate credibility of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRating {
    pub source_id: SourceId,
    pub score: f64,
    /// Number of notes the score was computed from
    pub notes_rated: usize,
}

/// What the evaluator knows about the text besides its content
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    /// Title, translated along with the content
    pub title: String,
    pub source_id: SourceId,
    /// Language the item arrived in
    pub original_language: String,
    pub similarity_threshold: f64,
    pub propaganda_threshold: f64,
    pub average_news_simplicity: f64,
    pub chatgpt_enabled: bool,
}

pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source_language: &str, target_language: &str) -> anyhow::Result<String>;
}

pub trait Evaluator: Send + Sync {
    fn evaluate(&self, text: &str, context: &EvaluationContext) -> anyhow::Result<ScoreVector>;
}

pub trait SourceRater: Send + Sync {
    fn rate_source(&self, source_id: SourceId) -> anyhow::Result<SourceRating>;
}

pub trait NoteStore: Send + Sync {
    /// Persists `note` and returns its new id.
    fn save_note(&self, note: &Note) -> anyhow::Result<NoteId>;

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> anyhow::Result<Option<Note>>;
}

pub trait SourceRatingStore: Send + Sync {
    fn save_source_rating(&self, source_id: SourceId, rating: &SourceRating) -> anyhow::Result<()>;
}

/// Relationship graph of notes, sources and reposts
///
/// Writes are best effort: a failure is logged and the note stays saved.
/// Connection settings come from [`GraphConfig`](crate::GraphConfig).
pub trait GraphStore: Send + Sync {
    /// Links an already persisted note (its id is set) to `source_id`.
    /// `title` is the title as received, before translation.
    fn save_note(&self, note: &Note, source_id: SourceId, title: &str) -> anyhow::Result<()>;
}
