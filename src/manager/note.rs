use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::collaborators::{NoteId, ScoreVector, SourceId, SourceRating};
use crate::fingerprint::Fingerprint;
use crate::metrics::ProcessingMetadata;

/// Persisted result of processing one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Assigned by the note store; `None` until saved
    pub id: Option<NoteId>,
    pub title: String,
    /// Content in the target language
    pub content: String,
    pub original_language: String,
    /// Fingerprint of the content as received, before translation
    pub fingerprint: Fingerprint,
    pub source_id: SourceId,
    pub reposted_from: Option<SourceId>,
    pub scores: ScoreVector,
    pub source_rating: Option<SourceRating>,
}

/// Result of a successful `process` call
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub note: Arc<Note>,
    /// The note already existed; nothing was evaluated or saved
    pub cache_hit: bool,
    pub metadata: ProcessingMetadata,
}
