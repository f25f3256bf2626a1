//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, bail};
use fakecheck_core::manager::{
    EvaluationContext, Evaluator, GraphStore, NoteId, NoteStore, ScoreVector, SourceId, SourceRater, SourceRating,
    SourceRatingStore, Translator,
};
use fakecheck_core::{AppConfig, AppContext, CancellationToken, Fingerprint, Note, ProcessingManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Content containing this word makes the evaluator fail
pub const EVALUATOR_POISON: &str = "explode";
/// Titles containing this word make the note store fail
pub const STORE_POISON: &str = "unsaveable";
/// Titles containing this word make the graph store fail
pub const GRAPH_POISON: &str = "unlinkable";

/// One fake standing in for every collaborator, recording each call
#[derive(Default)]
pub struct Fakes {
    pub translations: AtomicUsize,
    pub evaluations: AtomicUsize,
    pub rated_sources: Mutex<Vec<SourceId>>,
    pub saved_notes: Mutex<Vec<Note>>,
    pub saved_ratings: Mutex<Vec<(SourceId, SourceRating)>>,
    /// (note id, source id, title as received) per graph write
    pub graph_links: Mutex<Vec<(NoteId, SourceId, String)>>,
    /// Notes the store already knows, by fingerprint
    pub stored: Mutex<HashMap<Fingerprint, Note>>,
    pub failing_source: Mutex<Option<SourceId>>,
    /// Rated with zero notes behind the score
    pub unrated_source: Mutex<Option<SourceId>>,
    /// Cancel the token once this many evaluations have run
    pub cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    next_id: AtomicI64,
}

impl Fakes {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }

    pub fn saved_count(&self) -> usize {
        self.saved_notes.lock().unwrap().len()
    }

    pub fn rated_sources_sorted(&self) -> Vec<SourceId> {
        let mut sources = self.rated_sources.lock().unwrap().clone();
        sources.sort_unstable();
        sources
    }

    pub fn fail_source(&self, source_id: SourceId) {
        *self.failing_source.lock().unwrap() = Some(source_id);
    }

    pub fn mark_unrated(&self, source_id: SourceId) {
        *self.unrated_source.lock().unwrap() = Some(source_id);
    }

    pub fn graph_link_count(&self) -> usize {
        self.graph_links.lock().unwrap().len()
    }

    pub fn preload(&self, note: Note) {
        self.stored.lock().unwrap().insert(note.fingerprint.clone(), note);
    }
}

impl Translator for Fakes {
    fn translate(&self, text: &str, source_language: &str, target_language: &str) -> anyhow::Result<String> {
        self.translations.fetch_add(1, Ordering::SeqCst);
        if source_language == "klingon" {
            bail!("no dictionary for {}", source_language);
        }
        Ok(format!("[{}] {}", target_language, text))
    }
}

impl Evaluator for Fakes {
    fn evaluate(&self, text: &str, context: &EvaluationContext) -> anyhow::Result<ScoreVector> {
        let count = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if count >= *after {
                token.cancel();
            }
        }
        if text.contains(EVALUATOR_POISON) {
            return Err(anyhow!("evaluator crashed on {:?}", context.title));
        }

        let mut scores = ScoreVector::new();
        scores.insert("words".to_string(), text.split_whitespace().count() as f64);
        scores.insert("exclamations".to_string(), text.matches('!').count() as f64);
        Ok(scores)
    }
}

impl SourceRater for Fakes {
    fn rate_source(&self, source_id: SourceId) -> anyhow::Result<SourceRating> {
        self.rated_sources.lock().unwrap().push(source_id);
        if *self.failing_source.lock().unwrap() == Some(source_id) {
            bail!("source {} is unreachable", source_id);
        }
        let notes_rated = if *self.unrated_source.lock().unwrap() == Some(source_id) { 0 } else { 3 };
        Ok(SourceRating {
            source_id,
            score: 0.5,
            notes_rated,
        })
    }
}

impl NoteStore for Fakes {
    fn save_note(&self, note: &Note) -> anyhow::Result<NoteId> {
        if note.title.contains(STORE_POISON) {
            bail!("disk full");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut saved = note.clone();
        saved.id = Some(id);
        self.saved_notes.lock().unwrap().push(saved);
        Ok(id)
    }

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> anyhow::Result<Option<Note>> {
        Ok(self.stored.lock().unwrap().get(fingerprint).cloned())
    }
}

impl SourceRatingStore for Fakes {
    fn save_source_rating(&self, source_id: SourceId, rating: &SourceRating) -> anyhow::Result<()> {
        self.saved_ratings.lock().unwrap().push((source_id, rating.clone()));
        Ok(())
    }
}

impl GraphStore for Fakes {
    fn save_note(&self, note: &Note, source_id: SourceId, title: &str) -> anyhow::Result<()> {
        if title.contains(GRAPH_POISON) {
            bail!("graph database unavailable");
        }
        let id = note.id.ok_or_else(|| anyhow!("note {:?} was not saved first", note.title))?;
        self.graph_links.lock().unwrap().push((id, source_id, title.to_string()));
        Ok(())
    }
}

pub fn manager_in(fakes: &Arc<Fakes>, context: AppContext, config: AppConfig) -> ProcessingManager {
    ProcessingManager::builder(context)
        .config(config)
        .translator(fakes.clone())
        .evaluator(fakes.clone())
        .source_rater(fakes.clone())
        .note_store(fakes.clone())
        .source_rating_store(fakes.clone())
        .graph_store(fakes.clone())
        .build()
        .unwrap()
}

pub fn manager_with(fakes: &Arc<Fakes>, config: AppConfig) -> ProcessingManager {
    manager_in(fakes, AppContext::default(), config)
}

pub fn manager(fakes: &Arc<Fakes>) -> ProcessingManager {
    manager_with(fakes, AppConfig::default())
}
