//! Error types for the container, configuration and processing pipeline.

use std::fmt;

use thiserror::Error;

/// Errors raised by fakecheck-core.
///
/// Configuration and lookup errors are fatal to the caller that triggered
/// them. Collaborator failures are raised per work item; batch processing
/// catches them and records them on the item's [`BatchOutcome`](crate::BatchOutcome).
///
/// # Examples
///
/// ```rust
/// use fakecheck_core::{CoreError, ServiceContainer};
///
/// let container = ServiceContainer::new();
/// match container.get_any("translator") {
///     Err(CoreError::ServiceNotFound(name)) => assert_eq!(name, "translator"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tunable was rejected at construction time
    #[error("Configuration error: `{field}` {reason} (got {value})")]
    Configuration {
        field: String,
        value: String,
        reason: String,
    },

    /// Container asked for a name that was never registered
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Stored instance is not of the requested type
    #[error("Type mismatch for {name}: expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// A fallible factory failed to build its service
    #[error("Failed to construct service {name}: {source}")]
    ServiceConstruction {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An external collaborator failed for one work item
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Work was skipped because a stop signal was raised
    #[error("Operation was cancelled")]
    Cancelled,
}

impl CoreError {
    /// Builds a configuration error naming the offending field and value.
    pub fn configuration(
        field: impl Into<String>,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::Configuration {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the collaborator stage for collaborator failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CoreError::Collaborator(err) => Some(err.stage),
            _ => None,
        }
    }
}

/// The pipeline step a collaborator failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    DuplicateLookup,
    Translation,
    Evaluation,
    SourceRating,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DuplicateLookup => "duplicate lookup",
            Stage::Translation => "translation",
            Stage::Evaluation => "evaluation",
            Stage::SourceRating => "source rating",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Failure reported by a translator, evaluator, rater or store.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct CollaboratorError {
    pub stage: Stage,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl CollaboratorError {
    pub fn new(stage: Stage, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Result type for fakecheck-core operations.
pub type CoreResult<T> = Result<T, CoreError>;
