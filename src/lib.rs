//! # fakecheck-core
//!
//! Service lifecycle, caching and batch orchestration for a propaganda
//! analysis pipeline.
//!
//! ## Features
//!
//! - **Service container**: named factories with lazy, at-most-once singletons
//! - **Validated configuration**: database, graph and application settings from
//!   the environment, a mapping, JSON or YAML
//! - **Timed caches**: bounded FIFO caches with TTL expiry and hit-rate
//!   statistics, plus memoizing wrappers for text computations
//! - **Batch manager**: fingerprint dedup, translation, evaluation and source
//!   rating through pluggable collaborators, with per-item failure isolation
//!
//! The scoring algorithms, translation engine and storage live outside this
//! crate, behind the traits in [`manager::collaborators`].
//!
//! ## Quick Start
//!
//! ```rust
//! use fakecheck_core::{AppConfig, AppContext, FullConfig, memoize};
//! use std::sync::Arc;
//!
//! let config = FullConfig {
//!     app: AppConfig::builder().similarity_threshold(0.9).build().unwrap(),
//!     ..FullConfig::default()
//! };
//! let context = AppContext::from_config(config);
//!
//! // Shared services live in the container
//! context.container().register_factory("stopwords", || vec!["the", "a", "an"], true);
//! let stopwords = context.container().get::<Vec<&str>>("stopwords").unwrap();
//! assert_eq!(stopwords.len(), 3);
//!
//! // Expensive text computations go through a named cache
//! let sentiment = memoize(context.caches().sentiment(), |text: &str| {
//!     if text.contains("disaster") { -0.8 } else { 0.1 }
//! });
//! assert_eq!(sentiment.call("A looming disaster"), -0.8);
//! assert_eq!(sentiment.call("A   looming disaster"), -0.8);
//! assert_eq!(context.caches().sentiment().get_stats().hits, 1);
//! ```
//!
//! ## Logging
//!
//! Every component reports through `tracing`. Applications that want the
//! events printed call [`logging::init_tracing`] once at startup.

pub mod cache;
pub mod cancellation;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod fingerprint;
pub mod lifetime;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod observer;

mod registration;

pub use cache::{
    hit_rate, memoize, memoize_pair, CacheRegistry, CacheStats, DedupCache, Embedding, EmbeddingCache, Memoized,
    MemoizedPair, SentimentCache, SimilarityCache, TimedCache,
};
pub use cancellation::CancellationToken;
pub use config::{
    AppConfig, AppConfigBuilder, CacheConfig, CacheSettings, ConfigSource, ConfigValue, DatabaseConfig,
    EnvironmentConfigSource, FullConfig, GraphConfig, MapConfigSource,
};
pub use container::context::{get_container, global_context, reset_container, AppContext};
pub use container::ServiceContainer;
pub use descriptors::ServiceDescriptor;
pub use error::{CollaboratorError, CoreError, CoreResult, Stage};
pub use fingerprint::Fingerprint;
pub use lifetime::Lifetime;
pub use manager::{
    BatchItem, BatchOptions, BatchOutcome, BatchProgress, Note, ProcessOutcome, ProcessingManager,
};
pub use metrics::{PerformanceStats, ProcessingMetadata};
pub use observer::{ContainerObserver, TracingObserver};
