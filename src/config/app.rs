use std::collections::HashMap;
use std::fmt;

use super::{
    ensure_in_range, ensure_non_empty, redacted, CacheSettings, ConfigSource, ConfigValue, EnvironmentConfigSource, Fields,
    MapConfigSource,
};
use crate::error::{CoreError, CoreResult};

/// Accepted `log_level` values
pub const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

const FIELDS: &[&str] = &[
    "similarity_threshold",
    "average_news_simplicity",
    "propaganda_threshold",
    "openai_api_key",
    "is_chatgpt_processor_enabled",
    "log_level",
    "cache_enabled",
    "target_language",
    "batch_workers",
    "history_capacity",
    "caches",
];

const MAX_BATCH_WORKERS: usize = 64;

/// Application tunables
///
/// Build through [`AppConfig::builder`], [`AppConfig::from_env`] or
/// [`AppConfig::from_map`]; all three validate identically.
///
/// # Examples
///
/// ```
/// use fakecheck_core::AppConfig;
///
/// assert!(AppConfig::builder().similarity_threshold(0.85).build().is_ok());
///
/// let err = AppConfig::builder().similarity_threshold(1.5).build().unwrap_err();
/// assert!(err.to_string().contains("app.similarity_threshold"));
/// assert!(err.to_string().contains("1.5"));
/// ```
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    similarity_threshold: f64,
    average_news_simplicity: f64,
    propaganda_threshold: f64,
    openai_api_key: Option<String>,
    is_chatgpt_processor_enabled: bool,
    log_level: String,
    cache_enabled: bool,
    target_language: String,
    batch_workers: usize,
    history_capacity: usize,
    caches: CacheSettings,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }

    /// Reads unprefixed variables such as `SIMILARITY_THRESHOLD` and
    /// `LOG_LEVEL`. Cache settings keep their defaults.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_source(&EnvironmentConfigSource::new())
    }

    pub fn from_map(map: &HashMap<String, ConfigValue>) -> CoreResult<Self> {
        Self::from_source(&MapConfigSource::new(map.clone()))
    }

    pub fn from_source(source: &dyn ConfigSource) -> CoreResult<Self> {
        let fields = Fields::new("app", source);
        fields.reject_unknown(FIELDS)?;

        let mut builder = Self::builder();
        if let Some(v) = fields.f64("similarity_threshold")? {
            builder = builder.similarity_threshold(v);
        }
        if let Some(v) = fields.f64("average_news_simplicity")? {
            builder = builder.average_news_simplicity(v);
        }
        if let Some(v) = fields.f64("propaganda_threshold")? {
            builder = builder.propaganda_threshold(v);
        }
        if let Some(v) = fields.text("openai_api_key")? {
            builder = builder.openai_api_key(v);
        }
        if let Some(v) = fields.bool("is_chatgpt_processor_enabled")? {
            builder = builder.chatgpt_processor_enabled(v);
        }
        if let Some(v) = fields.text("log_level")? {
            builder = builder.log_level(v);
        }
        if let Some(v) = fields.bool("cache_enabled")? {
            builder = builder.cache_enabled(v);
        }
        if let Some(v) = fields.text("target_language")? {
            builder = builder.target_language(v);
        }
        if let Some(v) = fields.i64("batch_workers")? {
            builder = builder.batch_workers(non_negative(&fields, "batch_workers", v)?);
        }
        if let Some(v) = fields.i64("history_capacity")? {
            builder = builder.history_capacity(non_negative(&fields, "history_capacity", v)?);
        }
        if let Some(map) = fields.object("caches")? {
            builder = builder.caches(CacheSettings::from_map(&map)?);
        }
        builder.build()
    }

    fn validate(&self) -> CoreResult<()> {
        ensure_in_range("app.similarity_threshold", self.similarity_threshold, 0.0, 1.0)?;
        ensure_in_range("app.average_news_simplicity", self.average_news_simplicity, 0.0, 100.0)?;
        ensure_in_range("app.propaganda_threshold", self.propaganda_threshold, 0.0, 1.0)?;
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(CoreError::configuration(
                "app.log_level",
                format!("{:?}", self.log_level),
                format!("must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        ensure_non_empty("app.target_language", &self.target_language)?;
        if self.batch_workers == 0 || self.batch_workers > MAX_BATCH_WORKERS {
            return Err(CoreError::configuration(
                "app.batch_workers",
                self.batch_workers,
                format!("must be between 1 and {}", MAX_BATCH_WORKERS),
            ));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::configuration("app.history_capacity", 0, "must be at least 1"));
        }
        Ok(())
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn average_news_simplicity(&self) -> f64 {
        self.average_news_simplicity
    }

    pub fn propaganda_threshold(&self) -> f64 {
        self.propaganda_threshold
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    pub fn is_chatgpt_processor_enabled(&self) -> bool {
        self.is_chatgpt_processor_enabled
    }

    /// Upper-case level name, one of [`LOG_LEVELS`]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn batch_workers(&self) -> usize {
        self.batch_workers
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn caches(&self) -> &CacheSettings {
        &self.caches
    }
}

fn non_negative(fields: &Fields<'_>, key: &str, value: i64) -> CoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| CoreError::configuration(fields.qualified(key), value, "must not be negative"))
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("similarity_threshold", &self.similarity_threshold)
            .field("average_news_simplicity", &self.average_news_simplicity)
            .field("propaganda_threshold", &self.propaganda_threshold)
            .field("openai_api_key", &self.openai_api_key.as_deref().map(redacted))
            .field("is_chatgpt_processor_enabled", &self.is_chatgpt_processor_enabled)
            .field("log_level", &self.log_level)
            .field("cache_enabled", &self.cache_enabled)
            .field("target_language", &self.target_language)
            .field("batch_workers", &self.batch_workers)
            .field("history_capacity", &self.history_capacity)
            .field("caches", &self.caches)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            average_news_simplicity: 50.0,
            propaganda_threshold: 0.3,
            openai_api_key: None,
            is_chatgpt_processor_enabled: false,
            log_level: "INFO".to_string(),
            cache_enabled: true,
            target_language: "english".to_string(),
            batch_workers: 4,
            history_capacity: 1000,
            caches: CacheSettings::default(),
        }
    }
}

/// Builder for [`AppConfig`]; `build` runs validation
#[derive(Debug, Clone)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn similarity_threshold(mut self, value: f64) -> Self {
        self.config.similarity_threshold = value;
        self
    }

    pub fn average_news_simplicity(mut self, value: f64) -> Self {
        self.config.average_news_simplicity = value;
        self
    }

    pub fn propaganda_threshold(mut self, value: f64) -> Self {
        self.config.propaganda_threshold = value;
        self
    }

    /// Blank keys are treated as absent
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.openai_api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn chatgpt_processor_enabled(mut self, enabled: bool) -> Self {
        self.config.is_chatgpt_processor_enabled = enabled;
        self
    }

    /// Case-insensitive; stored upper-case
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into().trim().to_uppercase();
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    pub fn target_language(mut self, language: impl Into<String>) -> Self {
        self.config.target_language = language.into();
        self
    }

    pub fn batch_workers(mut self, workers: usize) -> Self {
        self.config.batch_workers = workers;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    pub fn caches(mut self, caches: CacheSettings) -> Self {
        self.config.caches = caches;
        self
    }

    pub fn build(self) -> CoreResult<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
