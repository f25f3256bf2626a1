use std::collections::HashMap;
use std::time::Duration;

use super::{ConfigValue, Fields, MapConfigSource};
use crate::error::{CoreError, CoreResult};

/// Capacity and time-to-live of one timed cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    max_entries: usize,
    ttl: Option<Duration>,
}

impl CacheConfig {
    /// `ttl = None` keeps entries until they are evicted or cleared.
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> CoreResult<Self> {
        if max_entries == 0 {
            return Err(CoreError::configuration("cache.max_entries", max_entries, "must be at least 1"));
        }
        Ok(Self { max_entries, ttl })
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn from_section(
        section: &'static str,
        map: &HashMap<String, ConfigValue>,
        defaults: CacheConfig,
    ) -> CoreResult<Self> {
        let source = MapConfigSource::new(map.clone());
        let fields = Fields::new(section, &source);
        fields.reject_unknown(&["max_entries", "ttl_secs"])?;

        let max_entries = match fields.i64("max_entries")? {
            None => defaults.max_entries,
            Some(n) if n >= 1 => n as usize,
            Some(n) => {
                return Err(CoreError::configuration(fields.qualified("max_entries"), n, "must be at least 1"))
            }
        };

        let ttl = match map.get("ttl_secs") {
            None => defaults.ttl,
            Some(ConfigValue::Null) => None,
            Some(_) => {
                let secs = fields.f64("ttl_secs")?.unwrap_or_default();
                if !(secs.is_finite() && secs >= 0.0) {
                    return Err(CoreError::configuration(
                        fields.qualified("ttl_secs"),
                        secs,
                        "must be a non-negative number of seconds",
                    ));
                }
                let ttl = Duration::try_from_secs_f64(secs)
                    .map_err(|_| CoreError::configuration(fields.qualified("ttl_secs"), secs, "is too large"))?;
                Some(ttl)
            }
        };

        Self::new(max_entries, ttl)
    }
}

/// Settings of the four named caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub embedding: CacheConfig,
    pub similarity: CacheConfig,
    pub sentiment: CacheConfig,
    pub dedup: CacheConfig,
}

impl CacheSettings {
    /// Parses `{"embedding": {"max_entries": .., "ttl_secs": ..}, ..}`;
    /// missing caches keep their defaults.
    pub fn from_map(map: &HashMap<String, ConfigValue>) -> CoreResult<Self> {
        let source = MapConfigSource::new(map.clone());
        let fields = Fields::new("app.caches", &source);
        fields.reject_unknown(&["embedding", "similarity", "sentiment", "dedup"])?;

        let defaults = Self::default();
        let load = |name: &str, section: &'static str, default: CacheConfig| -> CoreResult<CacheConfig> {
            match fields.object(name)? {
                Some(section_map) => CacheConfig::from_section(section, &section_map, default),
                None => Ok(default),
            }
        };

        Ok(Self {
            embedding: load("embedding", "app.caches.embedding", defaults.embedding)?,
            similarity: load("similarity", "app.caches.similarity", defaults.similarity)?,
            sentiment: load("sentiment", "app.caches.sentiment", defaults.sentiment)?,
            dedup: load("dedup", "app.caches.dedup", defaults.dedup)?,
        })
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            embedding: CacheConfig {
                max_entries: 500,
                ttl: Some(Duration::from_secs(3600)),
            },
            similarity: CacheConfig {
                max_entries: 1000,
                ttl: Some(Duration::from_secs(600)),
            },
            sentiment: CacheConfig {
                max_entries: 2000,
                ttl: Some(Duration::from_secs(300)),
            },
            dedup: CacheConfig {
                max_entries: 5000,
                ttl: Some(Duration::from_secs(3600)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(CacheConfig::new(0, None).is_err());
        assert!(CacheConfig::new(1, None).is_ok());
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let mut sentiment = HashMap::new();
        sentiment.insert("max_entries".to_string(), ConfigValue::Integer(10));
        sentiment.insert("ttl_secs".to_string(), ConfigValue::Null);
        let mut map = HashMap::new();
        map.insert("sentiment".to_string(), ConfigValue::Object(sentiment));

        let settings = CacheSettings::from_map(&map).unwrap();
        assert_eq!(settings.sentiment.max_entries(), 10);
        assert_eq!(settings.sentiment.ttl(), None);
        assert_eq!(settings.embedding, CacheSettings::default().embedding);
    }

    #[test]
    fn test_negative_ttl_rejected() {
        let mut dedup = HashMap::new();
        dedup.insert("ttl_secs".to_string(), ConfigValue::Float(-1.0));
        let mut map = HashMap::new();
        map.insert("dedup".to_string(), ConfigValue::Object(dedup));

        let err = CacheSettings::from_map(&map).unwrap_err();
        assert!(err.to_string().contains("app.caches.dedup.ttl_secs"));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let mut dedup = HashMap::new();
        dedup.insert("ttl_secs".to_string(), ConfigValue::Float(1e30));
        let mut map = HashMap::new();
        map.insert("dedup".to_string(), ConfigValue::Object(dedup));

        let err = CacheSettings::from_map(&map).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
        assert!(err.to_string().contains("app.caches.dedup.ttl_secs"));
        assert!(err.to_string().contains("is too large"));
    }
}
