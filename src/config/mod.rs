//! Configuration entities and the sources they are loaded from.
//!
//! Every configuration struct is built through a validating constructor: an
//! out-of-range or unparsable value fails with
//! [`CoreError::Configuration`](crate::CoreError::Configuration) naming the
//! field and the rejected value, and nothing is clamped. Values come from the
//! environment ([`EnvironmentConfigSource`]), from a nested mapping
//! ([`ConfigValue::Object`]), or from JSON/YAML text parsed into such a
//! mapping.

mod app;
mod cache;
mod database;
mod graph;

pub use app::{AppConfig, AppConfigBuilder, LOG_LEVELS};
pub use cache::{CacheConfig, CacheSettings};
pub use database::DatabaseConfig;
pub use graph::GraphConfig;

use std::collections::HashMap;
use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A loosely typed configuration value, as read from a mapping or file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
    Null,
}

impl ConfigValue {
    /// Numeric view; strings are parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer view; strings are parsed, floats must be whole
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            ConfigValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view; accepts true/false, 1/0, yes/no, on/off in any case
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            ConfigValue::Integer(0) => Some(false),
            ConfigValue::Integer(1) => Some(true),
            ConfigValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Scalar rendered as text; arrays and objects have no text form
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, ConfigValue>> {
        match self {
            ConfigValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{:?}", s),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Boolean(b) => write!(f, "{}", b),
            ConfigValue::Array(items) => write!(f, "array of {} items", items.len()),
            ConfigValue::Object(map) => write!(f, "object with {} keys", map.len()),
            ConfigValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

impl From<HashMap<String, ConfigValue>> for ConfigValue {
    fn from(value: HashMap<String, ConfigValue>) -> Self {
        ConfigValue::Object(value)
    }
}

/// Where configuration values come from
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Get a configuration value by field name
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;

    /// Whether keys outside the known field set are an error
    fn rejects_unknown_keys(&self) -> bool {
        false
    }
}

/// Environment variable configuration source
///
/// Field `host` with prefix `DB` reads `DB_HOST`; without a prefix it reads
/// `HOST`. Values are returned as raw strings and parsed by the consumer.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name for a field
    pub fn variable_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.variable_name(key)).ok().map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory mapping source; unknown keys are rejected
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new(values: HashMap<String, ConfigValue>) -> Self {
        Self { values }
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn rejects_unknown_keys(&self) -> bool {
        true
    }
}

/// Typed field reader over a source, producing field-qualified errors
pub(crate) struct Fields<'a> {
    section: &'static str,
    source: &'a dyn ConfigSource,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(section: &'static str, source: &'a dyn ConfigSource) -> Self {
        Self { section, source }
    }

    pub(crate) fn qualified(&self, key: &str) -> String {
        format!("{}.{}", self.section, key)
    }

    fn raw(&self, key: &str) -> Option<ConfigValue> {
        self.source.get(key).filter(|value| !value.is_null())
    }

    pub(crate) fn reject_unknown(&self, known: &[&str]) -> CoreResult<()> {
        if !self.source.rejects_unknown_keys() {
            return Ok(());
        }
        let mut keys = self.source.keys();
        keys.sort();
        match keys.into_iter().find(|key| !known.contains(&key.as_str())) {
            Some(unknown) => Err(CoreError::configuration(
                self.qualified(&unknown),
                "<unknown key>",
                "is not a recognized setting",
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn text(&self, key: &str) -> CoreResult<Option<String>> {
        match self.raw(key) {
            None => Ok(None),
            Some(value) => value.as_text().map(Some).ok_or_else(|| {
                CoreError::configuration(self.qualified(key), &value, "must be a string")
            }),
        }
    }

    pub(crate) fn f64(&self, key: &str) -> CoreResult<Option<f64>> {
        match self.raw(key) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                CoreError::configuration(self.qualified(key), &value, "must be a number")
            }),
        }
    }

    pub(crate) fn i64(&self, key: &str) -> CoreResult<Option<i64>> {
        match self.raw(key) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                CoreError::configuration(self.qualified(key), &value, "must be an integer")
            }),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> CoreResult<Option<bool>> {
        match self.raw(key) {
            None => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| {
                CoreError::configuration(self.qualified(key), &value, "must be a boolean")
            }),
        }
    }

    pub(crate) fn object(&self, key: &str) -> CoreResult<Option<HashMap<String, ConfigValue>>> {
        match self.raw(key) {
            None => Ok(None),
            Some(ConfigValue::Object(map)) => Ok(Some(map)),
            Some(value) => Err(CoreError::configuration(
                self.qualified(key),
                &value,
                "must be a mapping",
            )),
        }
    }
}

pub(crate) fn ensure_non_empty(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::configuration(field, format!("{:?}", value), "must not be empty"));
    }
    Ok(())
}

pub(crate) fn ensure_in_range(field: &str, value: f64, min: f64, max: f64) -> CoreResult<()> {
    // NaN fails both comparisons
    if !(value >= min && value <= max) {
        return Err(CoreError::configuration(
            field,
            value,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Stand-in printed by `Debug` for passwords and API keys
pub(crate) fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}

const SECTIONS: &[&str] = &["database", "graph", "app"];

/// Database, graph and application settings loaded together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullConfig {
    pub database: DatabaseConfig,
    pub graph: GraphConfig,
    pub app: AppConfig,
}

impl FullConfig {
    /// Loads every section from the environment.
    pub fn from_env() -> CoreResult<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            graph: GraphConfig::from_env()?,
            app: AppConfig::from_env()?,
        })
    }

    /// Loads from a nested mapping with optional `database`, `graph` and
    /// `app` sections. Missing sections take their defaults.
    pub fn from_map(map: &HashMap<String, ConfigValue>) -> CoreResult<Self> {
        let root = MapConfigSource::new(map.clone());
        let fields = Fields::new("config", &root);
        fields.reject_unknown(SECTIONS)?;

        let section = |name: &str| -> CoreResult<HashMap<String, ConfigValue>> {
            Ok(fields.object(name)?.unwrap_or_default())
        };

        Ok(Self {
            database: DatabaseConfig::from_map(&section("database")?)?,
            graph: GraphConfig::from_map(&section("graph")?)?,
            app: AppConfig::from_map(&section("app")?)?,
        })
    }

    pub fn from_value(value: &ConfigValue) -> CoreResult<Self> {
        match value {
            ConfigValue::Object(map) => Self::from_map(map),
            ConfigValue::Null => Ok(Self::default()),
            other => Err(CoreError::configuration("config", other, "must be a mapping")),
        }
    }

    pub fn from_json_str(text: &str) -> CoreResult<Self> {
        let value: ConfigValue = serde_json::from_str(text)
            .map_err(|e| CoreError::configuration("config", "<json>", format!("is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> CoreResult<Self> {
        let value: ConfigValue = serde_yaml::from_str(text)
            .map_err(|e| CoreError::configuration("config", "<yaml>", format!("is not valid YAML: {}", e)))?;
        Self::from_value(&value)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::configuration("config", path.display(), format!("could not be read: {}", e))
        })?;
        Self::from_yaml_str(&text)
    }
}
