use std::collections::HashMap;
use std::fmt;

use super::{ensure_non_empty, redacted, ConfigSource, ConfigValue, EnvironmentConfigSource, Fields, MapConfigSource};
use crate::error::{CoreError, CoreResult};

const FIELDS: &[&str] = &["uri", "user", "password", "database"];

/// URI schemes accepted by the graph driver
pub const GRAPH_URI_SCHEMES: &[&str] = &["bolt://", "neo4j://", "neo4j+s://", "bolt+s://"];

/// Graph database (relationship store) connection settings
///
/// Environment variables: `NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`,
/// `NEO4J_DATABASE`.
#[derive(Clone, PartialEq, Eq)]
pub struct GraphConfig {
    uri: String,
    user: String,
    password: String,
    database: String,
}

impl GraphConfig {
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> CoreResult<Self> {
        let config = Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> CoreResult<Self> {
        Self::from_source(&EnvironmentConfigSource::with_prefix("NEO4J"))
    }

    pub fn from_map(map: &HashMap<String, ConfigValue>) -> CoreResult<Self> {
        Self::from_source(&MapConfigSource::new(map.clone()))
    }

    pub fn from_source(source: &dyn ConfigSource) -> CoreResult<Self> {
        let fields = Fields::new("graph", source);
        fields.reject_unknown(FIELDS)?;
        let defaults = Self::default();

        Self::new(
            fields.text("uri")?.unwrap_or(defaults.uri),
            fields.text("user")?.unwrap_or(defaults.user),
            fields.text("password")?.unwrap_or(defaults.password),
            fields.text("database")?.unwrap_or(defaults.database),
        )
    }

    fn validate(&self) -> CoreResult<()> {
        if !GRAPH_URI_SCHEMES.iter().any(|scheme| self.uri.starts_with(scheme)) {
            return Err(CoreError::configuration(
                "graph.uri",
                format!("{:?}", self.uri),
                format!("must start with one of {}", GRAPH_URI_SCHEMES.join(", ")),
            ));
        }
        ensure_non_empty("graph.user", &self.user)?;
        ensure_non_empty("graph.database", &self.database)?;
        Ok(())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "your_strong_password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}
