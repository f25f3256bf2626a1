//! Application context and the optional process-wide instance.
//!
//! An [`AppContext`] owns one [`ServiceContainer`] and one [`CacheRegistry`].
//! Code that can pass the context explicitly should do so. For callers that
//! need a global, [`get_container`] and [`reset_container`] manage a single
//! process-wide context.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::ServiceContainer;
use crate::cache::CacheRegistry;
use crate::config::FullConfig;
use crate::error::CoreResult;

/// Container plus named caches, assembled once at startup
///
/// Cloning is cheap and yields a handle to the same container and caches.
///
/// # Examples
///
/// ```
/// use fakecheck_core::{AppConfig, AppContext, FullConfig};
///
/// let config = FullConfig {
///     app: AppConfig::builder().target_language("english").build().unwrap(),
///     ..FullConfig::default()
/// };
/// let context = AppContext::from_config(config);
///
/// assert_eq!(context.container().app_config().unwrap().target_language(), "english");
/// assert_eq!(context.caches().embedding().capacity(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct AppContext {
    container: Arc<ServiceContainer>,
    caches: Arc<CacheRegistry>,
}

impl AppContext {
    pub fn new(container: Arc<ServiceContainer>, caches: Arc<CacheRegistry>) -> Self {
        Self { container, caches }
    }

    /// A fresh container with every configuration section installed and
    /// caches sized from `config.app`.
    pub fn from_config(config: FullConfig) -> Self {
        let caches = CacheRegistry::new(*config.app.caches());
        let container = ServiceContainer::new();
        container.configure_database(config.database);
        container.configure_graph(config.graph);
        container.configure_app(config.app);
        Self::new(Arc::new(container), Arc::new(caches))
    }

    pub fn from_env() -> CoreResult<Self> {
        Ok(Self::from_config(FullConfig::from_env()?))
    }

    pub fn container(&self) -> &Arc<ServiceContainer> {
        &self.container
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Arc::new(ServiceContainer::new()), Arc::new(CacheRegistry::default()))
    }
}

static GLOBAL: Lazy<RwLock<AppContext>> = Lazy::new(|| RwLock::new(AppContext::default()));

/// The process-wide context
pub fn global_context() -> AppContext {
    GLOBAL.read().clone()
}

/// The process-wide container. Every call returns the same instance until
/// [`reset_container`] runs.
pub fn get_container() -> Arc<ServiceContainer> {
    GLOBAL.read().container.clone()
}

/// Replaces the process-wide context with an empty one.
///
/// Handles obtained earlier keep pointing at the old container and caches;
/// only later calls to [`get_container`] see the new instance.
pub fn reset_container() {
    *GLOBAL.write() = AppContext::default();
    tracing::info!("global service container reset");
}
