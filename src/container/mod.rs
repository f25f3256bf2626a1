//! Name-keyed service container with lazy singletons.
//!
//! The container maps service names to factories. Singleton registrations
//! build their instance on the first `get` and hand out the same `Arc`
//! afterwards; transient registrations build a fresh instance on every `get`.
//! It also holds the three configuration sections, which callers may install
//! explicitly or let the container read from the environment on first use.

pub mod context;

use std::any::{type_name, Any};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::config::{AppConfig, DatabaseConfig, GraphConfig};
use crate::descriptors::ServiceDescriptor;
use crate::error::{CoreError, CoreResult};
use crate::lifetime::Lifetime;
use crate::observer::{ContainerObserver, Observers};
use crate::registration::{AnyArc, Factory, Registration, Registry};

/// Configuration slot: explicitly installed, or built lazily on first read
struct ConfigSlot<T> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T> ConfigSlot<T> {
    fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    fn set(&self, value: T) {
        *self.value.write() = Some(Arc::new(value));
    }

    fn get_or_try_init(&self, init: impl FnOnce() -> CoreResult<T>) -> CoreResult<Arc<T>> {
        if let Some(value) = self.value.read().as_ref() {
            return Ok(value.clone());
        }
        let mut slot = self.value.write();
        // Another thread may have filled the slot between the two locks
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = Arc::new(init()?);
        *slot = Some(value.clone());
        Ok(value)
    }

    fn is_set(&self) -> bool {
        self.value.read().is_some()
    }

    fn clear(&self) {
        *self.value.write() = None;
    }
}

/// Registry of named service factories.
///
/// All methods take `&self`; the container is meant to be shared behind an
/// `Arc`. Registration lookups go through one `RwLock` held only for the map
/// access. Each singleton owns its own `OnceCell`, so constructing one service
/// never blocks resolution of another, and concurrent first requests for the
/// same singleton run its factory at most once.
///
/// Factories must not resolve their own name: a singleton factory that asks
/// the container for itself blocks forever.
///
/// # Examples
///
/// ```
/// use fakecheck_core::ServiceContainer;
/// use std::sync::Arc;
///
/// struct Tokenizer { vocabulary: usize }
///
/// let container = ServiceContainer::new();
/// container.register_factory("tokenizer", || Tokenizer { vocabulary: 30_000 }, true);
///
/// let tokenizer = container.get::<Tokenizer>("tokenizer").unwrap();
/// assert_eq!(tokenizer.vocabulary, 30_000);
/// assert!(Arc::ptr_eq(&tokenizer, &container.get::<Tokenizer>("tokenizer").unwrap()));
/// ```
pub struct ServiceContainer {
    registry: RwLock<Registry>,
    observers: RwLock<Observers>,
    database: ConfigSlot<DatabaseConfig>,
    graph: ConfigSlot<GraphConfig>,
    app: ConfigSlot<AppConfig>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            observers: RwLock::new(Observers::default()),
            database: ConfigSlot::new(),
            graph: ConfigSlot::new(),
            app: ConfigSlot::new(),
        }
    }

    fn insert(&self, name: String, registration: Registration) {
        let lifetime = registration.lifetime;
        let type_name = registration.type_name;
        let replaced = self.registry.write().insert(name.clone(), registration);
        if replaced {
            tracing::debug!(service = %name, ?lifetime, type_name, "replaced service registration");
        } else {
            tracing::debug!(service = %name, ?lifetime, type_name, "registered service");
        }
    }

    /// Registers an infallible factory under `name`.
    ///
    /// With `singleton` set, the first built instance is cached and shared.
    /// Registering a name again replaces the earlier registration together
    /// with any instance it had cached.
    pub fn register_factory<T, F>(&self, name: impl Into<String>, factory: F, singleton: bool)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Ok(Arc::new(factory()) as AnyArc));
        let registration = Registration::new(Lifetime::from_singleton_flag(singleton), factory, type_name::<T>());
        self.insert(name.into(), registration);
    }

    /// Registers a factory that may fail.
    ///
    /// A failure surfaces as [`CoreError::ServiceConstruction`] from `get` and
    /// nothing is cached, so the next `get` runs the factory again.
    ///
    /// ```
    /// use fakecheck_core::{CoreError, ServiceContainer};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let attempts = AtomicUsize::new(0);
    /// let container = ServiceContainer::new();
    /// container.register_try_factory(
    ///     "model",
    ///     move || {
    ///         if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
    ///             Err("weights not downloaded yet")
    ///         } else {
    ///             Ok(vec![0.1f32, 0.2])
    ///         }
    ///     },
    ///     true,
    /// );
    ///
    /// assert!(matches!(
    ///     container.get::<Vec<f32>>("model"),
    ///     Err(CoreError::ServiceConstruction { .. })
    /// ));
    /// assert_eq!(container.get::<Vec<f32>>("model").unwrap().len(), 2);
    /// ```
    pub fn register_try_factory<T, E, F>(&self, name: impl Into<String>, factory: F, singleton: bool)
    where
        T: Send + Sync + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let name = name.into();
        let service = name.clone();
        let factory: Factory = Arc::new(move || match factory() {
            Ok(value) => Ok(Arc::new(value) as AnyArc),
            Err(source) => Err(CoreError::ServiceConstruction {
                name: service.clone(),
                source: source.into(),
            }),
        });
        let registration = Registration::new(Lifetime::from_singleton_flag(singleton), factory, type_name::<T>());
        self.insert(name, registration);
    }

    /// Installs an already built instance as a singleton.
    pub fn register_instance<T>(&self, name: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let registration = Registration::prebuilt(Arc::new(value), type_name::<T>());
        self.insert(name.into(), registration);
    }

    /// Resolves `name` without checking the instance type.
    pub fn get_any(&self, name: &str) -> CoreResult<Arc<dyn Any + Send + Sync>> {
        let observers = self.observers.read().clone();
        let started = Instant::now();
        observers.resolving(name);

        let registration = self.registry.read().get(name);
        let registration = match registration {
            Some(registration) => registration,
            None => {
                let error = CoreError::ServiceNotFound(name.to_string());
                observers.failed(name, &error);
                return Err(error);
            }
        };

        // The registry lock is released here; factories run without it
        let mut constructed = false;
        let result = match &registration.instance {
            Some(cell) => cell
                .get_or_try_init(|| {
                    constructed = true;
                    tracing::debug!(service = name, "constructing singleton");
                    (registration.factory)()
                })
                .cloned(),
            None => {
                constructed = true;
                (registration.factory)()
            }
        };

        match result {
            Ok(instance) => {
                observers.resolved(name, started.elapsed(), constructed);
                Ok(instance)
            }
            Err(error) => {
                tracing::warn!(service = name, %error, "service construction failed");
                observers.failed(name, &error);
                Err(error)
            }
        }
    }

    /// Resolves `name` as a `T`.
    ///
    /// Fails with [`CoreError::ServiceNotFound`] for unknown names and with
    /// [`CoreError::TypeMismatch`] when the registration produces another type.
    pub fn get<T>(&self, name: &str) -> CoreResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get_any(name)?
            .downcast::<T>()
            .map_err(|_| CoreError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registration, sorted by name
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let registry = self.registry.read();
        let mut descriptors: Vec<_> = registry
            .iter()
            .map(|(name, registration)| ServiceDescriptor {
                name: name.clone(),
                lifetime: registration.lifetime,
                type_name: registration.type_name,
                instantiated: registration.is_instantiated(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn add_observer(&self, observer: Arc<dyn ContainerObserver>) {
        self.observers.write().add(observer);
    }

    pub fn configure_database(&self, config: DatabaseConfig) {
        tracing::debug!(host = config.host(), port = config.port(), "database configuration installed");
        self.database.set(config);
    }

    pub fn configure_graph(&self, config: GraphConfig) {
        tracing::debug!(uri = config.uri(), "graph configuration installed");
        self.graph.set(config);
    }

    pub fn configure_app(&self, config: AppConfig) {
        tracing::debug!(log_level = config.log_level(), "application configuration installed");
        self.app.set(config);
    }

    /// Installed database configuration, or one read from `DB_*` variables
    pub fn database_config(&self) -> CoreResult<Arc<DatabaseConfig>> {
        self.database.get_or_try_init(DatabaseConfig::from_env)
    }

    /// Installed graph configuration, or one read from `NEO4J_*` variables
    pub fn graph_config(&self) -> CoreResult<Arc<GraphConfig>> {
        self.graph.get_or_try_init(GraphConfig::from_env)
    }

    /// Installed application configuration, or one read from the environment
    pub fn app_config(&self) -> CoreResult<Arc<AppConfig>> {
        self.app.get_or_try_init(AppConfig::from_env)
    }

    /// Drops every registration, cached instance and configuration.
    /// Observers stay attached.
    pub fn reset(&self) {
        let dropped = {
            let mut registry = self.registry.write();
            let dropped = registry.len();
            registry.clear();
            dropped
        };
        self.database.clear();
        self.graph.clear();
        self.app.clear();
        tracing::info!(dropped, "service container reset");
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.len())
            .field("database_configured", &self.database.is_set())
            .field("graph_configured", &self.graph.is_set())
            .field("app_configured", &self.app.is_set())
            .finish()
    }
}
