//! Observers for container resolution events.
//!
//! Observers receive a callback for every `get` against the container: when
//! resolution starts, when it finishes (with whether the factory actually ran),
//! and when a fallible factory fails. [`TracingObserver`] forwards them to
//! `tracing`; tests and monitoring hooks can implement the trait directly.

use std::sync::Arc;
use std::time::Duration;

use crate::error::CoreError;

/// Observer trait for container resolution events.
///
/// Observer calls are made synchronously on the resolving thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use fakecheck_core::{ContainerObserver, ServiceContainer};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct ConstructionCounter(AtomicUsize);
///
/// impl ContainerObserver for ConstructionCounter {
///     fn resolving(&self, _name: &str) {}
///     fn resolved(&self, _name: &str, _duration: Duration, constructed: bool) {
///         if constructed {
///             self.0.fetch_add(1, Ordering::SeqCst);
///         }
///     }
/// }
///
/// let counter = Arc::new(ConstructionCounter::default());
/// let container = ServiceContainer::new();
/// container.add_observer(counter.clone());
/// container.register_factory("model", || vec![0.5f32; 4], true);
///
/// container.get::<Vec<f32>>("model").unwrap();
/// container.get::<Vec<f32>>("model").unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// ```
pub trait ContainerObserver: Send + Sync {
    /// Called before a lookup starts.
    fn resolving(&self, name: &str);

    /// Called after a successful lookup. `constructed` is true when the
    /// factory ran for this call.
    fn resolved(&self, name: &str, duration: Duration, constructed: bool);

    /// Called when a lookup fails, either because the name is unknown or
    /// because a fallible factory returned an error.
    fn failed(&self, name: &str, error: &CoreError) {
        let _ = (name, error);
    }
}

/// Registered observers; cheap to clone out of the container lock
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn resolving(&self, name: &str) {
        for observer in &self.observers {
            observer.resolving(name);
        }
    }

    pub(crate) fn resolved(&self, name: &str, duration: Duration, constructed: bool) {
        for observer in &self.observers {
            observer.resolved(name, duration, constructed);
        }
    }

    pub(crate) fn failed(&self, name: &str, error: &CoreError) {
        for observer in &self.observers {
            observer.failed(name, error);
        }
    }
}

/// Built-in observer that emits `tracing` events.
///
/// Lookups and hits go out at `trace`, constructions at `debug`, failures at
/// `warn`.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerObserver for TracingObserver {
    fn resolving(&self, name: &str) {
        tracing::trace!(service = name, "resolving service");
    }

    fn resolved(&self, name: &str, duration: Duration, constructed: bool) {
        if constructed {
            tracing::debug!(service = name, elapsed = ?duration, "constructed service");
        } else {
            tracing::trace!(service = name, elapsed = ?duration, "resolved cached service");
        }
    }

    fn failed(&self, name: &str, error: &CoreError) {
        tracing::warn!(service = name, %error, "service resolution failed");
    }
}
