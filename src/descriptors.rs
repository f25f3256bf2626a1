//! Service descriptors for introspection and diagnostics.

use crate::lifetime::Lifetime;

/// Read-only view of one container registration
///
/// Useful for health checks and startup diagnostics: which services are
/// registered, with which lifetime, and whether a singleton has been built yet.
///
/// # Examples
///
/// ```rust
/// use fakecheck_core::{Lifetime, ServiceContainer};
///
/// let container = ServiceContainer::new();
/// container.register_factory("tokenizer", || 42u32, true);
/// container.register_factory("request", || String::from("req"), false);
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 2);
/// assert_eq!(descriptors[0].name, "request");
/// assert_eq!(descriptors[0].lifetime, Lifetime::Transient);
/// assert!(!descriptors[1].instantiated);
///
/// container.get::<u32>("tokenizer").unwrap();
/// assert!(container.descriptors()[1].instantiated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Registration name
    pub name: String,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Concrete type produced by the factory
    pub type_name: &'static str,
    /// Whether the singleton instance has been built
    pub instantiated: bool,
}

impl ServiceDescriptor {
    pub fn is_singleton(&self) -> bool {
        self.lifetime.is_singleton()
    }
}
