//! Service registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::CoreResult;
use crate::lifetime::Lifetime;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory = Arc<dyn Fn() -> CoreResult<AnyArc> + Send + Sync>;

/// Service registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: Factory,
    /// Concrete type produced by the factory, for diagnostics
    pub(crate) type_name: &'static str,
    /// Singleton slot; `get_or_try_init` gives the at-most-once guarantee
    pub(crate) instance: Option<OnceCell<AnyArc>>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, factory: Factory, type_name: &'static str) -> Self {
        let instance = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            Lifetime::Transient => None,
        };

        Self {
            lifetime,
            factory,
            type_name,
            instance,
        }
    }

    /// Registration that already holds its instance.
    pub(crate) fn prebuilt(value: AnyArc, type_name: &'static str) -> Self {
        let stored = value.clone();
        let factory: Factory = Arc::new(move || Ok(stored.clone()));
        Self {
            lifetime: Lifetime::Singleton,
            factory,
            type_name,
            instance: Some(OnceCell::with_value(value)),
        }
    }

    pub(crate) fn is_instantiated(&self) -> bool {
        self.instance
            .as_ref()
            .map(|cell| cell.get().is_some())
            .unwrap_or(false)
    }
}

/// Name-keyed registry of registrations
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<String, Arc<Registration>>,
}

impl Registry {
    /// Inserts a registration, replacing any earlier one under the same name
    pub(crate) fn insert(&mut self, name: String, registration: Registration) -> bool {
        self.entries.insert(name, Arc::new(registration)).is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Registration>> {
        self.entries.get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Registration>)> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
