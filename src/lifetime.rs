//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use fakecheck_core::{Lifetime, ServiceContainer};
/// use std::sync::Arc;
///
/// struct Tokenizer;
/// struct Request { id: u32 }
///
/// let container = ServiceContainer::new();
/// container.register_factory("tokenizer", || Tokenizer, true);
/// container.register_factory("request", || Request { id: 7 }, false);
///
/// let a = container.get::<Tokenizer>("tokenizer").unwrap();
/// let b = container.get::<Tokenizer>("tokenizer").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let r1 = container.get::<Request>("request").unwrap();
/// let r2 = container.get::<Request>("request").unwrap();
/// assert!(!Arc::ptr_eq(&r1, &r2));
/// assert_eq!(r1.id, r2.id);
///
/// assert_eq!(Lifetime::from_singleton_flag(true), Lifetime::Singleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Built on first resolution and reused until the container is reset
    Singleton,
    /// Built fresh on every resolution, never cached
    Transient,
}

impl Lifetime {
    /// Maps the `singleton` registration flag to a lifetime.
    pub fn from_singleton_flag(singleton: bool) -> Self {
        if singleton {
            Lifetime::Singleton
        } else {
            Lifetime::Transient
        }
    }

    pub fn is_singleton(self) -> bool {
        self == Lifetime::Singleton
    }
}
