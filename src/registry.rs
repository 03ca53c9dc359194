//! Named shared-object registries.
//!
//! A [`Registry`] maps string names to shared values of a single type. Names
//! are unique per registry, and since each [`Hub`](crate::hub::Hub) keeps one
//! registry per value type, the same name may coexist under different types
//! without conflict.
//!
//! Two flavors exist:
//!
//! - [`Registry`] holds strong references. An entry stays alive until it is
//!   explicitly removed, and removal never invalidates handles that callers
//!   already obtained.
//! - [`WeakRegistry`] holds weak references. It backs the internal cores of
//!   sync values and channels: a name stays resolvable only while at least one
//!   endpoint keeps the core alive, and expires on its own once the last
//!   endpoint is released.
//!
//! All operations are safe to call from any number of concurrent threads or
//! tasks. Insertion is atomic per name, so a concurrent `find` never observes
//! a partially constructed entry.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("name '{name}' is already registered")]
    DuplicateName { name: String },
    #[error("name '{name}' is not registered")]
    NotFound { name: String },
    #[error("object '{name}' is not of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A process-local mapping from name to shared value.
pub struct Registry<T> {
    entries: Arc<DashMap<String, Arc<T>>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Registers `value` under `name`, failing if the name is taken.
    ///
    /// Under concurrent registration of the same name exactly one caller
    /// succeeds; the others receive [`RegistryError::DuplicateName`].
    pub fn register(&self, name: &str, value: T) -> RegistryResult<Arc<T>> {
        self.register_shared(name, Arc::new(value))
    }

    /// Same as [`register`](Self::register) for a value that is already shared.
    pub fn register_shared(&self, name: &str, value: Arc<T>) -> RegistryResult<Arc<T>> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateName {
                name: name.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(value.clone());
                debug!(name, "registered shared object");
                Ok(value)
            }
        }
    }

    /// Looks up a name. Never blocks; absence is not an error.
    pub fn find(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Returns the existing entry or inserts the value produced by `init`.
    ///
    /// `init` runs at most once per insertion, and other lookups of the same
    /// name see either no entry or the fully constructed one.
    pub fn find_or_create_with(&self, name: &str, init: impl FnOnce() -> T) -> Arc<T> {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(init()))
            .value()
            .clone()
    }

    /// Snapshot of the registered names at call time.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Detaches `name` from the registry, returning whether an entry existed.
    ///
    /// Holders of previously returned `Arc`s keep the value alive; only the
    /// name-to-value association is dropped.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            debug!(name, "removed shared object");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A name map that does not keep its values alive.
///
/// Lookups resolve only while some endpoint still holds the value; entries
/// whose value has been dropped are purged lazily on access and are never
/// reported by [`find`](Self::find) or [`names`](Self::names).
pub struct WeakRegistry<T> {
    entries: Arc<DashMap<String, Weak<T>>>,
}

impl<T> Clone for WeakRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for WeakRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WeakRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn find(&self, name: &str) -> Option<Arc<T>> {
        let found = self
            .entries
            .get(name)
            .and_then(|entry| entry.value().upgrade());
        if found.is_none() {
            self.entries.remove_if(name, |_, weak| weak.strong_count() == 0);
        }
        found
    }

    /// Returns the live entry for `name`, reviving the slot with `init` if the
    /// previous value has already been dropped.
    pub fn find_or_create_with(&self, name: &str, init: impl FnOnce() -> T) -> Arc<T> {
        self.purge();
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    live
                } else {
                    let fresh = Arc::new(init());
                    occupied.insert(Arc::downgrade(&fresh));
                    debug!(name, "revived named core");
                    fresh
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(init());
                vacant.insert(Arc::downgrade(&fresh));
                debug!(name, "created named core");
                fresh
            }
        }
    }

    /// Snapshot of the names whose value is still alive.
    pub fn names(&self) -> Vec<String> {
        self.purge();
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Dead entries are invisible to lookups; drop them so a stream of unique
    // short-lived names cannot grow the map without bound.
    fn purge(&self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Payload(u32);

    #[test]
    fn test_register_and_find() {
        let registry: Registry<Payload> = Registry::new();
        registry.register("a", Payload(1)).unwrap();

        assert_eq!(registry.find("a").unwrap().0, 1);
        assert!(registry.find("b").is_none());
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry: Registry<Payload> = Registry::new();
        registry.register("a", Payload(1)).unwrap();

        let result = registry.register("a", Payload(2));
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateName { .. })
        ));
        // The original entry is untouched.
        assert_eq!(registry.find("a").unwrap().0, 1);
    }

    #[test]
    fn test_remove_keeps_existing_handles_alive() {
        let registry: Registry<Payload> = Registry::new();
        let handle = registry.register("a", Payload(7)).unwrap();

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.find("a").is_none());

        // The handle obtained before removal still resolves.
        assert_eq!(handle.0, 7);
    }

    #[test]
    fn test_names_snapshot() {
        let registry: Registry<Payload> = Registry::new();
        registry.register("a", Payload(1)).unwrap();
        registry.register("b", Payload(2)).unwrap();

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let registry: Registry<Payload> = Registry::new();
        let first = registry.find_or_create_with("a", || Payload(1));
        let second = registry.find_or_create_with("a", || Payload(2));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.0, 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let registry: Registry<Payload> = Registry::new();

        let mut tasks = Vec::new();
        for i in 0..8u32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.register("contested", Payload(i)).is_ok()
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert!(registry.find("contested").is_some());
    }

    #[test]
    fn test_weak_registry_expires_with_last_holder() {
        let registry: WeakRegistry<Payload> = WeakRegistry::new();

        let holder = registry.find_or_create_with("core", || Payload(3));
        assert_eq!(registry.find("core").unwrap().0, 3);
        assert_eq!(registry.names(), vec!["core".to_string()]);

        drop(holder);
        assert!(registry.find("core").is_none());
        assert!(registry.names().is_empty());

        // A later lookup-or-create revives the name with a fresh value.
        let revived = registry.find_or_create_with("core", || Payload(9));
        assert_eq!(revived.0, 9);
    }

    #[test]
    fn test_dead_names_do_not_accumulate() {
        let registry: WeakRegistry<Payload> = WeakRegistry::new();

        for i in 0..64 {
            let name = format!("ephemeral-{}", i);
            let holder = registry.find_or_create_with(&name, || Payload(i));
            drop(holder);
        }

        // Each creation sweeps the names whose value is already gone, so at
        // most the newest dead entry remains.
        assert!(registry.len() <= 1);
        assert!(registry.names().is_empty());
        assert!(registry.is_empty());
    }
}
