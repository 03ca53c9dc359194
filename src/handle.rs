//! Cross-boundary object handles.
//!
//! An [`ObjectHandle`] is what external (host-side) code holds instead of a
//! bare reference: it pins the underlying shared value alive for as long as
//! the handle exists, even after the registry entry has been removed, and it
//! releases its share automatically when dropped. The value is destroyed
//! exactly once, when the last holder on either side of the boundary lets go.
//!
//! Field-level mutation goes through the value's own interior mutability
//! (atomics, locks); the handle adds no locking of its own. Each field write
//! is an independent, immediately visible store to the one shared object, so
//! a multi-field update is not atomic across fields unless the value type
//! itself offers a single atomic `set`.
//!
//! [`AnyHandle`] is the type-erased form that crosses an untyped host
//! boundary. Resolving it back to a concrete type is checked: a wrong type is
//! a programmer error and surfaces immediately as
//! [`RegistryError::TypeMismatch`](crate::registry::RegistryError::TypeMismatch).

use std::any::{type_name, Any};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::registry::{RegistryError, RegistryResult};

/// A shared, named handle to a registered value.
pub struct ObjectHandle<T> {
    name: String,
    inner: Arc<T>,
}

impl<T> Clone for ObjectHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for ObjectHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("name", &self.name)
            .field("value", &*self.inner)
            .finish()
    }
}

impl<T> ObjectHandle<T> {
    pub(crate) fn new(name: &str, inner: Arc<T>) -> Self {
        Self {
            name: name.to_string(),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concrete value view.
    pub fn obj(&self) -> &T {
        &self.inner
    }

    /// An additional owning share of the underlying value.
    pub fn share(&self) -> Arc<T> {
        self.inner.clone()
    }
}

impl<T: Send + Sync + 'static> ObjectHandle<T> {
    /// Erases the value type for transport across an untyped boundary.
    pub fn erase(self) -> AnyHandle {
        AnyHandle {
            name: self.name,
            inner: self.inner as Arc<dyn Any + Send + Sync>,
        }
    }
}

/// A type-erased shared handle.
#[derive(Clone)]
pub struct AnyHandle {
    name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl AnyHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recovers the typed handle, failing fast on a type mismatch.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> RegistryResult<ObjectHandle<T>> {
        self.inner
            .clone()
            .downcast::<T>()
            .map(|inner| ObjectHandle {
                name: self.name.clone(),
                inner,
            })
            .map_err(|_| RegistryError::TypeMismatch {
                name: self.name.clone(),
                expected: type_name::<T>(),
            })
    }
}

impl fmt::Debug for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyHandle").field("name", &self.name).finish()
    }
}
