//! The hub: one registry service instance per value type.
//!
//! A [`Hub`] owns the per-type name spaces behind every primitive in the
//! crate: strong object registries for host-visible shared values, and weak
//! core spaces backing sync values and channels. Operations on distinct names
//! or distinct types never contend on a common lock.
//!
//! A lazily initialized process-wide default hub backs the convenience
//! constructors ([`SyncValue::named`](crate::sync::SyncValue::named),
//! [`Publisher::attach`](crate::channel::Publisher::attach), ...). Tests and
//! embedders that need isolation construct their own hub with [`Hub::new`]
//! and route everything through it instead.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;

use crate::channel::{Publisher, Subscriber};
use crate::config::HubConfig;
use crate::registry::{Registry, WeakRegistry};
use crate::sync::SyncValue;

/// Type-indexed collection of name spaces.
///
/// Each space is created on first use and keyed by the `TypeId` of the space
/// type itself, so the downcast below cannot observe a foreign type.
#[derive(Clone, Default)]
struct TypeSpaces {
    inner: Arc<DashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl TypeSpaces {
    fn get_or_insert<S: Send + Sync + 'static>(&self, make: impl FnOnce() -> S) -> Arc<S> {
        let space = self
            .inner
            .entry(TypeId::of::<S>())
            .or_insert_with(|| Arc::new(make()) as Arc<dyn Any + Send + Sync>)
            .value()
            .clone();
        space
            .downcast::<S>()
            .expect("type space map is keyed by TypeId")
    }
}

lazy_static! {
    static ref DEFAULT_HUB: Hub = Hub::new(HubConfig::default());
}

#[derive(Clone)]
pub struct Hub {
    config: HubConfig,
    objects: TypeSpaces,
    cores: TypeSpaces,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            objects: TypeSpaces::default(),
            cores: TypeSpaces::default(),
        }
    }

    /// The process-wide default hub.
    pub fn global() -> &'static Hub {
        &DEFAULT_HUB
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// The shared-object registry for value type `T`.
    pub fn objects<T: Send + Sync + 'static>(&self) -> Registry<T> {
        (*self.objects.get_or_insert(Registry::<T>::new)).clone()
    }

    /// The weak core space for internal core type `C`.
    pub(crate) fn cores<C: Send + Sync + 'static>(&self) -> WeakRegistry<C> {
        (*self.cores.get_or_insert(WeakRegistry::<C>::new)).clone()
    }

    pub fn sync_value<T>(&self, name: &str) -> SyncValue<T>
    where
        T: Clone + Default + PartialEq + Send + Sync + 'static,
    {
        SyncValue::named_in(self, name)
    }

    pub fn sync_value_with<T>(&self, name: &str, quiescent: T) -> SyncValue<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        SyncValue::named_with_in(self, name, quiescent)
    }

    pub fn publisher<T: Clone + Send + 'static>(&self, name: &str) -> Publisher<T> {
        Publisher::attach_in(self, name)
    }

    pub fn subscriber<T: Clone + Send + 'static>(&self, name: &str) -> Subscriber<T> {
        Subscriber::attach_in(self, name)
    }
}
