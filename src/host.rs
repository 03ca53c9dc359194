//! The host bridge: the embedding surface for synchronous host threads.
//!
//! An embedded scripting interpreter runs on plain OS threads, while the
//! waiting primitives of this crate are async. The [`HostBridge`] spans that
//! gap: it holds a [`tokio::runtime::Handle`] and turns the async waits into
//! bounded blocking calls via `block_on`, while passing the already
//! synchronous operations (registry access, `set`/`get`, `push`) straight
//! through.
//!
//! Every blocking wait is bounded, by an explicit timeout or by the hub's
//! configured default, so a host that needs to shut down is never stuck on an
//! unbounded wait.
//!
//! The blocking methods must be called from plain threads, never from inside
//! the runtime the bridge drives.

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::instrument;

use crate::channel::{Publisher, Subscriber};
use crate::handle::{AnyHandle, ObjectHandle};
use crate::hub::Hub;
use crate::sync::SyncValue;
use crate::InternalResult;

#[derive(Clone)]
pub struct HostBridge {
    hub: Hub,
    runtime: Handle,
}

impl HostBridge {
    pub fn new(hub: Hub, runtime: Handle) -> Self {
        Self { hub, runtime }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Registers a value under `name` and hands back the owning handle.
    #[instrument(skip(self, value))]
    pub fn register<T: Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
    ) -> InternalResult<ObjectHandle<T>> {
        let shared = self.hub.objects::<T>().register(name, value)?;
        Ok(ObjectHandle::new(name, shared))
    }

    /// Looks up a name; absence is an expected condition, not an error.
    pub fn find<T: Send + Sync + 'static>(&self, name: &str) -> Option<ObjectHandle<T>> {
        self.hub
            .objects::<T>()
            .find(name)
            .map(|shared| ObjectHandle::new(name, shared))
    }

    /// Snapshot of the names registered under value type `T`.
    pub fn names<T: Send + Sync + 'static>(&self) -> Vec<String> {
        self.hub.objects::<T>().names()
    }

    /// Detaches a name. Handles already handed out stay valid.
    pub fn remove<T: Send + Sync + 'static>(&self, name: &str) -> bool {
        self.hub.objects::<T>().remove(name)
    }

    /// Checks an erased handle back into its concrete type.
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        handle: &AnyHandle,
    ) -> InternalResult<ObjectHandle<T>> {
        Ok(handle.downcast::<T>()?)
    }

    /// Constructor-or-lookup of a named observable value.
    pub fn sync_value<T>(&self, name: &str) -> HostSync<T>
    where
        T: Clone + Default + PartialEq + Send + Sync + 'static,
    {
        self.wrap_sync(self.hub.sync_value(name))
    }

    /// Like [`sync_value`](Self::sync_value) with an explicit quiescent
    /// baseline.
    pub fn sync_value_with<T>(&self, name: &str, quiescent: T) -> HostSync<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.wrap_sync(self.hub.sync_value_with(name, quiescent))
    }

    /// Constructor-or-lookup of a named channel's publish endpoint. Pushing is
    /// synchronous, so the publisher is handed out as-is.
    pub fn publisher<T: Clone + Send + 'static>(&self, name: &str) -> Publisher<T> {
        self.hub.publisher(name)
    }

    /// Attaches a new subscriber with blocking receive support.
    pub fn subscriber<T: Clone + Send + 'static>(&self, name: &str) -> HostSubscriber<T> {
        HostSubscriber {
            inner: self.hub.subscriber(name),
            runtime: self.runtime.clone(),
            wait_timeout: self.hub.config().wait_timeout,
        }
    }

    fn wrap_sync<T>(&self, inner: SyncValue<T>) -> HostSync<T> {
        HostSync {
            inner,
            runtime: self.runtime.clone(),
            wait_timeout: self.hub.config().wait_timeout,
        }
    }
}

/// Host-side handle to an observable value.
///
/// `set`/`get` are plain synchronous calls; only the waits go through the
/// runtime.
pub struct HostSync<T> {
    inner: SyncValue<T>,
    runtime: Handle,
    wait_timeout: Duration,
}

impl<T> Clone for HostSync<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            runtime: self.runtime.clone(),
            wait_timeout: self.wait_timeout,
        }
    }
}

impl<T> HostSync<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn set(&self, value: T) {
        self.inner.set(value)
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Blocks the calling thread until the value is non-quiescent, bounded by
    /// the hub's configured default timeout.
    pub fn wait_active_blocking(&self) -> InternalResult<T> {
        self.wait_active_blocking_for(self.wait_timeout)
    }

    /// Blocks the calling thread until the value is non-quiescent, bounded by
    /// an explicit timeout.
    pub fn wait_active_blocking_for(&self, timeout: Duration) -> InternalResult<T> {
        Ok(self
            .runtime
            .block_on(self.inner.wait_active_timeout(timeout))?)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Host-side subscriber with blocking receive.
pub struct HostSubscriber<T> {
    inner: Subscriber<T>,
    runtime: Handle,
    wait_timeout: Duration,
}

impl<T> HostSubscriber<T>
where
    T: Clone + Send + 'static,
{
    /// Blocks the calling thread until a message arrives, bounded by the
    /// hub's configured default timeout.
    pub fn recv_blocking(&mut self) -> InternalResult<T> {
        self.recv_blocking_for(self.wait_timeout)
    }

    /// Blocks the calling thread until a message arrives, bounded by an
    /// explicit timeout.
    pub fn recv_blocking_for(&mut self, timeout: Duration) -> InternalResult<T> {
        let recv = self.inner.recv_timeout(timeout);
        Ok(self.runtime.block_on(recv)?)
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> InternalResult<T> {
        Ok(self.inner.try_recv()?)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}
