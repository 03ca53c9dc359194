//! # sharebus: in-process shared objects, observable values, and pub/sub
//!
//! sharebus is the native side of an embedding boundary: it lets host
//! scripting threads and native tasks share state and signals inside one
//! process, by name, without either side owning the other's lifetime.
//!
//! ## Primitives
//!
//! Three named primitives, each with its own per-type namespace:
//!
//! - **Shared-object registry** ([`registry`]): a process-local map from name
//!   to reference-counted value. Removal detaches the name only; every holder
//!   keeps the value alive until the last one releases it.
//! - **Observable value** ([`sync`]): an atomic slot with a quiescent
//!   baseline and level-triggered wake/sleep signaling for tasks waiting on
//!   "non-quiescent".
//! - **Publish/subscribe channel** ([`channel`]): a typed broadcast medium
//!   with per-subscriber FIFO delivery, a bounded buffering window, and
//!   fire-and-forget pushes.
//!
//! ## Crossing the boundary
//!
//! The [`handle`] module provides the ownership model host code holds
//! (typed and type-erased reference-counted handles), and [`host`] provides
//! the [`HostBridge`](host::HostBridge): bounded blocking entry points that
//! let plain OS threads drive the async waits.
//!
//! ## Hubs
//!
//! All name spaces hang off a [`Hub`](hub::Hub). The convenience
//! constructors use a process-wide default hub; tests and embedders that
//! need isolation build their own.
//!
//! ```rust
//! use sharebus::{Hub, HubConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub = Hub::new(HubConfig::default());
//!
//! let publisher = hub.publisher::<u64>("frames");
//! let mut subscriber = hub.subscriber::<u64>("frames");
//! publisher.push(1);
//! assert_eq!(subscriber.recv().await.unwrap(), 1);
//!
//! let gate = hub.sync_value::<i64>("gate");
//! gate.set(77);
//! assert_eq!(gate.wait_active().await.unwrap(), 77);
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod host;
pub mod hub;
pub mod registry;
pub mod sync;

// Re-exports
pub use channel::{ChannelError, Publisher, Subscriber};
pub use config::HubConfig;
pub use error::{Error, InternalResult};
pub use handle::{AnyHandle, ObjectHandle};
pub use host::{HostBridge, HostSubscriber, HostSync};
pub use hub::Hub;
pub use registry::{Registry, RegistryError, WeakRegistry};
pub use sync::{SyncError, SyncValue};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
