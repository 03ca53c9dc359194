//! Observable synchronization values.
//!
//! A [`SyncValue`] is a named, typed value with atomic read/write and
//! level-triggered wake/sleep signaling. Every value has a *quiescent*
//! baseline: tasks blocked in [`wait_active`](SyncValue::wait_active) are
//! released whenever the stored value differs from that baseline, and re-block
//! naturally once it returns to it.
//!
//! The backing slot is a [`tokio::sync::watch`] channel, which gives the two
//! properties the contract requires without extra bookkeeping:
//!
//! - writes are totally ordered per named value, and a released waiter always
//!   observes a value that was actually written;
//! - waiting re-checks the predicate against the *current* value first, so a
//!   caller that arrives while the value is already active returns
//!   immediately (level-triggered, not edge-triggered).
//!
//! Handles with the same name share one underlying slot. The slot stays alive
//! while any handle references it and its name expires once the last handle is
//! released.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::trace;

use crate::hub::Hub;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("timed out after {waited:?} waiting on sync value '{name}'")]
    Timeout { name: String, waited: Duration },
    #[error("sync value '{name}' was dropped while waiting")]
    Closed { name: String },
}

pub type SyncResult<T> = Result<T, SyncError>;

pub(crate) struct SyncCore<T> {
    name: String,
    quiescent: T,
    slot: watch::Sender<T>,
}

/// A shared handle to a named observable value.
pub struct SyncValue<T> {
    core: Arc<SyncCore<T>>,
}

impl<T> Clone for SyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> SyncValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Returns the named value from the default hub, creating it initialized
    /// to `T::default()` if absent. Idempotent by name.
    pub fn named(name: &str) -> Self
    where
        T: Default,
    {
        Self::named_in(Hub::global(), name)
    }

    /// Like [`named`](Self::named) with an explicit quiescent baseline.
    ///
    /// The baseline is fixed by whichever call first creates the value; later
    /// lookups of the same name join the existing value and their `quiescent`
    /// argument is ignored.
    pub fn named_with(name: &str, quiescent: T) -> Self {
        Self::named_with_in(Hub::global(), name, quiescent)
    }

    pub fn named_in(hub: &Hub, name: &str) -> Self
    where
        T: Default,
    {
        Self::named_with_in(hub, name, T::default())
    }

    pub fn named_with_in(hub: &Hub, name: &str, quiescent: T) -> Self {
        let core = hub.cores::<SyncCore<T>>().find_or_create_with(name, || {
            let (slot, _) = watch::channel(quiescent.clone());
            SyncCore {
                name: name.to_string(),
                quiescent,
                slot,
            }
        });
        Self { core }
    }

    /// Atomically stores `value`.
    ///
    /// Every task currently blocked in [`wait_active`](Self::wait_active)
    /// re-checks its predicate; a value different from quiescent releases
    /// them, a value equal to quiescent leaves them blocked.
    pub fn set(&self, value: T) {
        let _ = self.core.slot.send_replace(value);
        trace!(name = %self.core.name, "sync value updated");
    }

    /// Non-blocking atomic read of the current value.
    pub fn get(&self) -> T {
        self.core.slot.borrow().clone()
    }

    /// Whether the current value differs from the quiescent baseline.
    pub fn is_active(&self) -> bool {
        *self.core.slot.borrow() != self.core.quiescent
    }

    /// Suspends until the stored value differs from quiescent, returning that
    /// value. Returns immediately if the value is already non-quiescent.
    ///
    /// Call again to re-block after the value has returned to quiescent.
    pub async fn wait_active(&self) -> SyncResult<T> {
        let mut rx = self.core.slot.subscribe();
        let value = rx
            .wait_for(|current| *current != self.core.quiescent)
            .await
            .map_err(|_| SyncError::Closed {
                name: self.core.name.clone(),
            })?;
        Ok(value.clone())
    }

    /// Bounded variant of [`wait_active`](Self::wait_active).
    pub async fn wait_active_timeout(&self, waited: Duration) -> SyncResult<T> {
        match tokio::time::timeout(waited, self.wait_active()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                name: self.core.name.clone(),
                waited,
            }),
        }
    }

    /// Suspends until the stored value equals `expected`.
    pub async fn wait_value(&self, expected: &T) -> SyncResult<()> {
        let mut rx = self.core.slot.subscribe();
        rx.wait_for(|current| current == expected)
            .await
            .map_err(|_| SyncError::Closed {
                name: self.core.name.clone(),
            })?;
        Ok(())
    }

    /// Bounded variant of [`wait_value`](Self::wait_value).
    pub async fn wait_value_timeout(&self, expected: &T, waited: Duration) -> SyncResult<()> {
        match tokio::time::timeout(waited, self.wait_value(expected)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                name: self.core.name.clone(),
                waited,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn quiescent(&self) -> &T {
        &self.core.quiescent
    }
}
