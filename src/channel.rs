//! Typed publish/subscribe channels.
//!
//! A channel is a named broadcast medium: every message pushed by a
//! [`Publisher`] is delivered, by value, to every [`Subscriber`] attached at
//! push time. Each subscriber sees its own deliveries in push order; there is
//! no ordering guarantee across subscribers. A subscriber that attaches after
//! a push never receives it, and pushing with zero subscribers attached is a
//! silent no-op rather than an error.
//!
//! Delivery rides on a [`tokio::sync::broadcast`] channel, which bounds the
//! per-subscriber buffering window: a subscriber that falls further behind
//! than the channel capacity observes [`ChannelError::Lagged`] and resumes
//! from the oldest retained message.
//!
//! Publishers are counted. Once the last publisher detaches, a receiving
//! subscriber first drains whatever is still buffered for it and then gets
//! [`ChannelError::Disconnected`] instead of suspending forever. Endpoints of
//! the same name share one underlying channel, which persists while any
//! publisher or subscriber references it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

use crate::hub::Hub;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no live publisher on channel '{channel}'")]
    Disconnected { channel: String },
    #[error("timed out after {waited:?} receiving on channel '{channel}'")]
    Timeout { channel: String, waited: Duration },
    #[error("subscriber lagged on channel '{channel}', {skipped} messages skipped")]
    Lagged { channel: String, skipped: u64 },
    #[error("no message buffered on channel '{channel}'")]
    Empty { channel: String },
}

pub type ChannelResult<T> = Result<T, ChannelError>;

pub(crate) struct ChannelCore<T> {
    name: String,
    bus: broadcast::Sender<T>,
    publishers: watch::Sender<usize>,
}

impl<T: Clone + Send + 'static> ChannelCore<T> {
    fn new(name: &str, capacity: usize) -> Self {
        let (bus, _) = broadcast::channel(capacity);
        let (publishers, _) = watch::channel(0usize);
        debug!(channel = name, capacity, "created channel");
        Self {
            name: name.to_string(),
            bus,
            publishers,
        }
    }
}

/// A publishing endpoint of a named channel.
pub struct Publisher<T> {
    core: Arc<ChannelCore<T>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        self.core.publishers.send_modify(|live| *live += 1);
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        // Dropping to zero releases subscribers blocked in recv.
        self.core.publishers.send_modify(|live| *live -= 1);
    }
}

impl<T> Publisher<T>
where
    T: Clone + Send + 'static,
{
    /// Obtains the publish endpoint of the named channel on the default hub,
    /// creating the channel if absent.
    pub fn attach(name: &str) -> Self {
        Self::attach_in(Hub::global(), name)
    }

    pub fn attach_in(hub: &Hub, name: &str) -> Self {
        Self::attach_with_capacity_in(hub, name, hub.config().channel_capacity)
    }

    /// Like [`attach`](Self::attach) with an explicit buffering window.
    ///
    /// The capacity is fixed by whichever endpoint first creates the channel;
    /// later attachments join the existing channel unchanged.
    pub fn attach_with_capacity(name: &str, capacity: usize) -> Self {
        Self::attach_with_capacity_in(Hub::global(), name, capacity)
    }

    pub fn attach_with_capacity_in(hub: &Hub, name: &str, capacity: usize) -> Self {
        let core = hub
            .cores::<ChannelCore<T>>()
            .find_or_create_with(name, || ChannelCore::new(name, capacity));
        core.publishers.send_modify(|live| *live += 1);
        Self { core }
    }

    /// Delivers `message` to every subscriber currently attached.
    ///
    /// With zero subscribers the message is dropped; nothing was promised, so
    /// no loss is reported.
    pub fn push(&self, message: T) {
        match self.core.bus.send(message) {
            Ok(delivered) => trace!(channel = %self.core.name, delivered, "pushed message"),
            Err(_) => trace!(channel = %self.core.name, "no subscriber attached, message dropped"),
        }
    }

    /// Number of subscribers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.core.bus.receiver_count()
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }
}

/// A subscribing endpoint of a named channel.
///
/// Each subscriber owns an independent FIFO view of the channel starting at
/// the moment it attached.
pub struct Subscriber<T> {
    core: Arc<ChannelCore<T>>,
    feed: broadcast::Receiver<T>,
    publishers: watch::Receiver<usize>,
}

impl<T> Subscriber<T>
where
    T: Clone + Send + 'static,
{
    /// Attaches a new subscriber to the named channel on the default hub,
    /// creating the channel if absent.
    pub fn attach(name: &str) -> Self {
        Self::attach_in(Hub::global(), name)
    }

    pub fn attach_in(hub: &Hub, name: &str) -> Self {
        let capacity = hub.config().channel_capacity;
        let core = hub
            .cores::<ChannelCore<T>>()
            .find_or_create_with(name, || ChannelCore::new(name, capacity));
        let feed = core.bus.subscribe();
        let publishers = core.publishers.subscribe();
        Self {
            core,
            feed,
            publishers,
        }
    }

    /// A new subscriber on the same channel, starting at the current stream
    /// position. Messages already buffered for `self` are not duplicated.
    pub fn resubscribe(&self) -> Self {
        Self {
            core: self.core.clone(),
            feed: self.feed.resubscribe(),
            publishers: self.core.publishers.subscribe(),
        }
    }

    /// Suspends until a message is delivered to this subscriber.
    ///
    /// Buffered messages are drained even when no publisher remains; only
    /// after the buffer is empty does the loss of the last publisher surface
    /// as [`ChannelError::Disconnected`].
    pub async fn recv(&mut self) -> ChannelResult<T> {
        loop {
            match self.feed.try_recv() {
                Ok(message) => return Ok(message),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Lagged(skipped)) => return Err(self.lagged(skipped)),
                Err(TryRecvError::Closed) => return Err(self.disconnected()),
            }

            if *self.publishers.borrow() == 0 {
                // A final push may have raced with the last publisher
                // detaching. The push happens before the count reaches zero,
                // so it is visible by now; drain once more before reporting
                // the loss.
                return match self.feed.try_recv() {
                    Ok(message) => Ok(message),
                    Err(TryRecvError::Lagged(skipped)) => Err(self.lagged(skipped)),
                    Err(_) => Err(self.disconnected()),
                };
            }

            // The select arms must not touch `self` as a whole while the
            // publisher-count future borrows its field.
            let channel = self.core.name.clone();
            tokio::select! {
                received = self.feed.recv() => match received {
                    Ok(message) => return Ok(message),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(channel = %channel, skipped, "subscriber lagged");
                        return Err(ChannelError::Lagged { channel, skipped });
                    }
                    Err(RecvError::Closed) => {
                        return Err(ChannelError::Disconnected { channel });
                    }
                },
                _ = self.publishers.wait_for(|live| *live == 0) => {
                    // Loop once more to drain messages that raced with the
                    // last publisher detaching.
                }
            }
        }
    }

    /// Bounded variant of [`recv`](Self::recv).
    pub async fn recv_timeout(&mut self, waited: Duration) -> ChannelResult<T> {
        match tokio::time::timeout(waited, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout {
                channel: self.core.name.clone(),
                waited,
            }),
        }
    }

    /// Non-suspending receive.
    pub fn try_recv(&mut self) -> ChannelResult<T> {
        match self.feed.try_recv() {
            Ok(message) => Ok(message),
            Err(TryRecvError::Empty) => Err(ChannelError::Empty {
                channel: self.core.name.clone(),
            }),
            Err(TryRecvError::Lagged(skipped)) => Err(self.lagged(skipped)),
            Err(TryRecvError::Closed) => Err(self.disconnected()),
        }
    }

    /// Adapts this subscriber into a [`Stream`](tokio_stream::Stream) over the
    /// raw broadcast feed. Publisher-loss detection does not carry over; the
    /// stream ends only when the channel itself is dropped.
    pub fn into_stream(self) -> BroadcastStream<T> {
        BroadcastStream::new(self.feed)
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    fn disconnected(&self) -> ChannelError {
        ChannelError::Disconnected {
            channel: self.core.name.clone(),
        }
    }

    fn lagged(&self, skipped: u64) -> ChannelError {
        debug!(channel = %self.core.name, skipped, "subscriber lagged");
        ChannelError::Lagged {
            channel: self.core.name.clone(),
            skipped,
        }
    }
}
