//! Transport abstraction for the relay layer.
//!
//! Implementations may fan out over WebSockets to many relays, or stay in
//! process (see [`crate::memory`]).

use async_trait::async_trait;
use bunker_core::Event;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::filter::Filter;

/// Identifier of a live subscription, unique per transport.
pub type SubscriptionId = u64;

/// A long-lived stream of events matching a filter.
///
/// Never closed by the consumer side on first result. Yields `None` only
/// once the transport has dropped the subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    /// Wrap the receiving half of a delivery channel.
    pub fn new(id: SubscriptionId, receiver: mpsc::Receiver<Event>) -> Self {
        Self { id, receiver }
    }

    /// The subscription's id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

/// Transport trait for subscribing to and publishing events.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Request delivery of every event matching `filter`, as it arrives.
    ///
    /// Duplicates may be delivered if upstream deduplication is imperfect.
    async fn subscribe(&self, filter: Filter) -> Result<Subscription>;

    /// Emit one event. Success means the event was handed off, not that
    /// anyone received it.
    async fn publish(&self, event: Event) -> Result<()>;
}
