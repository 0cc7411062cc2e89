//! A simple in-memory relay.
//!
//! Routes every published event to each live subscription whose filter
//! matches. Used by tests, and by embedders that colocate client and bunker.
//! Publish history is bounded; see [`MemoryRelay::with_history_limit`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bunker_core::Event;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::error::Result;
use crate::filter::Filter;
use crate::transport::{Subscription, SubscriptionId, Transport};

/// Per-subscription buffer size.
const SUBSCRIPTION_BUFFER: usize = 1000;

/// Published events kept for inspection by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

struct Subscriber {
    id: SubscriptionId,
    filter: Filter,
    sender: mpsc::Sender<Event>,
}

/// In-memory relay.
pub struct MemoryRelay {
    subscribers: RwLock<Vec<Subscriber>>,
    /// The most recent published events, oldest first.
    history: RwLock<VecDeque<Event>>,
    history_limit: usize,
    next_id: AtomicU64,
    /// Deliver each event twice, to simulate imperfect deduplication.
    duplicate_delivery: AtomicBool,
}

impl MemoryRelay {
    /// Create a new relay keeping the last [`DEFAULT_HISTORY_LIMIT`] events.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a relay keeping at most `limit` published events. Zero keeps
    /// none.
    pub fn with_history_limit(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            history_limit: limit,
            ..Self::default()
        })
    }

    /// Toggle double delivery of every published event.
    pub fn set_duplicate_delivery(&self, enabled: bool) {
        self.duplicate_delivery.store(enabled, Ordering::Relaxed);
    }

    /// Snapshot of the retained published events, oldest first.
    pub async fn published(&self) -> Vec<Event> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Number of live subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscribers
            .read()
            .await
            .iter()
            .filter(|s| !s.sender.is_closed())
            .count()
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
            next_id: AtomicU64::new(1),
            duplicate_delivery: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for MemoryRelay {
    async fn subscribe(&self, filter: Filter) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers.write().await.push(Subscriber {
            id,
            filter,
            sender: tx,
        });

        debug!(subscription = id, "subscription opened");
        Ok(Subscription::new(id, rx))
    }

    async fn publish(&self, event: Event) -> Result<()> {
        if self.history_limit > 0 {
            let mut history = self.history.write().await;
            if history.len() == self.history_limit {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        let copies = if self.duplicate_delivery.load(Ordering::Relaxed) {
            2
        } else {
            1
        };

        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for subscriber in subscribers.iter().filter(|s| s.filter.matches(&event)) {
                for _ in 0..copies {
                    match subscriber.sender.try_send(event.clone()) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            // Slow consumer; a relay does not wait for it.
                            warn!(subscription = subscriber.id, "subscriber buffer full, event dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            closed.push(subscriber.id);
                            break;
                        }
                    }
                }
            }
        }

        if !closed.is_empty() {
            self.subscribers
                .write()
                .await
                .retain(|s| !closed.contains(&s.id));
            debug!(count = closed.len(), "pruned closed subscriptions");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunker_core::{Keypair, PublicKey, UnsignedEvent};
    use std::time::Duration;

    fn event_to(author: &Keypair, recipient: &PublicKey, content: &str) -> Event {
        UnsignedEvent::new(24133, content)
            .tag(["p".to_string(), recipient.to_hex()])
            .sign(author)
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscription() {
        let relay = MemoryRelay::new();
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let mut sub = relay
            .subscribe(Filter::new().recipient(bob))
            .await
            .unwrap();

        let event = event_to(&alice, &bob, "hello");
        relay.publish(event.clone()).await.unwrap();

        assert_eq!(sub.next().await, Some(event));
    }

    #[tokio::test]
    async fn test_non_matching_subscription_gets_nothing() {
        let relay = MemoryRelay::new();
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();
        let carol = Keypair::generate().public_key();

        let mut sub = relay
            .subscribe(Filter::new().recipient(carol))
            .await
            .unwrap();

        relay.publish(event_to(&alice, &bob, "hi")).await.unwrap();

        let got = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(got.is_err(), "carol should not receive bob's event");
    }

    #[tokio::test]
    async fn test_subscription_stays_open() {
        let relay = MemoryRelay::new();
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let mut sub = relay.subscribe(Filter::new()).await.unwrap();

        for i in 0..5 {
            relay
                .publish(event_to(&alice, &bob, &i.to_string()))
                .await
                .unwrap();
        }

        for i in 0..5 {
            assert_eq!(sub.next().await.unwrap().content, i.to_string());
        }
    }

    #[tokio::test]
    async fn test_duplicate_delivery() {
        let relay = MemoryRelay::new();
        relay.set_duplicate_delivery(true);
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let mut sub = relay.subscribe(Filter::new()).await.unwrap();
        let event = event_to(&alice, &bob, "twice");
        relay.publish(event.clone()).await.unwrap();

        assert_eq!(sub.next().await, Some(event.clone()));
        assert_eq!(sub.next().await, Some(event));
        assert_eq!(relay.published().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let relay = MemoryRelay::new();
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let sub = relay.subscribe(Filter::new()).await.unwrap();
        assert_eq!(relay.subscription_count().await, 1);
        drop(sub);

        relay.publish(event_to(&alice, &bob, "x")).await.unwrap();
        assert_eq!(relay.subscription_count().await, 0);
        assert_eq!(relay.subscribers.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let relay = MemoryRelay::new();
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        relay.publish(event_to(&alice, &bob, "void")).await.unwrap();
        assert_eq!(relay.published().await.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let relay = MemoryRelay::with_history_limit(2);
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        for content in ["a", "b", "c"] {
            relay.publish(event_to(&alice, &bob, content)).await.unwrap();
        }

        let kept: Vec<_> = relay
            .published()
            .await
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(kept, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_history_can_be_disabled() {
        let relay = MemoryRelay::with_history_limit(0);
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let mut sub = relay.subscribe(Filter::new()).await.unwrap();
        relay.publish(event_to(&alice, &bob, "live")).await.unwrap();

        assert!(relay.published().await.is_empty());
        assert_eq!(sub.next().await.unwrap().content, "live");
    }
}
