//! Live stream fan-out registry
//!
//! Per-community subscriber lists behind one readers-writer lock: broadcast
//! iterates under the read lock, subscribe/unsubscribe mutate under the
//! write lock. Each subscriber owns a small bounded buffer; delivery into it
//! is a non-blocking try-send, so one slow consumer loses its own events and
//! nothing else - the broadcaster never waits and other communities are
//! untouched. The lock is never held across an await.
//!
//! Empty at process start; a community's entry is pruned when its last
//! subscriber leaves, so the registry's memory tracks live viewers only.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Event type for the subscribe acknowledgment
pub const EVENT_CONNECTED: &str = "connected";

/// Event type for newly created posts
pub const EVENT_POST_CREATED: &str = "post_created";

/// Event type for edited posts
pub const EVENT_POST_UPDATED: &str = "post_updated";

/// One event delivered to live subscribers
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// A registered subscriber: its identity plus the sending half of its buffer
struct Subscriber {
    id: u64,
    tx: mpsc::Sender<StreamEvent>,
}

struct RegistryInner {
    communities: RwLock<HashMap<Uuid, Vec<Subscriber>>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Fan-out registry shared by all submissions and all live connections.
///
/// Cheap to clone; all clones share the one subscriber table.
#[derive(Clone)]
pub struct StreamRegistry {
    inner: Arc<RegistryInner>,
}

impl StreamRegistry {
    /// Create a registry with the given per-subscriber buffer capacity.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                communities: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Subscribe to a community's live stream.
    ///
    /// The returned subscription immediately carries a `connected`
    /// acknowledgment, then receives broadcast events until it is dropped or
    /// explicitly unsubscribed.
    pub fn subscribe(&self, community_id: Uuid) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        // Ack first so it precedes any broadcast; the fresh buffer has room
        let _ = tx.try_send(StreamEvent {
            event_type: EVENT_CONNECTED.to_string(),
            payload: serde_json::json!({ "community_id": community_id }),
        });

        let mut communities = self.inner.communities.write().unwrap();
        let subscribers = communities.entry(community_id).or_default();
        subscribers.push(Subscriber { id, tx });

        debug!(
            community_id = %community_id,
            subscriber_id = id,
            total = subscribers.len(),
            "Client subscribed"
        );

        Subscription {
            community_id,
            id,
            rx,
            registry: self.clone(),
        }
    }

    /// Remove a subscriber by its buffer identity.
    ///
    /// Dropping the sending half is what closes the buffer: a blocked or
    /// later read on the subscription observes end-of-stream. Removing an
    /// unknown id is a no-op, so unsubscribe is safe to repeat. The community
    /// entry is pruned once its list empties.
    pub fn unsubscribe(&self, community_id: Uuid, subscriber_id: u64) {
        let mut communities = self.inner.communities.write().unwrap();

        let Some(subscribers) = communities.get_mut(&community_id) else {
            return;
        };

        // Identity, not index - the list may have been mutated concurrently
        if let Some(pos) = subscribers.iter().position(|s| s.id == subscriber_id) {
            subscribers.remove(pos);
            debug!(
                community_id = %community_id,
                subscriber_id = subscriber_id,
                remaining = subscribers.len(),
                "Client unsubscribed"
            );
        }

        if subscribers.is_empty() {
            communities.remove(&community_id);
        }
    }

    /// Broadcast an event to every live subscriber of a community.
    ///
    /// Non-blocking: a subscriber whose buffer is full loses this event and
    /// delivery to the others proceeds. Absence of subscribers is not an
    /// error.
    pub fn broadcast(&self, community_id: Uuid, event_type: &str, payload: serde_json::Value) {
        let communities = self.inner.communities.read().unwrap();

        let Some(subscribers) = communities.get(&community_id) else {
            return;
        };

        let event = StreamEvent {
            event_type: event_type.to_string(),
            payload,
        };

        let mut delivered = 0usize;
        for subscriber in subscribers {
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        community_id = %community_id,
                        subscriber_id = subscriber.id,
                        "Slow stream client, dropping event"
                    );
                }
                // A racing unsubscribe already closed this buffer
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        if delivered > 0 {
            debug!(
                community_id = %community_id,
                event_type = event_type,
                delivered = delivered,
                "Broadcast event"
            );
        }
    }

    /// Number of live subscribers for a community
    pub fn subscriber_count(&self, community_id: Uuid) -> usize {
        self.inner
            .communities
            .read()
            .unwrap()
            .get(&community_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Number of communities with at least one live subscriber
    pub fn community_count(&self) -> usize {
        self.inner.communities.read().unwrap().len()
    }
}

/// A live subscription to one community's stream.
///
/// Owns the receiving half of the buffer. Dropping the subscription
/// unsubscribes, which is how a disconnected client releases its slot.
pub struct Subscription {
    community_id: Uuid,
    id: u64,
    rx: mpsc::Receiver<StreamEvent>,
    registry: StreamRegistry,
}

impl Subscription {
    /// Receive the next event; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive; `None` when the buffer is currently empty.
    pub fn try_next(&mut self) -> Option<StreamEvent> {
        self.rx.try_recv().ok()
    }

    /// This subscription's identity in the registry
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Community this subscription watches
    pub fn community_id(&self) -> Uuid {
        self.community_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.community_id, self.id);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_acks_first() {
        let registry = StreamRegistry::new(10);
        let mut sub = registry.subscribe(Uuid::new_v4());

        let ack = sub.recv().await.unwrap();
        assert_eq!(ack.event_type, EVENT_CONNECTED);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_its_community() {
        let registry = StreamRegistry::new(10);
        let community_x = Uuid::new_v4();
        let community_y = Uuid::new_v4();

        let mut sub_x = registry.subscribe(community_x);
        let mut sub_y = registry.subscribe(community_y);

        // Drain acks
        assert_eq!(sub_x.recv().await.unwrap().event_type, EVENT_CONNECTED);
        assert_eq!(sub_y.recv().await.unwrap().event_type, EVENT_CONNECTED);

        registry.broadcast(
            community_x,
            EVENT_POST_CREATED,
            serde_json::json!({ "title": "hello" }),
        );

        let event = sub_x.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_POST_CREATED);
        assert_eq!(event.payload["title"], "hello");

        assert!(sub_y.try_next().is_none());
    }

    #[tokio::test]
    async fn test_slow_consumer_drops_without_blocking() {
        let registry = StreamRegistry::new(2);
        let community = Uuid::new_v4();

        // Never read: the ack occupies one slot, the first broadcast fills
        // the buffer, the rest must drop while broadcast returns immediately.
        let mut sub = registry.subscribe(community);

        for i in 0..5 {
            registry.broadcast(community, EVENT_POST_CREATED, serde_json::json!({ "n": i }));
        }

        assert_eq!(sub.recv().await.unwrap().event_type, EVENT_CONNECTED);
        assert_eq!(sub.recv().await.unwrap().payload["n"], 0);
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_stream() {
        let registry = StreamRegistry::new(10);
        let community = Uuid::new_v4();

        let mut sub = registry.subscribe(community);
        registry.unsubscribe(community, sub.id());

        // Buffered ack still drains, then end-of-stream
        assert_eq!(sub.recv().await.unwrap().event_type, EVENT_CONNECTED);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_harmless() {
        let registry = StreamRegistry::new(10);
        let community = Uuid::new_v4();

        let sub_a = registry.subscribe(community);
        let mut sub_b = registry.subscribe(community);
        let a_id = sub_a.id();

        registry.unsubscribe(community, a_id);
        registry.unsubscribe(community, a_id);

        assert_eq!(registry.subscriber_count(community), 1);

        // The untouched subscriber still receives
        registry.broadcast(community, EVENT_POST_CREATED, serde_json::json!({}));
        assert_eq!(sub_b.recv().await.unwrap().event_type, EVENT_CONNECTED);
        assert_eq!(sub_b.recv().await.unwrap().event_type, EVENT_POST_CREATED);
    }

    #[tokio::test]
    async fn test_empty_community_is_pruned() {
        let registry = StreamRegistry::new(10);
        let community = Uuid::new_v4();

        let sub = registry.subscribe(community);
        assert_eq!(registry.community_count(), 1);

        drop(sub);
        assert_eq!(registry.community_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let registry = StreamRegistry::new(10);
        let community = Uuid::new_v4();

        {
            let _sub = registry.subscribe(community);
            assert_eq!(registry.subscriber_count(community), 1);
        }

        assert_eq!(registry.subscriber_count(community), 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_community_is_noop() {
        let registry = StreamRegistry::new(10);
        registry.broadcast(Uuid::new_v4(), EVENT_POST_CREATED, serde_json::json!({}));
    }
}
