//! Progress event types and the per-user broadcaster
//!
//! Long-running reconciliation work reports progress as `ProgressEvent`s.
//! The `ProgressBroadcaster` fans events out to every live subscriber for
//! the owning user. Delivery is strictly non-blocking: a subscriber whose
//! queue is full misses that event, and a user with no subscribers drops
//! events silently. Producers never wait on observers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Default per-subscriber queue capacity
pub const SUBSCRIPTION_CAPACITY: usize = 100;

/// Phases of a reconciliation run, in the order they occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    FetchingLikedSongs,
    FetchingPlaylists,
    FetchingArtists,
    Analyzing,
    GeneratingPlan,
    CreatingPlaylists,
    AddingTracks,
    RemovingTracks,
    Complete,
}

/// A progress update event, serialized for SSE transmission
///
/// Wire form: `{"type":"progress","phase":"adding_tracks","current":10,"total":50,"message":"..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Incremental progress within a phase
    Progress {
        phase: ProgressPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        current: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        message: String,
    },
    /// Informational message with no counters
    Info { message: String },
    /// Non-fatal error notice
    Error { message: String },
    /// Terminal event for a run
    Complete {
        phase: ProgressPhase,
        message: String,
    },
}

impl ProgressEvent {
    /// Format as an SSE frame: `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {}\n\n", json))
    }
}

/// Handle for one live subscriber
///
/// Dropping the handle (or calling `ProgressBroadcaster::unsubscribe`)
/// closes the queue. The broadcaster tracks subscriptions by id rather
/// than by channel identity, so removal is idempotent.
pub struct Subscription {
    id: u64,
    user_id: String,
    rx: mpsc::Receiver<ProgressEvent>,
    arena: Arc<Inner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.arena.remove(&self.user_id, self.id);
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Receive the next event; `None` once the subscription is closed
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }
}

/// Per-user fan-out of progress events
///
/// Cheap to clone; all clones share the subscriber arena.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    /// user id -> (subscription id -> bounded sender)
    subscribers: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<ProgressEvent>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Inner {
    /// Remove one subscription; dropping the sender closes the queue.
    /// Idempotent, so an explicit unsubscribe followed by the handle's
    /// drop cannot close twice.
    fn remove(&self, user_id: &str, id: u64) {
        let mut subs = self.subscribers.write().unwrap();
        if let Some(user_subs) = subs.get_mut(user_id) {
            user_subs.remove(&id);
            if user_subs.is_empty() {
                subs.remove(user_id);
            }
        }
    }
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(SUBSCRIPTION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity,
            }),
        }
    }

    /// Register a new subscriber for a user
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subs = self.inner.subscribers.write().unwrap();
        subs.entry(user_id.to_string()).or_default().insert(id, tx);
        debug!(user_id, subscription = id, "progress subscriber added");

        Subscription {
            id,
            user_id: user_id.to_string(),
            rx,
            arena: Arc::clone(&self.inner),
        }
    }

    /// Remove a subscription, closing its queue
    ///
    /// No-op if the subscription was already removed.
    pub fn unsubscribe(&self, sub: &Subscription) {
        self.inner.remove(&sub.user_id, sub.id);
        debug!(user_id = %sub.user_id, subscription = sub.id, "progress subscriber removed");
    }

    /// Deliver an event to every current subscriber for a user
    ///
    /// Never blocks: full queues drop the event for that subscriber only,
    /// and a user with no subscribers drops it entirely.
    pub fn broadcast(&self, user_id: &str, event: ProgressEvent) {
        let subs = self.inner.subscribers.read().unwrap();
        let Some(user_subs) = subs.get(user_id) else {
            return;
        };
        for (id, tx) in user_subs {
            if tx.try_send(event.clone()).is_err() {
                debug!(user_id, subscription = id, "subscriber queue full, event dropped");
            }
        }
    }

    /// Number of live subscribers for a user
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap()
            .get(user_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn send_progress(
        &self,
        user_id: &str,
        phase: ProgressPhase,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        self.broadcast(
            user_id,
            ProgressEvent::Progress {
                phase,
                current: Some(current),
                total: Some(total),
                message: message.into(),
            },
        );
    }

    pub fn send_info(&self, user_id: &str, message: impl Into<String>) {
        self.broadcast(
            user_id,
            ProgressEvent::Info {
                message: message.into(),
            },
        );
    }

    pub fn send_error(&self, user_id: &str, message: impl Into<String>) {
        self.broadcast(
            user_id,
            ProgressEvent::Error {
                message: message.into(),
            },
        );
    }

    pub fn send_complete(&self, user_id: &str, message: impl Into<String>) {
        self.broadcast(
            user_id,
            ProgressEvent::Complete {
                phase: ProgressPhase::Complete,
                message: message.into(),
            },
        );
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_broadcast() {
        let broadcaster = ProgressBroadcaster::new();
        let mut sub = broadcaster.subscribe("user1");

        broadcaster.send_info("user1", "hello");

        match sub.recv().await {
            Some(ProgressEvent::Info { message }) => assert_eq!(message, "hello"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_dropped() {
        let broadcaster = ProgressBroadcaster::new();
        // Must not panic or block
        broadcaster.send_info("nobody", "into the void");
        assert_eq!(broadcaster.subscriber_count("nobody"), 0);
    }

    #[tokio::test]
    async fn events_are_isolated_per_user() {
        let broadcaster = ProgressBroadcaster::new();
        let mut sub_a = broadcaster.subscribe("a");
        let _sub_b = broadcaster.subscribe("b");

        broadcaster.send_info("a", "for a only");

        match sub_a.recv().await {
            Some(ProgressEvent::Info { message }) => assert_eq!(message, "for a only"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(broadcaster.subscriber_count("b"), 1);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let broadcaster = ProgressBroadcaster::new();
        let mut first = broadcaster.subscribe("user1");
        let mut second = broadcaster.subscribe("user1");

        broadcaster.send_info("user1", "fan-out");

        for sub in [&mut first, &mut second] {
            match sub.recv().await {
                Some(ProgressEvent::Info { message }) => assert_eq!(message, "fan-out"),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn unsubscribe_closes_queue_exactly_once() {
        let broadcaster = ProgressBroadcaster::new();
        let mut sub = broadcaster.subscribe("user1");

        broadcaster.unsubscribe(&sub);
        // Second unsubscribe is a no-op
        broadcaster.unsubscribe(&sub);

        assert_eq!(broadcaster.subscriber_count("user1"), 0);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let broadcaster = ProgressBroadcaster::with_capacity(2);
        let mut sub = broadcaster.subscribe("user1");

        // Third send overflows the queue; must not block or error
        broadcaster.send_info("user1", "one");
        broadcaster.send_info("user1", "two");
        broadcaster.send_info("user1", "three");

        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_some());
        // "three" was dropped; nothing further is pending
        assert!(sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_only_for_the_full_subscriber() {
        let broadcaster = ProgressBroadcaster::with_capacity(1);
        let mut stalled = broadcaster.subscribe("user1");
        let mut draining = broadcaster.subscribe("user1");

        broadcaster.send_info("user1", "first");
        // Only one subscriber keeps up
        match draining.recv().await {
            Some(ProgressEvent::Info { message }) => assert_eq!(message, "first"),
            other => panic!("unexpected event: {:?}", other),
        }

        // The stalled queue is still full, so "second" is dropped for it
        // but delivered to the drained one
        broadcaster.send_info("user1", "second");
        match draining.recv().await {
            Some(ProgressEvent::Info { message }) => assert_eq!(message, "second"),
            other => panic!("unexpected event: {:?}", other),
        }
        match stalled.recv().await {
            Some(ProgressEvent::Info { message }) => assert_eq!(message, "first"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(stalled.rx.try_recv().is_err());
    }

    #[test]
    fn sse_frame_format() {
        let event = ProgressEvent::Progress {
            phase: ProgressPhase::AddingTracks,
            current: Some(10),
            total: Some(50),
            message: "Adding tracks...".to_string(),
        };
        let frame = event.to_sse_frame().unwrap();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));
        assert!(frame.contains("\"type\":\"progress\""));
        assert!(frame.contains("\"phase\":\"adding_tracks\""));
    }

    #[test]
    fn info_event_omits_counters() {
        let event = ProgressEvent::Info {
            message: "hi".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"info","message":"hi"}"#);
    }
}
