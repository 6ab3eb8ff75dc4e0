//! In-memory session and short-lived token stores
//!
//! Sessions hold a user's Spotify tokens between requests. A background
//! reaper sweeps expired entries; reads also treat expired entries as
//! absent so the sweep interval never extends a lifetime.

use crate::spotify::TokenSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// One authenticated user's state
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub token: TokenSet,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Expiring key-value map shared across handlers
pub struct TtlStore<V> {
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
    ttl: Duration,
}

impl<V> Clone for TtlStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TtlStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Remove an entry, returning it if it was present and unexpired
    pub async fn remove(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value)
    }

    /// Replace the value and restart the clock for an existing key
    pub async fn update(&self, key: &str, value: V) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.expires_at = Instant::now() + self.ttl;
                true
            }
            None => false,
        }
    }

    /// Extend the lifetime of an existing key without changing its value
    pub async fn refresh(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Instant::now() + self.ttl;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("reaped {} expired entries", removed);
        }
    }

    /// Run the reaper until cancellation
    pub fn spawn_reaper(&self, interval: Duration, cancel: CancellationToken) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => store.sweep().await,
                }
            }
        });
    }
}

/// Cookie-keyed store of authenticated sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: TtlStore<Session>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlStore::new(ttl),
        }
    }

    /// Create a session, returning its opaque ID for the cookie
    pub async fn create(&self, session: Session) -> String {
        let sid = Uuid::new_v4().to_string();
        self.inner.insert(sid.clone(), session).await;
        sid
    }

    pub async fn get(&self, sid: &str) -> Option<Session> {
        self.inner.get(sid).await
    }

    /// Sliding expiry: restart the TTL clock for an active session
    pub async fn touch(&self, sid: &str) -> bool {
        self.inner.refresh(sid).await
    }

    /// Store a refreshed token set on an existing session
    pub async fn update_token(&self, sid: &str, token: TokenSet) -> bool {
        match self.inner.get(sid).await {
            Some(mut session) => {
                session.token = token;
                self.inner.update(sid, session).await
            }
            None => false,
        }
    }

    pub async fn delete(&self, sid: &str) {
        self.inner.remove(sid).await;
    }

    pub fn spawn_reaper(&self, interval: Duration, cancel: CancellationToken) {
        self.inner.spawn_reaper(interval, cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn token() -> TokenSet {
        TokenSet {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn session() -> Session {
        Session {
            user_id: "user-1".into(),
            display_name: "Listener".into(),
            token: token(),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = SessionStore::new(Duration::from_secs(60));
        let sid = store.create(session()).await;
        let got = store.get(&sid).await.expect("session present");
        assert_eq!(got.user_id, "user-1");
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store: TtlStore<String> = TtlStore::new(Duration::from_millis(0));
        store.insert("k".into(), "v".into()).await;
        assert!(store.get("k").await.is_none());
        assert!(store.remove("k").await.is_none());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired() {
        let store: TtlStore<u32> = TtlStore::new(Duration::from_millis(0));
        store.insert("old".into(), 1).await;
        let keeper: TtlStore<u32> = TtlStore {
            entries: Arc::clone(&store.entries),
            ttl: Duration::from_secs(60),
        };
        keeper.insert("fresh".into(), 2).await;
        store.sweep().await;
        assert_eq!(store.len().await, 1);
        assert_eq!(keeper.get("fresh").await, Some(2));
    }

    #[tokio::test]
    async fn update_token_replaces_in_place() {
        let store = SessionStore::new(Duration::from_secs(60));
        let sid = store.create(session()).await;
        let mut new_token = token();
        new_token.access_token = "rotated".into();
        assert!(store.update_token(&sid, new_token).await);
        assert_eq!(store.get(&sid).await.unwrap().token.access_token, "rotated");
    }

    #[tokio::test]
    async fn touch_slides_expiry() {
        let store = SessionStore::new(Duration::from_millis(200));
        let sid = store.create(session()).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.touch(&sid).await);
        tokio::time::sleep(Duration::from_millis(150)).await;
        // 300ms after creation but only 150ms after the touch
        assert!(store.get(&sid).await.is_some());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let sid = store.create(session()).await;
        store.delete(&sid).await;
        assert!(store.get(&sid).await.is_none());
    }
}
