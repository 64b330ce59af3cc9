//! In-memory session store.
//!
//! Maps session ids to shared, individually locked [`Session`]s. A turn holds
//! its session's mutex for its whole duration, which serializes callers of the
//! same session while leaving other sessions free to proceed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use wordtutor_core::{Session, SessionId};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_used: AtomicU64,
}

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    default_word: String,
    /// 0 means unbounded
    max_sessions: usize,
    clock: AtomicU64,
}

impl InMemorySessionStore {
    /// New sessions start on `default_word`. Past `max_sessions` the least
    /// recently used session is dropped; 0 disables eviction.
    pub fn new(default_word: impl Into<String>, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_word: default_word.into(),
            max_sessions,
            clock: AtomicU64::new(0),
        }
    }

    pub fn default_word(&self) -> &str {
        &self.default_word
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return the session for `id`, creating an empty one on first contact.
    ///
    /// Repeated calls with the same id return the same handle. Concurrent
    /// first contacts race on the write lock, and only one of them inserts.
    pub async fn get_or_create(&self, id: &SessionId) -> SessionHandle {
        if let Some(handle) = self.touch(id).await {
            return handle;
        }

        let mut sessions = self.sessions.write().await;
        let now = self.tick();
        if let Some(entry) = sessions.get(id) {
            entry.last_used.store(now, Ordering::Relaxed);
            return entry.handle.clone();
        }

        let handle = Arc::new(Mutex::new(Session::new(id.clone(), self.default_word.clone())));
        sessions.insert(
            id.clone(),
            Entry {
                handle: handle.clone(),
                last_used: AtomicU64::new(now),
            },
        );
        debug!(session = %id, total = sessions.len(), "Session created");

        if self.max_sessions > 0 && sessions.len() > self.max_sessions {
            evict_lru(&mut sessions, id);
        }
        handle
    }

    /// Existing session only; refreshes its recency.
    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.touch(id).await
    }

    async fn touch(&self, id: &SessionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(id)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.handle.clone())
    }

    /// Forget a session. Holders of its handle keep a working copy.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }
}

fn evict_lru(sessions: &mut HashMap<SessionId, Entry>, keep: &SessionId) {
    let victim = sessions
        .iter()
        .filter(|(id, _)| *id != keep)
        .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
        .map(|(id, _)| id.clone());

    if let Some(victim) = victim {
        sessions.remove(&victim);
        debug!(session = %victim, "Evicted least recently used session");
    }
}
