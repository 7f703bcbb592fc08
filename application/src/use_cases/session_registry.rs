//! Per-session state ownership.
//!
//! Each session id maps to one `tokio::sync::Mutex<SessionState>`. Holding
//! the lock for a whole message makes every session single-writer while
//! different sessions proceed concurrently.
//!
//! Sessions stay registered until removed. Long-running callers evict idle
//! ones with [`SessionRegistry::evict_idle`]; a session that is locked or
//! whose handle is still held elsewhere is never evicted.

use chrono::Utc;
use conductor_domain::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

pub type SharedSession = Arc<AsyncMutex<SessionState>>;

struct Entry {
    handle: SharedSession,
    last_used: Instant,
}

impl Entry {
    fn new(handle: SharedSession) -> Self {
        Self {
            handle,
            last_used: Instant::now(),
        }
    }

    /// Nobody but the registry holds the handle.
    fn is_unused(&self) -> bool {
        Arc::strong_count(&self.handle) == 1 && self.handle.try_lock().is_ok()
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `session_id`, creating an empty session on first use.
    pub fn session(&self, session_id: &str) -> SharedSession {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            Entry::new(Arc::new(AsyncMutex::new(SessionState::new(
                session_id,
                Utc::now(),
            ))))
        });
        entry.last_used = Instant::now();
        Arc::clone(&entry.handle)
    }

    /// Existing handle only
    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).map(|e| Arc::clone(&e.handle))
    }

    /// Install a previously saved session, replacing any live one.
    pub fn insert(&self, state: SessionState) -> SharedSession {
        let id = state.id.clone();
        let handle = Arc::new(AsyncMutex::new(state));
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(id, Entry::new(Arc::clone(&handle)));
        handle
    }

    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).is_some()
    }

    /// Drop sessions untouched for at least `max_idle`; returns their ids.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        self.evict_idle_at(max_idle, Instant::now())
    }

    fn evict_idle_at(&self, max_idle: Duration, now: Instant) -> Vec<String> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let mut evicted: Vec<String> = sessions
            .iter()
            .filter(|(_, e)| {
                now.saturating_duration_since(e.last_used) >= max_idle && e.is_unused()
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &evicted {
            sessions.remove(id);
        }
        evicted.sort();
        if !evicted.is_empty() {
            debug!("Evicted idle sessions: {:?}", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn session_ids(&self) -> Vec<String> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}
