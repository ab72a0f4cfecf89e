//! Session storage.
//!
//! A [`SessionStore`] maps opaque session ids to their [`SessionState`].
//! Each session sits behind its own mutex so frames for one session are
//! applied one at a time while different sessions proceed in parallel. The
//! map-level lock is only held to look up, insert or remove an entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::detector::SessionState;

/// One session's state plus its last activity time.
#[derive(Debug)]
pub struct SessionSlot {
    state: Mutex<SessionState>,
    last_active: Mutex<Instant>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            last_active: Mutex::new(Instant::now()),
        }
    }

    /// Exclusive access to the state. Marks the session as active.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        let guard = self.state.lock();
        *self.last_active.lock() = Instant::now();
        guard
    }

    /// Copy of the current state, without marking activity.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }
}

pub type SessionHandle = Arc<SessionSlot>;

/// Whether anyone besides the map holds the slot.
///
/// Handles are only cloned out under the map lock, so while eviction holds
/// the write lock this cannot change.
fn in_use(slot: &SessionHandle) -> bool {
    Arc::strong_count(slot) > 1
}

/// Keyed storage of per-session state.
pub trait SessionStore: Send + Sync {
    /// Handle to the session, creating a zeroed state on first reference.
    fn get_or_create(&self, session_id: &str) -> SessionHandle;

    /// Handle to an existing session.
    fn get(&self, session_id: &str) -> Option<SessionHandle>;

    /// Drop a session. Returns whether it existed. Updates made through a
    /// handle obtained earlier no longer reach the store.
    fn remove(&self, session_id: &str) -> bool;

    /// Drop every session idle for at least `max_idle` for which no handle
    /// is outstanding. Returns the number removed.
    fn evict_idle(&self, max_idle: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(slot) = self.sessions.read().get(session_id) {
            return Arc::clone(slot);
        }

        let mut sessions = self.sessions.write();
        // Another caller may have inserted between the two locks.
        let slot = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session_id, "session created");
            Arc::new(SessionSlot::new())
        });
        Arc::clone(slot)
    }

    fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            debug!(session_id, "session removed");
        }
        removed
    }

    fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, slot| in_use(slot) || slot.idle_for() < max_idle);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
