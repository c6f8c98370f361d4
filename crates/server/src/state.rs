// crates/server/src/state.rs
//! Application state for the Axum server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use hirelane_core::ActivityLog;
use hirelane_db::Database;

use crate::broadcast::Broadcaster;
use crate::cache::SessionCache;
use crate::notify::{LogMailer, Mailer};

/// Per-session lock registry.
///
/// Read-modify-write sequences (status transitions, turn appends) take the
/// session's lock for their whole span, including the broadcast send, so each
/// session has a linear history. Sends are non-blocking, so holding the lock
/// across them cannot stall on a slow subscriber. Different sessions never
/// contend. The registry itself uses a `std::sync::Mutex` held only for the
/// map lookup, never across an `.await`.
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get (or create) the lock for one session. The caller awaits it
    /// outside the registry lock.
    pub fn lock_for(&self, session_uid: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("session lock registry");
        locks
            .entry(session_uid.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub fn remove(&self, session_uid: &str) {
        let mut locks = self.locks.lock().expect("session lock registry");
        locks.remove(session_uid);
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Suspicious-activity reports waiting to be folded into the next turn
/// append for their session.
pub struct PendingActivity {
    pending: Mutex<HashMap<String, ActivityLog>>,
}

impl PendingActivity {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Merge a new report into the session's pending log.
    pub fn report(&self, session_uid: &str, activity: &ActivityLog) {
        let mut pending = self.pending.lock().expect("pending activity registry");
        pending
            .entry(session_uid.to_string())
            .or_default()
            .merge(activity);
    }

    /// Take and clear the pending log for a session.
    pub fn drain(&self, session_uid: &str) -> Option<ActivityLog> {
        let mut pending = self.pending.lock().expect("pending activity registry");
        pending.remove(session_uid)
    }
}

impl Default for PendingActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle for session/turn persistence.
    pub db: Database,
    /// Live-update fan-out (session topics, user queues, global feed).
    pub broadcaster: Broadcaster,
    /// Per-session async lock registry.
    pub locks: SessionLocks,
    /// Activity reports awaiting the next turn append.
    pub pending_activity: PendingActivity,
    /// Ephemeral session mirror (best-effort, DB authoritative).
    pub cache: SessionCache,
    /// Outbound email seam.
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(db: Database) -> Arc<Self> {
        Self::with_mailer(db, Arc::new(LogMailer))
    }

    /// Create with an externally-provided mailer (tests, real transports).
    pub fn with_mailer(db: Database, mailer: Arc<dyn Mailer>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            broadcaster: Broadcaster::new(),
            locks: SessionLocks::new(),
            pending_activity: PendingActivity::new(),
            cache: SessionCache::new(),
            mailer,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
