// crates/server/src/broadcast.rs
//! Live-update fan-out over broadcast channels.
//!
//! One topic per session uid, one queue per user id, plus a global
//! notification feed. Publishing is a non-blocking channel send: a slow or
//! absent subscriber can never stall the caller, so snapshots can be sent
//! while the per-session lock is still held and arrive in commit order.

use std::collections::HashMap;
use std::sync::RwLock;

use hirelane_core::{Recommendation, SessionStatus};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::notify::Notification;

/// Capacity of each topic channel. Laggards get a `Lagged` error and
/// re-hydrate from the REST surface.
const TOPIC_CAPACITY: usize = 64;

/// Session state as seen by live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct SessionSnapshot {
    pub session_uid: String,
    pub status: SessionStatus,
    pub candidate_name: String,
    pub template_name: String,
    pub total_turns: i64,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub recommendation: Option<Recommendation>,
    pub updated_at: Option<i64>,
}

/// Topic registry. Uses `std::sync::RwLock` (not `tokio::sync::RwLock`)
/// because the lock is never held across an `.await` point: lookups and
/// inserts are short synchronous map operations.
pub struct Broadcaster {
    sessions: RwLock<HashMap<String, broadcast::Sender<SessionSnapshot>>>,
    users: RwLock<HashMap<String, broadcast::Sender<Notification>>>,
    global: broadcast::Sender<Notification>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            global: broadcast::channel(TOPIC_CAPACITY).0,
        }
    }

    /// Subscribe to updates for one session, creating the topic if needed.
    pub fn subscribe_session(&self, session_uid: &str) -> broadcast::Receiver<SessionSnapshot> {
        let mut topics = self.sessions.write().expect("session topics lock");
        topics
            .entry(session_uid.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Subscribe to one user's notification queue, creating it if needed.
    pub fn subscribe_user(&self, user_id: &str) -> broadcast::Receiver<Notification> {
        let mut queues = self.users.write().expect("user queues lock");
        queues
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<Notification> {
        self.global.subscribe()
    }

    /// Fire-and-forget publish of a fresh session snapshot.
    pub fn publish_session_update(&self, session_uid: &str, snapshot: SessionSnapshot) {
        let sender = {
            let topics = self.sessions.read().expect("session topics lock");
            topics.get(session_uid).cloned()
        };
        match sender {
            Some(tx) => {
                if let Err(e) = tx.send(snapshot) {
                    tracing::debug!(session_uid, error = %e, "No live subscribers for session");
                }
            }
            None => {
                tracing::debug!(session_uid, "No topic yet for session, update dropped");
            }
        }
    }

    /// Fire-and-forget publish to one user's queue.
    pub fn publish_user_notification(&self, user_id: &str, notification: Notification) {
        let sender = {
            let queues = self.users.read().expect("user queues lock");
            queues.get(user_id).cloned()
        };
        match sender {
            Some(tx) => {
                if let Err(e) = tx.send(notification) {
                    tracing::debug!(user_id, error = %e, "No subscribers on user queue");
                }
            }
            None => {
                tracing::debug!(user_id, "No queue yet for user, notification dropped");
            }
        }
    }

    /// Fire-and-forget publish to the global feed.
    pub fn publish_global_notification(&self, notification: Notification) {
        if let Err(e) = self.global.send(notification) {
            tracing::debug!(error = %e, "No subscribers on global feed");
        }
    }

    /// Drop the topic for a deleted session so the registry does not grow
    /// without bound.
    pub fn drop_session_topic(&self, session_uid: &str) {
        let mut topics = self.sessions.write().expect("session topics lock");
        topics.remove(session_uid);
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;

    fn snapshot(uid: &str, status: SessionStatus, total_turns: i64) -> SessionSnapshot {
        SessionSnapshot {
            session_uid: uid.to_string(),
            status,
            candidate_name: "Ada Lovelace".to_string(),
            template_name: "Backend screen".to_string(),
            total_turns,
            started_at: 1_000,
            completed_at: None,
            recommendation: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_session_updates_in_order() {
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe_session("s-1");

        for n in 1..=3 {
            broadcaster.publish_session_update("s-1", snapshot("s-1", SessionStatus::InProgress, n));
        }

        for n in 1..=3 {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.total_turns, n);
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let broadcaster = Broadcaster::new();
        // No topic, then a topic whose only receiver was dropped.
        broadcaster.publish_session_update("s-1", snapshot("s-1", SessionStatus::Pending, 0));
        drop(broadcaster.subscribe_session("s-1"));
        broadcaster.publish_session_update("s-1", snapshot("s-1", SessionStatus::Pending, 0));
    }

    #[tokio::test]
    async fn test_topics_are_isolated_per_session() {
        let broadcaster = Broadcaster::new();
        let mut rx_a = broadcaster.subscribe_session("s-a");
        let mut rx_b = broadcaster.subscribe_session("s-b");

        broadcaster.publish_session_update("s-a", snapshot("s-a", SessionStatus::InProgress, 1));

        assert_eq!(rx_a.recv().await.unwrap().session_uid, "s-a");
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_user_and_global_feeds() {
        let broadcaster = Broadcaster::new();
        let mut user_rx = broadcaster.subscribe_user("recruiter-1");
        let mut global_rx = broadcaster.subscribe_global();

        let notification = Notification::new(NotificationKind::Completed, "s-1", 1_000);
        broadcaster.publish_user_notification("recruiter-1", notification.clone());
        broadcaster.publish_global_notification(notification.clone());

        assert_eq!(user_rx.recv().await.unwrap(), notification);
        assert_eq!(global_rx.recv().await.unwrap(), notification);
    }

    #[tokio::test]
    async fn test_drop_session_topic() {
        let broadcaster = Broadcaster::new();
        let _rx = broadcaster.subscribe_session("s-1");
        broadcaster.drop_session_topic("s-1");

        let topics = broadcaster.sessions.read().unwrap();
        assert!(!topics.contains_key("s-1"));
    }
}
