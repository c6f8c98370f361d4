// crates/server/src/notify.rs
//! Notification categories and the outbound mail seam.
//!
//! Delivery is fire-and-forget: a failed send is logged and the request that
//! triggered it proceeds unchanged.

use async_trait::async_trait;
use serde::Serialize;

/// The closed set of notification categories. Adding a category means adding
/// a variant, and the exhaustive matches below force the copy to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub enum NotificationKind {
    Scheduled,
    Reminder,
    Completed,
    Cancelled,
}

impl NotificationKind {
    pub fn title(self) -> &'static str {
        match self {
            NotificationKind::Scheduled => "Interview scheduled",
            NotificationKind::Reminder => "Interview starting soon",
            NotificationKind::Completed => "Interview completed",
            NotificationKind::Cancelled => "Interview cancelled",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            NotificationKind::Scheduled => "Your interview has been scheduled.",
            NotificationKind::Reminder => "Your interview starts within the next hour.",
            NotificationKind::Completed => "The interview has been completed.",
            NotificationKind::Cancelled => "The interview has been cancelled.",
        }
    }
}

/// A notification as published to live feeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct Notification {
    pub kind: NotificationKind,
    pub session_uid: String,
    pub title: String,
    pub message: String,
    pub created_at: i64,
}

impl Notification {
    pub fn new(kind: NotificationKind, session_uid: &str, created_at: i64) -> Self {
        Self {
            kind,
            session_uid: session_uid.to_string(),
            title: kind.title().to_string(),
            message: kind.message().to_string(),
            created_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound email seam. The real transport lives outside this service; the
/// default implementation just logs.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Mailer that logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(recipient, subject, body_len = body.len(), "Mail (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_distinct_copy() {
        let kinds = [
            NotificationKind::Scheduled,
            NotificationKind::Reminder,
            NotificationKind::Completed,
            NotificationKind::Cancelled,
        ];
        for kind in kinds {
            assert!(!kind.title().is_empty());
            assert!(!kind.message().is_empty());
        }
        let titles: std::collections::HashSet<_> = kinds.iter().map(|k| k.title()).collect();
        assert_eq!(titles.len(), kinds.len());
    }

    #[test]
    fn test_notification_wire_shape() {
        let notification = Notification::new(NotificationKind::Reminder, "s-1", 42);
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"kind\":\"REMINDER\""));
        assert!(json.contains("\"sessionUid\":\"s-1\""));
        assert!(json.contains("\"createdAt\":42"));
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        LogMailer
            .send("candidate@example.com", "Interview scheduled", "body")
            .await
            .unwrap();
    }
}
