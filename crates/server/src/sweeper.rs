// crates/server/src/sweeper.rs
//! Scheduled maintenance sweeps.
//!
//! Three independent interval tasks share the app state: pre-start
//! reminders, stale-session abandonment, and retention. Each per-session
//! action is isolated, so one failing session never blocks the rest of a
//! sweep. Stale abandonment goes through the same transition entry point as
//! interactive requests.

use std::sync::Arc;
use std::time::Duration;

use hirelane_core::{now_ms, SessionStatus};

use crate::lifecycle;
use crate::notify::NotificationKind;
use crate::state::AppState;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Sweep thresholds and cadence.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Remind for sessions starting within this window.
    pub reminder_window_ms: i64,
    /// IN_PROGRESS sessions older than this are considered stale.
    pub stale_after_ms: i64,
    /// ABANDONED sessions older than this are retention candidates.
    pub retention_ms: i64,
    /// Hard-delete retention candidates instead of only logging them.
    pub retention_delete: bool,
    pub reminder_interval: Duration,
    pub stale_interval: Duration,
    pub retention_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            reminder_window_ms: HOUR_MS,
            stale_after_ms: 2 * HOUR_MS,
            retention_ms: 30 * DAY_MS,
            retention_delete: false,
            reminder_interval: Duration::from_secs(300),
            stale_interval: Duration::from_secs(600),
            retention_interval: Duration::from_secs(24 * 3600),
        }
    }
}

impl SweepConfig {
    /// Default config with the retention-delete switch read from the
    /// environment (`HIRELANE_RETENTION_DELETE=1`).
    pub fn from_env() -> Self {
        let retention_delete = std::env::var("HIRELANE_RETENTION_DELETE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            retention_delete,
            ..Self::default()
        }
    }
}

pub struct Sweeper {
    state: Arc<AppState>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(state: Arc<AppState>, config: SweepConfig) -> Self {
        Self { state, config }
    }

    /// Spawn the three interval tasks. They run for the life of the process.
    pub fn spawn(self) {
        let sweeper = Arc::new(self);

        let s = sweeper.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(s.config.reminder_interval);
            loop {
                interval.tick().await;
                s.run_reminder_sweep(now_ms()).await;
            }
        });

        let s = sweeper.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(s.config.stale_interval);
            loop {
                interval.tick().await;
                s.run_stale_sweep(now_ms()).await;
            }
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweeper.config.retention_interval);
            loop {
                interval.tick().await;
                sweeper.run_retention_sweep(now_ms()).await;
            }
        });
    }

    /// Remind candidates whose PENDING session starts within the window.
    /// `reminded_at` is marked before the notification fires, so a session is
    /// reminded at most once even across overlapping sweeps.
    pub async fn run_reminder_sweep(&self, now: i64) {
        let due = match self
            .state
            .db
            .pending_reminders(now, self.config.reminder_window_ms)
            .await
        {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "Reminder sweep query failed");
                return;
            }
        };

        for session in due {
            if let Err(e) = self.state.db.mark_reminded(&session.session_uid, now).await {
                tracing::warn!(session_uid = %session.session_uid, error = %e, "Reminder mark failed");
                continue;
            }
            lifecycle::notify(&self.state, &session, NotificationKind::Reminder).await;
            tracing::info!(session_uid = %session.session_uid, "Reminder sent");
        }
    }

    /// Abandon IN_PROGRESS sessions that started too long ago.
    pub async fn run_stale_sweep(&self, now: i64) {
        let cutoff = now - self.config.stale_after_ms;
        let stale = match self.state.db.stale_in_progress(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                tracing::warn!(error = %e, "Stale sweep query failed");
                return;
            }
        };

        for session in stale {
            match lifecycle::transition(&self.state, &session.session_uid, SessionStatus::Abandoned)
                .await
            {
                Ok(_) => {
                    tracing::info!(session_uid = %session.session_uid, "Stale session abandoned");
                }
                Err(e) => {
                    tracing::warn!(session_uid = %session.session_uid, error = %e, "Stale abandon failed");
                }
            }
        }
    }

    /// Surface ABANDONED sessions past the retention window. Deletion only
    /// happens when explicitly configured; the default is log-only.
    pub async fn run_retention_sweep(&self, now: i64) {
        let cutoff = now - self.config.retention_ms;
        let expired = match self.state.db.abandoned_before(cutoff).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::warn!(error = %e, "Retention sweep query failed");
                return;
            }
        };

        for session in expired {
            if self.config.retention_delete {
                match lifecycle::delete_session(&self.state, &session.session_uid).await {
                    Ok(()) => {
                        tracing::info!(session_uid = %session.session_uid, "Expired session deleted");
                    }
                    Err(e) => {
                        tracing::warn!(session_uid = %session.session_uid, error = %e, "Retention delete failed");
                    }
                }
            } else {
                tracing::info!(
                    session_uid = %session.session_uid,
                    started_at = session.started_at,
                    "Session past retention window, archival candidate"
                );
            }
        }
    }
}
