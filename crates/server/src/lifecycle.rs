// crates/server/src/lifecycle.rs
//! Session lifecycle orchestration.
//!
//! Route handlers stay thin; this module owns the order of operations for
//! each lifecycle request: take the session lock, run the database work in
//! one transaction, then mirror and broadcast while still holding the lock
//! so subscribers see a linear history per session. Mail delivery happens
//! after the lock is released; a slow mail transport must not queue other
//! operations on the session behind it.

use hirelane_core::{now_ms, SessionStatus};
use hirelane_db::{EvaluationUpdate, NewSession, SessionRow};
use uuid::Uuid;

use crate::broadcast::SessionSnapshot;
use crate::error::{ApiError, ApiResult};
use crate::notify::{Notification, NotificationKind};
use crate::state::AppState;

/// Parameters for creating a session.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub candidate_id: i64,
    pub template_id: i64,
    pub language: Option<String>,
    pub scheduled_at: Option<i64>,
}

/// Build the live snapshot for a session, resolving display names.
pub async fn snapshot(state: &AppState, session: &SessionRow) -> ApiResult<SessionSnapshot> {
    let candidate_name = state
        .db
        .find_candidate(session.candidate_id)
        .await?
        .map(|c| c.full_name())
        .unwrap_or_else(|| "(unknown)".to_string());
    let template_name = state
        .db
        .find_template(session.template_id)
        .await?
        .map(|t| t.name)
        .unwrap_or_else(|| "(unknown)".to_string());

    Ok(SessionSnapshot {
        session_uid: session.session_uid.clone(),
        status: session.status,
        candidate_name,
        template_name,
        total_turns: session.total_turns,
        started_at: session.started_at,
        completed_at: session.completed_at,
        recommendation: session.recommendation,
        updated_at: session.updated_at,
    })
}

/// Update the status field of the cached mirror, seeding an empty entry if
/// the session has none yet. Log-and-continue on cache failure.
pub(crate) fn mirror_status(state: &AppState, session_uid: &str, status: SessionStatus) {
    let result = state.cache.get(session_uid).and_then(|existing| {
        let mut entry = existing.unwrap_or_else(|| {
            serde_json::json!({ "currentQuestion": null, "history": [] })
        });
        entry["status"] = serde_json::json!(status);
        state.cache.put(session_uid, entry)
    });
    if let Err(e) = result {
        tracing::warn!(session_uid, error = %e, "Cache mirror skipped");
    }
}

/// Send a notification to the candidate's email plus the live feeds.
/// Failures are logged; the primary state change already happened.
pub(crate) async fn notify(state: &AppState, session: &SessionRow, kind: NotificationKind) {
    let notification = Notification::new(kind, &session.session_uid, now_ms());

    match state.db.find_candidate(session.candidate_id).await {
        Ok(Some(candidate)) => {
            if let Some(email) = candidate.email.as_deref() {
                if let Err(e) = state
                    .mailer
                    .send(email, kind.title(), kind.message())
                    .await
                {
                    tracing::warn!(
                        session_uid = %session.session_uid,
                        error = %e,
                        "Mail delivery failed"
                    );
                }
            }
            state
                .broadcaster
                .publish_user_notification(&candidate.id.to_string(), notification.clone());
        }
        Ok(None) => {
            tracing::warn!(session_uid = %session.session_uid, "Candidate missing for notification");
        }
        Err(e) => {
            tracing::warn!(session_uid = %session.session_uid, error = %e, "Candidate lookup failed");
        }
    }

    state.broadcaster.publish_global_notification(notification);
}

/// Create a PENDING session.
///
/// `started_at` is the scheduled time when it lies in the future, otherwise
/// now (walk-in interviews start immediately).
pub async fn create_session(
    state: &AppState,
    params: CreateSessionParams,
) -> ApiResult<SessionSnapshot> {
    if state.db.find_candidate(params.candidate_id).await?.is_none() {
        return Err(ApiError::CandidateNotFound(params.candidate_id));
    }
    if state.db.find_template(params.template_id).await?.is_none() {
        return Err(ApiError::TemplateNotFound(params.template_id));
    }

    let now = now_ms();
    let started_at = match params.scheduled_at {
        Some(at) if at > now => at,
        _ => now,
    };
    let new = NewSession {
        session_uid: Uuid::new_v4().to_string(),
        candidate_id: params.candidate_id,
        template_id: params.template_id,
        language: params.language,
        scheduled_at: params.scheduled_at,
        started_at,
    };

    let session = state.db.create_session(&new, now).await?;
    tracing::info!(session_uid = %session.session_uid, "Session created");

    mirror_status(state, &session.session_uid, session.status);
    notify(state, &session, NotificationKind::Scheduled).await;

    snapshot(state, &session).await
}

pub async fn get_session(state: &AppState, session_uid: &str) -> ApiResult<SessionSnapshot> {
    let session = state.db.get_session(session_uid).await?;
    snapshot(state, &session).await
}

/// Apply a status change, then publish the fresh snapshot.
pub async fn transition(
    state: &AppState,
    session_uid: &str,
    target: SessionStatus,
) -> ApiResult<SessionSnapshot> {
    let lock = state.locks.lock_for(session_uid);
    let guard = lock.lock().await;

    let result = state.db.transition_session(session_uid, target, now_ms()).await?;
    let snap = snapshot(state, &result.session).await?;

    if result.changed {
        tracing::info!(session_uid, status = %target, "Session transitioned");
        mirror_status(state, session_uid, target);
        state
            .broadcaster
            .publish_session_update(session_uid, snap.clone());
    }
    // Mail can be slow; appends on this session must not queue behind it.
    drop(guard);

    if result.changed && target == SessionStatus::Completed {
        notify(state, &result.session, NotificationKind::Completed).await;
    }

    Ok(snap)
}

/// Pause an IN_PROGRESS session. Stricter than a raw status request: any
/// other source state is rejected rather than treated as a no-op.
pub async fn pause(state: &AppState, session_uid: &str) -> ApiResult<SessionSnapshot> {
    guarded_transition(state, session_uid, SessionStatus::Paused, |status| {
        status.validate_pause()
    })
    .await
}

/// Resume a PAUSED session.
pub async fn resume(state: &AppState, session_uid: &str) -> ApiResult<SessionSnapshot> {
    guarded_transition(state, session_uid, SessionStatus::InProgress, |status| {
        status.validate_resume()
    })
    .await
}

async fn guarded_transition(
    state: &AppState,
    session_uid: &str,
    target: SessionStatus,
    guard: impl Fn(SessionStatus) -> Result<(), hirelane_core::TransitionError>,
) -> ApiResult<SessionSnapshot> {
    let lock = state.locks.lock_for(session_uid);
    let _guard = lock.lock().await;

    let session = state.db.get_session(session_uid).await?;
    guard(session.status)?;

    let result = state.db.transition_session(session_uid, target, now_ms()).await?;
    let snap = snapshot(state, &result.session).await?;

    tracing::info!(session_uid, status = %target, "Session transitioned");
    mirror_status(state, session_uid, target);
    state
        .broadcaster
        .publish_session_update(session_uid, snap.clone());

    Ok(snap)
}

/// Attach the evaluation summary. Allowed in any status.
pub async fn record_evaluation(
    state: &AppState,
    session_uid: &str,
    eval: EvaluationUpdate,
) -> ApiResult<SessionSnapshot> {
    let lock = state.locks.lock_for(session_uid);
    let _guard = lock.lock().await;

    let session = state.db.update_evaluation(session_uid, &eval, now_ms()).await?;
    let snap = snapshot(state, &session).await?;
    state
        .broadcaster
        .publish_session_update(session_uid, snap.clone());
    Ok(snap)
}

/// Delete a session and everything attached to it.
pub async fn delete_session(state: &AppState, session_uid: &str) -> ApiResult<()> {
    let lock = state.locks.lock_for(session_uid);
    let session = {
        let _guard = lock.lock().await;

        let session = state.db.get_session(session_uid).await?;
        state.db.delete_session(session_uid).await?;
        tracing::info!(session_uid, "Session deleted");

        if let Err(e) = state.cache.evict(session_uid) {
            tracing::warn!(session_uid, error = %e, "Cache eviction skipped");
        }
        state.pending_activity.drain(session_uid);
        state.broadcaster.drop_session_topic(session_uid);
        session
    };
    state.locks.remove(session_uid);

    notify(state, &session, NotificationKind::Cancelled).await;
    Ok(())
}
