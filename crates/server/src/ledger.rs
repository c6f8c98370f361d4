// crates/server/src/ledger.rs
//! Turn ledger orchestration: append, update, list.
//!
//! Appends run the anti-cheat analyzer when a non-empty answer arrives,
//! folding in any activity reports that queued up since the last turn.
//! Updates never re-run analysis: by then an external evaluator has scored
//! the turn and its supplied fields are authoritative.

use hirelane_core::{analyze, now_ms, ActivityLog};
use hirelane_db::{NewTurn, TurnPatch, TurnRow};

use crate::error::{ApiError, ApiResult};
use crate::lifecycle;
use crate::state::AppState;

/// Parameters for appending a turn.
#[derive(Debug, Clone, Default)]
pub struct AppendTurnParams {
    pub question: String,
    pub answer: Option<String>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    /// Activity observed by the client while answering; merged with any
    /// reports that arrived out of band.
    pub activity: Option<ActivityLog>,
}

/// Append a turn to a session's ledger.
pub async fn append_turn(
    state: &AppState,
    session_uid: &str,
    params: AppendTurnParams,
) -> ApiResult<TurnRow> {
    let question = params.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::Validation("question must not be empty".to_string()));
    }

    let lock = state.locks.lock_for(session_uid);
    let _guard = lock.lock().await;

    let session = state.db.get_session(session_uid).await?;
    let now = now_ms();

    let answer = params
        .answer
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    let (flagged, details) = match answer {
        Some(answer) => {
            let mut activity = params.activity.unwrap_or_default();
            if let Some(pending) = state.pending_activity.drain(session_uid) {
                activity.merge(&pending);
            }
            // The answer arrives with the question in the same call, so the
            // response window comes from the client-reported duration.
            let question_at = now - params.answer_duration_ms.unwrap_or(0);
            let result = analyze(answer, question_at, now, Some(&activity));
            if result.has_signals() {
                tracing::info!(
                    session_uid,
                    risk_score = result.risk_score,
                    signal_count = result.signals.len(),
                    requires_review = result.requires_review,
                    "Anti-cheat signals on answer"
                );
                (result.requires_review, Some(result.details()))
            } else {
                (false, None)
            }
        }
        None => (false, None),
    };

    let new = NewTurn {
        question: question.clone(),
        answer: answer.map(str::to_string),
        answer_duration_ms: params.answer_duration_ms,
        audio_url: params.audio_url,
    };
    let turn = state
        .db
        .append_turn(session.id, &new, flagged, details.as_deref(), now)
        .await?;

    mirror_turn(state, session_uid, &question);

    let mut after = session;
    after.total_turns += 1;
    after.updated_at = Some(now);
    let snap = lifecycle::snapshot(state, &after).await?;
    state.broadcaster.publish_session_update(session_uid, snap);

    Ok(turn)
}

/// Patch an existing turn. The turn must belong to the session, and only
/// supplied fields change.
pub async fn update_turn(
    state: &AppState,
    session_uid: &str,
    turn_id: i64,
    patch: TurnPatch,
) -> ApiResult<TurnRow> {
    let lock = state.locks.lock_for(session_uid);
    let _guard = lock.lock().await;

    let session = state.db.get_session(session_uid).await?;
    let turn = state
        .db
        .update_turn(session.id, turn_id, &patch, now_ms())
        .await?;

    let snap = lifecycle::snapshot(state, &session).await?;
    state.broadcaster.publish_session_update(session_uid, snap);

    Ok(turn)
}

/// All turns for a session in ledger order.
pub async fn list_turns(state: &AppState, session_uid: &str) -> ApiResult<Vec<TurnRow>> {
    let session = state.db.get_session(session_uid).await?;
    Ok(state.db.list_turns(session.id).await?)
}

/// Update the cached mirror with the latest question. Log-and-continue on
/// cache failure.
fn mirror_turn(state: &AppState, session_uid: &str, question: &str) {
    let result = state.cache.get(session_uid).and_then(|existing| {
        let mut entry = existing.unwrap_or_else(|| {
            serde_json::json!({ "status": null, "currentQuestion": null, "history": [] })
        });
        entry["currentQuestion"] = serde_json::json!(question);
        if let Some(history) = entry["history"].as_array_mut() {
            history.push(serde_json::json!(question));
        }
        state.cache.put(session_uid, entry)
    });
    if let Err(e) = result {
        tracing::warn!(session_uid, error = %e, "Cache mirror skipped");
    }
}
