// crates/server/src/routes/sessions.rs
//! Session lifecycle endpoints.
//!
//! Handlers parse the wire shape and delegate to [`crate::lifecycle`];
//! transition legality lives in the core state machine, not here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use hirelane_core::{Recommendation, SessionStatus};
use hirelane_db::EvaluationUpdate;
use serde::Deserialize;

use crate::broadcast::SessionSnapshot;
use crate::error::ApiResult;
use crate::lifecycle::{self, CreateSessionParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub candidate_id: i64,
    pub template_id: i64,
    pub language: Option<String>,
    pub scheduled_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub ai_summary: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub recommendation: Option<Recommendation>,
}

/// POST /api/sessions - Create a PENDING session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let snapshot = lifecycle::create_session(
        &state,
        CreateSessionParams {
            candidate_id: req.candidate_id,
            template_id: req.template_id,
            language: req.language,
            scheduled_at: req.scheduled_at,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/sessions/{uid} - Current snapshot.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(lifecycle::get_session(&state, &uid).await?))
}

/// POST /api/sessions/{uid}/status - Request a status transition.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(lifecycle::transition(&state, &uid, req.status).await?))
}

/// POST /api/sessions/{uid}/pause
async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(lifecycle::pause(&state, &uid).await?))
}

/// POST /api/sessions/{uid}/resume
async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(lifecycle::resume(&state, &uid).await?))
}

/// PUT /api/sessions/{uid}/evaluation - Attach the evaluation summary.
async fn update_evaluation(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<EvaluationRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    let eval = EvaluationUpdate {
        ai_summary: req.ai_summary,
        strengths: req.strengths,
        weaknesses: req.weaknesses,
        recommendation: req.recommendation,
    };
    Ok(Json(lifecycle::record_evaluation(&state, &uid, eval).await?))
}

/// DELETE /api/sessions/{uid}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<StatusCode> {
    lifecycle::delete_session(&state, &uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the session routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{uid}", get(get_session))
        .route("/sessions/{uid}", delete(delete_session))
        .route("/sessions/{uid}/status", post(update_status))
        .route("/sessions/{uid}/pause", post(pause_session))
        .route("/sessions/{uid}/resume", post(resume_session))
        .route("/sessions/{uid}/evaluation", put(update_evaluation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_deserializes_camel_case() {
        let req: CreateSessionRequest = serde_json::from_str(
            r#"{"candidateId": 1, "templateId": 2, "scheduledAt": 1700000000000}"#,
        )
        .unwrap();
        assert_eq!(req.candidate_id, 1);
        assert_eq!(req.template_id, 2);
        assert_eq!(req.scheduled_at, Some(1_700_000_000_000));
        assert!(req.language.is_none());
    }

    #[test]
    fn test_status_request_uses_wire_names() {
        let req: StatusRequest = serde_json::from_str(r#"{"status": "IN_PROGRESS"}"#).unwrap();
        assert_eq!(req.status, SessionStatus::InProgress);

        assert!(serde_json::from_str::<StatusRequest>(r#"{"status": "RUNNING"}"#).is_err());
    }

    #[test]
    fn test_evaluation_request_fields_optional() {
        let req: EvaluationRequest =
            serde_json::from_str(r#"{"recommendation": "HIRE"}"#).unwrap();
        assert_eq!(req.recommendation, Some(Recommendation::Hire));
        assert!(req.ai_summary.is_none());
    }
}
