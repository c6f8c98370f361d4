// crates/server/src/routes/turns.rs
//! Turn ledger endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use hirelane_core::ActivityLog;
use hirelane_db::{TurnPatch, TurnRow};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::ledger::{self, AppendTurnParams};
use crate::state::AppState;

/// A turn as returned on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct TurnView {
    pub id: i64,
    pub turn_number: i64,
    pub question: String,
    pub answer: Option<String>,
    pub question_at: i64,
    pub answer_at: Option<i64>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    pub ai_comment: Option<String>,
    pub communication_score: Option<f64>,
    pub clarity_score: Option<f64>,
    pub technical_score: Option<f64>,
    pub anticheat_flagged: bool,
    pub anticheat_details: Option<String>,
}

impl From<TurnRow> for TurnView {
    fn from(turn: TurnRow) -> Self {
        Self {
            id: turn.id,
            turn_number: turn.turn_number,
            question: turn.question,
            answer: turn.answer,
            question_at: turn.question_at,
            answer_at: turn.answer_at,
            answer_duration_ms: turn.answer_duration_ms,
            audio_url: turn.audio_url,
            ai_comment: turn.ai_comment,
            communication_score: turn.communication_score,
            clarity_score: turn.clarity_score,
            technical_score: turn.technical_score,
            anticheat_flagged: turn.anticheat_flagged,
            anticheat_details: turn.anticheat_details,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendTurnRequest {
    pub question: String,
    pub answer: Option<String>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    pub activity: Option<ActivityLog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTurnRequest {
    pub answer: Option<String>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    pub ai_comment: Option<String>,
    pub communication_score: Option<f64>,
    pub clarity_score: Option<f64>,
    pub technical_score: Option<f64>,
    pub anticheat_flagged: Option<bool>,
    pub anticheat_details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TurnListResponse {
    pub turns: Vec<TurnView>,
    pub total: usize,
}

/// POST /api/sessions/{uid}/turns - Append a turn to the ledger.
async fn append_turn(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<AppendTurnRequest>,
) -> ApiResult<(StatusCode, Json<TurnView>)> {
    let turn = ledger::append_turn(
        &state,
        &uid,
        AppendTurnParams {
            question: req.question,
            answer: req.answer,
            answer_duration_ms: req.answer_duration_ms,
            audio_url: req.audio_url,
            activity: req.activity,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(turn.into())))
}

/// GET /api/sessions/{uid}/turns - List turns in ledger order.
async fn list_turns(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<Json<TurnListResponse>> {
    let turns: Vec<TurnView> = ledger::list_turns(&state, &uid)
        .await?
        .into_iter()
        .map(TurnView::from)
        .collect();
    let total = turns.len();
    Ok(Json(TurnListResponse { turns, total }))
}

/// PATCH /api/sessions/{uid}/turns/{turn_id} - Patch a turn's fields.
async fn update_turn(
    State(state): State<Arc<AppState>>,
    Path((uid, turn_id)): Path<(String, i64)>,
    Json(req): Json<UpdateTurnRequest>,
) -> ApiResult<Json<TurnView>> {
    let patch = TurnPatch {
        answer: req.answer,
        answer_duration_ms: req.answer_duration_ms,
        audio_url: req.audio_url,
        ai_comment: req.ai_comment,
        communication_score: req.communication_score,
        clarity_score: req.clarity_score,
        technical_score: req.technical_score,
        anticheat_flagged: req.anticheat_flagged,
        anticheat_details: req.anticheat_details,
    };
    let turn = ledger::update_turn(&state, &uid, turn_id, patch).await?;
    Ok(Json(turn.into()))
}

/// Create the turn routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions/{uid}/turns", get(list_turns).post(append_turn))
        .route("/sessions/{uid}/turns/{turn_id}", patch(update_turn))
}
