// crates/server/src/routes/activity.rs
//! Suspicious-activity intake.
//!
//! Client-side monitors report events out of band. Each report is persisted
//! as a standalone row and, for the known kinds, folded into the session's
//! pending activity log so the next turn append sees it.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use hirelane_core::{now_ms, ActivityLog};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub activity_type: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ActivityResponse {
    pub recorded: bool,
}

/// Translate a report into the activity log delta it contributes, if any.
/// Unknown types are still recorded but carry no analyzer weight.
fn to_activity_delta(report: &ActivityReport) -> Option<ActivityLog> {
    let count = report
        .metadata
        .as_ref()
        .and_then(|m| m.get("count"))
        .and_then(|c| c.as_u64())
        .map(|c| u32::try_from(c).unwrap_or(u32::MAX))
        .unwrap_or(1);

    match report.activity_type.as_str() {
        "TAB_SWITCH" => Some(ActivityLog {
            tab_switches: count,
            ..ActivityLog::default()
        }),
        "PASTE" => Some(ActivityLog {
            paste_detected: true,
            ..ActivityLog::default()
        }),
        "INTERRUPTION" => Some(ActivityLog {
            interruptions: count,
            ..ActivityLog::default()
        }),
        _ => None,
    }
}

/// POST /api/sessions/{uid}/activity - Report suspicious activity.
async fn report_activity(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(report): Json<ActivityReport>,
) -> ApiResult<(StatusCode, Json<ActivityResponse>)> {
    state.db.get_session(&uid).await?;

    state
        .db
        .record_suspicious_activity(&uid, &report.activity_type, report.metadata.as_ref(), now_ms())
        .await?;

    match to_activity_delta(&report) {
        Some(delta) => state.pending_activity.report(&uid, &delta),
        None => {
            tracing::debug!(session_uid = %uid, activity_type = %report.activity_type, "Unweighted activity type");
        }
    }

    Ok((StatusCode::ACCEPTED, Json(ActivityResponse { recorded: true })))
}

/// Create the activity routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sessions/{uid}/activity", post(report_activity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(activity_type: &str, metadata: Option<serde_json::Value>) -> ActivityReport {
        ActivityReport {
            activity_type: activity_type.to_string(),
            metadata,
        }
    }

    #[test]
    fn test_tab_switch_delta_uses_metadata_count() {
        let delta = to_activity_delta(&report("TAB_SWITCH", Some(json!({ "count": 4 })))).unwrap();
        assert_eq!(delta.tab_switches, 4);

        // No metadata means one event.
        let delta = to_activity_delta(&report("TAB_SWITCH", None)).unwrap();
        assert_eq!(delta.tab_switches, 1);
    }

    #[test]
    fn test_paste_delta_sets_flag() {
        let delta = to_activity_delta(&report("PASTE", None)).unwrap();
        assert!(delta.paste_detected);
        assert_eq!(delta.tab_switches, 0);
    }

    #[test]
    fn test_oversized_count_clamps() {
        let delta =
            to_activity_delta(&report("TAB_SWITCH", Some(json!({ "count": u64::MAX })))).unwrap();
        assert_eq!(delta.tab_switches, u32::MAX);
    }

    #[test]
    fn test_unknown_type_has_no_delta() {
        assert!(to_activity_delta(&report("SCREEN_SHARE_STOPPED", None)).is_none());
    }
}
