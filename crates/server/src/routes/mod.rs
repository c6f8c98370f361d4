//! API route handlers for the hirelane server.

pub mod activity;
pub mod health;
pub mod live;
pub mod sessions;
pub mod turns;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/sessions - Create a session
/// - GET  /api/sessions/{uid} - Session snapshot
/// - POST /api/sessions/{uid}/status - Request a status transition
/// - POST /api/sessions/{uid}/pause - Pause (IN_PROGRESS only)
/// - POST /api/sessions/{uid}/resume - Resume (PAUSED only)
/// - PUT  /api/sessions/{uid}/evaluation - Attach evaluation summary
/// - DELETE /api/sessions/{uid} - Delete session and its turns
/// - POST /api/sessions/{uid}/turns - Append a turn
/// - GET  /api/sessions/{uid}/turns - List turns in ledger order
/// - PATCH /api/sessions/{uid}/turns/{turn_id} - Patch a turn
/// - POST /api/sessions/{uid}/activity - Report suspicious activity
/// - GET  /api/live/sessions/{uid} - SSE stream of session snapshots
/// - GET  /api/live/notifications - SSE stream of the global feed
/// - GET  /api/live/users/{user_id} - SSE stream of one user's queue
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", sessions::router())
        .nest("/api", turns::router())
        .nest("/api", activity::router())
        .nest("/api", live::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let db = hirelane_db::Database::new_in_memory().await.expect("in-memory DB");
        let state = AppState::new(db);
        let _router = api_routes(state);
    }
}
