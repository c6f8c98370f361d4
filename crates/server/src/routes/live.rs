// crates/server/src/routes/live.rs
//! Live update streams (SSE).
//!
//! - `GET /api/live/sessions/{uid}`  -- snapshots for one session
//! - `GET /api/live/notifications`   -- global notification feed
//! - `GET /api/live/users/{user_id}` -- one user's notification queue
//!
//! Each stream heartbeats every 15 seconds. A lagged session subscriber gets
//! the current snapshot re-sent from the database so it recovers without
//! reconnecting.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use tokio::sync::broadcast::error::RecvError;

use crate::error::ApiResult;
use crate::lifecycle;
use crate::notify::Notification;
use crate::state::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

fn keep_alive() -> axum::response::sse::KeepAlive {
    axum::response::sse::KeepAlive::new()
        .interval(HEARTBEAT)
        .text("heartbeat")
}

/// GET /api/live/sessions/{uid} -- SSE stream of session snapshots.
///
/// On connect the current snapshot is sent immediately so the client can
/// hydrate without a separate REST call.
async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    // 404 before the stream starts if the session does not exist.
    let session = state.db.get_session(&uid).await?;
    let initial = lifecycle::snapshot(&state, &session).await?;

    let mut rx = state.broadcaster.subscribe_session(&uid);

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("snapshot").data(
            serde_json::to_string(&initial).unwrap_or_default()
        ));

        let mut heartbeat_interval = tokio::time::interval(HEARTBEAT);
        loop {
            tokio::select! {
                update = rx.recv() => {
                    match update {
                        Ok(snapshot) => {
                            yield Ok(Event::default().event("session_updated").data(
                                serde_json::to_string(&snapshot).unwrap_or_default()
                            ));
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(session_uid = %uid, lagged = n, "SSE client lagged, re-sending snapshot");
                            match state.db.get_session(&uid).await {
                                Ok(session) => {
                                    if let Ok(snapshot) = lifecycle::snapshot(&state, &session).await {
                                        yield Ok(Event::default().event("snapshot").data(
                                            serde_json::to_string(&snapshot).unwrap_or_default()
                                        ));
                                    }
                                }
                                // Session deleted while streaming: end the stream.
                                Err(_) => break,
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = heartbeat_interval.tick() => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

/// GET /api/live/notifications -- SSE stream of the global feed.
async fn global_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe_global();
    Sse::new(notification_stream(rx)).keep_alive(keep_alive())
}

/// GET /api/live/users/{user_id} -- SSE stream of one user's queue.
async fn user_stream(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe_user(&user_id);
    Sse::new(notification_stream(rx)).keep_alive(keep_alive())
}

/// Shared loop for the two notification feeds. Lagged notifications are
/// dropped rather than replayed: feeds are advisory, the REST surface is
/// authoritative.
fn notification_stream(
    mut rx: tokio::sync::broadcast::Receiver<Notification>,
) -> impl tokio_stream::Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut heartbeat_interval = tokio::time::interval(HEARTBEAT);
        loop {
            tokio::select! {
                notification = rx.recv() => {
                    match notification {
                        Ok(notification) => {
                            yield Ok(Event::default().event("notification").data(
                                serde_json::to_string(&notification).unwrap_or_default()
                            ));
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(lagged = n, "Notification subscriber lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = heartbeat_interval.tick() => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
            }
        }
    }
}

/// Create the live streaming routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/live/sessions/{uid}", get(session_stream))
        .route("/live/notifications", get(global_stream))
        .route("/live/users/{user_id}", get(user_stream))
}
