// crates/server/src/lib.rs
//! Hirelane server library.
//!
//! Axum HTTP/SSE surface for the interview coordination service: session
//! lifecycle, turn ledger, anti-cheat intake, live update streams, and the
//! scheduled maintenance sweeper.

pub mod broadcast;
pub mod cache;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod notify;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;
pub use sweeper::{SweepConfig, Sweeper};

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, sessions, turns, activity, live streams)
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
