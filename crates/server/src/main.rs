// crates/server/src/main.rs
//! Hirelane server binary.
//!
//! Opens the database, starts the Axum HTTP server, and spawns the
//! maintenance sweeper (reminders, stale abandonment, retention).

use std::net::SocketAddr;

use anyhow::Result;
use hirelane_db::Database;
use hirelane_server::{create_app, AppState, SweepConfig, Sweeper};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Default port for the server.
const DEFAULT_PORT: u16 = 47310;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("HIRELANE_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Database::open_default().await?;
    tracing::info!(db_path = %db.db_path().display(), "Database ready");

    let state = AppState::new(db);
    let app = create_app(state.clone());

    Sweeper::new(state, SweepConfig::from_env()).spawn();

    let port = get_port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "hirelane listening");

    axum::serve(listener, app).await?;

    Ok(())
}
