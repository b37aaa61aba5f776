//! HTTP server for the local JSON API.
//!
//! Serves the latest collection pass and stored snapshots to frontends.

pub mod routes;
pub mod state;

use crate::config::EngineConfig;
use crate::server::routes::{config, executions, health, summary, usage};
use crate::server::state::AppState;

use axum::{routing::get, Router};
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

/// Builds the router with all API routes.
pub fn router(state: AppState) -> Router {
    // CORS layer for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Execution history
        .route("/api/executions", get(executions::get_executions))
        .route("/api/run-history", get(executions::get_run_history))
        // Usage
        .route("/api/usage", get(usage::get_usage))
        .route("/api/summary", get(summary::get_summary))
        // Config API
        .route("/api/config", get(config::get_config))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server for the process-wide state on a background thread.
///
/// The receiver yields the bound address, or the error that stopped the
/// server from listening.
pub fn start_server(config: EngineConfig) -> mpsc::Receiver<io::Result<SocketAddr>> {
    let port = config.server_port;
    spawn_server(AppState::from_globals(config), port)
}

/// Serves `state` on `127.0.0.1:port` from a background thread.
pub fn spawn_server(state: AppState, port: u16) -> mpsc::Receiver<io::Result<SocketAddr>> {
    let (ready_tx, ready_rx) = mpsc::channel();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Tokio runtime, API disabled");
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        rt.block_on(async {
            run_server(state, port, ready_tx).await;
        });
    });

    tracing::info!(port, "HTTP server starting");
    ready_rx
}

/// Runs the axum server.
async fn run_server(state: AppState, port: u16, ready: mpsc::Sender<io::Result<SocketAddr>>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind HTTP server");
            let _ = ready.send(Err(e));
            return;
        }
    };

    let bound = listener.local_addr().unwrap_or(addr);
    tracing::info!("HTTP server listening on http://{}", bound);
    let _ = ready.send(Ok(bound));

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(error = %e, "HTTP server stopped");
    }
}
