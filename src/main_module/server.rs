//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

use super::{alive, health_check, shutdown_signal};

pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(health_check))
        .merge(crate::discord::configure())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        app_state.config.server.host, app_state.config.server.port
    )
    .parse()
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
