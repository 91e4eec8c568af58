//! Liveness handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::shared::state::AppState;

pub async fn alive() -> &'static str {
    "Ticket bot is alive"
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let open_tickets = state.controller.open_tickets().await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "ticketbot",
            "version": env!("CARGO_PKG_VERSION"),
            "open_tickets": open_tickets
        })),
    )
}
