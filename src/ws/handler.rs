//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::ChatError;

/// `GET /joinChatServer` — Upgrade to WebSocket and register a session.
///
/// The first text frame the client receives is its client id.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.dispatcher.engine().is_shutting_down() {
        return ChatError::ShuttingDown.into_response();
    }
    tracing::debug!("ws upgrade requested");
    ws.on_upgrade(move |socket| run_connection(socket, state))
}
