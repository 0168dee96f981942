//! Chat handlers: join a room, send a message to a room.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{JoinRoomRequest, JoinRoomResponse, SendMessageRequest, SendMessageResponse};
use crate::app_state::AppState;
use crate::error::{ChatError, ErrorResponse};
use crate::service::{Command, CommandOutcome};

/// `POST /joinChatRoom` — Add a connected client to a room.
///
/// # Errors
///
/// Returns [`ChatError::MalformedRequest`] on missing fields,
/// [`ChatError::RoomNotFound`] / [`ChatError::ClientNotFound`] on unknown
/// ids, and [`ChatError::ShuttingDown`] during shutdown.
#[utoipa::path(
    post,
    path = "/joinChatRoom",
    tag = "Chat",
    summary = "Join a chat room",
    description = "Adds the client to the room and announces the join to every member, the joiner included.",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Client joined", body = JoinRoomResponse),
        (status = 400, description = "Missing chatroomname or clientid", body = ErrorResponse),
        (status = 404, description = "Unknown room or client", body = ErrorResponse),
        (status = 503, description = "Server shutting down", body = ErrorResponse),
    )
)]
pub async fn join_room(
    State(state): State<AppState>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload.map_err(|e| ChatError::MalformedRequest(e.body_text()))?;
    let command = Command::try_from(&req)?;
    let Command::JoinRoom { room, client_id } = &command else {
        return Err(ChatError::Internal("join request built wrong command".to_string()));
    };
    let (room, client_id) = (room.clone(), client_id.clone());
    tracing::info!(%client_id, %room, "join requested");

    let CommandOutcome::Joined(outcome) = state.dispatcher.dispatch(command).await? else {
        return Err(ChatError::Internal("join returned wrong outcome".to_string()));
    };
    Ok((
        StatusCode::OK,
        Json(JoinRoomResponse::new(room, client_id, outcome)),
    ))
}

/// `POST /sendMsg` — Broadcast `username:text` to every member of a room.
///
/// # Errors
///
/// Returns [`ChatError::MalformedRequest`] on missing fields,
/// [`ChatError::RoomNotFound`] on an unknown room, and
/// [`ChatError::ShuttingDown`] during shutdown.
#[utoipa::path(
    post,
    path = "/sendMsg",
    tag = "Chat",
    summary = "Send a message to a room",
    description = "Best-effort fan-out: unreachable members are dropped and counted in `failed`.",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message fanned out", body = SendMessageResponse),
        (status = 400, description = "Missing chatroom, username or text", body = ErrorResponse),
        (status = 404, description = "Unknown room", body = ErrorResponse),
        (status = 503, description = "Server shutting down", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload.map_err(|e| ChatError::MalformedRequest(e.body_text()))?;
    let command = Command::try_from(&req)?;
    let Command::SendMessage(message) = &command else {
        return Err(ChatError::Internal("send request built wrong command".to_string()));
    };
    let room = message.room.clone();

    let CommandOutcome::Sent(report) = state.dispatcher.dispatch(command).await? else {
        return Err(ChatError::Internal("send returned wrong outcome".to_string()));
    };
    Ok((
        StatusCode::OK,
        Json(SendMessageResponse::new(room, report)),
    ))
}

/// Chat routes mounted at the root level, matching the paths clients use.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/joinChatRoom", post(join_room))
        .route("/sendMsg", post(send_message))
}
