//! Room listing handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{RoomListResponse, RoomSummaryDto};
use crate::app_state::AppState;

/// `GET /rooms` — List configured rooms with current member counts.
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    tag = "Rooms",
    summary = "List rooms",
    description = "Returns every configured room in configuration order with its member count.",
    responses(
        (status = 200, description = "Room list", body = RoomListResponse),
    )
)]
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let data: Vec<RoomSummaryDto> = state
        .dispatcher
        .engine()
        .room_summaries()
        .await
        .into_iter()
        .map(RoomSummaryDto::from)
        .collect();
    let total = data.len();
    Json(RoomListResponse { data, total })
}

/// Room routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/rooms", get(list_rooms))
}
