//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! Chat endpoints keep their historical root paths (`/joinChatRoom`,
//! `/sendMsg`); read-only resources are mounted under `/api/v1`.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Path the OpenAPI document is served from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "roomcast-gateway",
        description = "Join named rooms over WebSocket and broadcast text to every member."
    ),
    paths(
        handlers::chat::join_room,
        handlers::chat::send_message,
        handlers::room::list_rooms,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Chat", description = "Room membership and messaging"),
        (name = "Rooms", description = "Room catalog"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::chat::routes())
        .merge(handlers::system::routes())
}

/// Builds the full application: REST, WebSocket, docs, and middleware.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router())
        .route("/joinChatServer", get(ws_handler))
        .merge(docs_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    Router::new().route(OPENAPI_PATH, get(|| async { axum::Json(ApiDoc::openapi()) }))
}
