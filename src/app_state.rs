//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::domain::ChatEngine;
use crate::service::Dispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispatcher in front of the chat engine.
    pub dispatcher: Dispatcher,
    /// Capacity of each new session's outbound queue.
    pub outbound_queue_capacity: usize,
    /// Upper bound on a single WebSocket frame write.
    pub ws_write_timeout: Duration,
}

impl AppState {
    /// Builds the engine, dispatcher and transport settings from `config`.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let engine = Arc::new(ChatEngine::new(config.rooms.iter().cloned()));
        Self {
            dispatcher: Dispatcher::new(engine),
            outbound_queue_capacity: config.outbound_queue_capacity,
            ws_write_timeout: config.ws_write_timeout,
        }
    }
}
