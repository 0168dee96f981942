//! # roomcast-gateway
//!
//! Real-time room fan-out over WebSocket.
//!
//! Clients open a long-lived WebSocket session and receive an opaque client
//! id. They join named rooms and send text to a room; every current member
//! of the room receives `sender:text`. The room set is fixed at startup.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── Dispatcher (service/)
//!     │
//!     ├── ChatEngine (domain/)
//!     │     ├── ConnectionRegistry  (client id → handle + joined rooms)
//!     │     └── Room × N            (per-room member set, own lock)
//!     │
//!     └── per-session outbound queue → socket writer
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
