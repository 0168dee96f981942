//! WebSocket layer: session handling and command frames.
//!
//! The endpoint at `/joinChatServer` opens a long-lived session. The server
//! pushes room traffic down it and accepts join/send commands over it.

pub mod connection;
pub mod handler;
pub mod messages;
