//! Domain layer: client identity, rooms, and the broadcast engine.
//!
//! This module contains the in-memory model of who is connected and which
//! rooms they listen to, plus the [`ChatEngine`] that coordinates membership
//! changes with broadcasts.

pub mod chat_message;
pub mod client_id;
pub mod connection;
pub mod connection_registry;
pub mod engine;
pub mod room;

pub use chat_message::ChatMessage;
pub use client_id::ClientId;
pub use connection::{ConnectionHandle, DeliveryError, MemberRef};
pub use connection_registry::ConnectionRegistry;
pub use engine::{ChatEngine, JoinOutcome, RoomSummary, SendReport};
pub use room::{BroadcastReport, Room};
