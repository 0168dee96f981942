//! WebSocket message types: inbound commands and outbound replies.
//!
//! Room traffic is written to the socket as plain text frames
//! (`sender:text`). Only replies to commands a client sends over the socket
//! use the JSON envelope defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Inbound command frame. `id` is echoed back on the reply.
#[derive(Debug, Clone, Deserialize)]
pub struct WsRequest {
    /// Client-provided correlation id.
    #[serde(default)]
    pub id: String,
    /// The command itself.
    #[serde(flatten)]
    pub command: WsCommand,
}

/// Commands a client can send over its own session.
///
/// The session's client id is implied, so joins carry only the room.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Join a room.
    JoinRoom {
        /// Room to join.
        #[serde(default)]
        chatroomname: Option<String>,
    },
    /// Broadcast to a room.
    SendMessage {
        /// Target room.
        #[serde(default)]
        chatroom: Option<String>,
        /// Sender label.
        #[serde(default)]
        username: Option<String>,
        /// Message body.
        #[serde(default)]
        text: Option<String>,
    },
}

/// Outbound reply envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsReply {
    /// Correlation id copied from the request.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsReplyType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for reply types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsReplyType {
    /// Command succeeded.
    Response,
    /// Command failed.
    Error,
}

impl WsReply {
    /// Successful reply carrying `payload`.
    #[must_use]
    pub fn response(id: String, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type: WsReplyType::Response,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Error reply built from a [`ChatError`].
    #[must_use]
    pub fn error(id: String, err: &ChatError) -> Self {
        Self {
            id,
            msg_type: WsReplyType::Error,
            timestamp: Utc::now(),
            payload: serde_json::to_value(err.to_body()).unwrap_or_default(),
        }
    }

    /// Serializes the reply to a JSON text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
