//! Transient chat message and its wire rendering.

use serde::{Deserialize, Serialize};

/// Sender label used for notices authored by the server itself.
pub const SYSTEM_SENDER: &str = "ChatServer";

/// Notice text broadcast to a room after a member joins.
pub const JOIN_NOTICE: &str = "new user joined chatroom";

/// One message addressed to a room. Not stored after delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Target room name.
    pub room: String,
    /// Free-form label of the author (not authenticated).
    pub sender: String,
    /// Message body.
    pub text: String,
}

impl ChatMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(room: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// The server-authored "user joined" notice for `room`.
    #[must_use]
    pub fn join_notice(room: impl Into<String>) -> Self {
        Self::new(room, SYSTEM_SENDER, JOIN_NOTICE)
    }

    /// Renders the payload delivered to every member: `sender:text`.
    #[must_use]
    pub fn payload(&self) -> String {
        format!("{}:{}", self.sender, self.text)
    }
}
