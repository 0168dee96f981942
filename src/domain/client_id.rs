//! Opaque client identifier.
//!
//! [`ClientId`] is handed to a client when its WebSocket session is
//! registered and is echoed back on every join request. It is generated from
//! a UUID v4 but stored as a string: identifiers arriving from the outside
//! are never parsed, only looked up, so a malformed id simply does not match
//! any registered session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session token for one registered connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh identifier (hyphenated UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
