//! Command dispatcher: validated commands in, engine calls out.
//!
//! Transports decode their own wire formats and build a [`Command`] through
//! the validating constructors here. Anything missing a required field is
//! rejected with [`ChatError::MalformedRequest`] before the engine is
//! touched. The dispatcher holds no state beyond the engine reference.

use std::sync::Arc;

use crate::domain::{ChatEngine, ChatMessage, ClientId, ConnectionHandle, JoinOutcome, SendReport};
use crate::error::ChatError;

/// One inbound request, decoded and validated.
#[derive(Debug)]
pub enum Command {
    /// Register a freshly upgraded session.
    Connect {
        /// Delivery capability for the new session.
        handle: ConnectionHandle,
    },
    /// Add a client to a room.
    JoinRoom {
        /// Target room name.
        room: String,
        /// Client to add.
        client_id: ClientId,
    },
    /// Broadcast text to a room.
    SendMessage(ChatMessage),
    /// Tear down a session.
    Disconnect {
        /// Client to remove.
        client_id: ClientId,
    },
}

impl Command {
    /// Builds a [`Command::JoinRoom`] from raw request fields.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MalformedRequest`] if either field is missing or
    /// blank.
    pub fn join_room(room: Option<&str>, client_id: Option<&str>) -> Result<Self, ChatError> {
        let room = required("chatroomname", room)?;
        let client_id = required("clientid", client_id)?;
        Ok(Self::JoinRoom {
            room: room.to_string(),
            client_id: ClientId::from(client_id),
        })
    }

    /// Builds a [`Command::SendMessage`] from raw request fields.
    ///
    /// `text` may be empty but must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MalformedRequest`] if `room` or `username` is
    /// missing or blank, or if `text` is missing.
    pub fn send_message(
        room: Option<&str>,
        username: Option<&str>,
        text: Option<&str>,
    ) -> Result<Self, ChatError> {
        let room = required("chatroom", room)?;
        let username = required("username", username)?;
        let text =
            text.ok_or_else(|| ChatError::MalformedRequest("text is missing".to_string()))?;
        Ok(Self::SendMessage(ChatMessage::new(room, username, text)))
    }

    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::JoinRoom { .. } => "join_room",
            Self::SendMessage(_) => "send_message",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ChatError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ChatError::MalformedRequest(format!("{field} is missing"))),
    }
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Session registered under this id.
    Connected(ClientId),
    /// Client joined a room.
    Joined(JoinOutcome),
    /// Message fanned out.
    Sent(SendReport),
    /// Session removed; `false` if it was already gone.
    Disconnected(bool),
}

/// Routes [`Command`]s to the [`ChatEngine`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    engine: Arc<ChatEngine>,
}

impl Dispatcher {
    /// Creates a dispatcher over a shared engine.
    #[must_use]
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self { engine }
    }

    /// Returns a reference to the inner [`ChatEngine`].
    #[must_use]
    pub fn engine(&self) -> &Arc<ChatEngine> {
        &self.engine
    }

    /// Executes one command.
    ///
    /// # Errors
    ///
    /// Propagates the engine's [`ChatError`] unchanged.
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, ChatError> {
        let kind = command.kind();
        let outcome = match command {
            Command::Connect { handle } => self
                .handle_connect(handle)
                .await
                .map(CommandOutcome::Connected),
            Command::JoinRoom { room, client_id } => self
                .handle_join(&room, &client_id)
                .await
                .map(CommandOutcome::Joined),
            Command::SendMessage(message) => {
                self.handle_send(&message).await.map(CommandOutcome::Sent)
            }
            Command::Disconnect { client_id } => Ok(CommandOutcome::Disconnected(
                self.handle_disconnect(&client_id).await,
            )),
        };
        if let Err(err) = &outcome {
            tracing::info!(command = kind, code = err.error_code(), %err, "command rejected");
        }
        outcome
    }

    /// Registers a session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ShuttingDown`] after shutdown.
    pub async fn handle_connect(&self, handle: ConnectionHandle) -> Result<ClientId, ChatError> {
        self.engine.connect(handle).await
    }

    /// Joins a client to a room.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::RoomNotFound`], [`ChatError::ClientNotFound`] or
    /// [`ChatError::ShuttingDown`].
    pub async fn handle_join(
        &self,
        room: &str,
        client_id: &ClientId,
    ) -> Result<JoinOutcome, ChatError> {
        self.engine.join(room, client_id).await
    }

    /// Broadcasts a message.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::RoomNotFound`] or [`ChatError::ShuttingDown`].
    pub async fn handle_send(&self, message: &ChatMessage) -> Result<SendReport, ChatError> {
        let report = self.engine.send(message).await?;
        tracing::debug!(
            room = %message.room,
            delivered = report.delivered,
            failed = report.failed,
            "message broadcast"
        );
        Ok(report)
    }

    /// Removes a session. Safe to call for ids that are already gone.
    pub async fn handle_disconnect(&self, client_id: &ClientId) -> bool {
        self.engine.disconnect(client_id).await
    }

    /// Closes every session; called once on process termination.
    pub async fn shutdown(&self) -> usize {
        tracing::info!("shutting down chat engine");
        self.engine.shutdown().await
    }
}
