//! Request and response bodies for the join and send endpoints.
//!
//! Field names follow the wire format existing clients already speak
//! (`chatroomname`, `clientid`, `chatroom`, `username`, `text`). Every
//! request field is optional at the serde level so that a missing field
//! reaches the dispatcher and is reported as a malformed request instead of
//! a generic JSON rejection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ClientId, JoinOutcome, SendReport};
use crate::error::ChatError;
use crate::service::Command;

/// Request body for `POST /joinChatRoom`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Room to join.
    #[serde(default)]
    pub chatroomname: Option<String>,
    /// Client id received when the WebSocket session opened.
    #[serde(default)]
    pub clientid: Option<String>,
}

impl TryFrom<&JoinRoomRequest> for Command {
    type Error = ChatError;

    fn try_from(req: &JoinRoomRequest) -> Result<Self, Self::Error> {
        Self::join_room(req.chatroomname.as_deref(), req.clientid.as_deref())
    }
}

/// Response body for a successful join.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomResponse {
    /// Room joined.
    pub chatroomname: String,
    /// Client that joined.
    #[schema(value_type = String)]
    pub clientid: ClientId,
    /// `false` if the client was already a member.
    pub newly_joined: bool,
    /// Members the join notice was delivered to.
    pub notified: usize,
}

impl JoinRoomResponse {
    /// Builds the response from the engine outcome.
    #[must_use]
    pub fn new(chatroomname: String, clientid: ClientId, outcome: JoinOutcome) -> Self {
        Self {
            chatroomname,
            clientid,
            newly_joined: outcome.newly_joined,
            notified: outcome.notice.delivered,
        }
    }
}

/// Request body for `POST /sendMsg`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Target room.
    #[serde(default)]
    pub chatroom: Option<String>,
    /// Sender label shown before the text.
    #[serde(default)]
    pub username: Option<String>,
    /// Message body.
    #[serde(default)]
    pub text: Option<String>,
}

impl TryFrom<&SendMessageRequest> for Command {
    type Error = ChatError;

    fn try_from(req: &SendMessageRequest) -> Result<Self, Self::Error> {
        Self::send_message(
            req.chatroom.as_deref(),
            req.username.as_deref(),
            req.text.as_deref(),
        )
    }
}

/// Response body for `POST /sendMsg`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    /// Room the message was sent to.
    pub chatroom: String,
    /// Members the message was queued for.
    pub delivered: usize,
    /// Unreachable members that were dropped.
    pub failed: usize,
}

impl SendMessageResponse {
    /// Builds the response from the engine report.
    #[must_use]
    pub fn new(chatroom: String, report: SendReport) -> Self {
        Self {
            chatroom,
            delivered: report.delivered,
            failed: report.failed,
        }
    }
}
