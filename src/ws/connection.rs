//! WebSocket session loop.
//!
//! Registers the session with the dispatcher, sends the client its id, then
//! multiplexes two streams until either side ends:
//!
//! - frames from the client, decoded as [`WsRequest`] commands;
//! - room payloads from the session's outbound queue.
//!
//! The queue closing means the engine dropped this session (disconnect or
//! shutdown); the loop answers with a Close frame. Every exit path ends in
//! `handle_disconnect`, which is idempotent.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};

use super::messages::{WsCommand, WsReply, WsRequest};
use crate::app_state::AppState;
use crate::domain::{ClientId, ConnectionHandle};
use crate::error::ChatError;
use crate::service::{Command, CommandOutcome, Dispatcher};

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let dispatcher = state.dispatcher;
    let write_timeout = state.ws_write_timeout;
    let (handle, mut outbound_rx) = ConnectionHandle::channel(state.outbound_queue_capacity);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let client_id = match dispatcher.handle_connect(handle).await {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(%err, "rejecting ws session");
            write_frame(&mut ws_tx, Message::Close(None), write_timeout).await;
            return;
        }
    };

    if !write_frame(&mut ws_tx, Message::text(client_id.as_str()), write_timeout).await {
        dispatcher.handle_disconnect(&client_id).await;
        return;
    }

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handle_text_message(&dispatcher, &client_id, text.as_str()).await;
                        if !write_frame(&mut ws_tx, Message::text(reply), write_timeout).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%client_id, %err, "ws read error");
                        break;
                    }
                    _ => {}
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(text) => {
                        if !write_frame(&mut ws_tx, Message::text(text), write_timeout).await {
                            break;
                        }
                    }
                    None => {
                        write_frame(&mut ws_tx, Message::Close(None), write_timeout).await;
                        break;
                    }
                }
            }
        }
    }

    dispatcher.handle_disconnect(&client_id).await;
    tracing::debug!(%client_id, "ws connection closed");
}

/// Writes one frame, giving up after `timeout`. Returns `false` if the
/// session should be torn down.
async fn write_frame<S>(ws_tx: &mut S, frame: Message, timeout: Duration) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match tokio::time::timeout(timeout, ws_tx.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::debug!(%err, "ws write failed");
            false
        }
        Err(_) => {
            tracing::warn!(?timeout, "ws write timed out");
            false
        }
    }
}

/// Decodes and executes one client command, returning the JSON reply.
async fn handle_text_message(
    dispatcher: &Dispatcher,
    client_id: &ClientId,
    text: &str,
) -> String {
    let request = match serde_json::from_str::<WsRequest>(text) {
        Ok(request) => request,
        Err(err) => {
            let err = ChatError::MalformedRequest(err.to_string());
            return WsReply::error(String::new(), &err).to_json();
        }
    };

    let command = match &request.command {
        WsCommand::JoinRoom { chatroomname } => {
            Command::join_room(chatroomname.as_deref(), Some(client_id.as_str()))
        }
        WsCommand::SendMessage {
            chatroom,
            username,
            text,
        } => Command::send_message(chatroom.as_deref(), username.as_deref(), text.as_deref()),
    };

    let outcome = match command {
        Ok(command) => dispatcher.dispatch(command).await,
        Err(err) => Err(err),
    };

    let reply = match outcome {
        Ok(CommandOutcome::Joined(joined)) => WsReply::response(
            request.id,
            serde_json::json!({
                "joined": true,
                "newly_joined": joined.newly_joined,
                "notified": joined.notice.delivered,
            }),
        ),
        Ok(CommandOutcome::Sent(report)) => WsReply::response(
            request.id,
            serde_json::json!({
                "delivered": report.delivered,
                "failed": report.failed,
            }),
        ),
        Ok(other) => WsReply::error(
            request.id,
            &ChatError::Internal(format!("unexpected outcome: {other:?}")),
        ),
        Err(err) => WsReply::error(request.id, &err),
    };
    reply.to_json()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use super::*;
    use crate::domain::ChatEngine;
    use crate::ws::messages::WsReplyType;

    async fn session() -> (Dispatcher, ClientId, tokio::sync::mpsc::Receiver<String>) {
        let dispatcher = Dispatcher::new(Arc::new(ChatEngine::new(["sports"])));
        let (handle, rx) = ConnectionHandle::channel(8);
        let Ok(id) = dispatcher.handle_connect(handle).await else {
            panic!("connect failed");
        };
        (dispatcher, id, rx)
    }

    /// A peer that never accepts another frame.
    struct StalledPeer;

    impl Sink<Message> for StalledPeer {
        type Error = axum::Error;

        fn poll_ready(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn close_frame_to_stalled_peer_gives_up() {
        let mut peer = StalledPeer;
        let Ok(written) = tokio::time::timeout(
            Duration::from_secs(5),
            write_frame(&mut peer, Message::Close(None), Duration::from_millis(20)),
        )
        .await
        else {
            panic!("write_frame ignored its timeout");
        };
        assert!(!written);
    }

    #[tokio::test]
    async fn frame_to_ready_peer_is_written() {
        let mut peer = futures_util::sink::drain::<Message>().sink_map_err(axum::Error::new);
        assert!(write_frame(&mut peer, Message::text("sys:hi"), Duration::from_secs(1)).await);
    }

    fn parse(reply: &str) -> WsReply {
        let Ok(reply) = serde_json::from_str::<WsReply>(reply) else {
            panic!("reply is not JSON: {reply}");
        };
        reply
    }

    #[tokio::test]
    async fn join_uses_session_client_id() {
        let (dispatcher, id, mut rx) = session().await;

        let reply = parse(
            &handle_text_message(
                &dispatcher,
                &id,
                r#"{"id":"1","command":"join_room","chatroomname":"sports"}"#,
            )
            .await,
        );

        assert_eq!(reply.id, "1");
        assert_eq!(reply.msg_type, WsReplyType::Response);
        assert_eq!(reply.payload["newly_joined"], true);
        assert_eq!(
            rx.recv().await.as_deref(),
            Some("ChatServer:new user joined chatroom")
        );
    }

    #[tokio::test]
    async fn malformed_json_yields_error_reply() {
        let (dispatcher, id, _rx) = session().await;
        let reply = parse(&handle_text_message(&dispatcher, &id, "not json").await);
        assert_eq!(reply.msg_type, WsReplyType::Error);
        assert_eq!(reply.payload["code"], 1001);
    }

    #[tokio::test]
    async fn send_to_unknown_room_yields_not_found() {
        let (dispatcher, id, _rx) = session().await;
        let reply = parse(
            &handle_text_message(
                &dispatcher,
                &id,
                r#"{"command":"send_message","chatroom":"cooking","username":"a","text":"b"}"#,
            )
            .await,
        );
        assert_eq!(reply.msg_type, WsReplyType::Error);
        assert_eq!(reply.payload["code"], 2001);
    }
}
