//! Room engine: the single authority over membership and broadcast.
//!
//! [`ChatEngine`] owns the fixed set of [`Room`]s and the
//! [`ConnectionRegistry`]. It keeps the two consistent: every room a client
//! is in is recorded in that client's registry entry, and removing the entry
//! removes the client from each of those rooms.
//!
//! # Locking
//!
//! - Lock order is connection table first, then a room's member set.
//! - `join` holds the table read lock while it records the room and edits
//!   the member set, so joins into unrelated rooms run in parallel and a
//!   disconnect cannot slip between a join's validity check and its insert.
//! - `connect`, `disconnect` and `shutdown` take the table write lock only
//!   to edit the table. Member sets are cleaned up after it is released; a
//!   member left behind for that moment has a dropped handle and fails
//!   delivery like any closed session.
//! - Broadcasts take only the target room's read lock, and only long enough
//!   to copy its members.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;

use super::chat_message::ChatMessage;
use super::connection::ConnectionHandle;
use super::room::Room;
use super::{ClientId, ConnectionRegistry};
use crate::error::ChatError;

/// Aggregate outcome of a broadcast, after failed members were cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    /// Members the payload was queued for.
    pub delivered: usize,
    /// Members that could not be reached and were disconnected.
    pub failed: usize,
}

/// Outcome of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    /// `false` if the client was already a member.
    pub newly_joined: bool,
    /// Delivery of the "user joined" notice.
    pub notice: SendReport,
}

/// Room name plus its current member count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    /// Room name.
    pub name: String,
    /// Number of members at the time of the call.
    pub member_count: usize,
}

/// Connection and room registry with broadcast fan-out.
#[derive(Debug)]
pub struct ChatEngine {
    rooms: HashMap<String, Room>,
    room_order: Vec<String>,
    connections: ConnectionRegistry,
    shutting_down: AtomicBool,
}

impl ChatEngine {
    /// Creates an engine serving the given rooms.
    ///
    /// Blank names are skipped and duplicates collapse to one room. The
    /// configured order is kept for listings.
    #[must_use]
    pub fn new<I, S>(room_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rooms = HashMap::new();
        let mut room_order = Vec::new();
        for name in room_names {
            let name: String = name.into();
            let name = name.trim().to_string();
            if name.is_empty() || rooms.contains_key(&name) {
                continue;
            }
            rooms.insert(name.clone(), Room::new(name.clone()));
            room_order.push(name);
        }
        Self {
            rooms,
            room_order,
            connections: ConnectionRegistry::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Registers a new session and returns its client id.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ShuttingDown`] once [`Self::shutdown`] has run.
    pub async fn connect(&self, handle: ConnectionHandle) -> Result<ClientId, ChatError> {
        self.ensure_running()?;
        let client_id = self
            .connections
            .register(handle)
            .await
            .ok_or(ChatError::ShuttingDown)?;

        tracing::info!(%client_id, "client connected");
        Ok(client_id)
    }

    /// Adds `client_id` to `room_name` and announces it to the room.
    ///
    /// The notice goes to every member after the add, the joiner included.
    /// Joining a room twice leaves membership unchanged but announces again.
    ///
    /// # Errors
    ///
    /// - [`ChatError::RoomNotFound`] if the room is not configured.
    /// - [`ChatError::ClientNotFound`] if the client is not registered.
    /// - [`ChatError::ShuttingDown`] once [`Self::shutdown`] has run.
    pub async fn join(
        &self,
        room_name: &str,
        client_id: &ClientId,
    ) -> Result<JoinOutcome, ChatError> {
        self.ensure_running()?;
        let room = self.room(room_name)?;

        let Some(newly_joined) = self.connections.attach(client_id, room).await else {
            self.ensure_running()?;
            tracing::debug!(%client_id, room = room_name, "join from unknown client");
            return Err(ChatError::ClientNotFound(client_id.to_string()));
        };

        tracing::info!(%client_id, room = room_name, newly_joined, "client joined room");

        let notice = self.fan_out(room, &ChatMessage::join_notice(room_name)).await;
        Ok(JoinOutcome {
            newly_joined,
            notice,
        })
    }

    /// Broadcasts `message` as `sender:text` to every member of its room.
    ///
    /// Best effort: a member that cannot be reached is counted in
    /// [`SendReport::failed`] and disconnected; the rest still receive it.
    ///
    /// # Errors
    ///
    /// - [`ChatError::RoomNotFound`] if the room is not configured.
    /// - [`ChatError::ShuttingDown`] once [`Self::shutdown`] has run.
    pub async fn send(&self, message: &ChatMessage) -> Result<SendReport, ChatError> {
        self.ensure_running()?;
        let room = self.room(&message.room)?;
        Ok(self.fan_out(room, message).await)
    }

    /// Removes a client from every room it joined and from the registry.
    ///
    /// Idempotent. Returns `false` if the client was not registered. Dropping
    /// the registry entry closes the session's outbound queue.
    pub async fn disconnect(&self, client_id: &ClientId) -> bool {
        let Some(entry) = self.connections.remove(client_id).await else {
            return false;
        };
        let connected_secs = (Utc::now() - entry.connected_at()).num_seconds();
        let rooms = entry.into_rooms();
        for name in &rooms {
            if let Some(room) = self.rooms.get(name) {
                room.remove(client_id).await;
            }
        }

        tracing::info!(%client_id, rooms = rooms.len(), connected_secs, "client disconnected");
        true
    }

    /// Closes every session and empties every room.
    ///
    /// Idempotent; later calls find nothing to close. Returns the number of
    /// sessions closed by this call. A broadcast already in flight sees the
    /// closed sessions as delivery failures.
    pub async fn shutdown(&self) -> usize {
        self.shutting_down.store(true, Ordering::SeqCst);

        let closed = self.connections.close().await.len();
        for room in self.rooms.values() {
            room.clear().await;
        }

        if closed > 0 {
            tracing::info!(closed, "closed all connections");
        }
        closed
    }

    /// Returns `true` once [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Returns `true` if `client_id` is currently registered.
    pub async fn is_valid(&self, client_id: &ClientId) -> bool {
        self.connections.is_valid(client_id).await
    }

    /// Configured room names, in configuration order.
    #[must_use]
    pub fn room_names(&self) -> &[String] {
        &self.room_order
    }

    /// Every room with its current member count, in configuration order.
    pub async fn room_summaries(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(self.room_order.len());
        for name in &self.room_order {
            if let Some(room) = self.rooms.get(name) {
                summaries.push(RoomSummary {
                    name: name.clone(),
                    member_count: room.member_count().await,
                });
            }
        }
        summaries
    }

    /// Member count of one room.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::RoomNotFound`] if the room is not configured.
    pub async fn member_count(&self, room_name: &str) -> Result<usize, ChatError> {
        Ok(self.room(room_name)?.member_count().await)
    }

    /// Number of registered sessions.
    pub async fn connection_count(&self) -> usize {
        self.connections.len().await
    }

    fn room(&self, room_name: &str) -> Result<&Room, ChatError> {
        self.rooms.get(room_name).ok_or_else(|| {
            tracing::debug!(room = room_name, "room does not exist");
            ChatError::RoomNotFound(room_name.to_string())
        })
    }

    fn ensure_running(&self) -> Result<(), ChatError> {
        if self.is_shutting_down() {
            return Err(ChatError::ShuttingDown);
        }
        Ok(())
    }

    async fn fan_out(&self, room: &Room, message: &ChatMessage) -> SendReport {
        let report = room.broadcast(&message.payload()).await;
        for (client_id, err) in &report.failed {
            tracing::warn!(%client_id, room = room.name(), %err, "dropping unreachable member");
            self.disconnect(client_id).await;
        }
        SendReport {
            delivered: report.delivered,
            failed: report.failed.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;

    fn engine() -> ChatEngine {
        ChatEngine::new(["sports", "travel"])
    }

    async fn connect(engine: &ChatEngine) -> (ClientId, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::channel(256);
        let Ok(id) = engine.connect(handle).await else {
            panic!("connect failed");
        };
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn join_then_send_delivers_exactly_once() {
        let engine = engine();
        let (c, mut rx) = connect(&engine).await;

        let Ok(outcome) = engine.join("sports", &c).await else {
            panic!("join failed");
        };
        assert!(outcome.newly_joined);
        assert_eq!(outcome.notice.delivered, 1);

        let Ok(report) = engine.send(&ChatMessage::new("sports", "sys", "hi")).await else {
            panic!("send failed");
        };
        assert_eq!(report, SendReport { delivered: 1, failed: 0 });

        let received = drain(&mut rx);
        assert_eq!(
            received,
            vec!["ChatServer:new user joined chatroom".to_string(), "sys:hi".to_string()]
        );
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let engine = engine();
        let (c, _rx) = connect(&engine).await;

        assert!(engine.join("sports", &c).await.is_ok());
        let Ok(second) = engine.join("sports", &c).await else {
            panic!("second join failed");
        };

        assert!(!second.newly_joined);
        assert_eq!(engine.member_count("sports").await.ok(), Some(1));
    }

    #[tokio::test]
    async fn existing_members_see_join_notice() {
        let engine = engine();
        let (a, mut rx_a) = connect(&engine).await;
        let (b, mut rx_b) = connect(&engine).await;

        assert!(engine.join("travel", &a).await.is_ok());
        drain(&mut rx_a);
        assert!(engine.join("travel", &b).await.is_ok());

        assert_eq!(drain(&mut rx_a), vec!["ChatServer:new user joined chatroom"]);
        assert_eq!(drain(&mut rx_b), vec!["ChatServer:new user joined chatroom"]);
    }

    #[tokio::test]
    async fn disconnect_removes_client_from_every_room() {
        let engine = engine();
        let (c, _rx) = connect(&engine).await;
        assert!(engine.join("sports", &c).await.is_ok());
        assert!(engine.join("travel", &c).await.is_ok());

        assert!(engine.disconnect(&c).await);

        for room in ["sports", "travel"] {
            let Ok(report) = engine.send(&ChatMessage::new(room, "sys", "gone?")).await else {
                panic!("send failed");
            };
            assert_eq!(report.delivered, 0);
            assert_eq!(engine.member_count(room).await.ok(), Some(0));
        }
        assert!(!engine.is_valid(&c).await);
        assert!(!engine.disconnect(&c).await);
    }

    #[tokio::test]
    async fn failed_member_does_not_block_fan_out() {
        let engine = engine();
        let (a, mut rx_a) = connect(&engine).await;
        let (b, rx_b) = connect(&engine).await;
        let (c, mut rx_c) = connect(&engine).await;
        for id in [&a, &b, &c] {
            assert!(engine.join("sports", id).await.is_ok());
        }
        drain(&mut rx_a);
        drain(&mut rx_c);
        drop(rx_b);

        let Ok(report) = engine.send(&ChatMessage::new("sports", "alice", "hello")).await
        else {
            panic!("send failed");
        };

        assert_eq!(report, SendReport { delivered: 2, failed: 1 });
        assert_eq!(drain(&mut rx_a), vec!["alice:hello"]);
        assert_eq!(drain(&mut rx_c), vec!["alice:hello"]);
        assert!(!engine.is_valid(&b).await);
        assert_eq!(engine.member_count("sports").await.ok(), Some(2));
    }

    #[tokio::test]
    async fn unknown_room_is_rejected_without_side_effects() {
        let engine = engine();
        let (c, mut rx) = connect(&engine).await;

        let result = engine.join("nonexistent", &c).await;

        assert!(matches!(result, Err(ChatError::RoomNotFound(ref r)) if r == "nonexistent"));
        assert_eq!(engine.room_names(), ["sports", "travel"]);
        assert!(matches!(
            engine.member_count("nonexistent").await,
            Err(ChatError::RoomNotFound(_))
        ));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn unknown_client_is_rejected() {
        let engine = engine();
        let result = engine.join("sports", &ClientId::from("not-a-real-id")).await;
        assert!(matches!(result, Err(ChatError::ClientNotFound(_))));
        assert_eq!(engine.member_count("sports").await.ok(), Some(0));
    }

    #[tokio::test]
    async fn send_to_unknown_room_delivers_nothing() {
        let engine = engine();
        let result = engine.send(&ChatMessage::new("cooking", "bob", "hi")).await;
        assert!(matches!(result, Err(ChatError::RoomNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_are_all_recorded() {
        const N: usize = 64;
        let engine = Arc::new(engine());

        let mut receivers = Vec::with_capacity(N);
        let mut tasks = Vec::with_capacity(N);
        for _ in 0..N {
            let (id, rx) = connect(&engine).await;
            receivers.push(rx);
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move { engine.join("sports", &id).await }));
        }
        for task in tasks {
            let Ok(result) = task.await else {
                panic!("join task panicked");
            };
            assert!(result.is_ok());
        }
        for rx in &mut receivers {
            drain(rx);
        }

        let Ok(report) = engine.send(&ChatMessage::new("sports", "sys", "all")).await else {
            panic!("send failed");
        };

        assert_eq!(report, SendReport { delivered: N, failed: 0 });
        for rx in &mut receivers {
            assert_eq!(drain(rx), vec!["sys:all"]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn disconnects_racing_broadcasts_leave_no_stale_members() {
        let engine = Arc::new(engine());
        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..32 {
            let (id, rx) = connect(&engine).await;
            assert!(engine.join("travel", &id).await.is_ok());
            ids.push(id);
            receivers.push(rx);
        }

        let sender = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for i in 0..50 {
                    let _ = engine
                        .send(&ChatMessage::new("travel", "sys", i.to_string()))
                        .await;
                }
            })
        };
        let leaver = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for id in &ids {
                    engine.disconnect(id).await;
                }
            })
        };

        assert!(sender.await.is_ok());
        assert!(leaver.await.is_ok());
        assert_eq!(engine.member_count("travel").await.ok(), Some(0));
        assert_eq!(engine.connection_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_closes_sessions_and_rejects_later_calls() {
        let engine = engine();
        let (c, mut rx) = connect(&engine).await;
        assert!(engine.join("sports", &c).await.is_ok());

        assert_eq!(engine.shutdown().await, 1);
        assert_eq!(engine.shutdown().await, 0);

        drain(&mut rx);
        assert!(rx.recv().await.is_none());
        assert!(matches!(
            engine.join("sports", &c).await,
            Err(ChatError::ShuttingDown)
        ));
        assert!(matches!(
            engine.send(&ChatMessage::new("sports", "sys", "late")).await,
            Err(ChatError::ShuttingDown)
        ));
        let (handle, _rx) = ConnectionHandle::channel(4);
        assert!(matches!(
            engine.connect(handle).await,
            Err(ChatError::ShuttingDown)
        ));
        assert!(!engine.disconnect(&c).await);
        assert_eq!(engine.member_count("sports").await.ok(), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_racing_sends_and_joins_settles_cleanly() {
        let engine = Arc::new(engine());
        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..16 {
            let (handle, rx) = ConnectionHandle::channel(1024);
            let Ok(id) = engine.connect(handle).await else {
                panic!("connect failed");
            };
            ids.push(id);
            receivers.push(rx);
        }
        for id in ids.iter().step_by(2) {
            assert!(engine.join("sports", id).await.is_ok());
        }

        let mut senders = Vec::new();
        for room in ["sports", "travel", "sports", "travel"] {
            let engine = Arc::clone(&engine);
            senders.push(tokio::spawn(async move {
                let mut results = Vec::new();
                for i in 0..50 {
                    let message = ChatMessage::new(room, "sys", i.to_string());
                    results.push(engine.send(&message).await);
                    tokio::task::yield_now().await;
                }
                results
            }));
        }
        let mut joiners = Vec::new();
        for chunk in ids.chunks(4) {
            let engine = Arc::clone(&engine);
            let chunk = chunk.to_vec();
            joiners.push(tokio::spawn(async move {
                let mut results = Vec::new();
                for id in &chunk {
                    for room in ["sports", "travel"] {
                        results.push(engine.join(room, id).await);
                        tokio::task::yield_now().await;
                    }
                }
                results
            }));
        }
        let stopper = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                engine.shutdown().await
            })
        };

        let settled = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            let mut sends = Vec::new();
            for task in senders {
                let Ok(results) = task.await else {
                    panic!("send task panicked");
                };
                sends.extend(results);
            }
            let mut joins = Vec::new();
            for task in joiners {
                let Ok(results) = task.await else {
                    panic!("join task panicked");
                };
                joins.extend(results);
            }
            let Ok(closed) = stopper.await else {
                panic!("shutdown task panicked");
            };
            (sends, joins, closed)
        })
        .await;
        let Ok((sends, joins, closed)) = settled else {
            panic!("tasks did not finish after shutdown");
        };

        assert_eq!(closed, 16);
        for result in &sends {
            assert!(matches!(result, Ok(_) | Err(ChatError::ShuttingDown)), "{result:?}");
        }
        for result in &joins {
            assert!(matches!(result, Ok(_) | Err(ChatError::ShuttingDown)), "{result:?}");
        }
        assert_eq!(engine.connection_count().await, 0);
        for room in engine.room_names() {
            assert_eq!(engine.member_count(room).await.ok(), Some(0));
        }
        for rx in &mut receivers {
            drain(rx);
            assert!(rx.recv().await.is_none());
        }
    }

    #[test]
    fn blank_and_duplicate_room_names_are_dropped() {
        let engine = ChatEngine::new(["sports", " ", "sports", " travel "]);
        assert_eq!(engine.room_names(), ["sports", "travel"]);
    }

    #[tokio::test]
    async fn summaries_follow_configuration_order() {
        let engine = ChatEngine::new(["travel", "sports"]);
        let (c, _rx) = connect(&engine).await;
        assert!(engine.join("sports", &c).await.is_ok());

        let summaries = engine.room_summaries().await;
        assert_eq!(
            summaries,
            vec![
                RoomSummary { name: "travel".to_string(), member_count: 0 },
                RoomSummary { name: "sports".to_string(), member_count: 1 },
            ]
        );
    }
}
