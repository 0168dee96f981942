//! Table of live sessions keyed by [`ClientId`].
//!
//! The registry is the only owner of [`ConnectionHandle`]s. Each entry also
//! carries the reverse index of rooms the client joined, which is what lets
//! a disconnect remove the client from exactly the rooms it is in.
//!
//! Joins run under the table's read lock, so joins into different rooms
//! proceed in parallel. Register, remove and close take the write lock and
//! touch only the table itself. A room is never locked while the write lock
//! is held.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::ClientId;
use super::connection::ConnectionHandle;
use super::room::Room;

/// One registered session.
#[derive(Debug)]
pub struct ConnectionEntry {
    handle: ConnectionHandle,
    rooms: Mutex<BTreeSet<String>>,
    connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            rooms: Mutex::new(BTreeSet::new()),
            connected_at: Utc::now(),
        }
    }

    /// Registration timestamp.
    #[must_use]
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Consumes the entry, closing the session's queue, and returns the
    /// rooms the client was in.
    #[must_use]
    pub fn into_rooms(self) -> BTreeSet<String> {
        self.rooms.into_inner()
    }
}

#[derive(Debug, Default)]
struct ConnectionTable {
    entries: HashMap<ClientId, ConnectionEntry>,
    closed: bool,
}

/// Concurrent registry of live sessions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    table: RwLock<ConnectionTable>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and returns its new identifier.
    ///
    /// Returns `None` once [`Self::close`] has run; the handle is dropped and
    /// the session's queue closes with it.
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ClientId> {
        let mut table = self.table.write().await;
        if table.closed {
            return None;
        }
        let mut client_id = ClientId::generate();
        while table.entries.contains_key(&client_id) {
            client_id = ClientId::generate();
        }
        table
            .entries
            .insert(client_id.clone(), ConnectionEntry::new(handle));
        Some(client_id)
    }

    /// Returns `true` if the identifier is registered and not yet removed.
    pub async fn is_valid(&self, client_id: &ClientId) -> bool {
        self.table.read().await.entries.contains_key(client_id)
    }

    /// Records `client_id` as a member of `room` and adds it to the room.
    ///
    /// Both edits happen under the table read lock, so a concurrent
    /// [`Self::remove`] sees either neither or both. Returns `None` if the
    /// client is not registered, otherwise whether it was newly added.
    pub async fn attach(&self, client_id: &ClientId, room: &Room) -> Option<bool> {
        let table = self.table.read().await;
        let entry = table.entries.get(client_id)?;
        entry.rooms.lock().await.insert(room.name().to_string());
        Some(room.add(client_id.clone(), entry.handle.member_ref()).await)
    }

    /// Removes an identifier. Idempotent; returns the entry if there was one.
    pub async fn remove(&self, client_id: &ClientId) -> Option<ConnectionEntry> {
        self.table.write().await.entries.remove(client_id)
    }

    /// Refuses further registrations and removes every entry.
    pub async fn close(&self) -> Vec<ConnectionEntry> {
        let mut table = self.table.write().await;
        table.closed = true;
        table.entries.drain().map(|(_, entry)| entry).collect()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }
}
