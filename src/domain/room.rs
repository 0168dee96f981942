//! A named broadcast channel and its member set.
//!
//! Each [`Room`] guards its own member set with a [`tokio::sync::RwLock`],
//! so joins and broadcasts in unrelated rooms never contend. Broadcasts copy
//! the member set under the read lock and deliver after releasing it; a
//! concurrent join or leave therefore never observes or disturbs an
//! in-progress iteration.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ClientId;
use super::connection::{DeliveryError, MemberRef};

/// Outcome of delivering one payload to every member of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of members the payload was queued for.
    pub delivered: usize,
    /// Members whose delivery failed, with the reason.
    pub failed: Vec<(ClientId, DeliveryError)>,
}

/// One named room.
#[derive(Debug)]
pub struct Room {
    name: String,
    members: RwLock<HashMap<ClientId, MemberRef>>,
}

impl Room {
    /// Creates an empty room.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Room name (immutable).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a member. Returns `false` if the client was already present.
    pub async fn add(&self, client_id: ClientId, member: MemberRef) -> bool {
        let mut members = self.members.write().await;
        if members.contains_key(&client_id) {
            return false;
        }
        members.insert(client_id, member);
        true
    }

    /// Removes a member. Returns `false` if the client was not present.
    pub async fn remove(&self, client_id: &ClientId) -> bool {
        self.members.write().await.remove(client_id).is_some()
    }

    /// Drops every member at once. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut members = self.members.write().await;
        let removed = members.len();
        members.clear();
        removed
    }

    /// Current number of members.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Copies the member set as it is right now.
    pub async fn snapshot(&self) -> Vec<(ClientId, MemberRef)> {
        self.members
            .read()
            .await
            .iter()
            .map(|(id, member)| (id.clone(), member.clone()))
            .collect()
    }

    /// Delivers `payload` to every member present when the call started.
    ///
    /// Delivery never waits on a member; a closed or lagging session is
    /// recorded in [`BroadcastReport::failed`] and the loop moves on.
    pub async fn broadcast(&self, payload: &str) -> BroadcastReport {
        let snapshot = self.snapshot().await;
        let mut report = BroadcastReport::default();
        for (client_id, member) in snapshot {
            match member.deliver(payload) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::debug!(room = %self.name, %client_id, %err, "delivery failed");
                    report.failed.push((client_id, err));
                }
            }
        }
        report
    }
}
