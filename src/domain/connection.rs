//! Delivery capability for a single WebSocket session.
//!
//! The transport owns the receiving half of a bounded queue and writes
//! whatever arrives to the socket. The sending half is split in two:
//!
//! - [`ConnectionHandle`] holds the strong sender and lives only in the
//!   [`super::ConnectionRegistry`]. Dropping it closes the queue, which tells
//!   the transport writer to close the socket.
//! - [`MemberRef`] holds a weak sender and is what rooms store. A room can
//!   never keep a session alive; once the registry lets go, every member
//!   reference stops delivering.

use tokio::sync::mpsc;

/// Reason a single delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The session is gone (handle dropped or writer exited).
    #[error("connection closed")]
    Closed,
    /// The session's outbound queue is full; the consumer is too slow.
    #[error("outbound queue full")]
    QueueFull,
}

impl From<mpsc::error::TrySendError<String>> for DeliveryError {
    fn from(err: mpsc::error::TrySendError<String>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => Self::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}

/// Owning handle to a session's outbound queue.
#[derive(Debug)]
pub struct ConnectionHandle {
    sender: mpsc::Sender<String>,
}

impl ConnectionHandle {
    /// Creates a handle plus the receiver the transport writer drains.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Returns a non-owning reference for room membership.
    #[must_use]
    pub fn member_ref(&self) -> MemberRef {
        MemberRef {
            sender: self.sender.downgrade(),
        }
    }
}

/// Non-owning reference to a session, stored in room member sets.
#[derive(Debug, Clone)]
pub struct MemberRef {
    sender: mpsc::WeakSender<String>,
}

impl MemberRef {
    /// Attempts delivery through the weak sender.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] if the owning handle was dropped and
    /// [`DeliveryError::QueueFull`] if the session is lagging.
    pub fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let sender = self.sender.upgrade().ok_or(DeliveryError::Closed)?;
        sender.try_send(text.to_string())?;
        Ok(())
    }
}
