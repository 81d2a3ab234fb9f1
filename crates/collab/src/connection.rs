//! Client connections as seen by the session.
//!
//! A connection is an outbound message channel plus its join state. The
//! transport owns the socket; the session only ever pushes
//! [`ServerMessage`]s into the channel.

use crate::message::ServerMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Unique connection identifier.
///
/// Identifiers are handed out in increasing order, so sorting by id gives
/// connection order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Conn({})", self.0)
    }
}

/// State of a client connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection established, no display name yet.
    Connected,
    /// Joined the session as a participant.
    Joined,
}

/// A client connection registered with the session.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Current connection state.
    pub state: ConnectionState,
    /// Channel to send messages to this client.
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ClientConnection {
    /// Create a new client connection.
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            state: ConnectionState::Connected,
            tx,
        }
    }

    /// Check if the connection has joined as a participant.
    pub fn is_joined(&self) -> bool {
        self.state == ConnectionState::Joined
    }

    /// Send a message to this client.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.tx
            .send(msg)
            .map_err(|_| SendError::ChannelClosed(self.id))
    }
}

/// Error when sending a message fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The channel to the client is closed.
    #[error("Channel closed for connection {0}")]
    ChannelClosed(ConnectionId),
}
