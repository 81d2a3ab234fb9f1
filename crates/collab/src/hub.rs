//! Fan-out of session events to connected participants.
//!
//! Delivery is best effort: a participant whose channel has closed is
//! skipped and reported back to the caller, and no ordering is promised
//! between different participants.

use crate::connection::{ClientConnection, ConnectionId, ConnectionState, SendError};
use crate::message::ServerMessage;
use delta::Delta;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Holds every open connection and broadcasts to the joined ones.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    connections: BTreeMap<ConnectionId, ClientConnection>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened connection.
    pub fn add(&mut self, conn_id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) {
        self.connections
            .insert(conn_id, ClientConnection::new(conn_id, tx));
    }

    /// Forget a connection.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Option<ClientConnection> {
        self.connections.remove(&conn_id)
    }

    /// Mark a connection as a participant so it receives broadcasts.
    pub fn mark_joined(&mut self, conn_id: ConnectionId) {
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.state = ConnectionState::Joined;
        }
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.connections.contains_key(&conn_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send to a single connection, joined or not.
    pub fn send_to(&self, conn_id: ConnectionId, msg: ServerMessage) -> Result<(), SendError> {
        match self.connections.get(&conn_id) {
            Some(conn) => conn.send(msg),
            None => Err(SendError::ChannelClosed(conn_id)),
        }
    }

    /// Deliver an edit to every participant except its author's connection.
    pub fn broadcast_edit(
        &self,
        origin: ConnectionId,
        edit: &Delta,
        author_name: &str,
    ) -> Vec<ConnectionId> {
        let msg = ServerMessage::ReceiveChanges {
            edit: edit.clone(),
            author_name: author_name.to_string(),
        };
        self.broadcast(msg, Some(origin))
    }

    /// Deliver the full participant list to every participant.
    pub fn broadcast_presence(&self, names: Vec<String>) -> Vec<ConnectionId> {
        self.broadcast(ServerMessage::UserList { users: names }, None)
    }

    pub fn broadcast_typing(&self, name: &str) -> Vec<ConnectionId> {
        let msg = ServerMessage::Typing {
            display_name: name.to_string(),
        };
        self.broadcast(msg, None)
    }

    pub fn broadcast_stop_typing(&self, name: &str) -> Vec<ConnectionId> {
        let msg = ServerMessage::StopTyping {
            display_name: name.to_string(),
        };
        self.broadcast(msg, None)
    }

    /// Send `msg` to all joined connections, optionally skipping one.
    /// Returns the connections whose channel was closed.
    fn broadcast(&self, msg: ServerMessage, except: Option<ConnectionId>) -> Vec<ConnectionId> {
        let mut failed = Vec::new();
        for conn in self.connections.values() {
            if !conn.is_joined() || Some(conn.id) == except {
                continue;
            }
            if conn.send(msg.clone()).is_err() {
                failed.push(conn.id);
            }
        }
        if !failed.is_empty() {
            tracing::debug!("Broadcast skipped {} closed connection(s)", failed.len());
        }
        failed
    }
}
