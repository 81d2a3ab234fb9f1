//! The shared editing session.
//!
//! `DocumentSession` owns the document store, the participant registry, the
//! typing tracker and the broadcast hub, and implements every protocol
//! event as a plain synchronous method. It is meant to be owned by exactly
//! one task (see [`crate::coordinator`]): because no method awaits, each
//! event runs to completion before the next one starts, which is what keeps
//! the document and the name map consistent.

use crate::connection::ConnectionId;
use crate::error::{CollabError, CollabResult};
use crate::hub::BroadcastHub;
use crate::message::{ClientMessage, ServerMessage};
use crate::registry::{Joined, SessionRegistry};
use crate::store::DocumentStore;
use crate::typing::{TypingExpired, TypingTracker, TypingTransition};
use delta::Delta;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Point-in-time counters for a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Open connections, joined or not.
    pub connections: usize,
    /// Connections that joined under a name.
    pub participants: usize,
    /// Names currently typing.
    pub typing: usize,
    /// Length of the current document.
    pub document_len: usize,
    /// Edits accepted so far.
    pub revision: u64,
}

/// State of the single shared document and everyone editing it.
pub struct DocumentSession {
    store: DocumentStore,
    registry: SessionRegistry,
    typing: TypingTracker,
    hub: BroadcastHub,
}

impl DocumentSession {
    /// Create an empty session. Typing expiry events arrive on the returned
    /// receiver and must be fed back through [`Self::handle_expiry`].
    pub fn new(typing_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<TypingExpired>) {
        let (typing, expiry_rx) = TypingTracker::new(typing_timeout);
        let session = Self {
            store: DocumentStore::new(),
            registry: SessionRegistry::new(),
            typing,
            hub: BroadcastHub::new(),
        };
        (session, expiry_rx)
    }

    pub fn document(&self) -> Arc<Delta> {
        self.store.current_snapshot()
    }

    pub fn participants(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn is_typing(&self, name: &str) -> bool {
        self.typing.is_typing(name)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            connections: self.hub.connection_count(),
            participants: self.registry.len(),
            typing: self.typing.typing_names().len(),
            document_len: self.store.len(),
            revision: self.store.revision(),
        }
    }

    /// A transport connection opened.
    pub fn connect(&mut self, conn_id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) {
        tracing::debug!("{} connected", conn_id);
        self.hub.add(conn_id, tx);
    }

    /// Dispatch one client message.
    pub fn handle_message(&mut self, conn_id: ConnectionId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join { display_name } => {
                let _ = self.join(conn_id, &display_name);
            }
            ClientMessage::GetDocument => self.get_document(conn_id),
            ClientMessage::SendChanges { edit } => {
                let _ = self.send_changes(conn_id, &edit);
            }
            ClientMessage::Typing { display_name } => {
                self.typing(conn_id, display_name.as_deref());
            }
            ClientMessage::StopTyping { display_name } => {
                self.stop_typing(conn_id, display_name.as_deref());
            }
            ClientMessage::Ping => {
                let _ = self.hub.send_to(conn_id, ServerMessage::Pong);
            }
        }
    }

    /// Join `conn_id` under `name`.
    ///
    /// The joiner receives, in order: the join result, the current document,
    /// then the user list broadcast that everyone else also receives. A
    /// rejected join is reported to the joiner only.
    pub fn join(&mut self, conn_id: ConnectionId, name: &str) -> CollabResult<()> {
        if !self.hub.contains(conn_id) {
            return Err(CollabError::UnknownConnection(conn_id));
        }

        let joined = match self.registry.join(conn_id, name) {
            Ok(joined) => joined,
            Err(err) => {
                tracing::warn!("{} join as {:?} rejected: {}", conn_id, name, err);
                let _ = self.hub.send_to(
                    conn_id,
                    ServerMessage::JoinResult {
                        success: false,
                        message: Some(err.to_string()),
                    },
                );
                return Err(err);
            }
        };

        if let Joined::Renamed { previous } = &joined {
            tracing::info!("{} renamed from {:?} to {:?}", conn_id, previous, name);
            if self.typing.stop(previous) == TypingTransition::Stopped {
                self.hub.broadcast_stop_typing(previous);
            }
        } else {
            tracing::info!("{} joined as {:?}", conn_id, name);
        }

        self.hub.mark_joined(conn_id);
        let _ = self.hub.send_to(
            conn_id,
            ServerMessage::JoinResult {
                success: true,
                message: None,
            },
        );
        let _ = self.hub.send_to(
            conn_id,
            ServerMessage::LoadDocument {
                document: Delta::clone(&self.store.current_snapshot()),
            },
        );
        self.hub.broadcast_presence(self.registry.names());
        Ok(())
    }

    /// Reply with the current document. Allowed before joining.
    pub fn get_document(&self, conn_id: ConnectionId) {
        let document = Delta::clone(&self.store.current_snapshot());
        let _ = self
            .hub
            .send_to(conn_id, ServerMessage::LoadDocument { document });
    }

    /// Apply an edit from `conn_id` and relay it to everyone else.
    ///
    /// Rejected edits are not broadcast; the sender gets an `error` reply
    /// and can resynchronize with `get-document`.
    pub fn send_changes(
        &mut self,
        conn_id: ConnectionId,
        edit: &Delta,
    ) -> CollabResult<Arc<Delta>> {
        let Some(author) = self.registry.name_of(conn_id).map(str::to_owned) else {
            let err = CollabError::UnknownConnection(conn_id);
            tracing::debug!("Dropping edit from {}: not joined", conn_id);
            let _ = self
                .hub
                .send_to(conn_id, ServerMessage::error(err.code(), err.to_string()));
            return Err(err);
        };

        match self.store.apply_edit(edit) {
            Ok(document) => {
                tracing::debug!(
                    "Applied edit from {:?}, revision {}, length {}",
                    author,
                    self.store.revision(),
                    document.len()
                );
                self.hub.broadcast_edit(conn_id, edit, &author);
                Ok(document)
            }
            Err(err) => {
                tracing::warn!("Protocol violation from {} ({:?}): {}", conn_id, author, err);
                let _ = self
                    .hub
                    .send_to(conn_id, ServerMessage::error(err.code(), err.to_string()));
                Err(err)
            }
        }
    }

    /// `conn_id` is typing. Ignored for connections that have not joined.
    pub fn typing(&mut self, conn_id: ConnectionId, claimed: Option<&str>) {
        let Some(name) = self.signal_name(conn_id, claimed) else {
            return;
        };
        if self.typing.signal(&name) == TypingTransition::Started {
            self.hub.broadcast_typing(&name);
        }
    }

    /// `conn_id` stopped typing. Ignored if it was not typing.
    pub fn stop_typing(&mut self, conn_id: ConnectionId, claimed: Option<&str>) {
        let Some(name) = self.signal_name(conn_id, claimed) else {
            return;
        };
        if self.typing.stop(&name) == TypingTransition::Stopped {
            self.hub.broadcast_stop_typing(&name);
        }
    }

    /// A typing timer fired.
    pub fn handle_expiry(&mut self, expired: TypingExpired) {
        if self.typing.expire(&expired) == TypingTransition::Stopped {
            tracing::trace!("Typing indicator for {:?} expired", expired.name);
            self.hub.broadcast_stop_typing(&expired.name);
        }
    }

    /// The transport connection closed. Frees the name, clears its typing
    /// indicator and tells everyone who is left.
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        self.hub.remove(conn_id);

        let Some(name) = self.registry.leave(conn_id) else {
            tracing::debug!("{} disconnected before joining", conn_id);
            return;
        };

        tracing::info!("{} ({:?}) left", conn_id, name);
        if self.typing.stop(&name) == TypingTransition::Stopped {
            self.hub.broadcast_stop_typing(&name);
        }
        self.hub.broadcast_presence(self.registry.names());
    }

    /// The registered name for a typing signal. A differing name in the
    /// payload is not trusted.
    fn signal_name(&self, conn_id: ConnectionId, claimed: Option<&str>) -> Option<String> {
        let Some(name) = self.registry.name_of(conn_id) else {
            tracing::debug!("Ignoring typing signal from {}: not joined", conn_id);
            return None;
        };
        if let Some(claimed) = claimed.filter(|claimed| *claimed != name) {
            tracing::warn!(
                "{} sent typing signal for {:?} but is joined as {:?}",
                conn_id,
                claimed,
                name
            );
        }
        Some(name.to_string())
    }
}
