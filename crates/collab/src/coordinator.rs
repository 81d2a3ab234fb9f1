//! The single task that owns the session.
//!
//! Connection tasks never touch shared state. They forward [`Command`]s
//! over an unbounded channel; the coordinator applies them one at a time,
//! interleaved with typing-timer events, in one `select!` loop. Edits are
//! therefore applied in the order the coordinator receives them.

use crate::connection::ConnectionId;
use crate::message::{ClientMessage, ServerMessage};
use crate::session::{DocumentSession, SessionStats};
use crate::typing::TypingExpired;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Events delivered to the coordinator.
#[derive(Debug)]
pub enum Command {
    /// A connection opened; `tx` carries messages back to it.
    Connected {
        conn_id: ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    },
    /// A parsed message from a connection.
    Message {
        conn_id: ConnectionId,
        message: ClientMessage,
    },
    /// A connection closed.
    Disconnected { conn_id: ConnectionId },
    /// Request current statistics.
    Stats { reply: oneshot::Sender<SessionStats> },
}

/// The coordinator task has stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Coordinator is not running")]
pub struct CoordinatorClosed;

/// Cloneable handle for submitting commands.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    pub fn send(&self, cmd: Command) -> Result<(), CoordinatorClosed> {
        self.tx.send(cmd).map_err(|_| CoordinatorClosed)
    }

    pub fn connected(
        &self,
        conn_id: ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), CoordinatorClosed> {
        self.send(Command::Connected { conn_id, tx })
    }

    pub fn message(
        &self,
        conn_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), CoordinatorClosed> {
        self.send(Command::Message { conn_id, message })
    }

    pub fn disconnected(&self, conn_id: ConnectionId) -> Result<(), CoordinatorClosed> {
        self.send(Command::Disconnected { conn_id })
    }

    /// Ask the coordinator for its statistics.
    pub async fn stats(&self) -> Result<SessionStats, CoordinatorClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply })?;
        rx.await.map_err(|_| CoordinatorClosed)
    }
}

/// Owns the [`DocumentSession`] and drives it from its command queue.
pub struct Coordinator {
    session: DocumentSession,
    expiry_rx: mpsc::UnboundedReceiver<TypingExpired>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl Coordinator {
    /// Create a coordinator with an empty document.
    pub fn new(typing_timeout: Duration) -> (Self, CoordinatorHandle) {
        let (session, expiry_rx) = DocumentSession::new(typing_timeout);
        let (tx, cmd_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            session,
            expiry_rx,
            cmd_rx,
        };
        (coordinator, CoordinatorHandle { tx })
    }

    /// Spawn the coordinator loop on the current runtime.
    pub fn spawn(
        typing_timeout: Duration,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(typing_timeout);
        let task = tokio::spawn(coordinator.run(shutdown_rx));
        (handle, task)
    }

    /// Process commands until shutdown is signalled or every handle is
    /// dropped.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let Coordinator {
            mut session,
            mut expiry_rx,
            mut cmd_rx,
        } = self;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => Self::dispatch(&mut session, cmd),
                    None => {
                        tracing::debug!("All coordinator handles dropped");
                        break;
                    }
                },
                Some(expired) = expiry_rx.recv() => {
                    session.handle_expiry(expired);
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Coordinator received shutdown signal");
                    break;
                }
            }
        }
    }

    fn dispatch(session: &mut DocumentSession, cmd: Command) {
        match cmd {
            Command::Connected { conn_id, tx } => session.connect(conn_id, tx),
            Command::Message { conn_id, message } => session.handle_message(conn_id, message),
            Command::Disconnected { conn_id } => session.disconnect(conn_id),
            Command::Stats { reply } => {
                let _ = reply.send(session.stats());
            }
        }
    }
}
