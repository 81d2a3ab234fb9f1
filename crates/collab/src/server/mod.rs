//! WebSocket collaboration server.
//!
//! This module exposes the shared document over WebSocket connections. It
//! handles the handshake (including the origin check), frame parsing and
//! the connection lifecycle; all session state lives in the
//! [`Coordinator`].
//!
//! # Architecture
//!
//! The server uses tokio-tungstenite for WebSocket connections. Each
//! connection runs in its own task with a second task forwarding outgoing
//! messages. Parsed client messages are sent to the coordinator, the only
//! task that reads or writes the document and the participant list.
//!
//! # Example
//!
//! ```ignore
//! use collab::server::{CollaborationServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env()?;
//!     let server = CollaborationServer::new(config);
//!
//!     // Run server on configured port
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;

use crate::connection::ConnectionId;
use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::message::{ClientMessage, ServerMessage};

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

pub use config::{AllowedOrigins, ConfigError, ServerConfig};

/// The collaboration server.
pub struct CollaborationServer {
    /// Server configuration.
    config: ServerConfig,
    /// Handle to the coordinator owning the session.
    coordinator: CoordinatorHandle,
    /// The coordinator and its shutdown receivers, until `serve` starts it.
    pending: Mutex<Option<PendingRun>>,
    /// Number of open connections.
    active: Arc<AtomicUsize>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl CollaborationServer {
    /// Create a new server with an empty document.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, accept_shutdown) = broadcast::channel(1);
        let (coordinator, handle) = Coordinator::new(config.typing_timeout);
        let pending = PendingRun {
            coordinator,
            coordinator_shutdown: shutdown_tx.subscribe(),
            accept_shutdown,
        };
        Self {
            config,
            coordinator: handle,
            pending: Mutex::new(Some(pending)),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle to the session coordinator, e.g. for statistics.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Get a shutdown handle.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Get current server statistics.
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            active_connections: self.active.load(Ordering::SeqCst),
        }
    }

    /// Bind to the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr.clone(), e))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let PendingRun {
            coordinator,
            coordinator_shutdown,
            accept_shutdown: mut shutdown_rx,
        } = self
            .pending
            .lock()
            .map_err(|_| ServerError::AlreadyRunning)?
            .take()
            .ok_or(ServerError::AlreadyRunning)?;

        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        tracing::info!("Collaboration server listening on {}", local_addr);

        let coordinator_task = tokio::spawn(coordinator.run(coordinator_shutdown));

        // Accept connections
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            // Check connection limits
                            let open = self.active.load(Ordering::SeqCst);
                            if open >= self.config.max_total_connections {
                                tracing::warn!("Max connections reached, rejecting {}", addr);
                                continue;
                            }

                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server received shutdown signal");
                    break;
                }
            }
        }

        // Wait for coordinator to finish
        let _ = coordinator_task.await;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Handle a new connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        tracing::debug!("New connection from {}", addr);

        let coordinator = self.coordinator.clone();
        let origins = self.config.allowed_origins.clone();
        let active = ActiveConnection::register(&self.active);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // Spawn connection handler task
        tokio::spawn(async move {
            let _active = active;

            // Upgrade to WebSocket
            let ws_stream = match accept_hdr_async(stream, origin_check(origins, addr)).await {
                Ok(ws) => ws,
                Err(e) => {
                    tracing::error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_tx, mut ws_rx) = ws_stream.split();

            // Create message channel for this connection
            let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();
            let conn_id = ConnectionId::new();

            if coordinator.connected(conn_id, msg_tx.clone()).is_err() {
                tracing::warn!("Coordinator stopped, dropping {}", addr);
                return;
            }
            tracing::debug!("{} is {}", addr, conn_id);

            // Outgoing message forwarder
            let outgoing = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    match msg.to_json() {
                        Ok(json) => {
                            if ws_tx.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to serialize message: {}", e);
                        }
                    }
                }
            });

            // Incoming message handler
            loop {
                tokio::select! {
                    msg = ws_rx.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(message) => {
                                        if coordinator.message(conn_id, message).is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!(
                                            "Unparseable message from {}: {}",
                                            conn_id,
                                            e
                                        );
                                        let reply =
                                            ServerMessage::error("message_error", e.to_string());
                                        let _ = msg_tx.send(reply);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!("Connection {} closed", conn_id);
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error for {}: {}", conn_id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Connection {} received shutdown signal", conn_id);
                        break;
                    }
                }
            }

            // Cleanup
            outgoing.abort();

            // Notify coordinator of disconnect
            let _ = coordinator.disconnected(conn_id);
        });
    }
}

/// Handshake callback that refuses origins outside `origins` with 403.
fn origin_check(
    origins: AllowedOrigins,
    addr: SocketAddr,
) -> impl FnOnce(&Request, Response) -> Result<Response, ErrorResponse> {
    move |req, response| {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        if origins.allows(origin) {
            return Ok(response);
        }
        tracing::warn!("Rejecting {} from origin {:?}", addr, origin);
        let mut reject = ErrorResponse::new(Some("Origin not allowed".to_string()));
        *reject.status_mut() = StatusCode::FORBIDDEN;
        Err(reject)
    }
}

/// A coordinator waiting for `serve`. The shutdown receivers are created
/// with the server, so a shutdown requested before `serve` is still seen.
struct PendingRun {
    coordinator: Coordinator,
    coordinator_shutdown: broadcast::Receiver<()>,
    accept_shutdown: broadcast::Receiver<()>,
}

/// Counts a connection as open for as long as it lives.
struct ActiveConnection(Arc<AtomicUsize>);

impl ActiveConnection {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Server statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerStats {
    /// Open transport connections, including ones still handshaking.
    pub active_connections: usize,
}

/// Handle for triggering server shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to shut down.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind to {0}: {1}")]
    BindFailed(String, #[source] std::io::Error),

    /// The bound listener has no usable local address.
    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// `serve` was called more than once.
    #[error("Server is already running")]
    AlreadyRunning,
}
