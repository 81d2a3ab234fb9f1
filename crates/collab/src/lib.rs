//! Real-time synchronization of a single shared rich-text document.
//!
//! Clients join under a display name, receive the current document, and
//! from then on exchange edits and typing signals. The server applies edits
//! in the order it receives them and relays them to everyone else.
//!
//! # Modules
//!
//! - `store`: the shared document and its composition-only mutation path
//! - `registry`: connection to display-name mapping with unique names
//! - `typing`: typing indicators that lapse after a period of silence
//! - `hub`: fan-out of events to connected participants
//! - `session`: all of the above wired together, one method per protocol event
//! - `coordinator`: the single task that owns the session
//! - `message`: the JSON wire protocol
//! - `connection`: per-connection identity and outbound channel
//! - `error`: error types for the collaboration crate
//!
//! # Example
//!
//! ```
//! use collab::{ConnectionId, DocumentSession, ServerMessage};
//! use delta::Delta;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut session, _expiry) = DocumentSession::new(Duration::from_secs(1));
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let alice = ConnectionId::new();
//!
//! session.connect(alice, tx);
//! session.join(alice, "alice").unwrap();
//! session.send_changes(alice, &Delta::new().insert("hi")).unwrap();
//!
//! assert_eq!(session.document().plain_text(), "hi");
//! assert!(matches!(rx.try_recv(), Ok(ServerMessage::JoinResult { success: true, .. })));
//! # }
//! ```

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod hub;
pub mod message;
pub mod registry;
pub mod session;
pub mod store;
pub mod typing;

/// WebSocket collaboration server module.
///
/// This module is only available when the `server` feature is enabled.
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use connection::{ConnectionId, SendError};
pub use coordinator::{Command, Coordinator, CoordinatorClosed, CoordinatorHandle};
pub use error::{CollabError, CollabResult};
pub use hub::BroadcastHub;
pub use message::{ClientMessage, ServerMessage};
pub use registry::{Joined, SessionRegistry};
pub use session::{DocumentSession, SessionStats};
pub use store::DocumentStore;
pub use typing::{TypingExpired, TypingTracker, TypingTransition, DEFAULT_TYPING_TIMEOUT};
