//! Wire protocol between the sync server and its clients.
//!
//! Every frame is a JSON object tagged by `type`, e.g.
//! `{"type":"send-changes","edit":{"ops":[{"retain":2},{"insert":"!"}]}}`.

use delta::Delta;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join the session under a display name.
    Join {
        #[serde(rename = "displayName")]
        display_name: String,
    },

    /// Ask for the current document.
    GetDocument,

    /// Submit a local edit.
    SendChanges { edit: Delta },

    /// The sender is typing.
    Typing {
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
    },

    /// The sender stopped typing.
    StopTyping {
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
    },

    /// Keepalive.
    Ping,
}

/// Messages sent from server to client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Acknowledgement of a join request.
    JoinResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Full document snapshot.
    LoadDocument { document: Delta },

    /// An edit made by another participant.
    ReceiveChanges {
        edit: Delta,
        #[serde(rename = "authorName")]
        author_name: String,
    },

    /// Everyone currently in the session.
    UserList { users: Vec<String> },

    /// A participant started typing.
    Typing {
        #[serde(rename = "displayName")]
        display_name: String,
    },

    /// A participant stopped typing.
    StopTyping {
        #[serde(rename = "displayName")]
        display_name: String,
    },

    /// Error message, sent only to the connection that caused it.
    Error { code: String, message: String },

    /// Pong response to ping.
    Pong,
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMessage {
    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
