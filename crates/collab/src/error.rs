//! Error types for the collaboration crate.

use crate::connection::ConnectionId;
use delta::DeltaError;
use thiserror::Error;

/// Result type alias for collaboration operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors that can occur while handling participant requests.
///
/// None of these are fatal: each is reported to the requesting connection
/// (or just logged) and the shared state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// The display name is held by another live connection.
    #[error("Name already taken: {0}")]
    NameTaken(String),

    /// The display name is empty or blank.
    #[error("Invalid display name: {0:?}")]
    InvalidName(String),

    /// The edit is malformed or reaches past the end of the document.
    #[error("Invalid edit: {0}")]
    InvalidEdit(#[from] DeltaError),

    /// The connection has not joined the session.
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

impl CollabError {
    /// Short machine-readable code used in `error` messages to clients.
    pub fn code(&self) -> &'static str {
        match self {
            CollabError::NameTaken(_) => "name_taken",
            CollabError::InvalidName(_) => "invalid_name",
            CollabError::InvalidEdit(_) => "invalid_edit",
            CollabError::UnknownConnection(_) => "not_joined",
        }
    }
}
