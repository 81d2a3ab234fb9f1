//! Error types for the delta crate.

use thiserror::Error;

/// Result type alias for delta operations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors produced while building, decoding or applying deltas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    /// An operation is malformed (wrong shape, zero length, empty text).
    #[error("Invalid operation: {0}")]
    InvalidOp(String),

    /// The edit touches content past the end of the document.
    #[error("Edit spans {needed} characters but the document has {available}")]
    OutOfRange { needed: usize, available: usize },

    /// The edit places a boundary between the two halves of a surrogate
    /// pair.
    #[error("Edit splits a character at offset {offset}")]
    SplitsCharacter { offset: usize },

    /// The target of an apply contains retains or deletes.
    #[error("Target is not a document: only inserts are allowed")]
    NotADocument,
}
