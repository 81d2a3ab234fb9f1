//! The single shared document.
//!
//! Edits are composed onto the current document strictly in the order the
//! store receives them. There is no transformation against the version a
//! client last saw: two clients editing the same base concurrently simply
//! land one on top of the other (see the `arrival_order` test below).

use crate::error::CollabResult;
use delta::Delta;
use std::sync::Arc;

/// Owns the current document and advances it by composition.
#[derive(Debug, Default)]
pub struct DocumentStore {
    document: Arc<Delta>,
    revision: u64,
}

impl DocumentStore {
    /// Create a store holding the empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest document. Cheap: only bumps a reference count.
    pub fn current_snapshot(&self) -> Arc<Delta> {
        Arc::clone(&self.document)
    }

    /// Number of edits accepted so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Length of the current document.
    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Compose `edit` onto the current document and replace it.
    ///
    /// On error the stored document is left exactly as it was.
    pub fn apply_edit(&mut self, edit: &Delta) -> CollabResult<Arc<Delta>> {
        let next = Arc::new(self.document.apply(edit)?);
        self.document = Arc::clone(&next);
        self.revision += 1;
        Ok(next)
    }
}
