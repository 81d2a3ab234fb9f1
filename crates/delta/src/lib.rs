//! Rich-text edit representation.
//!
//! A [`Delta`] is an ordered list of ops: `insert` new content, `retain`
//! existing content (optionally reformatting it) or `delete` it. The same
//! type describes both a whole document (inserts only) and a change to one.
//!
//! # Modules
//!
//! - `attributes`: formatting attribute maps and how they compose
//! - `op`: the individual operations and their validated wire form
//! - `delta`: normalization, composition and bounds-checked application
//! - `error`: error types for the delta crate
//!
//! # Example
//!
//! ```
//! use delta::Delta;
//!
//! let doc = Delta::new().apply(&Delta::new().insert("hi")).unwrap();
//! let doc = doc.apply(&Delta::new().retain(2).insert("!")).unwrap();
//! assert_eq!(doc.plain_text(), "hi!");
//!
//! // Edits that reach past the end are rejected, never truncated.
//! assert!(doc.apply(&Delta::new().retain(10)).is_err());
//! ```

pub mod attributes;
#[allow(clippy::module_inception)]
mod delta;
pub mod error;
mod iter;
pub mod op;

pub use attributes::AttributeMap;
pub use delta::Delta;
pub use error::{DeltaError, DeltaResult};
pub use op::{InsertValue, Op, OpKind};
