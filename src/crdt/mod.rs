//! Sequence CRDT
//!
//! Handles:
//! - Identifier ordering (counter, then site)
//! - Physical-position insert/delete with tombstones
//! - Merge pass that re-establishes canonical order

pub mod document;
pub mod identifier;

// Re-exports
pub use document::{physical_index, Document, Element};
pub use identifier::Identifier;
