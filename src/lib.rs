//! scribe - collaborative plain-text editor server
//!
//! Participants connect over WebSocket and send character inserts and
//! deletes. A single authoritative sequence CRDT applies them, merges by
//! identifier order, and broadcasts the visible text to everyone.
//!
//! ## Modules
//!
//! - **crdt**: identifiers, elements, and the tombstoned sequence document
//! - **sync**: the coordinator, participant set, and wire protocol
//! - **server**: axum router, WebSocket sessions, editor page
//! - **config**: TOML configuration with defaults

pub mod config;
pub mod crdt;
pub mod error;
pub mod server;
pub mod sync;

pub use config::Config;
pub use crdt::{Document, Element, Identifier};
pub use error::{ConfigError, DocumentError, OperationError, TransportError};
pub use sync::Coordinator;
