//! Synchronization coordinator
//!
//! Handles:
//! - Participant registration and the broadcast set
//! - Operation parsing, validation and identifier minting
//! - Merge + fan-out after every applied edit

pub mod coordinator;
pub mod participants;
pub mod protocol;

// Re-exports
pub use coordinator::{Coordinator, DocumentSnapshot};
pub use participants::{ParticipantId, ParticipantState, Participants};
pub use protocol::{Operation, OperationMessage, ServerMessage};
