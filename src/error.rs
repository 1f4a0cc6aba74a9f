//! Error types for scribe

use thiserror::Error;
use uuid::Uuid;

use crate::crdt::Identifier;

/// Errors raised by the sequence document itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid position {position} for document of length {length}")]
    InvalidPosition { position: i64, length: usize },
}

/// Reasons an inbound operation is dropped by the coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Malformed operation: {0}")]
    Malformed(String),

    #[error("Unknown operation type: {0}")]
    UnknownType(String),

    #[error("Insert 'char' must be exactly one character, got {0:?}")]
    InvalidChar(Option<String>),

    #[error("Participant {0} is no longer active")]
    InactiveParticipant(Uuid),

    #[error("Identifier {0} is already present in the document")]
    DuplicateIdentifier(Identifier),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures on a single participant's channel.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Receive error: {0}")]
    Receive(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Configuration problems detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
