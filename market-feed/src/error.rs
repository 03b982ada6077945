//! Error types for the market feed crate

use thiserror::Error;

use crate::application::ports::ConnectionId;

/// Instrument store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Slot {position} out of range (capacity {capacity})")]
    SlotOutOfRange { position: usize, capacity: usize },
}

/// Fatal errors raised inside the tick loop
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No catalog template for slot {0}")]
    MissingTemplate(usize),
}

/// Inbound command errors. The message is discarded, the connection stays open.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command is not a JSON object")]
    NotAnObject,

    #[error("Missing 'type' field")]
    MissingType,

    #[error("Unrecognized command type: {0}")]
    UnknownType(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Connection transport errors. Terminal for that connection only.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Outbound queue full")]
    QueueFull,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Subscription registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate instrument id {0} in catalog")]
    DuplicateId(i64),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Errors that stop the running server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Change generator failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Change generator task aborted: {0}")]
    GeneratorTask(#[from] tokio::task::JoinError),
}
