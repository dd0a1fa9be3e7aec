//! Domain error types
//!
//! This module defines the error hierarchy for the exporter. Errors coming from
//! the MongoDB driver or librdkafka are flattened into strings so that no
//! third-party type crosses the crate boundary.

use thiserror::Error;

/// Main export error type
///
/// Only `Configuration`, `Connection`, `Source` and `Cancelled` are meant to
/// abort a run. Per-record problems are reported through [`ValidationError`]
/// or `Delivery` and absorbed by the orchestrator.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Configuration-related errors (missing variable, malformed file or value)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document store errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Message broker errors
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Network/connection errors not tied to a specific backend
    #[error("Connection error: {0}")]
    Connection(String),

    /// Record validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A message could not be handed to the broker client
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Checkpoint state errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was interrupted by a shutdown signal
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ExportError {
    /// Whether this error means the process could not reach one of its backends
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ExportError::Connection(_)
                | ExportError::Source(SourceError::ConnectionFailed(_))
                | ExportError::Source(SourceError::PingFailed(_))
                | ExportError::Broker(BrokerError::ConnectionFailed(_))
        )
    }
}

/// Document store (MongoDB) errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Client could not be constructed from the connection string
    #[error("Failed to connect to document store: {0}")]
    ConnectionFailed(String),

    /// The ping after connecting failed
    #[error("Document store did not answer ping: {0}")]
    PingFailed(String),

    /// Opening the cursor failed
    #[error("Failed to open cursor on collection '{collection}': {message}")]
    CursorOpenFailed { collection: String, message: String },

    /// Fetching the next page of a cursor failed
    #[error("Failed to advance cursor: {0}")]
    CursorAdvanceFailed(String),
}

/// Message broker (Kafka) errors
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Producer could not be created
    #[error("Failed to create producer: {0}")]
    ConnectionFailed(String),

    /// The local producer queue rejected a message
    #[error("Failed to enqueue message for key '{key}': {message}")]
    EnqueueFailed { key: String, message: String },

    /// Flush did not complete before its deadline
    #[error("Flush did not complete: {0}")]
    FlushFailed(String),
}

/// Per-record validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The identifying field is absent
    #[error("record has no 'afid' field")]
    MissingIdentifier,

    /// The identifying field holds a non-numeric value
    #[error("'afid' is not numeric (found {0})")]
    NonNumericIdentifier(String),

    /// The identifying field is zero
    #[error("'afid' is zero")]
    ZeroIdentifier,
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::Configuration(format!("TOML parse error: {err}"))
    }
}
