//! Gateway error types
//!
//! Error types surfaced by the public gateway operations. Upstream adapter
//! failures never appear here; they degrade to disconnected samples inside
//! the multiplexer.

use crate::ids::StreamId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Error type for gateway operations
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Malformed filter specification or invalid channel entry,
    /// raised synchronously at stream creation or reload
    Configuration(String),
    /// Explicit lookup against a channel that was never written
    UnknownChannel(String),
    /// Operation on a publisher in the wrong lifecycle state
    /// (e.g. second shutdown, output request after shutdown)
    PublisherState {
        /// Stream the publisher belongs to
        stream: StreamId,
        /// What was attempted and why it was rejected
        message: String,
    },
    /// Stream id not present in the gateway's table
    StreamNotFound(StreamId),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Configuration(msg) => write!(f, "Invalid stream configuration: {}", msg),
            GatewayError::UnknownChannel(name) => write!(f, "Unknown channel: {}", name),
            GatewayError::PublisherState { stream, message } => {
                write!(f, "Publisher state violation on stream {}: {}", stream, message)
            }
            GatewayError::StreamNotFound(id) => write!(f, "Stream not found: {}", id),
        }
    }
}

impl std::error::Error for GatewayError {}
