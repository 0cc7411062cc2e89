//! Error types for the relay layer.

use thiserror::Error;

/// Errors that can occur during relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The event was refused by the relay.
    #[error("event rejected: {0}")]
    Rejected(String),

    /// The subscription was closed by the relay.
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
