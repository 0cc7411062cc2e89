//! Error types for bunker core.

use thiserror::Error;

use crate::types::EventId;

/// Core errors that can occur while handling keys and events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("event pubkey {claimed} does not match signer {signer}")]
    PubkeyMismatch { claimed: String, signer: String },
}

/// Validation errors for signed events.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("event id mismatch: expected {expected}, got {got}")]
    IdMismatch { expected: EventId, got: EventId },
}
