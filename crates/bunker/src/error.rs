//! Error types for the bunker backend.

use bunker_cipher::CipherError;
use bunker_core::CoreError;
use bunker_relay::RelayError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during backend and client operations.
#[derive(Debug, Error)]
pub enum BunkerError {
    /// Relay error.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    /// Signer error.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// Envelope decode error.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Envelope could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No response arrived in time.
    #[error("timed out waiting for {method} response")]
    Timeout { method: String },

    /// The remote side answered with an error reply.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote side answered with something unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The client was shut down while a request was pending.
    #[error("client closed")]
    ClientClosed,
}

/// Errors from the local signer.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Event construction or signing failed.
    #[error("signing failed: {0}")]
    Signing(#[from] CoreError),

    /// Encryption or decryption failed.
    #[error("cipher failure: {0}")]
    Cipher(#[from] CipherError),

    /// Decrypted bytes are not UTF-8.
    #[error("plaintext is not valid UTF-8")]
    InvalidUtf8,
}

/// Where envelope decoding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Decryption (bad framing, wrong key, tampering).
    Decrypt,
    /// JSON parsing.
    Parse,
    /// Required fields missing or contradictory.
    Structure,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeStage::Decrypt => "decrypt",
            DecodeStage::Parse => "parse",
            DecodeStage::Structure => "structure",
        };
        f.write_str(s)
    }
}

/// An inbound envelope could not be decoded.
///
/// One kind for every failure mode; the stage and detail exist for logs
/// only and are never sent back to the sender.
#[derive(Debug, Error)]
#[error("envelope decode failed at {stage}: {detail}")]
pub struct DecodeError {
    pub stage: DecodeStage,
    pub detail: String,
}

impl DecodeError {
    pub(crate) fn new(stage: DecodeStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }
}

/// Why a handler produced no result. Logged, never transmitted.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Wrong number or shape of parameters.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The event payload could not be parsed.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The permission gate refused (or failed, which counts as refusal).
    #[error("permission denied for {method}")]
    Denied { method: String },

    /// The local signer failed for this request.
    #[error("signer failure: {0}")]
    Signer(#[from] SignerError),
}

/// Result type for bunker operations.
pub type Result<T> = std::result::Result<T, BunkerError>;
