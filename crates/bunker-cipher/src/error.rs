//! Error types for envelope encryption.

use thiserror::Error;

/// Errors that can occur while encrypting or decrypting payloads.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error (wrong key or tampered ciphertext).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Key agreement error.
    #[error("key agreement error: {0}")]
    KeyAgreementError(String),

    /// Payload framing error.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Unknown payload version.
    #[error("unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] bunker_core::CoreError),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;
