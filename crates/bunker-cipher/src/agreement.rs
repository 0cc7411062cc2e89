//! Key agreement between two identities.
//!
//! Provides X25519 over the parties' Ed25519 keys and ChaCha20-Poly1305
//! authenticated encryption under the derived conversation key.

use bunker_core::{Keypair, PublicKey};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use x25519_dalek::StaticSecret;

use crate::error::{CipherError, Result};

/// Blake3 derive-key context for conversation keys.
const CONVERSATION_KEY_CONTEXT: &str = "bunker-v1 2024 conversation key";

/// A symmetric key shared by exactly two identities.
///
/// Derived identically by both sides: `derive(a, B) == derive(b, A)`.
#[derive(Clone)]
pub struct ConversationKey([u8; 32]);

impl ConversationKey {
    /// Derive the key shared between `local` and `peer`.
    ///
    /// Fails if the peer key is not a valid curve point or yields a
    /// non-contributory (all-zero) shared secret.
    pub fn derive(local: &Keypair, peer: &PublicKey) -> Result<Self> {
        let secret = StaticSecret::from(local.agreement_secret());
        let peer_x25519 = x25519_dalek::PublicKey::from(peer.to_x25519_bytes()?);

        let shared = secret.diffie_hellman(&peer_x25519);
        if !shared.was_contributory() {
            return Err(CipherError::KeyAgreementError(
                "non-contributory shared secret".into(),
            ));
        }

        let mut hasher = blake3::Hasher::new_derive_key(CONVERSATION_KEY_CONTEXT);
        hasher.update(shared.as_bytes());
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CipherError::EncryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CipherError::EncryptionError(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CipherError::DecryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CipherError::DecryptionError(e.to_string()))
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConversationKey(..)")
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}
