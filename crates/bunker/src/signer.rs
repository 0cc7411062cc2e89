//! The local signer: the only holder of the custodied key.

use bunker_core::{Event, Keypair, PublicKey, UnsignedEvent};

use crate::error::SignerError;

/// Operations the backend performs with the custodied key.
///
/// Implementations must be callable from many tasks at once. A signer built
/// on a non-reentrant primitive must serialize calls internally.
pub trait LocalSigner: Send + Sync {
    /// The identity this signer speaks for. Stable for the signer's lifetime.
    fn identity(&self) -> PublicKey;

    /// Sign an event on a remote party's behalf. Deterministic for a given
    /// key and input. This is the privileged operation the gate protects.
    fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError>;

    /// Sign the transport event that carries an envelope.
    ///
    /// Kept apart from [`sign`](Self::sign) so instrumentation and policy
    /// can tell protocol plumbing from signatures made for a client.
    fn sign_envelope(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.sign(unsigned)
    }

    /// Encrypt `plaintext` for `recipient`.
    fn encrypt_as_self(&self, recipient: &PublicKey, plaintext: &str)
        -> Result<String, SignerError>;

    /// Decrypt a payload `sender` encrypted for this identity.
    fn decrypt_as_self(&self, sender: &PublicKey, ciphertext: &str)
        -> Result<String, SignerError>;
}

/// A [`LocalSigner`] backed by an in-memory keypair.
pub struct KeypairSigner {
    keypair: Keypair,
    identity: PublicKey,
}

impl KeypairSigner {
    /// Take custody of a keypair.
    pub fn new(keypair: Keypair) -> Self {
        let identity = keypair.public_key();
        Self { keypair, identity }
    }

    /// Custody a freshly generated key.
    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeypairSigner({:?})", self.identity)
    }
}

impl LocalSigner for KeypairSigner {
    fn identity(&self) -> PublicKey {
        self.identity
    }

    fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        Ok(unsigned.sign(&self.keypair)?)
    }

    fn encrypt_as_self(
        &self,
        recipient: &PublicKey,
        plaintext: &str,
    ) -> Result<String, SignerError> {
        Ok(bunker_cipher::encrypt(&self.keypair, recipient, plaintext.as_bytes())?)
    }

    fn decrypt_as_self(&self, sender: &PublicKey, ciphertext: &str) -> Result<String, SignerError> {
        let bytes = bunker_cipher::decrypt(&self.keypair, sender, ciphertext)?;
        String::from_utf8(bytes).map_err(|_| SignerError::InvalidUtf8)
    }
}
