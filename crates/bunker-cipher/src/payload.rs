//! Encrypted payload framing.
//!
//! On the wire a payload is a hex string over:
//!
//! ```text
//! version (1 byte) || nonce (12 bytes) || ciphertext + tag (>= 16 bytes)
//! ```

use bunker_core::{Keypair, PublicKey};

use crate::agreement::{ConversationKey, EncryptionNonce};
use crate::error::{CipherError, Result};

/// Current payload format version.
pub const PAYLOAD_VERSION: u8 = 1;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A decoded (still encrypted) payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Format version.
    pub version: u8,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Encrypt plaintext with the given key.
    pub fn seal(plaintext: &[u8], key: &ConversationKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            version: PAYLOAD_VERSION,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the given key.
    pub fn open(&self, key: &ConversationKey) -> Result<Vec<u8>> {
        match self.version {
            PAYLOAD_VERSION => key.decrypt(&self.ciphertext, &self.nonce),
            other => Err(CipherError::UnsupportedVersion(other)),
        }
    }

    /// Encode to the hex wire form.
    pub fn to_hex(&self) -> String {
        let mut buf = Vec::with_capacity(1 + NONCE_LEN + self.ciphertext.len());
        buf.push(self.version);
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(&self.ciphertext);
        hex::encode(buf)
    }

    /// Decode from the hex wire form.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CipherError::MalformedPayload(e.to_string()))?;

        if bytes.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CipherError::MalformedPayload(format!(
                "payload too short: {} bytes",
                bytes.len()
            )));
        }

        let version = bytes[0];
        if version != PAYLOAD_VERSION {
            return Err(CipherError::UnsupportedVersion(version));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1..1 + NONCE_LEN]);

        Ok(Self {
            version,
            nonce: EncryptionNonce::from_bytes(nonce),
            ciphertext: bytes[1 + NONCE_LEN..].to_vec(),
        })
    }
}

/// Encrypt `plaintext` from `local` to `peer`, returning the wire form.
pub fn encrypt(local: &Keypair, peer: &PublicKey, plaintext: &[u8]) -> Result<String> {
    let key = ConversationKey::derive(local, peer)?;
    Ok(EncryptedPayload::seal(plaintext, &key)?.to_hex())
}

/// Decrypt a wire-form payload that `peer` sent to `local`.
pub fn decrypt(local: &Keypair, peer: &PublicKey, payload: &str) -> Result<Vec<u8>> {
    let payload = EncryptedPayload::from_hex(payload)?;
    let key = ConversationKey::derive(local, peer)?;
    payload.open(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pairwise_roundtrip() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let wire = encrypt(&alice, &bob.public_key(), b"hello, encrypted world!").unwrap();
        let plaintext = decrypt(&bob, &alice.public_key(), &wire).unwrap();

        assert_eq!(plaintext, b"hello, encrypted world!");
    }

    #[test]
    fn test_fresh_nonce_per_message() {
        let alice = Keypair::generate();
        let bob = Keypair::generate().public_key();

        let a = encrypt(&alice, &bob, b"same").unwrap();
        let b = encrypt(&alice, &bob, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_third_party_cannot_decrypt() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let eve = Keypair::generate();

        let wire = encrypt(&alice, &bob.public_key(), b"secret").unwrap();

        assert!(matches!(
            decrypt(&eve, &alice.public_key(), &wire),
            Err(CipherError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_spoofed_sender_fails() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let mallory = Keypair::generate();

        // Mallory encrypts to Bob but Bob believes it came from Alice.
        let wire = encrypt(&mallory, &bob.public_key(), b"sign this").unwrap();
        assert!(decrypt(&bob, &alice.public_key(), &wire).is_err());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let wire = encrypt(&alice, &bob.public_key(), b"secret").unwrap();
        let mut bytes = hex::decode(&wire).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        assert!(decrypt(&bob, &alice.public_key(), &hex::encode(bytes)).is_err());
    }

    #[test]
    fn test_malformed_framing() {
        assert!(matches!(
            EncryptedPayload::from_hex("not hex"),
            Err(CipherError::MalformedPayload(_))
        ));
        assert!(matches!(
            EncryptedPayload::from_hex("01abcd"),
            Err(CipherError::MalformedPayload(_))
        ));

        let mut bytes = vec![9u8];
        bytes.extend_from_slice(&[0u8; 40]);
        assert!(matches!(
            EncryptedPayload::from_hex(&hex::encode(bytes)),
            Err(CipherError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_invalid_peer_key() {
        let alice = Keypair::generate();
        // The Edwards identity: a small-order point with no usable key.
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        let bogus = PublicKey::from_bytes(bytes);
        assert!(encrypt(&alice, &bogus, b"x").is_err());
    }

    proptest! {
        #[test]
        fn decrypt_never_panics(input in ".*") {
            let bob = Keypair::from_seed(&[3u8; 32]);
            let alice = Keypair::from_seed(&[4u8; 32]).public_key();
            let _ = decrypt(&bob, &alice, &input);
        }
    }
}
