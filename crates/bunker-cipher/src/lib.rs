//! # Bunker Cipher
//!
//! Encryption of envelope payloads between two identities.
//!
//! ## Encryption Model
//!
//! 1. **Key agreement**: each party's Ed25519 identity maps onto Curve25519;
//!    X25519 between the local secret and the peer's public key gives the same
//!    shared secret in both directions.
//! 2. **Conversation key**: the shared secret goes through Blake3 `derive_key`
//!    under a fixed context, so keys from this protocol are never reused
//!    elsewhere.
//! 3. **Payload**: ChaCha20-Poly1305 with a random nonce per message, framed as
//!    `hex(version || nonce || ciphertext)`.
//!
//! ## Usage
//!
//! ```rust
//! use bunker_cipher::{decrypt, encrypt};
//! use bunker_core::Keypair;
//!
//! let alice = Keypair::generate();
//! let bob = Keypair::generate();
//!
//! let payload = encrypt(&alice, &bob.public_key(), b"hello").unwrap();
//! let plaintext = decrypt(&bob, &alice.public_key(), &payload).unwrap();
//! assert_eq!(plaintext, b"hello");
//! ```

pub mod agreement;
pub mod error;
pub mod payload;

pub use agreement::{ConversationKey, EncryptionNonce};
pub use error::{CipherError, Result};
pub use payload::{decrypt, encrypt, EncryptedPayload, PAYLOAD_VERSION};
