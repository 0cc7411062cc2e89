//! # Bunker Core
//!
//! Pure primitives for bunker: identities, signatures, and signed events.
//!
//! This crate contains no I/O and no networking. It is pure computation
//! over the event object model that the remote-signing protocol carries.
//!
//! ## Key Types
//!
//! - [`PublicKey`] - A party's identity (Ed25519 verifying key, hex on the wire)
//! - [`Keypair`] - The custodied secret used to sign events
//! - [`UnsignedEvent`] - Event fields as submitted for signing
//! - [`Event`] - A signed, verifiable event
//! - [`EventId`] - Content-addressed identifier (Blake3 of the canonical form)
//!
//! ## Canonicalization
//!
//! Event ids are computed over a canonical JSON array. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod types;
pub mod validation;

pub use canonical::{canonical_json, compute_event_id};
pub use crypto::{Keypair, PublicKey, Signature};
pub use error::{CoreError, ValidationError};
pub use event::{now_secs, Event, Tag, UnsignedEvent, KIND_REMOTE_SIGNING};
pub use types::EventId;
pub use validation::verify_event;
