//! Canonical event serialization.
//!
//! The event id commits to exactly these fields, in this order:
//!
//! ```text
//! [0, <pubkey hex>, <created_at>, <kind>, <tags>, <content>]
//! ```
//!
//! serialized as compact JSON (no whitespace). The leading `0` is a format
//! version. Anything not in the array (id, sig, unknown fields) is not
//! covered by the signature.

use serde_json::json;

use crate::crypto::PublicKey;
use crate::event::Tag;
use crate::types::EventId;

/// Canonical JSON preimage of an event id.
pub fn canonical_json(
    pubkey: &PublicKey,
    created_at: u64,
    kind: u16,
    tags: &[Tag],
    content: &str,
) -> String {
    json!([0, pubkey.to_hex(), created_at, kind, tags, content]).to_string()
}

/// Compute the event id over the canonical form.
pub fn compute_event_id(
    pubkey: &PublicKey,
    created_at: u64,
    kind: u16,
    tags: &[Tag],
    content: &str,
) -> EventId {
    let preimage = canonical_json(pubkey, created_at, kind, tags, content);
    EventId::digest(&preimage)
}
