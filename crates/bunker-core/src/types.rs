//! Event identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::decode_hex_array;

/// The id of an event: blake3 of its canonical JSON preimage.
///
/// Signatures cover these 32 bytes, not the JSON. On the wire it is
/// lowercase hex; `Display` prints the first 16 hex characters for logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId([u8; 32]);

impl EventId {
    /// Hash a canonical preimage.
    pub fn digest(preimage: &str) -> Self {
        Self(*blake3::hash(preimage.as_bytes()).as_bytes())
    }

    /// The bytes a signature commits to.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        decode_hex_array::<32>(s).map(Self)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({self})")
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..16])
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_blake3() {
        let id = EventId::digest("[0]");
        assert_eq!(id.as_bytes(), blake3::hash(b"[0]").as_bytes());
        assert_ne!(id, EventId::digest("[1]"));
    }

    #[test]
    fn test_wire_form_is_full_hex() {
        let id = EventId::digest("x");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        assert_eq!(serde_json::from_str::<EventId>(&json).unwrap(), id);
    }

    #[test]
    fn test_display_is_short() {
        let id = EventId::digest("x");
        assert_eq!(id.to_string().len(), 16);
        assert!(id.to_hex().starts_with(&id.to_string()));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(EventId::from_hex("abcd").is_err());
    }
}
