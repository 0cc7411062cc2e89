//! Events: the signed unit carried by the network.
//!
//! An [`UnsignedEvent`] is what a remote client submits for signing. Signing
//! fixes the author, computes the content-addressed id, and produces an
//! [`Event`] whose signature anyone can check against the author's key.

use serde::{Deserialize, Serialize};

use crate::canonical::compute_event_id;
use crate::crypto::{Keypair, PublicKey, Signature};
use crate::error::{CoreError, ValidationError};
use crate::types::EventId;
use crate::validation::verify_event;

/// A tag: a name followed by positional values, e.g. `["p", "<hex>"]`.
pub type Tag = Vec<String>;

/// Kind of the events that carry remote-signing envelopes.
pub const KIND_REMOTE_SIGNING: u16 = 24133;

/// Event fields awaiting a signature.
///
/// `pubkey` is optional; when present it must name the signing key. A
/// missing `created_at` means "now". Unknown JSON fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    #[serde(default = "now_secs")]
    pub created_at: u64,
    pub kind: u16,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// Start an event of the given kind, timestamped now.
    pub fn new(kind: u16, content: impl Into<String>) -> Self {
        Self {
            pubkey: None,
            created_at: now_secs(),
            kind,
            tags: Vec::new(),
            content: content.into(),
        }
    }

    /// Set the timestamp.
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Append a tag.
    pub fn tag<I, S>(mut self, tag: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(tag.into_iter().map(Into::into).collect());
        self
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::MalformedEvent(e.to_string()))
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("event serialization failed")
    }

    /// Sign with the given keypair.
    ///
    /// Fails if the event names a different author.
    pub fn sign(self, keypair: &Keypair) -> Result<Event, CoreError> {
        let signer = keypair.public_key();
        if let Some(claimed) = self.pubkey {
            if claimed != signer {
                return Err(CoreError::PubkeyMismatch {
                    claimed: claimed.to_hex(),
                    signer: signer.to_hex(),
                });
            }
        }

        let id = compute_event_id(&signer, self.created_at, self.kind, &self.tags, &self.content);
        let sig = keypair.sign(id.as_bytes());

        Ok(Event {
            id,
            pubkey: signer,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}

/// A signed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: Signature,
}

impl Event {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::MalformedEvent(e.to_string()))
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("event serialization failed")
    }

    /// Check the id and signature.
    pub fn verify(&self) -> Result<(), ValidationError> {
        verify_event(self)
    }

    /// First value of every tag named `name`.
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }

    /// Whether a `p` tag addresses `recipient`.
    pub fn is_addressed_to(&self, recipient: &PublicKey) -> bool {
        let hex = recipient.to_hex();
        self.tag_values("p").any(|value| value == hex)
    }
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
