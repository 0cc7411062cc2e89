//! Subscription filters.

use bunker_core::{Event, PublicKey};
use serde::Serialize;

/// Selects which events a subscription receives.
///
/// Every populated field must match; an empty filter matches everything.
/// Serializes in the relay wire shape (`kinds`, `authors`, `#p`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<PublicKey>>,

    /// Recipients named in `p` tags.
    #[serde(rename = "#p", skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<PublicKey>>,
}

impl Filter {
    /// An empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept events of this kind.
    pub fn kind(mut self, kind: u16) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    /// Also accept events from this author.
    pub fn author(mut self, author: PublicKey) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(author);
        self
    }

    /// Also accept events addressed to this recipient.
    pub fn recipient(mut self, recipient: PublicKey) -> Self {
        self.recipients.get_or_insert_with(Vec::new).push(recipient);
        self
    }

    /// Check whether an event passes the filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }

        if let Some(authors) = &self.authors {
            if !authors.contains(&event.pubkey) {
                return false;
            }
        }

        if let Some(recipients) = &self.recipients {
            if !recipients.iter().any(|r| event.is_addressed_to(r)) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunker_core::{Keypair, UnsignedEvent};

    fn event_to(author: &Keypair, kind: u16, recipient: &PublicKey) -> Event {
        UnsignedEvent::new(kind, "")
            .tag(["p".to_string(), recipient.to_hex()])
            .sign(author)
            .unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let author = Keypair::generate();
        let event = event_to(&author, 1, &Keypair::generate().public_key());
        assert!(Filter::new().matches(&event));
    }

    #[test]
    fn test_kind_and_recipient() {
        let author = Keypair::generate();
        let me = Keypair::generate().public_key();
        let someone_else = Keypair::generate().public_key();

        let filter = Filter::new().kind(24133).recipient(me);

        assert!(filter.matches(&event_to(&author, 24133, &me)));
        assert!(!filter.matches(&event_to(&author, 1, &me)));
        assert!(!filter.matches(&event_to(&author, 24133, &someone_else)));
    }

    #[test]
    fn test_author() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let target = Keypair::generate().public_key();

        let filter = Filter::new().author(alice.public_key());
        assert!(filter.matches(&event_to(&alice, 1, &target)));
        assert!(!filter.matches(&event_to(&bob, 1, &target)));
    }

    #[test]
    fn test_wire_shape() {
        let me = PublicKey::from_bytes([0x11; 32]);
        let json = serde_json::to_value(Filter::new().kind(24133).recipient(me)).unwrap();

        assert_eq!(json["kinds"][0], 24133);
        assert_eq!(json["#p"][0], me.to_hex());
        assert!(json.get("authors").is_none());
    }
}
