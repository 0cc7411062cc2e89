//! Proptest generators for property-based testing.

use proptest::prelude::*;

use bunker::Envelope;
use bunker_core::{Keypair, PublicKey, Tag, UnsignedEvent};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random PublicKey.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a reasonable timestamp (seconds).
pub fn timestamp() -> impl Strategy<Value = u64> {
    0u64..=4_102_444_800
}

/// Generate a tag: a short name and up to three values.
pub fn tag() -> impl Strategy<Value = Tag> {
    ("[a-z]{1,2}", prop::collection::vec(".{0,16}", 0..=3)).prop_map(|(name, values)| {
        let mut tag = vec![name];
        tag.extend(values);
        tag
    })
}

/// Parameters for an unsigned event.
#[derive(Debug, Clone)]
pub struct UnsignedEventParams {
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl Arbitrary for UnsignedEventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            timestamp(),
            any::<u16>(),
            prop::collection::vec(tag(), 0..4),
            ".{0,64}",
        )
            .prop_map(|(created_at, kind, tags, content)| UnsignedEventParams {
                created_at,
                kind,
                tags,
                content,
            })
            .boxed()
    }
}

/// Build an unsigned event from params.
pub fn unsigned_event(params: &UnsignedEventParams) -> UnsignedEvent {
    UnsignedEvent {
        pubkey: None,
        created_at: params.created_at,
        kind: params.kind,
        tags: params.tags.clone(),
        content: params.content.clone(),
    }
}

/// Generate a method name.
pub fn method_name() -> impl Strategy<Value = String> {
    "[a-z][a-z-]{0,15}"
}

/// Generate a request envelope.
pub fn request_envelope() -> impl Strategy<Value = Envelope> {
    (
        "[0-9a-f]{1,32}",
        method_name(),
        prop::collection::vec(".{0,32}", 0..4),
    )
        .prop_map(|(id, method, params)| Envelope::request(id, method, params))
}

/// Generate a response envelope.
pub fn response_envelope() -> impl Strategy<Value = Envelope> {
    ("[0-9a-f]{1,32}", ".{0,64}", any::<bool>()).prop_map(|(id, value, ok)| {
        if ok {
            Envelope::result(id, value)
        } else {
            Envelope::error(id, value)
        }
    })
}
