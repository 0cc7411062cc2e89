//! Envelope codec.
//!
//! An envelope is the JSON-RPC-like unit exchanged between a client and the
//! bunker:
//!
//! ```text
//! request:  {"id": "...", "method": "...", "params": ["...", ...]}
//! response: {"id": "...", "result": "..."}  or  {"id": "...", "error": "..."}
//! ```
//!
//! Field order is irrelevant and unknown fields are ignored. The serialized
//! envelope is encrypted between the two parties and travels as the content
//! of a [`KIND_REMOTE_SIGNING`] event tagged with the recipient.

use bunker_core::{Event, PublicKey, UnsignedEvent, KIND_REMOTE_SIGNING};
use serde::{Deserialize, Serialize};

use crate::error::{BunkerError, DecodeError, DecodeStage, Result};
use crate::signer::LocalSigner;

/// A request naming a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub method: String,
    pub params: Vec<String>,
}

/// The payload of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Result(String),
    Error(String),
}

/// A response, correlated to its request by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: String,
    pub reply: Reply,
}

/// Either side of the exchange. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Request(Request),
    Response(Response),
}

impl Envelope {
    /// Build a request.
    pub fn request(
        id: impl Into<String>,
        method: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Envelope::Request(Request {
            id: id.into(),
            method: method.into(),
            params: params.into_iter().map(Into::into).collect(),
        })
    }

    /// Build a successful response.
    pub fn result(id: impl Into<String>, result: impl Into<String>) -> Self {
        Envelope::Response(Response {
            id: id.into(),
            reply: Reply::Result(result.into()),
        })
    }

    /// Build an error response.
    pub fn error(id: impl Into<String>, error: impl Into<String>) -> Self {
        Envelope::Response(Response {
            id: id.into(),
            reply: Reply::Error(error.into()),
        })
    }

    /// The correlation id.
    pub fn id(&self) -> &str {
        match self {
            Envelope::Request(r) => &r.id,
            Envelope::Response(r) => &r.id,
        }
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        let wire = match self {
            Envelope::Request(r) => WireEnvelope {
                id: Some(r.id.clone()),
                method: Some(r.method.clone()),
                params: Some(r.params.clone()),
                result: None,
                error: None,
            },
            Envelope::Response(r) => {
                let (result, error) = match &r.reply {
                    Reply::Result(v) => (Some(v.clone()), None),
                    Reply::Error(e) => (None, Some(e.clone())),
                };
                WireEnvelope {
                    id: Some(r.id.clone()),
                    method: None,
                    params: None,
                    result,
                    error,
                }
            }
        };
        serde_json::to_string(&wire).map_err(|e| BunkerError::Encoding(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, DecodeError> {
        let wire: WireEnvelope = serde_json::from_str(json)
            .map_err(|e| DecodeError::new(DecodeStage::Parse, e.to_string()))?;
        wire.into_envelope()
    }
}

/// The JSON shape, every field optional so structure is checked by hand.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WireEnvelope {
    fn into_envelope(self) -> std::result::Result<Envelope, DecodeError> {
        let structure = |detail: &str| DecodeError::new(DecodeStage::Structure, detail);

        let id = self.id.ok_or_else(|| structure("missing id"))?;

        match (self.method, self.result, self.error) {
            (Some(method), None, None) => Ok(Envelope::Request(Request {
                id,
                method,
                params: self.params.unwrap_or_default(),
            })),
            (None, Some(result), None) => Ok(Envelope::Response(Response {
                id,
                reply: Reply::Result(result),
            })),
            (None, None, Some(error)) => Ok(Envelope::Response(Response {
                id,
                reply: Reply::Error(error),
            })),
            (None, None, None) => Err(structure("neither method nor result/error")),
            (Some(_), _, _) => Err(structure("request carries a result or error")),
            (None, Some(_), Some(_)) => Err(structure("both result and error")),
        }
    }
}

/// Decrypt and parse an envelope `sender` sent to the holder of `recipient`.
pub fn decode(
    ciphertext: &str,
    sender: &PublicKey,
    recipient: &dyn LocalSigner,
) -> std::result::Result<Envelope, DecodeError> {
    let json = recipient
        .decrypt_as_self(sender, ciphertext)
        .map_err(|e| DecodeError::new(DecodeStage::Decrypt, e.to_string()))?;
    Envelope::from_json(&json)
}

/// Serialize and encrypt an envelope from the holder of `sender` to `recipient`.
pub fn encode(
    envelope: &Envelope,
    recipient: &PublicKey,
    sender: &dyn LocalSigner,
) -> Result<String> {
    let json = envelope.to_json()?;
    Ok(sender.encrypt_as_self(recipient, &json)?)
}

/// Encode an envelope and wrap it in a signed transport event addressed to
/// `recipient`.
pub fn seal(envelope: &Envelope, recipient: &PublicKey, sender: &dyn LocalSigner) -> Result<Event> {
    let content = encode(envelope, recipient, sender)?;
    let unsigned = UnsignedEvent::new(KIND_REMOTE_SIGNING, content)
        .tag(["p".to_string(), recipient.to_hex()]);
    Ok(sender.sign_envelope(unsigned)?)
}
