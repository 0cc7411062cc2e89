//! The built-in methods.

use async_trait::async_trait;
use bunker_core::{PublicKey, UnsignedEvent};
use serde_json::json;
use tracing::debug;

use super::names;
use crate::backend::Backend;
use crate::error::HandlerError;
use crate::gate::PermissionRequest;
use crate::handler::{HandlerOutcome, MethodHandler};

/// Acknowledges a pairing request. Not gated; approving the pairing, if
/// wanted, is up to the embedding application.
pub struct Connect;

#[async_trait]
impl MethodHandler for Connect {
    async fn handle(&self, _backend: &Backend, remote: &PublicKey, _params: &[String]) -> HandlerOutcome {
        debug!(remote = %remote.short(), "connect acknowledged");
        HandlerOutcome::Respond("ack".to_string())
    }
}

/// Discloses the custodied identity. Not gated.
pub struct GetPublicKey;

#[async_trait]
impl MethodHandler for GetPublicKey {
    async fn handle(&self, backend: &Backend, _remote: &PublicKey, _params: &[String]) -> HandlerOutcome {
        HandlerOutcome::Respond(backend.identity().to_hex())
    }
}

/// Lists registered method names as a JSON array. Not gated.
pub struct Describe;

#[async_trait]
impl MethodHandler for Describe {
    async fn handle(&self, backend: &Backend, _remote: &PublicKey, _params: &[String]) -> HandlerOutcome {
        let methods = backend.registry().methods().await;
        HandlerOutcome::Respond(json!(methods).to_string())
    }
}

/// Signs an event with the custodied key, if the gate allows.
///
/// Params: `[<unsigned event JSON>]`. The result is the signed event JSON.
pub struct SignEvent;

#[async_trait]
impl MethodHandler for SignEvent {
    async fn handle(&self, backend: &Backend, remote: &PublicKey, params: &[String]) -> HandlerOutcome {
        let Some(raw) = params.first() else {
            return HandlerOutcome::Failed(HandlerError::InvalidParams(
                "expected one event parameter".into(),
            ));
        };

        let unsigned = match UnsignedEvent::from_json(raw) {
            Ok(event) => event,
            Err(e) => return HandlerOutcome::Failed(HandlerError::MalformedEvent(e.to_string())),
        };

        let request = PermissionRequest::new(*remote, names::SIGN_EVENT).with_event(unsigned.clone());
        if !backend.authorize(&request).await {
            return HandlerOutcome::Failed(HandlerError::Denied {
                method: names::SIGN_EVENT.to_string(),
            });
        }

        match backend.signer().sign(unsigned) {
            Ok(event) => {
                debug!(remote = %remote.short(), id = %event.id, kind = event.kind, "event signed");
                HandlerOutcome::Respond(event.to_json())
            }
            Err(e) => HandlerOutcome::Failed(HandlerError::Signer(e)),
        }
    }
}
