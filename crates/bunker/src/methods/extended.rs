//! Opt-in methods beyond the built-in four.

use async_trait::async_trait;
use bunker_core::PublicKey;

use super::names;
use crate::backend::Backend;
use crate::error::HandlerError;
use crate::gate::PermissionRequest;
use crate::handler::{HandlerOutcome, MethodHandler};

/// Liveness check. Not gated.
pub struct Ping;

#[async_trait]
impl MethodHandler for Ping {
    async fn handle(&self, _backend: &Backend, _remote: &PublicKey, _params: &[String]) -> HandlerOutcome {
        HandlerOutcome::Respond("pong".to_string())
    }
}

/// Encrypt a plaintext from the custodied key to a third party.
///
/// Params: `[<peer hex>, <plaintext>]`. Gated.
pub struct Encrypt;

#[async_trait]
impl MethodHandler for Encrypt {
    async fn handle(&self, backend: &Backend, remote: &PublicKey, params: &[String]) -> HandlerOutcome {
        let (peer, plaintext) = match peer_and_payload(params) {
            Ok(parsed) => parsed,
            Err(e) => return HandlerOutcome::Failed(e),
        };

        let request = PermissionRequest::new(*remote, names::ENCRYPT).with_peer(peer);
        if !backend.authorize(&request).await {
            return HandlerOutcome::Failed(HandlerError::Denied {
                method: names::ENCRYPT.to_string(),
            });
        }

        backend
            .signer()
            .encrypt_as_self(&peer, plaintext)
            .map_err(HandlerError::from)
            .into()
    }
}

/// Decrypt a payload a third party sent to the custodied key.
///
/// Params: `[<peer hex>, <ciphertext>]`. Gated.
pub struct Decrypt;

#[async_trait]
impl MethodHandler for Decrypt {
    async fn handle(&self, backend: &Backend, remote: &PublicKey, params: &[String]) -> HandlerOutcome {
        let (peer, ciphertext) = match peer_and_payload(params) {
            Ok(parsed) => parsed,
            Err(e) => return HandlerOutcome::Failed(e),
        };

        let request = PermissionRequest::new(*remote, names::DECRYPT).with_peer(peer);
        if !backend.authorize(&request).await {
            return HandlerOutcome::Failed(HandlerError::Denied {
                method: names::DECRYPT.to_string(),
            });
        }

        backend
            .signer()
            .decrypt_as_self(&peer, ciphertext)
            .map_err(HandlerError::from)
            .into()
    }
}

fn peer_and_payload(params: &[String]) -> Result<(PublicKey, &str), HandlerError> {
    match params {
        [peer, payload] => {
            let peer = PublicKey::from_hex(peer)
                .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;
            Ok((peer, payload.as_str()))
        }
        _ => Err(HandlerError::InvalidParams(format!(
            "expected [peer, payload], got {} params",
            params.len()
        ))),
    }
}
