//! The requesting side of the protocol.
//!
//! A [`RemoteSignerClient`] holds its own throwaway identity, sends encrypted
//! requests to a bunker and matches responses back to callers by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bunker_core::{Event, Keypair, PublicKey, UnsignedEvent, KIND_REMOTE_SIGNING};
use bunker_relay::{Filter, Transport};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::envelope::{self, Envelope, Reply};
use crate::error::{BunkerError, Result};
use crate::methods::names;
use crate::signer::{KeypairSigner, LocalSigner};

/// Default time to wait for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Reply>>>>;

/// Client for a remote bunker.
pub struct RemoteSignerClient {
    signer: Arc<KeypairSigner>,
    remote: PublicKey,
    transport: Arc<dyn Transport>,
    pending: Pending,
    timeout: Duration,
    listener: JoinHandle<()>,
}

impl RemoteSignerClient {
    /// Subscribe to responses from `remote` and return a ready client.
    pub async fn connect_to(
        keypair: Keypair,
        remote: PublicKey,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let signer = Arc::new(KeypairSigner::new(keypair));
        let filter = Filter::new()
            .kind(KIND_REMOTE_SIGNING)
            .author(remote)
            .recipient(signer.identity());
        let mut subscription = transport.subscribe(filter).await?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listener = {
            let signer = Arc::clone(&signer);
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                while let Some(event) = subscription.next().await {
                    if let Err(e) = event.verify() {
                        warn!(id = %event.id, error = %e, "discarding invalid response event");
                        continue;
                    }
                    let response = match envelope::decode(&event.content, &event.pubkey, signer.as_ref()) {
                        Ok(Envelope::Response(response)) => response,
                        Ok(Envelope::Request(_)) => continue,
                        Err(e) => {
                            warn!(error = %e, "discarding undecodable response");
                            continue;
                        }
                    };
                    match pending.lock().await.remove(&response.id) {
                        Some(waiter) => {
                            let _ = waiter.send(response.reply);
                        }
                        None => debug!(id = %response.id, "response with no waiting request"),
                    }
                }
            })
        };

        Ok(Self {
            signer,
            remote,
            transport,
            pending,
            timeout: DEFAULT_TIMEOUT,
            listener,
        })
    }

    /// Change the timeout used by the convenience methods.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// This client's identity.
    pub fn identity(&self) -> PublicKey {
        self.signer.identity()
    }

    /// The bunker this client talks to.
    pub fn remote(&self) -> PublicKey {
        self.remote
    }

    /// Send a request and wait for its response.
    ///
    /// Each request carries a fresh random id. A bunker that silently drops
    /// the request surfaces here as [`BunkerError::Timeout`].
    pub async fn request(
        &self,
        method: &str,
        params: impl IntoIterator<Item = impl Into<String>>,
        timeout: Duration,
    ) -> Result<String> {
        let id = hex::encode(rand::random::<[u8; 16]>());
        let request = Envelope::request(id.clone(), method, params);
        let event = envelope::seal(&request, &self.remote, self.signer.as_ref())?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.transport.publish(event).await {
            self.pending.lock().await.remove(&id);
            return Err(e.into());
        }
        debug!(id = %id, method, "request sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Reply::Result(result))) => Ok(result),
            Ok(Ok(Reply::Error(error))) => Err(BunkerError::Remote(error)),
            Ok(Err(_)) => Err(BunkerError::ClientClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(BunkerError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    /// Pair with the bunker.
    pub async fn connect(&self) -> Result<()> {
        self.request(names::CONNECT, no_params(), self.timeout).await?;
        Ok(())
    }

    /// Ask for the custodied identity.
    pub async fn get_public_key(&self) -> Result<PublicKey> {
        let hex = self
            .request(names::GET_PUBLIC_KEY, no_params(), self.timeout)
            .await?;
        PublicKey::from_hex(&hex).map_err(|e| BunkerError::InvalidResponse(e.to_string()))
    }

    /// Have the bunker sign an event. The returned event is verified and
    /// must be authored by the bunker's identity.
    pub async fn sign_event(&self, unsigned: &UnsignedEvent) -> Result<Event> {
        let json = self
            .request(names::SIGN_EVENT, [unsigned.to_json()], self.timeout)
            .await?;
        let event =
            Event::from_json(&json).map_err(|e| BunkerError::InvalidResponse(e.to_string()))?;
        event
            .verify()
            .map_err(|e| BunkerError::InvalidResponse(e.to_string()))?;
        if event.pubkey != self.remote {
            return Err(BunkerError::InvalidResponse(format!(
                "signed by {} instead of {}",
                event.pubkey.short(),
                self.remote.short()
            )));
        }
        Ok(event)
    }

    /// List the methods the bunker serves.
    pub async fn describe(&self) -> Result<Vec<String>> {
        let json = self
            .request(names::DESCRIBE, no_params(), self.timeout)
            .await?;
        serde_json::from_str(&json).map_err(|e| BunkerError::InvalidResponse(e.to_string()))
    }

    /// Liveness check.
    pub async fn ping(&self) -> Result<()> {
        self.request(names::PING, no_params(), self.timeout).await?;
        Ok(())
    }

    /// Have the bunker encrypt `plaintext` to `peer`.
    pub async fn encrypt(&self, peer: &PublicKey, plaintext: &str) -> Result<String> {
        self.request(names::ENCRYPT, [peer.to_hex(), plaintext.to_string()], self.timeout)
            .await
    }

    /// Have the bunker decrypt a payload `peer` sent to it.
    pub async fn decrypt(&self, peer: &PublicKey, ciphertext: &str) -> Result<String> {
        self.request(names::DECRYPT, [peer.to_hex(), ciphertext.to_string()], self.timeout)
            .await
    }
}

impl Drop for RemoteSignerClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn no_params() -> Vec<String> {
    Vec::new()
}
