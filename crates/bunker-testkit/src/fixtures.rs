//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bunker::gate::{PermissionGate, PermissionRequest};
use bunker::{
    Backend, BackendConfig, BackendHandle, KeypairSigner, LocalSigner, RemoteSignerClient,
    SignerError,
};
use bunker_core::{Event, Keypair, PublicKey, UnsignedEvent};
use bunker_relay::MemoryRelay;

/// Timeout used by fixture clients when a response is expected.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout used when asserting that no response arrives.
pub const SILENCE_TIMEOUT: Duration = Duration::from_millis(300);

/// The bunker's deterministic keypair.
pub fn bunker_keypair() -> Keypair {
    Keypair::from_seed(&[7u8; 32])
}

/// A deterministic client keypair; distinct `n` give distinct identities.
pub fn client_keypair(n: u8) -> Keypair {
    let mut seed = [0x42u8; 32];
    seed[0] = n;
    Keypair::from_seed(&seed)
}

/// Install a test-writer subscriber once. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Instrumented collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// A signer that counts privileged signatures.
///
/// Envelope wrapping goes through `sign_envelope` and is not counted.
pub struct CountingSigner {
    inner: KeypairSigner,
    signs: AtomicUsize,
}

impl CountingSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            inner: KeypairSigner::new(keypair),
            signs: AtomicUsize::new(0),
        }
    }

    /// Number of events signed on a client's behalf so far.
    pub fn sign_count(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }
}

impl LocalSigner for CountingSigner {
    fn identity(&self) -> PublicKey {
        self.inner.identity()
    }

    fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(unsigned)
    }

    fn sign_envelope(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.inner.sign_envelope(unsigned)
    }

    fn encrypt_as_self(&self, recipient: &PublicKey, plaintext: &str) -> Result<String, SignerError> {
        self.inner.encrypt_as_self(recipient, plaintext)
    }

    fn decrypt_as_self(&self, sender: &PublicKey, ciphertext: &str) -> Result<String, SignerError> {
        self.inner.decrypt_as_self(sender, ciphertext)
    }
}

/// A gate with a fixed answer that records every question.
pub struct RecordingGate {
    decision: bool,
    requests: Mutex<Vec<PermissionRequest>>,
}

impl RecordingGate {
    pub fn allowing() -> Self {
        Self::new(true)
    }

    pub fn denying() -> Self {
        Self::new(false)
    }

    fn new(decision: bool) -> Self {
        Self {
            decision,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<PermissionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PermissionGate for RecordingGate {
    async fn allow(&self, request: &PermissionRequest) -> anyhow::Result<bool> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.decision)
    }
}

/// A gate that never answers, like a prompt nobody clicks.
#[derive(Default)]
pub struct PendingGate {
    queries: AtomicUsize,
}

impl PendingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of questions currently (and forever) outstanding.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for PendingGate {
    async fn allow(&self, _request: &PermissionRequest) -> anyhow::Result<bool> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(false)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Running bunker
// ─────────────────────────────────────────────────────────────────────────────

/// A backend served over an in-memory relay.
pub struct TestBunker {
    pub relay: Arc<MemoryRelay>,
    pub signer: Arc<CountingSigner>,
    pub backend: Arc<Backend>,
    handle: Option<BackendHandle>,
}

impl TestBunker {
    /// Start a bunker with the default configuration.
    pub async fn start(gate: Arc<dyn PermissionGate>) -> Self {
        Self::start_with(gate, BackendConfig::default()).await
    }

    /// Start a bunker with the given configuration.
    pub async fn start_with(gate: Arc<dyn PermissionGate>, config: BackendConfig) -> Self {
        let relay = MemoryRelay::new();
        let signer = Arc::new(CountingSigner::new(bunker_keypair()));
        let backend = Arc::new(Backend::new(signer.clone(), relay.clone(), gate, config));
        let handle = backend.spawn().await.expect("backend failed to start");
        Self {
            relay,
            signer,
            backend,
            handle: Some(handle),
        }
    }

    /// The bunker's identity.
    pub fn identity(&self) -> PublicKey {
        self.backend.identity()
    }

    /// A client with a fresh identity.
    pub async fn client(&self) -> RemoteSignerClient {
        self.client_with(Keypair::generate()).await
    }

    /// A client with the given identity.
    pub async fn client_with(&self, keypair: Keypair) -> RemoteSignerClient {
        RemoteSignerClient::connect_to(keypair, self.identity(), self.relay.clone())
            .await
            .expect("client failed to subscribe")
            .with_timeout(RESPONSE_TIMEOUT)
    }

    /// Events the bunker has published.
    pub async fn responses(&self) -> Vec<Event> {
        let me = self.identity();
        self.relay
            .published()
            .await
            .into_iter()
            .filter(|event| event.pubkey == me)
            .collect()
    }

    /// Stop the backend.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_keys() {
        assert_eq!(bunker_keypair().public_key(), bunker_keypair().public_key());
        assert_eq!(client_keypair(1).public_key(), client_keypair(1).public_key());
        assert_ne!(client_keypair(1).public_key(), client_keypair(2).public_key());
        assert_ne!(client_keypair(1).public_key(), bunker_keypair().public_key());
    }

    #[test]
    fn test_counting_signer_counts() {
        let signer = CountingSigner::new(client_keypair(1));
        assert_eq!(signer.sign_count(), 0);
        signer.sign(UnsignedEvent::new(1, "a")).unwrap();
        signer.sign(UnsignedEvent::new(1, "b")).unwrap();
        assert_eq!(signer.sign_count(), 2);

        signer
            .sign_envelope(UnsignedEvent::new(24133, "wrapping"))
            .unwrap();
        assert_eq!(signer.sign_count(), 2);
    }

    #[tokio::test]
    async fn test_recording_gate() {
        let gate = RecordingGate::denying();
        let request = PermissionRequest::new(client_keypair(1).public_key(), "sign-event");
        assert!(!gate.allow(&request).await.unwrap());
        assert_eq!(gate.requests(), vec![request]);
    }

    #[tokio::test]
    async fn test_pending_gate_never_answers() {
        let gate = PendingGate::new();
        let request = PermissionRequest::new(client_keypair(1).public_key(), "sign-event");
        let result = tokio::time::timeout(SILENCE_TIMEOUT, gate.allow(&request)).await;
        assert!(result.is_err());
        assert_eq!(gate.query_count(), 1);
    }
}
