//! The Backend: receives encrypted requests, dispatches them to handlers,
//! and publishes responses.
//!
//! Every inbound transport event goes through the same pipeline:
//!
//! ```text
//! received -> decoded -> dispatched -> responded | dropped
//! ```
//!
//! Anything short of a handler result is dropped without a word to the
//! sender. A remote party cannot tell an undecryptable payload from an
//! unknown method, a denial, or a failed handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bunker_core::{Event, PublicKey, KIND_REMOTE_SIGNING};
use bunker_relay::{Filter, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, OverflowPolicy};
use crate::envelope::{self, Envelope};
use crate::error::{HandlerError, Result};
use crate::gate::{PermissionGate, PermissionRequest};
use crate::handler::{HandlerOutcome, MethodHandler, MethodRegistry};
use crate::methods;
use crate::signer::LocalSigner;

/// Why an inbound event produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not a remote-signing event.
    WrongKind,
    /// Published by this backend's own identity.
    OwnEvent,
    /// Id or signature of the transport event did not check out.
    InvalidEvent,
    /// The payload could not be decrypted or parsed.
    DecodeFailed,
    /// The envelope was a response, not a request.
    NotARequest,
    /// No handler is registered for the method.
    UnknownMethod,
    /// The permission gate refused.
    Denied,
    /// The handler chose not to answer.
    Declined,
    /// The handler failed.
    HandlerFailed,
    /// The response could not be sealed.
    EncodeFailed,
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A response was handed to the transport.
    Responded,
    /// Nothing was sent.
    Dropped(DropReason),
}

/// The remote-signing backend.
pub struct Backend {
    identity: PublicKey,
    signer: Arc<dyn LocalSigner>,
    transport: Arc<dyn Transport>,
    gate: Arc<dyn PermissionGate>,
    registry: MethodRegistry,
    config: BackendConfig,
    overflow_drops: AtomicU64,
}

impl Backend {
    /// Create a backend seeded with the built-in methods.
    pub fn new(
        signer: Arc<dyn LocalSigner>,
        transport: Arc<dyn Transport>,
        gate: Arc<dyn PermissionGate>,
        config: BackendConfig,
    ) -> Self {
        Self {
            identity: signer.identity(),
            signer,
            transport,
            gate,
            registry: MethodRegistry::with_handlers(methods::builtin_handlers()),
            config,
            overflow_drops: AtomicU64::new(0),
        }
    }

    /// The custodied identity.
    pub fn identity(&self) -> PublicKey {
        self.identity
    }

    /// The local signer.
    pub fn signer(&self) -> &dyn LocalSigner {
        self.signer.as_ref()
    }

    /// The method registry.
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Inbound events discarded because the work queue was full.
    pub fn overflow_drops(&self) -> u64 {
        self.overflow_drops.load(Ordering::Relaxed)
    }

    /// Register or replace a method handler. Takes effect for the next
    /// dispatched request.
    pub async fn register(&self, method: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        let method = method.into();
        let replaced = self.registry.register(method.clone(), handler).await;
        info!(method = %method, replaced, "method registered");
    }

    /// Add `ping`, `encrypt` and `decrypt`.
    pub async fn register_extended_methods(&self) {
        for (method, handler) in methods::extended_handlers() {
            self.register(method, handler).await;
        }
    }

    /// Ask the gate. A gate error counts as a refusal.
    pub async fn authorize(&self, request: &PermissionRequest) -> bool {
        match self.gate.allow(request).await {
            Ok(allowed) => {
                debug!(
                    remote = %request.remote.short(),
                    method = %request.method,
                    allowed,
                    "permission decided"
                );
                allowed
            }
            Err(e) => {
                warn!(
                    remote = %request.remote.short(),
                    method = %request.method,
                    error = %e,
                    "permission gate failed, treating as deny"
                );
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Process one inbound transport event to completion.
    pub async fn handle_event(&self, event: &Event) -> DispatchOutcome {
        if event.kind != KIND_REMOTE_SIGNING {
            return DispatchOutcome::Dropped(DropReason::WrongKind);
        }
        if event.pubkey == self.identity {
            return DispatchOutcome::Dropped(DropReason::OwnEvent);
        }
        if self.config.verify_inbound {
            if let Err(e) = event.verify() {
                warn!(id = %event.id, error = %e, "inbound event failed verification");
                return DispatchOutcome::Dropped(DropReason::InvalidEvent);
            }
        }

        let remote = event.pubkey;
        let envelope = match envelope::decode(&event.content, &remote, self.signer()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(remote = %remote.short(), error = %e, "dropping undecodable request");
                return DispatchOutcome::Dropped(DropReason::DecodeFailed);
            }
        };

        let request = match envelope {
            Envelope::Request(request) => request,
            Envelope::Response(response) => {
                debug!(remote = %remote.short(), id = %response.id, "ignoring response envelope");
                return DispatchOutcome::Dropped(DropReason::NotARequest);
            }
        };

        debug!(
            remote = %remote.short(),
            id = %request.id,
            method = %request.method,
            "request received"
        );

        let Some(handler) = self.registry.resolve(&request.method).await else {
            if self.config.reply_unknown_methods {
                let reply = format!("method not supported: {}", request.method);
                return self.respond(&remote, Envelope::error(request.id, reply)).await;
            }
            debug!(method = %request.method, "no handler, dropping");
            return DispatchOutcome::Dropped(DropReason::UnknownMethod);
        };

        match handler.handle(self, &remote, &request.params).await {
            HandlerOutcome::Respond(result) => {
                self.respond(&remote, Envelope::result(request.id, result))
                    .await
            }
            HandlerOutcome::Drop => {
                debug!(method = %request.method, "handler declined");
                DispatchOutcome::Dropped(DropReason::Declined)
            }
            HandlerOutcome::Failed(HandlerError::Denied { method }) => {
                warn!(remote = %remote.short(), method = %method, "request denied");
                DispatchOutcome::Dropped(DropReason::Denied)
            }
            HandlerOutcome::Failed(e) => {
                warn!(
                    remote = %remote.short(),
                    method = %request.method,
                    error = %e,
                    "handler failed"
                );
                DispatchOutcome::Dropped(DropReason::HandlerFailed)
            }
        }
    }

    /// Seal a response for `remote` and publish it. A failed publish is
    /// logged and otherwise indistinguishable from success.
    async fn respond(&self, remote: &PublicKey, response: Envelope) -> DispatchOutcome {
        let event = match envelope::seal(&response, remote, self.signer()) {
            Ok(event) => event,
            Err(e) => {
                warn!(remote = %remote.short(), error = %e, "failed to seal response");
                return DispatchOutcome::Dropped(DropReason::EncodeFailed);
            }
        };

        match self.transport.publish(event).await {
            Ok(()) => debug!(remote = %remote.short(), id = %response.id(), "response published"),
            Err(e) => warn!(remote = %remote.short(), error = %e, "failed to publish response"),
        }
        DispatchOutcome::Responded
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Run loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe and start serving in the background.
    ///
    /// The subscription is open when this returns, so requests published
    /// afterwards are not missed. Each event is handled on its own task; a
    /// request waiting on the gate never holds up the others.
    pub async fn spawn(self: &Arc<Self>) -> Result<BackendHandle> {
        let filter = Filter::new()
            .kind(KIND_REMOTE_SIGNING)
            .recipient(self.identity);
        let mut subscription = self.transport.subscribe(filter).await?;

        let (tx, mut rx) = mpsc::channel::<Event>(self.config.queue_capacity.max(1));

        let pump = {
            let backend = Arc::clone(self);
            tokio::spawn(async move {
                while let Some(event) = subscription.next().await {
                    if !backend.enqueue(&tx, event).await {
                        break;
                    }
                }
                debug!("subscription ended");
            })
        };

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let backend = Arc::clone(self);

        let task = tokio::spawn(async move {
            info!(identity = %backend.identity.short(), "backend started");
            let mut detached = false;
            loop {
                tokio::select! {
                    signal = &mut shutdown_rx, if !detached => match signal {
                        Ok(()) => break,
                        // Handle dropped without shutdown: keep serving.
                        Err(_) => detached = true,
                    },
                    next = rx.recv() => match next {
                        Some(event) => {
                            let backend = Arc::clone(&backend);
                            tokio::spawn(async move {
                                backend.handle_event(&event).await;
                            });
                        }
                        None => break,
                    },
                }
            }

            pump.abort();
            let _ = pump.await;
            info!(identity = %backend.identity.short(), "backend stopped");
        });

        Ok(BackendHandle {
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Hand one inbound event to the work queue under the configured
    /// overflow policy. Returns `false` once the queue is closed.
    async fn enqueue(&self, queue: &mpsc::Sender<Event>, event: Event) -> bool {
        match self.config.overflow {
            OverflowPolicy::DropNewest => match queue.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(event)) => {
                    self.overflow_drops.fetch_add(1, Ordering::Relaxed);
                    warn!(id = %event.id, "work queue full, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
            OverflowPolicy::Block => queue.send(event).await.is_ok(),
        }
    }

    /// Serve until the subscription ends.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        self.spawn().await?.wait().await;
        Ok(())
    }
}

/// Control handle for a backend started with [`Backend::spawn`].
///
/// Dropping the handle leaves the backend running.
pub struct BackendHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl BackendHandle {
    /// Stop taking new requests and close the subscription. Requests
    /// already dispatched run to completion on their own tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "backend task ended abnormally");
        }
    }

    /// Wait for the backend to stop on its own.
    pub async fn wait(self) {
        let BackendHandle { shutdown, task } = self;
        // Keep the sender alive so waiting is not mistaken for detaching.
        let _shutdown = shutdown;
        if let Err(e) = task.await {
            warn!(error = %e, "backend task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{AllowAll, DenyAll};
    use crate::signer::KeypairSigner;
    use bunker_core::{Keypair, UnsignedEvent};
    use bunker_relay::MemoryRelay;

    fn backend_with(gate: Arc<dyn PermissionGate>, config: BackendConfig) -> (Backend, Arc<MemoryRelay>) {
        let relay = MemoryRelay::new();
        let backend = Backend::new(
            Arc::new(KeypairSigner::generate()),
            relay.clone(),
            gate,
            config,
        );
        (backend, relay)
    }

    fn request_event(client: &KeypairSigner, backend: &Backend, request: &Envelope) -> Event {
        envelope::seal(request, &backend.identity(), client).unwrap()
    }

    #[tokio::test]
    async fn test_builtins_registered() {
        let (backend, _) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        assert_eq!(
            backend.registry().methods().await,
            vec!["connect", "describe", "get-public-key", "sign-event"]
        );
    }

    #[tokio::test]
    async fn test_extended_methods() {
        let (backend, _) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        backend.register_extended_methods().await;
        let methods = backend.registry().methods().await;
        for name in ["ping", "encrypt", "decrypt"] {
            assert!(methods.iter().any(|m| m == name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_wrong_kind_dropped() {
        let (backend, relay) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let event = UnsignedEvent::new(1, "hello")
            .sign(&Keypair::generate())
            .unwrap();

        assert_eq!(
            backend.handle_event(&event).await,
            DispatchOutcome::Dropped(DropReason::WrongKind)
        );
        assert!(relay.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_tampered_event_dropped() {
        let (backend, relay) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let mut event = request_event(
            &client,
            &backend,
            &Envelope::request("1", "get-public-key", Vec::<String>::new()),
        );
        event.created_at += 1;

        assert_eq!(
            backend.handle_event(&event).await,
            DispatchOutcome::Dropped(DropReason::InvalidEvent)
        );
        assert!(relay.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_response_envelope_ignored() {
        let (backend, _) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let event = request_event(&client, &backend, &Envelope::result("1", "x"));

        assert_eq!(
            backend.handle_event(&event).await,
            DispatchOutcome::Dropped(DropReason::NotARequest)
        );
    }

    #[tokio::test]
    async fn test_denied_sign_event() {
        let (backend, relay) = backend_with(Arc::new(DenyAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let event = request_event(
            &client,
            &backend,
            &Envelope::request("2", "sign-event", [r#"{"created_at":1700000000,"kind":1,"tags":[],"content":"hi"}"#]),
        );

        assert_eq!(
            backend.handle_event(&event).await,
            DispatchOutcome::Dropped(DropReason::Denied)
        );
        assert!(relay.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_sign_event_param() {
        let (backend, relay) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let event = request_event(
            &client,
            &backend,
            &Envelope::request("3", "sign-event", ["not an event"]),
        );

        assert_eq!(
            backend.handle_event(&event).await,
            DispatchOutcome::Dropped(DropReason::HandlerFailed)
        );
        assert!(relay.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_public_key_responds_to_sender() {
        let (backend, relay) = backend_with(Arc::new(DenyAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let event = request_event(
            &client,
            &backend,
            &Envelope::request("1", "get-public-key", Vec::<String>::new()),
        );

        assert_eq!(backend.handle_event(&event).await, DispatchOutcome::Responded);

        let published = relay.published().await;
        assert_eq!(published.len(), 1);
        let response = &published[0];
        assert_eq!(response.pubkey, backend.identity());
        assert!(response.is_addressed_to(&client.identity()));
        assert_eq!(
            envelope::decode(&response.content, &response.pubkey, &client).unwrap(),
            Envelope::result("1", backend.identity().to_hex())
        );
    }

    fn inbound(content: &str) -> Event {
        UnsignedEvent::new(KIND_REMOTE_SIGNING, content)
            .sign(&Keypair::generate())
            .unwrap()
    }

    #[tokio::test]
    async fn test_drop_newest_discards_when_full() {
        let (backend, _) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let (tx, mut rx) = mpsc::channel(1);

        assert!(backend.enqueue(&tx, inbound("first")).await);
        assert!(backend.enqueue(&tx, inbound("second")).await);
        assert!(backend.enqueue(&tx, inbound("third")).await);

        assert_eq!(backend.overflow_drops(), 2);
        assert_eq!(rx.recv().await.unwrap().content, "first");
        assert!(rx.try_recv().is_err());

        // Room again: intake resumes.
        assert!(backend.enqueue(&tx, inbound("fourth")).await);
        assert_eq!(rx.recv().await.unwrap().content, "fourth");
        assert_eq!(backend.overflow_drops(), 2);
    }

    #[tokio::test]
    async fn test_block_waits_for_room() {
        let config = BackendConfig {
            overflow: OverflowPolicy::Block,
            ..BackendConfig::default()
        };
        let (backend, _) = backend_with(Arc::new(AllowAll), config);
        let backend = Arc::new(backend);
        let (tx, mut rx) = mpsc::channel(1);

        assert!(backend.enqueue(&tx, inbound("first")).await);
        let blocked = {
            let backend = Arc::clone(&backend);
            let tx = tx.clone();
            tokio::spawn(async move { backend.enqueue(&tx, inbound("second")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        assert_eq!(rx.recv().await.unwrap().content, "first");
        assert!(blocked.await.unwrap());
        assert_eq!(rx.recv().await.unwrap().content, "second");
        assert_eq!(backend.overflow_drops(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_reports_closed_queue() {
        let (backend, _) = backend_with(Arc::new(AllowAll), BackendConfig::default());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(!backend.enqueue(&tx, inbound("late")).await);
        assert_eq!(backend.overflow_drops(), 0);
    }

    /// Collects formatted log output for the current thread.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    struct UnreachableRelay;

    #[async_trait::async_trait]
    impl Transport for UnreachableRelay {
        async fn subscribe(&self, _filter: Filter) -> bunker_relay::Result<bunker_relay::Subscription> {
            Err(bunker_relay::RelayError::TransportError("offline".into()))
        }

        async fn publish(&self, _event: Event) -> bunker_relay::Result<()> {
            Err(bunker_relay::RelayError::TransportError("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_publish_is_not_logged_as_published() {
        let capture = LogCapture::default();
        let _guard = capture.install();

        let backend = Backend::new(
            Arc::new(KeypairSigner::generate()),
            Arc::new(UnreachableRelay),
            Arc::new(AllowAll),
            BackendConfig::default(),
        );
        let client = KeypairSigner::generate();
        let event = request_event(
            &client,
            &backend,
            &Envelope::request("1", "get-public-key", Vec::<String>::new()),
        );

        // Fire and forget: the caller sees no difference.
        assert_eq!(backend.handle_event(&event).await, DispatchOutcome::Responded);

        let lines = capture.lines();
        assert!(lines.iter().any(|l| l.contains("failed to publish response")));
        assert!(!lines.iter().any(|l| l.contains("response published")));
    }

    #[tokio::test]
    async fn test_denial_logged_as_warning() {
        let capture = LogCapture::default();
        let _guard = capture.install();

        let (backend, _) = backend_with(Arc::new(DenyAll), BackendConfig::default());
        let client = KeypairSigner::generate();
        let event = request_event(
            &client,
            &backend,
            &Envelope::request("2", "sign-event", [r#"{"kind":1,"content":"hi"}"#]),
        );
        backend.handle_event(&event).await;

        let lines = capture.lines();
        let denial = lines
            .iter()
            .find(|l| l.contains("request denied"))
            .expect("denial was not logged");
        assert!(denial.contains("WARN"));
    }
}
