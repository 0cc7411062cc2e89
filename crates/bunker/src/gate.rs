//! The permission gate: the trust decision consulted before privileged work.
//!
//! The embedding application supplies the gate. It may answer instantly from
//! a policy, or suspend for as long as an interactive prompt takes; the
//! backend never times it out. Every request is a fresh query: nothing is
//! cached here, even for the same method from the same identity.

use std::future::Future;

use async_trait::async_trait;
use bunker_core::{PublicKey, UnsignedEvent};

/// Method-specific context offered to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionContext {
    None,
    /// The event that would be signed.
    Event(UnsignedEvent),
    /// The counterparty of an encrypt/decrypt request.
    Peer(PublicKey),
}

/// One authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    pub remote: PublicKey,
    pub method: String,
    pub context: PermissionContext,
}

impl PermissionRequest {
    pub fn new(remote: PublicKey, method: impl Into<String>) -> Self {
        Self {
            remote,
            method: method.into(),
            context: PermissionContext::None,
        }
    }

    pub fn with_event(mut self, event: UnsignedEvent) -> Self {
        self.context = PermissionContext::Event(event);
        self
    }

    pub fn with_peer(mut self, peer: PublicKey) -> Self {
        self.context = PermissionContext::Peer(peer);
        self
    }
}

/// Decides whether a remote identity may perform a method.
///
/// An `Err` is treated exactly like `Ok(false)`.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn allow(&self, request: &PermissionRequest) -> anyhow::Result<bool>;
}

/// Approves everything. For tests and fully trusted deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
    async fn allow(&self, _request: &PermissionRequest) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl PermissionGate for DenyAll {
    async fn allow(&self, _request: &PermissionRequest) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// A gate backed by an async closure. See [`gate_fn`].
pub struct FnGate<F>(F);

#[async_trait]
impl<F, Fut> PermissionGate for FnGate<F>
where
    F: Fn(PermissionRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    async fn allow(&self, request: &PermissionRequest) -> anyhow::Result<bool> {
        (self.0)(request.clone()).await
    }
}

/// Build a gate from an async closure.
///
/// ```rust
/// use bunker::gate::{gate_fn, PermissionContext};
///
/// // Only sign kind-1 notes.
/// let gate = gate_fn(|request| async move {
///     anyhow::Ok(match request.context {
///         PermissionContext::Event(event) => event.kind == 1,
///         _ => false,
///     })
/// });
/// # let _ = gate;
/// ```
pub fn gate_fn<F, Fut>(f: F) -> FnGate<F>
where
    F: Fn(PermissionRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    FnGate(f)
}
