//! Method handlers and the registry that maps names to them.
//!
//! New methods plug in by implementing [`MethodHandler`] and registering
//! under a name; the dispatcher never changes. Registering an existing name
//! replaces the previous handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bunker_core::PublicKey;
use tokio::sync::RwLock;

use crate::backend::Backend;
use crate::error::HandlerError;

/// What a handler produced.
///
/// Only `Respond` reaches the network. `Drop` and `Failed` both mean no
/// response at all; `Failed` carries a reason for the local log.
#[derive(Debug)]
pub enum HandlerOutcome {
    Respond(String),
    Drop,
    Failed(HandlerError),
}

impl HandlerOutcome {
    /// Whether a response will be sent.
    pub fn is_response(&self) -> bool {
        matches!(self, HandlerOutcome::Respond(_))
    }
}

impl From<Result<String, HandlerError>> for HandlerOutcome {
    fn from(result: Result<String, HandlerError>) -> Self {
        match result {
            Ok(value) => HandlerOutcome::Respond(value),
            Err(e) => HandlerOutcome::Failed(e),
        }
    }
}

/// A protocol method implementation.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, backend: &Backend, remote: &PublicKey, params: &[String])
        -> HandlerOutcome;
}

/// A handler backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MethodHandler for FnHandler<F>
where
    F: Fn(PublicKey, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerOutcome> + Send,
{
    async fn handle(
        &self,
        _backend: &Backend,
        remote: &PublicKey,
        params: &[String],
    ) -> HandlerOutcome {
        (self.0)(*remote, params.to_vec()).await
    }
}

/// Build a handler from an async closure over `(remote, params)`.
///
/// For handlers that need the backend (signer, gate), implement
/// [`MethodHandler`] directly.
pub fn handler_fn<F, Fut>(f: F) -> Arc<FnHandler<F>>
where
    F: Fn(PublicKey, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerOutcome> + Send,
{
    Arc::new(FnHandler(f))
}

/// Live mapping from method name to handler.
///
/// Read on every dispatch, written rarely. Lookups clone the handler out so
/// the lock is never held while a handler runs.
#[derive(Default)]
pub struct MethodRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl MethodRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the given handlers.
    pub fn with_handlers(
        handlers: impl IntoIterator<Item = (String, Arc<dyn MethodHandler>)>,
    ) -> Self {
        Self {
            handlers: RwLock::new(handlers.into_iter().collect()),
        }
    }

    /// Register `handler` under `method`, replacing any previous one.
    ///
    /// Returns whether a handler was replaced.
    pub async fn register(&self, method: impl Into<String>, handler: Arc<dyn MethodHandler>) -> bool {
        self.handlers
            .write()
            .await
            .insert(method.into(), handler)
            .is_some()
    }

    /// Remove a method. Returns whether it existed.
    pub async fn unregister(&self, method: &str) -> bool {
        self.handlers.write().await.remove(method).is_some()
    }

    /// Look up the handler for `method`.
    pub async fn resolve(&self, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.read().await.get(method).cloned()
    }

    /// All registered method names, sorted.
    pub async fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: &'static str) -> Arc<dyn MethodHandler> {
        handler_fn(move |_remote, _params| async move {
            HandlerOutcome::Respond(value.to_string())
        })
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = MethodRegistry::new();
        assert!(registry.resolve("echo").await.is_none());

        assert!(!registry.register("echo", constant("a")).await);
        assert!(registry.resolve("echo").await.is_some());
        assert_eq!(registry.methods().await, vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = MethodRegistry::new();
        registry.register("m", constant("first")).await;
        assert!(registry.register("m", constant("second")).await);
        assert_eq!(registry.methods().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = MethodRegistry::with_handlers([("m".to_string(), constant("x"))]);
        assert!(registry.unregister("m").await);
        assert!(!registry.unregister("m").await);
        assert!(registry.methods().await.is_empty());
    }

    #[tokio::test]
    async fn test_methods_sorted() {
        let registry = MethodRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, constant("x")).await;
        }
        assert_eq!(registry.methods().await, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(HandlerOutcome::from(Ok("x".to_string())).is_response());
        let failed = HandlerOutcome::from(Err(HandlerError::InvalidParams("x".into())));
        assert!(matches!(failed, HandlerOutcome::Failed(_)));
    }
}
