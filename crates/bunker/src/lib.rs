//! # Bunker
//!
//! A remote-signing backend. The bunker custodies one signing key and serves
//! encrypted RPC requests arriving over relays, asking an injected
//! permission gate before any privileged operation.
//!
//! ## Overview
//!
//! - **Envelope**: the request/response unit, encrypted between client and
//!   bunker and carried in a kind-24133 event
//! - **Local Signer**: the only holder of the custodied key
//! - **Permission Gate**: the embedding application's trust decision
//! - **Method Registry**: method names mapped to pluggable handlers
//! - **Backend**: subscribes, decodes, dispatches, responds
//!
//! ## Silent Drop
//!
//! The backend answers only when a handler produces a result. Undecryptable
//! payloads, unknown methods, denials and handler failures all look the same
//! from the network: no response at all.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bunker::core::Keypair;
//! use bunker::gate::AllowAll;
//! use bunker::relay::MemoryRelay;
//! use bunker::{Backend, BackendConfig, KeypairSigner, RemoteSignerClient};
//!
//! async fn example() -> bunker::Result<()> {
//!     let relay = MemoryRelay::new();
//!
//!     let backend = Arc::new(Backend::new(
//!         Arc::new(KeypairSigner::generate()),
//!         relay.clone(),
//!         Arc::new(AllowAll),
//!         BackendConfig::default(),
//!     ));
//!     let handle = backend.spawn().await?;
//!
//!     let client =
//!         RemoteSignerClient::connect_to(Keypair::generate(), backend.identity(), relay).await?;
//!     assert_eq!(client.get_public_key().await?, backend.identity());
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod handler;
pub mod methods;
pub mod signer;

// Re-export component crates
pub use bunker_cipher as cipher;
pub use bunker_core as core;
pub use bunker_relay as relay;

pub use backend::{Backend, BackendHandle, DispatchOutcome, DropReason};
pub use client::RemoteSignerClient;
pub use config::{BackendConfig, OverflowPolicy};
pub use envelope::{Envelope, Reply, Request, Response};
pub use error::{BunkerError, DecodeError, DecodeStage, HandlerError, Result, SignerError};
pub use gate::{gate_fn, AllowAll, DenyAll, PermissionContext, PermissionGate, PermissionRequest};
pub use handler::{handler_fn, HandlerOutcome, MethodHandler, MethodRegistry};
pub use signer::{KeypairSigner, LocalSigner};
