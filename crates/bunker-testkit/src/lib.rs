//! # Bunker Testkit
//!
//! Testing utilities for bunker.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic keys, an in-memory bunker with a client
//! - **Instrumented collaborators**: a signer that counts invocations, gates
//!   that record or never answer
//! - **Generators**: proptest strategies for events and envelopes
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bunker::gate::AllowAll;
//! use bunker_testkit::TestBunker;
//!
//! # async fn example() {
//! let bunker = TestBunker::start(Arc::new(AllowAll)).await;
//! let client = bunker.client().await;
//! assert_eq!(client.get_public_key().await.unwrap(), bunker.identity());
//! # }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    bunker_keypair, client_keypair, init_tracing, CountingSigner, PendingGate, RecordingGate,
    TestBunker,
};
pub use generators::{unsigned_event, UnsignedEventParams};
