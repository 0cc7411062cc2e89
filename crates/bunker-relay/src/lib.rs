//! # Bunker Relay
//!
//! The transport collaborator of the remote-signing backend.
//!
//! ## Overview
//!
//! A bunker never talks to its clients directly. Requests and responses are
//! ordinary signed events routed through untrusted relays. The backend needs
//! only two operations from the relay layer:
//!
//! - **subscribe**: deliver every event matching a [`Filter`], indefinitely
//! - **publish**: emit one event, fire-and-forget
//!
//! Connection pooling, reconnection and deduplication across relays belong
//! to the [`Transport`] implementation, not to this crate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bunker_core::{PublicKey, KIND_REMOTE_SIGNING};
//! use bunker_relay::{Filter, MemoryRelay, Transport};
//!
//! async fn example(me: PublicKey) {
//!     let relay = MemoryRelay::new();
//!     let filter = Filter::new().kind(KIND_REMOTE_SIGNING).recipient(me);
//!     let mut subscription = relay.subscribe(filter).await.unwrap();
//!
//!     while let Some(event) = subscription.next().await {
//!         println!("request from {}", event.pubkey);
//!     }
//! }
//! ```

pub mod error;
pub mod filter;
pub mod memory;
pub mod transport;

pub use error::{RelayError, Result};
pub use filter::Filter;
pub use memory::MemoryRelay;
pub use transport::{Subscription, SubscriptionId, Transport};
