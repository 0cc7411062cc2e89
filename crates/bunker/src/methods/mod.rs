//! Protocol methods shipped with the backend.
//!
//! The four built-ins (`connect`, `sign-event`, `get-public-key`, `describe`)
//! seed every backend. The extended set (`ping`, `encrypt`, `decrypt`) is
//! opt-in via [`crate::Backend::register_extended_methods`].

use std::sync::Arc;

use crate::handler::MethodHandler;

mod builtin;
mod extended;

pub use builtin::{Connect, Describe, GetPublicKey, SignEvent};
pub use extended::{Decrypt, Encrypt, Ping};

/// Method names on the wire.
pub mod names {
    pub const CONNECT: &str = "connect";
    pub const SIGN_EVENT: &str = "sign-event";
    pub const GET_PUBLIC_KEY: &str = "get-public-key";
    pub const DESCRIBE: &str = "describe";
    pub const PING: &str = "ping";
    pub const ENCRYPT: &str = "encrypt";
    pub const DECRYPT: &str = "decrypt";
}

/// Handlers every backend starts with.
pub fn builtin_handlers() -> Vec<(String, Arc<dyn MethodHandler>)> {
    vec![
        (names::CONNECT.to_string(), Arc::new(Connect) as Arc<dyn MethodHandler>),
        (names::SIGN_EVENT.to_string(), Arc::new(SignEvent)),
        (names::GET_PUBLIC_KEY.to_string(), Arc::new(GetPublicKey)),
        (names::DESCRIBE.to_string(), Arc::new(Describe)),
    ]
}

/// Optional handlers for liveness checks and encryption on behalf of the
/// custodied key.
pub fn extended_handlers() -> Vec<(String, Arc<dyn MethodHandler>)> {
    vec![
        (names::PING.to_string(), Arc::new(Ping) as Arc<dyn MethodHandler>),
        (names::ENCRYPT.to_string(), Arc::new(Encrypt)),
        (names::DECRYPT.to_string(), Arc::new(Decrypt)),
    ]
}
