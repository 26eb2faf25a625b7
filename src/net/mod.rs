//! Network layer for the relay.
//!
//! This module contains:
//! - `frame`: length-delimited message framing over a byte stream
//! - `session`: connection-to-identity registry
//! - `handler`: per-connection request/response loop and dispatch
//! - `server`: listener, accept loop, connection lifecycle

pub mod frame;
pub mod handler;
pub mod server;
pub mod session;

// Re-export main entry points
pub use server::Relay;
pub use session::{ConnId, SessionRegistry};
