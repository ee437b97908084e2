//! Transport layer for the text protocol.
//!
//! Every exchange is one datagram out and one datagram back. There are no
//! sequence numbers and no retries; a lost reply surfaces as a timeout when
//! one is configured and blocks forever otherwise.

pub mod udp;

use std::future::Future;
use std::net::SocketAddr;

use crate::error::Result;

/// Maximum size of a single message.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// A single request/response exchange with a name server.
pub trait Exchange {
    /// Send `query` to `server` and wait for exactly one reply.
    fn exchange(&mut self, server: SocketAddr, query: &str) -> impl Future<Output = Result<String>>;
}

/// Answers queries arriving at a server.
pub trait Handler {
    /// Produce the reply for one query.
    fn respond(&mut self, query: &str) -> impl Future<Output = String>;

    /// Called periodically and on shutdown.
    fn report(&mut self) {}
}
