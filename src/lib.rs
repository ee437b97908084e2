//! Waypoint - a minimal iterative name resolver.
//!
//! Names resolve through a local record store first, then by walking
//! delegation records from server to server, caching every hop.

pub mod authority;
pub mod cache;
pub mod client;
pub mod error;
pub mod record;
pub mod resolver;
pub mod server;
pub mod stats;
pub mod transport;
pub mod zone;

pub use error::{Error, Result};
