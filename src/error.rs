//! Error types for resolution and serving.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for waypoint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or serving names.
#[derive(Error, Debug)]
pub enum Error {
    /// A delegation target is not an `address:port` pair.
    #[error("invalid name server address `{0}`, expected address:port")]
    InvalidTarget(String),

    /// Sending to or receiving from an upstream server failed.
    #[error("upstream {addr} unavailable: {source}")]
    Upstream {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// An upstream server did not reply in time.
    #[error("upstream {addr} did not reply within {timeout:?}")]
    UpstreamTimeout { addr: SocketAddr, timeout: Duration },

    /// The delegation walk revisited a server or ran past the hop limit.
    #[error("delegation loop detected at {server} after {hops} hops")]
    DelegationLoop { server: SocketAddr, hops: usize },

    /// The zone file could not be read.
    #[error("failed to read zone file {}: {source}", .path.display())]
    Zone {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
