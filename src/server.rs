//! Server orchestration.
//!
//! Binds a UDP server and runs either the caching resolver or a leaf
//! record server on it.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::authority::Authority;
use crate::error::Result;
use crate::resolver::{Resolver, ResolverConfig};
use crate::transport::udp::{UdpExchange, UdpServer};
use crate::zone;

/// Configuration for a resolver process.
pub struct ResolverServerConfig {
    /// Local address to bind (e.g., 0.0.0.0:5353)
    pub bind_addr: SocketAddr,
    /// Wait limit for each upstream reply. `None` waits forever.
    pub upstream_timeout: Option<Duration>,
    pub resolver: ResolverConfig,
}

/// Configuration for a leaf record server process.
pub struct AuthorityConfig {
    pub bind_addr: SocketAddr,
    pub zone_path: PathBuf,
    /// Log every answer at info level.
    pub verbose: bool,
}

/// Run the caching resolver until `shutdown` completes.
pub async fn run_resolver<S>(config: ResolverServerConfig, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let server = UdpServer::bind(config.bind_addr).await?;
    let exchange = UdpExchange::bind_for(config.resolver.parent)
        .await?
        .with_timeout(config.upstream_timeout);

    info!(
        "resolver listening on {} (parent {}, cache ttl {}s)",
        server.local_addr()?,
        config.resolver.parent,
        config.resolver.cache_ttl.as_secs()
    );

    server
        .serve(Resolver::new(config.resolver, exchange), shutdown)
        .await;

    Ok(())
}

/// Run a leaf record server until `shutdown` completes.
pub async fn run_authority<S>(config: AuthorityConfig, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let records = zone::load(&config.zone_path)?;
    let authority = Authority::new(records, config.verbose);
    let server = UdpServer::bind(config.bind_addr).await?;

    info!(
        "record server listening on {} ({} records from {})",
        server.local_addr()?,
        authority.record_count(),
        config.zone_path.display()
    );

    server.serve(authority, shutdown).await;

    Ok(())
}
