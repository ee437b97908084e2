use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use waypoint::resolver::ResolverConfig;
use waypoint::server::{self, AuthorityConfig, ResolverServerConfig};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Minimal iterative name resolver", long_about = None)]
struct Args {
    /// Log every query and its outcome
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a caching resolver that follows delegations
    Resolver {
        /// Local port to listen on
        port: u16,

        /// Parent server address
        parent_ip: IpAddr,

        /// Parent server port
        parent_port: u16,

        /// Seconds to keep learned records (0 keeps them forever)
        cache_ttl: u64,

        /// Bind address
        #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,

        /// Seconds to wait for an upstream reply (0 waits forever)
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,

        /// Give up on delegation chains longer than this or that revisit a server
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_hops: Option<u64>,
    },

    /// Serve records from a zone file
    Server {
        /// Zone file with one name,target,kind record per line
        zone: PathBuf,

        /// Local port to listen on
        port: u16,

        /// Bind address
        #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
    },

    /// Send names read from stdin to a server and print the answers
    Query {
        /// Server address
        server_ip: IpAddr,

        /// Server port
        server_port: u16,

        /// Seconds to wait for each reply (0 waits forever)
        #[arg(short, long, default_value_t = 0)]
        timeout: u64,
    },
}

/// Zero means no limit.
fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> waypoint::Result<()> {
    match args.command {
        Command::Resolver {
            port,
            parent_ip,
            parent_port,
            cache_ttl,
            bind,
            timeout,
            max_hops,
        } => {
            let config = ResolverServerConfig {
                bind_addr: SocketAddr::new(bind, port),
                upstream_timeout: optional_secs(timeout),
                resolver: ResolverConfig {
                    parent: SocketAddr::new(parent_ip, parent_port),
                    cache_ttl: Duration::from_secs(cache_ttl),
                    max_hops: max_hops.map(|n| n as usize),
                    verbose: args.verbose,
                },
            };
            server::run_resolver(config, shutdown_signal()).await
        }
        Command::Server { zone, port, bind } => {
            let config = AuthorityConfig {
                bind_addr: SocketAddr::new(bind, port),
                zone_path: zone,
                verbose: args.verbose,
            };
            server::run_authority(config, shutdown_signal()).await
        }
        Command::Query {
            server_ip,
            server_port,
            timeout,
        } => {
            waypoint::client::run(SocketAddr::new(server_ip, server_port), optional_secs(timeout))
                .await
        }
    }
}

fn main() -> waypoint::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(args))
}
