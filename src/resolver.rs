//! Query resolution logic.
//!
//! Handles the core query processing pipeline:
//! 1. Local store lookup (address hit answers immediately)
//! 2. Delegation walk when the store holds a matching NS record
//! 3. Forward to the parent server on a miss, walking any delegation it returns
//!
//! Every record learned from a remote server is cached with the configured TTL.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::cache::RecordStore;
use crate::error::{Error, Result};
use crate::record::{Answer, NO_SUCH_NAME, Record, RecordKind};
use crate::stats::{Resolution, Stats, StatsSnapshot};
use crate::transport::{Exchange, Handler};

/// Configuration for the resolution engine.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Server that receives queries the local store cannot answer.
    pub parent: SocketAddr,
    /// Lifetime of learned records. Zero caches them forever.
    pub cache_ttl: Duration,
    /// Upper bound on exchanges in one delegation walk. Also rejects a walk
    /// that returns to a server it already asked. `None` follows the chain
    /// for as long as servers keep delegating.
    pub max_hops: Option<usize>,
    /// Log every query outcome at info level.
    pub verbose: bool,
}

impl ResolverConfig {
    pub fn new(parent: SocketAddr) -> Self {
        Self {
            parent,
            cache_ttl: Duration::ZERO,
            max_hops: None,
            verbose: false,
        }
    }
}

/// Caching resolver.
///
/// Owns the record store and the exchange used to reach other servers.
/// Queries are processed one at a time through `&mut self`, so sweep, scan
/// and insert are never interleaved with another query.
pub struct Resolver<E> {
    store: RecordStore,
    exchange: E,
    config: ResolverConfig,
    stats: Stats,
}

impl<E: Exchange> Resolver<E> {
    pub fn new(config: ResolverConfig, exchange: E) -> Self {
        Self::with_store(config, exchange, RecordStore::new())
    }

    /// Create a resolver whose store is pre-populated, e.g. from a zone file.
    pub fn with_store(config: ResolverConfig, exchange: E, store: RecordStore) -> Self {
        Self {
            store,
            exchange,
            config,
            stats: Stats::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Answer one inbound query.
    pub async fn resolve(&mut self, query: &str) -> Result<Answer> {
        let query = query.trim();
        let start_time = Instant::now();

        let (resolution, result) = match self.store.resolve(query) {
            Answer::Found(record) if record.kind() == RecordKind::Address => {
                (Resolution::Local, Ok(Answer::Found(record)))
            }
            Answer::Found(record) => {
                let result = match record.server_addr() {
                    Ok(target) => self.resolve_via_delegation(target, query).await,
                    Err(e) => Err(e),
                };
                (Resolution::Delegated, result)
            }
            _ => (Resolution::Forwarded, self.forward_to_parent(query).await),
        };

        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(answer) => {
                self.stats.record(resolution, elapsed_ms);
                if self.config.verbose {
                    info!(
                        query,
                        answer = %answer,
                        "{} total={:.3}ms",
                        resolution.as_str(),
                        elapsed_ms
                    );
                }
            }
            Err(e) => {
                self.stats.record_failed(elapsed_ms);
                warn!(query, error = %e, "{} FAILED", resolution.as_str());
            }
        }

        result
    }

    /// Walk a delegation chain starting at `target`, caching every hop.
    ///
    /// Stops at the first address record, negative answer or malformed
    /// reply. Without `max_hops` a cyclic set of servers keeps the walk
    /// going forever.
    pub async fn resolve_via_delegation(
        &mut self,
        target: SocketAddr,
        query: &str,
    ) -> Result<Answer> {
        let mut server = target;
        let mut visited = FxHashSet::default();
        let mut hops = 0;

        loop {
            if let Some(max_hops) = self.config.max_hops {
                if hops >= max_hops || !visited.insert(server) {
                    return Err(Error::DelegationLoop { server, hops });
                }
            }
            hops += 1;

            debug!(query, %server, hops, "following delegation");
            let record = match self.ask(server, query).await? {
                Answer::Found(record) => record,
                answer => return Ok(answer),
            };

            match record.kind() {
                RecordKind::Address => return Ok(Answer::Found(record)),
                RecordKind::Delegation => server = record.server_addr()?,
            }
        }
    }

    /// Forward a store miss to the parent, then chase any delegation it returns.
    async fn forward_to_parent(&mut self, query: &str) -> Result<Answer> {
        let parent = self.config.parent;
        debug!(query, %parent, "forwarding to parent");

        let record = match self.ask(parent, query).await? {
            Answer::Found(record) => record,
            answer => return Ok(answer),
        };

        match record.kind() {
            RecordKind::Address => Ok(Answer::Found(record)),
            RecordKind::Delegation => {
                let target = record.server_addr()?;
                self.resolve_via_delegation(target, query).await
            }
        }
    }

    /// One exchange with `server`. A record in the reply is cached before returning.
    ///
    /// A delegation whose target is not an `address:port` pair is rejected
    /// here and never cached, so the next query for that name asks again.
    async fn ask(&mut self, server: SocketAddr, query: &str) -> Result<Answer> {
        let reply = self.exchange.exchange(server, query).await?;
        self.stats.record_hop();

        let answer = Answer::parse_reply(&reply, self.expiry());
        match &answer {
            Answer::Found(record) => {
                if record.kind() == RecordKind::Delegation {
                    record.server_addr()?;
                }
                self.learn(record.clone());
            }
            Answer::Malformed(raw) => debug!(%server, reply = %raw, "malformed reply"),
            Answer::NoSuchName => {}
        }

        Ok(answer)
    }

    fn learn(&mut self, record: Record) {
        debug!(record = %record, "caching");
        self.store.add(record);
    }

    fn expiry(&self) -> Option<Instant> {
        if self.config.cache_ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + self.config.cache_ttl)
        }
    }

    /// Returns the number of records currently held.
    pub fn cache_len(&self) -> usize {
        self.store.len()
    }

    pub fn stats_snapshot_and_reset(&mut self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}

impl<E: Exchange> Handler for Resolver<E> {
    async fn respond(&mut self, query: &str) -> String {
        match self.resolve(query).await {
            Ok(answer) => answer.to_wire(),
            Err(_) => NO_SUCH_NAME.to_string(),
        }
    }

    fn report(&mut self) {
        let cache_len = self.cache_len();
        let stats = self.stats_snapshot_and_reset();
        info!(
            "[stats] cache={} requests={} local={} delegated={} forwarded={} failed={} hops={} avg_response={:.2}ms",
            cache_len,
            stats.requests,
            stats.local,
            stats.delegated,
            stats.forwarded,
            stats.failed,
            stats.hops,
            stats.avg_response_ms
        );
    }
}
