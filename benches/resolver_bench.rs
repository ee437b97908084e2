//! Benchmarks for resolver request handling over UDP.
//!
//! A mock parent delegates every name to a mock leaf server, each adding
//! simulated network latency. Measures a warm cache hit against a cold walk
//! (a fresh query name every iteration, so parent and leaf are both asked).

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

use waypoint::resolver::{Resolver, ResolverConfig};
use waypoint::transport::Exchange;
use waypoint::transport::udp::{UdpExchange, UdpServer};

const MAX_MESSAGE_SIZE: usize = 1024;

const RESOLVER_ADDR: &str = "127.0.0.1:15360";
const PARENT_ADDR: &str = "127.0.0.1:15361";
const LEAF_ADDR: &str = "127.0.0.1:15362";

/// Simulated per-hop latency on loopback
const BASE_LATENCY_US: u64 = 500;
const JITTER_US: u64 = 200;

async fn simulate_latency() {
    let jitter = rand::rng().random_range(0..=JITTER_US * 2);
    let latency = BASE_LATENCY_US - JITTER_US + jitter;
    tokio::time::sleep(Duration::from_micros(latency)).await;
}

/// Mock server replying with whatever `answer` builds from the query.
async fn mock_server(socket: UdpSocket, answer: fn(&str) -> String) {
    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    loop {
        if let Ok((len, src)) = socket.recv_from(&mut buf).await {
            let query = String::from_utf8_lossy(&buf[..len]).into_owned();
            simulate_latency().await;
            let _ = socket.send_to(answer(&query).as_bytes(), src).await;
        }
    }
}

fn start_mock_servers() {
    std::thread::spawn(move || {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let parent = UdpSocket::bind(PARENT_ADDR).await.unwrap();
            let leaf = UdpSocket::bind(LEAF_ADDR).await.unwrap();
            tokio::join!(
                mock_server(parent, |query| format!("{query},{LEAF_ADDR},NS")),
                mock_server(leaf, |query| format!("{query},93.184.216.34,A")),
            );
        });
    });

    std::thread::sleep(Duration::from_millis(50));
}

fn start_resolver() {
    let resolver_addr: SocketAddr = RESOLVER_ADDR.parse().unwrap();
    let parent_addr: SocketAddr = PARENT_ADDR.parse().unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let local = LocalSet::new();

        local.block_on(&rt, async {
            let server = UdpServer::bind(resolver_addr).await.unwrap();
            let exchange = UdpExchange::bind_for(parent_addr).await.unwrap();
            let resolver = Resolver::new(ResolverConfig::new(parent_addr), exchange);

            server.serve(resolver, std::future::pending()).await;
        });
    });

    std::thread::sleep(Duration::from_millis(50));
}

fn bench_resolver(c: &mut Criterion) {
    start_mock_servers();
    start_resolver();

    let rt = Runtime::new().unwrap();
    let resolver_addr: SocketAddr = RESOLVER_ADDR.parse().unwrap();
    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("resolver");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("udp", "cached"), |b| {
        b.to_async(&rt).iter(|| async {
            let mut client = UdpExchange::bind_for(resolver_addr)
                .await
                .unwrap()
                .with_timeout(Some(Duration::from_secs(5)));
            client.exchange(resolver_addr, "www.example.com").await.unwrap()
        });
    });

    group.bench_function(BenchmarkId::new("udp", "delegation_walk"), |b| {
        b.to_async(&rt).iter(|| async {
            let id = counter.fetch_add(1, Ordering::Relaxed);
            let mut client = UdpExchange::bind_for(resolver_addr)
                .await
                .unwrap()
                .with_timeout(Some(Duration::from_secs(5)));
            client
                .exchange(resolver_addr, &format!("host{id}.example.org"))
                .await
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolver);
criterion_main!(benches);
