//! UDP transport.
//!
//! `UdpServer` owns the listening socket and handles one query at a time to
//! completion. `UdpExchange` owns separate ephemeral sockets used for
//! talking to other name servers, so replies from upstream never mix with
//! incoming client queries.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::{Exchange, Handler, MAX_MESSAGE_SIZE};

/// How often the server asks its handler to report.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Client side of the protocol.
///
/// Holds one ephemeral socket per address family, bound on first use, so a
/// delegation can move between IPv4 and IPv6 servers.
#[derive(Default)]
pub struct UdpExchange {
    v4: Option<UdpSocket>,
    v6: Option<UdpSocket>,
    timeout: Option<Duration>,
}

impl UdpExchange {
    /// Create an exchange with no sockets bound yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exchange and bind the socket for `peer`'s address family up front.
    pub async fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let mut exchange = Self::new();
        exchange.socket_for(peer).await?;

        Ok(exchange)
    }

    /// Bound the wait for each reply. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Local address of the socket used to reach `peer`, if one is bound.
    pub fn local_addr_for(&self, peer: SocketAddr) -> io::Result<SocketAddr> {
        let slot = if peer.is_ipv4() { &self.v4 } else { &self.v6 };
        match slot {
            Some(socket) => socket.local_addr(),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn slot(&mut self, peer: SocketAddr) -> &mut Option<UdpSocket> {
        if peer.is_ipv4() { &mut self.v4 } else { &mut self.v6 }
    }

    async fn socket_for(&mut self, peer: SocketAddr) -> io::Result<&UdpSocket> {
        let slot = self.slot(peer);
        let socket = match slot.take() {
            Some(socket) => socket,
            None => {
                let local: SocketAddr = if peer.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                UdpSocket::bind(local).await?
            }
        };

        Ok(slot.insert(socket))
    }
}

impl Exchange for UdpExchange {
    async fn exchange(&mut self, server: SocketAddr, query: &str) -> Result<String> {
        let timeout = self.timeout;
        let socket = self
            .socket_for(server)
            .await
            .map_err(|source| Error::Upstream {
                addr: server,
                source,
            })?;

        discard_queued(socket);
        socket
            .send_to(query.as_bytes(), server)
            .await
            .map_err(|source| Error::Upstream {
                addr: server,
                source,
            })?;

        let reply = recv_reply(socket, server);
        let outcome = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, reply).await.ok(),
            None => Some(reply.await),
        };

        match outcome {
            Some(result) => result,
            None => {
                // A late reply must not be read as the answer to the next query.
                self.slot(server).take();
                Err(Error::UpstreamTimeout {
                    addr: server,
                    timeout: timeout.unwrap_or_default(),
                })
            }
        }
    }
}

/// Drop datagrams already waiting on `socket` so the next read is a reply to the next send.
fn discard_queued(socket: &UdpSocket) {
    let mut buf = [0u8; MAX_MESSAGE_SIZE];

    while let Ok((_, src)) = socket.try_recv_from(&mut buf) {
        debug!(%src, "discarding queued datagram");
    }
}

/// Wait for the next datagram from `server`, discarding any from elsewhere.
async fn recv_reply(socket: &UdpSocket, server: SocketAddr) -> Result<String> {
    let mut buf = [0u8; MAX_MESSAGE_SIZE];

    loop {
        let (len, src) = socket
            .recv_from(&mut buf)
            .await
            .map_err(|source| Error::Upstream {
                addr: server,
                source,
            })?;

        if src != server {
            debug!(%src, expected = %server, "dropping stray datagram");
            continue;
        }

        return Ok(String::from_utf8_lossy(&buf[..len]).into_owned());
    }
}

/// Server side of the protocol.
pub struct UdpServer {
    socket: UdpSocket,
}

impl UdpServer {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve queries until `shutdown` completes.
    ///
    /// Each query is answered before the next datagram is read, so the
    /// handler never sees two queries at once.
    pub async fn serve<H, S>(self, mut handler: H, shutdown: S)
    where
        H: Handler,
        S: Future<Output = ()>,
    {
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        let mut interval = tokio::time::interval(REPORT_INTERVAL);
        interval.tick().await; // Skip first immediate tick
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    let (len, src) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(error = %e, "UDP recv error");
                            continue;
                        }
                    };

                    let query = String::from_utf8_lossy(&buf[..len]).into_owned();
                    let reply = handler.respond(&query).await;

                    if let Err(e) = self.socket.send_to(reply.as_bytes(), src).await {
                        warn!(error = %e, client = %src, "UDP reply error");
                    }
                }
                _ = interval.tick() => handler.report(),
                _ = &mut shutdown => {
                    info!("shutting down");
                    handler.report();
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Handler for Echo {
        async fn respond(&mut self, query: &str) -> String {
            format!("echo:{query}")
        }
    }

    #[tokio::test]
    async fn exchange_round_trip() {
        let server = UdpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut client = UdpExchange::bind_for(addr).await.unwrap();

        let serve = server.serve(Echo, std::future::pending());
        let reply = tokio::select! {
            _ = serve => unreachable!("server stopped"),
            reply = client.exchange(addr, "example.com") => reply.unwrap(),
        };

        assert_eq!(reply, "echo:example.com");
    }

    #[tokio::test]
    async fn exchange_times_out_on_silent_server() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();
        let mut client = UdpExchange::bind_for(addr)
            .await
            .unwrap()
            .with_timeout(Some(Duration::from_millis(50)));

        let err = client.exchange(addr, "example.com").await.unwrap_err();

        assert!(matches!(err, Error::UpstreamTimeout { addr: a, .. } if a == addr));
    }

    #[tokio::test]
    async fn exchange_ignores_stray_datagrams() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let stray = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut client = UdpExchange::bind_for(addr)
            .await
            .unwrap()
            .with_timeout(Some(Duration::from_secs(5)));
        let client_addr: SocketAddr =
            (Ipv4Addr::LOCALHOST, client.local_addr_for(addr).unwrap().port()).into();

        let upstream = async {
            let mut buf = [0u8; MAX_MESSAGE_SIZE];
            let (_, src) = server.recv_from(&mut buf).await.unwrap();
            stray.send_to(b"spoofed,6.6.6.6,A", client_addr).await.unwrap();
            server.send_to(b"example.com,1.2.3.4,A", src).await.unwrap();
        };

        let (reply, ()) = tokio::join!(client.exchange(addr, "example.com"), upstream);

        assert_eq!(reply.unwrap(), "example.com,1.2.3.4,A");
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = UdpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), server.serve(Echo, async {}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn late_reply_is_not_taken_for_next_answer() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut client = UdpExchange::new().with_timeout(Some(Duration::from_millis(100)));

        let upstream = async {
            let mut buf = [0u8; MAX_MESSAGE_SIZE];
            let (_, first) = server.recv_from(&mut buf).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            server.send_to(b"slow.com,1.1.1.1,A", first).await.unwrap();
            let (_, second) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(b"fast.com,2.2.2.2,A", second).await.unwrap();
        };
        let queries = async {
            let first = client.exchange(addr, "slow.com").await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            let second = client.exchange(addr, "fast.com").await;
            (first, second)
        };

        let ((first, second), ()) = tokio::join!(queries, upstream);

        assert!(matches!(first, Err(Error::UpstreamTimeout { .. })));
        assert_eq!(second.unwrap(), "fast.com,2.2.2.2,A");
    }

    #[tokio::test]
    async fn queued_datagram_is_discarded_before_send() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut client = UdpExchange::bind_for(addr)
            .await
            .unwrap()
            .with_timeout(Some(Duration::from_secs(5)));
        let client_addr: SocketAddr =
            (Ipv4Addr::LOCALHOST, client.local_addr_for(addr).unwrap().port()).into();

        server.send_to(b"stale.com,6.6.6.6,A", client_addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let upstream = async {
            let mut buf = [0u8; MAX_MESSAGE_SIZE];
            let (_, src) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(b"example.com,1.2.3.4,A", src).await.unwrap();
        };

        let (reply, ()) = tokio::join!(client.exchange(addr, "example.com"), upstream);

        assert_eq!(reply.unwrap(), "example.com,1.2.3.4,A");
    }

    #[tokio::test]
    async fn exchange_reaches_both_address_families() {
        let Ok(v6_server) = UdpSocket::bind("[::1]:0").await else {
            return; // no IPv6 loopback on this host
        };
        let v4_server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let v4_addr = v4_server.local_addr().unwrap();
        let v6_addr = v6_server.local_addr().unwrap();
        let mut client = UdpExchange::bind_for(v4_addr)
            .await
            .unwrap()
            .with_timeout(Some(Duration::from_secs(5)));

        assert!(client.local_addr_for(v6_addr).is_err());

        let answer = |socket: UdpSocket, reply: &'static str| async move {
            let mut buf = [0u8; MAX_MESSAGE_SIZE];
            let (_, src) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(reply.as_bytes(), src).await.unwrap();
        };

        let (v4_reply, ()) = tokio::join!(
            client.exchange(v4_addr, "example.com"),
            answer(v4_server, "com,[::1]:53,NS")
        );
        let (v6_reply, ()) = tokio::join!(
            client.exchange(v6_addr, "example.com"),
            answer(v6_server, "example.com,1.2.3.4,A")
        );

        assert_eq!(v4_reply.unwrap(), "com,[::1]:53,NS");
        assert_eq!(v6_reply.unwrap(), "example.com,1.2.3.4,A");
        assert!(client.local_addr_for(v6_addr).is_ok());
    }
}
