//! Interactive query client.
//!
//! Reads one name per line from stdin, sends it to a server and prints the
//! target of the answer, or the raw reply when it is not a record.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::error::Result;
use crate::transport::Exchange;
use crate::transport::udp::UdpExchange;

/// Read names from stdin until EOF, printing one answer per line.
pub async fn run(server: SocketAddr, timeout: Option<Duration>) -> Result<()> {
    let mut exchange = UdpExchange::bind_for(server).await?.with_timeout(timeout);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match exchange.exchange(server, &line).await {
            Ok(reply) => println!("{}", display_reply(&reply)),
            Err(e) => warn!(query = %line, error = %e, "no answer"),
        }
    }

    Ok(())
}

/// The part of a reply worth showing: the target of a record, else the whole reply.
pub fn display_reply(reply: &str) -> &str {
    let fields: Vec<&str> = reply.split(',').collect();
    match fields.as_slice() {
        [_, target, _] => *target,
        _ => reply,
    }
}
