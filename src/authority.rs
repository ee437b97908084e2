//! Leaf record server.
//!
//! Answers straight from its zone: an address record, a delegation record
//! for the caller to follow, or the negative sentinel. Never contacts other
//! servers.

use tracing::info;

use crate::cache::RecordStore;
use crate::record::Record;
use crate::transport::Handler;

pub struct Authority {
    store: RecordStore,
    served: u64,
    verbose: bool,
}

impl Authority {
    pub fn new(records: Vec<Record>, verbose: bool) -> Self {
        Self {
            store: RecordStore::from(records),
            served: 0,
            verbose,
        }
    }

    /// Look up one query in the zone.
    pub fn answer(&mut self, query: &str) -> String {
        let query = query.trim();
        let reply = self.store.resolve(query).to_wire();
        self.served += 1;

        if self.verbose {
            info!(query, reply = %reply, "ANSWERED");
        }
        reply
    }

    pub fn record_count(&self) -> usize {
        self.store.len()
    }
}

impl Handler for Authority {
    async fn respond(&mut self, query: &str) -> String {
        self.answer(query)
    }

    fn report(&mut self) {
        info!("[stats] records={} served={}", self.record_count(), self.served);
        self.served = 0;
    }
}
