//! Record store with lazy TTL-based expiration.

use std::time::Instant;

use crate::record::{Answer, Record, RecordKind};

/// Ordered collection of records.
///
/// Insertion order defines scan order. Expired records may sit in the
/// sequence until the next read, which always sweeps them first.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. No deduplication.
    pub fn add(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Drop every record whose expiry has passed. Returns how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&mut self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|record| !record.is_expired_at(now));

        before - self.records.len()
    }

    /// Look up a query against the live records.
    ///
    /// Exact address matches win over delegation matches regardless of
    /// insertion order. A delegation matches when the query ends with its
    /// name, so `com` covers `example.com`. Within each pass the first
    /// inserted record wins.
    pub fn resolve(&mut self, query: &str) -> Answer {
        self.resolve_at(query, Instant::now())
    }

    pub fn resolve_at(&mut self, query: &str, now: Instant) -> Answer {
        self.sweep_expired_at(now);

        let address = self
            .records
            .iter()
            .find(|r| r.kind() == RecordKind::Address && r.name() == query);
        let found = address.or_else(|| {
            self.records
                .iter()
                .find(|r| r.kind() == RecordKind::Delegation && query.ends_with(r.name()))
        });

        match found {
            Some(record) => Answer::Found(record.clone()),
            None => Answer::NoSuchName,
        }
    }

    /// Number of records held, including any not yet swept.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl From<Vec<Record>> for RecordStore {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
