//! Name records and the text wire format.
//!
//! Every message is a single line of text. A positive answer is
//! `name,target,kind` with `kind` either `A` or `NS`; a negative answer is
//! the literal [`NO_SUCH_NAME`] string. Fields are not escaped.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::{Error, Result};

/// Reply sent when no record matches a query.
pub const NO_SUCH_NAME: &str = "non-existent domain";

const FIELD_SEPARATOR: char = ',';

/// The two kinds of binding a record can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Name maps to a directly usable network address.
    Address,
    /// Name (or name suffix) is served by another name server.
    Delegation,
}

impl RecordKind {
    /// Parse a kind tag. Only `A` and `NS` are accepted.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "A" => Some(RecordKind::Address),
            "NS" => Some(RecordKind::Delegation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Address => "A",
            RecordKind::Delegation => "NS",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One name-to-target binding.
///
/// Name and target are trimmed at construction and never change afterwards.
/// A record with an `expires_at` in the past is logically deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    target: String,
    kind: RecordKind,
    expires_at: Option<Instant>,
}

impl Record {
    pub fn new(name: &str, target: &str, kind: RecordKind, expires_at: Option<Instant>) -> Self {
        Self {
            name: name.trim().to_string(),
            target: target.trim().to_string(),
            kind,
            expires_at,
        }
    }

    /// Parse a `name,target,kind` line.
    ///
    /// Returns `None` unless the line has exactly three fields and a known kind.
    pub fn parse_line(line: &str, expires_at: Option<Instant>) -> Option<Self> {
        let mut fields = line.split(FIELD_SEPARATOR);
        let (Some(name), Some(target), Some(kind), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return None;
        };

        let kind = RecordKind::parse(kind)?;

        Some(Self::new(name, target, kind, expires_at))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// True once `now` has reached the expiry instant. Records without one never expire.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// The name server this record points at, as a socket address.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        self.target
            .parse()
            .map_err(|_| Error::InvalidTarget(self.target.clone()))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.name, self.target, self.kind)
    }
}

/// Result of a lookup or of one exchange with a name server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Found(Record),
    NoSuchName,
    /// A reply that is neither the negative sentinel nor a valid record.
    /// Carried verbatim back to the original caller.
    Malformed(String),
}

impl Answer {
    /// Interpret a name server's reply.
    ///
    /// Records parsed out of the reply get `expires_at` attached.
    pub fn parse_reply(reply: &str, expires_at: Option<Instant>) -> Self {
        if reply.trim() == NO_SUCH_NAME {
            return Answer::NoSuchName;
        }

        match Record::parse_line(reply, expires_at) {
            Some(record) => Answer::Found(record),
            None => Answer::Malformed(reply.to_string()),
        }
    }

    /// Encode the answer as a reply message.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Found(record) => record.fmt(f),
            Answer::NoSuchName => f.write_str(NO_SUCH_NAME),
            Answer::Malformed(raw) => f.write_str(raw),
        }
    }
}
