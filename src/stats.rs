//! Statistics tracking for the resolver.

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Address record found in the local store.
    Local,
    /// Local delegation followed through the name server chain.
    Delegated,
    /// Miss forwarded to the parent server.
    Forwarded,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Local => "LOCAL",
            Resolution::Delegated => "DELEGATED",
            Resolution::Forwarded => "FORWARDED",
        }
    }
}

/// Counters accumulated between reports.
#[derive(Debug, Default)]
pub struct Stats {
    requests: u64,
    local: u64,
    delegated: u64,
    forwarded: u64,
    failed: u64,
    hops: u64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resolution: Resolution, response_time_ms: f64) {
        match resolution {
            Resolution::Local => self.local += 1,
            Resolution::Delegated => self.delegated += 1,
            Resolution::Forwarded => self.forwarded += 1,
        }
        self.record_request(response_time_ms);
    }

    pub fn record_failed(&mut self, response_time_ms: f64) {
        self.failed += 1;
        self.record_request(response_time_ms);
    }

    /// Count one exchange with an upstream server.
    pub fn record_hop(&mut self) {
        self.hops += 1;
    }

    fn record_request(&mut self, response_time_ms: f64) {
        self.requests += 1;
        self.total_response_time_us += (response_time_ms * 1000.0) as u64;
    }

    pub fn snapshot_and_reset(&mut self) -> StatsSnapshot {
        let stats = std::mem::take(self);

        let avg_response_ms = if stats.requests > 0 {
            (stats.total_response_time_us as f64 / stats.requests as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            requests: stats.requests,
            local: stats.local,
            delegated: stats.delegated,
            forwarded: stats.forwarded,
            failed: stats.failed,
            hops: stats.hops,
            avg_response_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub local: u64,
    pub delegated: u64,
    pub forwarded: u64,
    pub failed: u64,
    pub hops: u64,
    pub avg_response_ms: f64,
}
