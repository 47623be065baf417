#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub malformed_dropped: u64,
    /// Parsed fine but carried values no peer could have produced.
    pub invalid_dropped: u64,
    pub stale_dropped: u64,
    pub role_violations: u64,
    pub reconciliations: u64,
    pub rtt_ms: Option<i64>,
    pub remote_lag_ms: i64,
    pub clock_offset_ms: i64,
}

impl NetworkStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received_bytes(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }
}
