//! Round-trip and clock offset estimation between the two nodes.
//!
//! A node stamps its pings and the peer echoes that stamp back next to its own
//! game time, which gives the requester one RTT sample and, on the client, one
//! clock offset sample:
//!
//! ```text
//! offset = ((t1 - t0) + (t1 - t2)) / 2
//! ```
//!
//! Stamps come off the wire, so every step is checked and a sample that does
//! not fit in an `i64` or runs backwards is refused. The server defines game
//! time and never moves its own offset.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::net::Message;
use crate::role::Role;

/// How a fresh offset sample is folded into the running offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Take the latest sample as the offset.
    #[default]
    Replace,
    /// Exponential moving average; `percent` is the weight of the new sample.
    Smoothed { percent: u8 },
    /// Pings carry game time, so each sample is a correction relative to the
    /// current offset and is added onto it. A sample taken while an earlier
    /// correction was still in flight is measured against the old offset.
    Accumulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    pub round_trip_ms: i64,
    pub remote_lag_ms: i64,
    pub offset_ms: i64,
}

#[derive(Debug)]
pub struct ClockSync {
    role: Role,
    policy: OffsetPolicy,
    lag_quantum_ms: i64,
    ping_interval_ms: i64,
    offset_ms: i64,
    remote_lag_ms: i64,
    last_round_trip_ms: Option<i64>,
    samples: u32,
    next_ping_at: Option<i64>,
}

impl ClockSync {
    pub fn new(role: Role, config: &SessionConfig) -> Self {
        Self {
            role,
            policy: config.offset_policy,
            lag_quantum_ms: config.lag_quantum_ms.max(1),
            ping_interval_ms: config.ping_interval_ms,
            offset_ms: 0,
            remote_lag_ms: 0,
            last_round_trip_ms: None,
            samples: 0,
            next_ping_at: None,
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    pub fn remote_lag_ms(&self) -> i64 {
        self.remote_lag_ms
    }

    pub fn last_round_trip_ms(&self) -> Option<i64> {
        self.last_round_trip_ms
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Shared game time for a local wall-clock reading.
    pub fn game_time(&self, local_now: i64) -> i64 {
        local_now.saturating_add(self.offset_ms)
    }

    /// Timestamp put on outgoing pings and compared against echoed ones.
    fn stamp(&self, local_now: i64) -> i64 {
        match self.policy {
            OffsetPolicy::Accumulate => self.game_time(local_now),
            OffsetPolicy::Replace | OffsetPolicy::Smoothed { .. } => local_now,
        }
    }

    /// Builds a stamped ping and pushes the periodic schedule forward.
    pub fn ping(&mut self, local_now: i64) -> Message {
        self.next_ping_at = Some(local_now.saturating_add(self.ping_interval_ms));
        Message::Ping {
            t0: self.stamp(local_now),
        }
    }

    /// Returns a ping once the interval since the last one has elapsed.
    pub fn poll(&mut self, local_now: i64) -> Option<Message> {
        match self.next_ping_at {
            Some(due) if local_now < due => None,
            _ => Some(self.ping(local_now)),
        }
    }

    /// Answers a peer ping immediately with our game time.
    pub fn on_ping(&self, t0: i64, local_now: i64) -> Message {
        Message::Pong {
            t0,
            t1: self.game_time(local_now),
        }
    }

    /// Folds in the answer to one of our pings. Returns `None` and leaves
    /// the clock untouched when the echoed stamps are impossible.
    pub fn on_pong(&mut self, t0: i64, t1: i64, local_now: i64) -> Option<ClockSample> {
        let received = self.stamp(local_now);
        let round_trip = received.checked_sub(t0).filter(|rtt| *rtt >= 0)?;
        let half = round_trip / 2;
        let remote_lag = half.checked_add(self.lag_quantum_ms - half.rem_euclid(self.lag_quantum_ms))?;

        let offset = if self.role == Role::Client {
            let sample = t1
                .checked_sub(t0)?
                .checked_add(t1.checked_sub(received)?)?
                / 2;
            self.fold(sample)?
        } else {
            self.offset_ms
        };

        self.remote_lag_ms = remote_lag;
        self.last_round_trip_ms = Some(round_trip);
        self.offset_ms = offset;
        self.samples += 1;

        log::debug!(
            "clock sample: rtt={}ms lag={}ms offset={}ms",
            round_trip,
            self.remote_lag_ms,
            self.offset_ms
        );

        Some(ClockSample {
            round_trip_ms: round_trip,
            remote_lag_ms: self.remote_lag_ms,
            offset_ms: self.offset_ms,
        })
    }

    fn fold(&self, sample: i64) -> Option<i64> {
        match self.policy {
            OffsetPolicy::Replace => Some(sample),
            OffsetPolicy::Smoothed { percent } if self.samples > 0 => {
                let weight = i64::from(percent.min(100));
                let step = sample.checked_sub(self.offset_ms)?.checked_mul(weight)? / 100;
                self.offset_ms.checked_add(step)
            }
            OffsetPolicy::Smoothed { .. } => Some(sample),
            OffsetPolicy::Accumulate => self.offset_ms.checked_add(sample),
        }
    }
}

/// Milliseconds on the local wall clock.
pub fn local_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
