use serde::{Deserialize, Serialize};

use crate::arena::{Arena, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::clock::OffsetPolicy;

pub const DEFAULT_TICK_MS: i64 = 10;
pub const DEFAULT_PING_INTERVAL_MS: i64 = 1000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub arena_width: i32,
    pub arena_height: i32,

    pub tick_ms: i64,

    pub ping_interval_ms: i64,
    pub initial_pings: u32,
    pub lag_quantum_ms: i64,
    pub offset_policy: OffsetPolicy,

    pub countdown_ms: i64,
    pub end_grace_ms: i64,
    pub score_limit: u32,

    pub ball_initial_velocity: i32,
    pub ball_max_velocity: i32,
    pub ball_velocity_step: i32,
    pub paddle_velocity: i32,

    pub history_capacity: usize,
    pub peer_timeout_ms: u64,

    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            arena_width: DEFAULT_WIDTH,
            arena_height: DEFAULT_HEIGHT,

            tick_ms: DEFAULT_TICK_MS,

            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            initial_pings: 2,
            lag_quantum_ms: 50,
            offset_policy: OffsetPolicy::Replace,

            countdown_ms: 2000,
            end_grace_ms: 2000,
            score_limit: 5,

            ball_initial_velocity: 2,
            ball_max_velocity: 8,
            ball_velocity_step: 1,
            paddle_velocity: DEFAULT_WIDTH / 100,

            history_capacity: DEFAULT_HISTORY_CAPACITY,
            peer_timeout_ms: 120_000,

            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn arena(&self) -> Arena {
        Arena::new(self.arena_width, self.arena_height)
    }
}
