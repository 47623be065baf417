use crate::clock::ClockSample;
use crate::role::Side;

/// Lifecycle notifications for whoever drives the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ClockSampled(ClockSample),
    CountdownStarted {
        until: i64,
        left_score: u32,
        right_score: u32,
    },
    RoundStarted {
        at: i64,
    },
    GoalScored {
        scorer: Side,
        left_score: u32,
        right_score: u32,
    },
    GameOver {
        left_score: u32,
        right_score: u32,
    },
    EndAcknowledged,
    ConnectionLost {
        reason: String,
    },
}
