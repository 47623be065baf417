//! Round lifecycle: countdown, active play, goals, resets and game end.
//!
//! The server decides every transition that changes scores or ball direction
//! and describes it with a [`RoundReset`]. The client applies those verbatim.

use glam::IVec2;
use rand::Rng;

use crate::arena::Arena;
use crate::config::SessionConfig;
use crate::net::RoundReset;
use crate::replication::{EntityId, Motion, ReplicatedEntity};
use crate::role::{Role, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Ball held until the deadline. [`NO_SERVE`] while no reset has been
    /// seen yet.
    Countdown { until: i64 },
    Active,
    Ended { at: i64 },
}

/// Countdown deadline carried by the reset that closes a finished game.
pub const NO_SERVE: i64 = i64::MAX;

/// Result of a goal resolved by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    Reset(RoundReset),
    /// `reset` carries the final scores and parks the ball.
    GameOver { winner: Side, reset: RoundReset },
}

#[derive(Debug)]
pub struct RoundController {
    role: Role,
    state: RoundState,
    left_score: u32,
    right_score: u32,
    score_limit: u32,
    countdown_ms: i64,
    end_grace_ms: i64,
    shutdown_at: Option<i64>,
}

impl RoundController {
    pub fn new(role: Role, config: &SessionConfig) -> Self {
        Self {
            role,
            state: RoundState::Countdown { until: NO_SERVE },
            left_score: 0,
            right_score: 0,
            score_limit: config.score_limit.max(1),
            countdown_ms: config.countdown_ms,
            end_grace_ms: config.end_grace_ms,
            shutdown_at: None,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.left_score, self.right_score)
    }

    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == RoundState::Active
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, RoundState::Ended { .. })
    }

    /// Moves an expired countdown to `Active`. Returns true on that edge.
    pub fn update(&mut self, now: i64) -> bool {
        match self.state {
            RoundState::Countdown { until } if now >= until => {
                self.state = RoundState::Active;
                log::info!("round started at {now}");
                true
            }
            _ => false,
        }
    }

    pub fn ball_may_move(&self, now: i64) -> bool {
        match self.state {
            RoundState::Active => true,
            RoundState::Countdown { until } => now >= until,
            RoundState::Ended { .. } => false,
        }
    }

    /// Picks a fresh ball direction and starts a countdown at `now`.
    pub fn start_round<R: Rng>(&mut self, now: i64, rng: &mut R) -> RoundReset {
        let reset = RoundReset {
            time: now,
            countdown_until: now.saturating_add(self.countdown_ms),
            ball_direction: random_direction(rng),
            left_score: self.left_score,
            right_score: self.right_score,
        };
        self.state = RoundState::Countdown {
            until: reset.countdown_until,
        };
        log::info!(
            "countdown until {} ({}-{})",
            reset.countdown_until,
            self.left_score,
            self.right_score
        );
        reset
    }

    /// Awards a point to `scorer`. Ends the game once the limit is reached,
    /// otherwise starts the next round.
    pub fn score<R: Rng>(&mut self, scorer: Side, now: i64, rng: &mut R) -> GoalOutcome {
        match scorer {
            Side::Left => self.left_score += 1,
            Side::Right => self.right_score += 1,
        }
        log::info!(
            "goal for {:?}: {}-{}",
            scorer,
            self.left_score,
            self.right_score
        );

        if self.score_of(scorer) >= self.score_limit {
            self.end(now);
            let reset = RoundReset {
                time: now,
                countdown_until: NO_SERVE,
                ball_direction: IVec2::ZERO,
                left_score: self.left_score,
                right_score: self.right_score,
            };
            GoalOutcome::GameOver {
                winner: scorer,
                reset,
            }
        } else {
            GoalOutcome::Reset(self.start_round(now, rng))
        }
    }

    /// A client `goal` only counts while the ball is in play and heading for
    /// the right goal.
    pub fn accepts_client_goal(&self, ball: Motion) -> bool {
        self.role.is_server() && self.is_active() && ball.direction.x > 0
    }

    pub fn apply_reset(&mut self, reset: &RoundReset) {
        self.left_score = reset.left_score;
        self.right_score = reset.right_score;
        if !self.is_ended() {
            self.state = RoundState::Countdown {
                until: reset.countdown_until,
            };
        }
    }

    /// Ends the game and schedules shutdown after the grace period. Repeated
    /// calls keep the first deadline.
    pub fn end(&mut self, now: i64) {
        if self.is_ended() {
            return;
        }
        let shutdown_at = now.saturating_add(self.end_grace_ms);
        self.state = RoundState::Ended { at: now };
        self.shutdown_at = Some(shutdown_at);
        log::info!(
            "game over {}-{}, closing at {}",
            self.left_score,
            self.right_score,
            shutdown_at
        );
    }

    pub fn shutdown_at(&self) -> Option<i64> {
        self.shutdown_at
    }

    pub fn shutdown_due(&self, now: i64) -> bool {
        self.shutdown_at.is_some_and(|at| now >= at)
    }
}

/// Independent uniform sign per axis.
pub fn random_direction<R: Rng>(rng: &mut R) -> IVec2 {
    let sign = |positive: bool| if positive { 1 } else { -1 };
    IVec2::new(sign(rng.gen_bool(0.5)), sign(rng.gen_bool(0.5)))
}

/// Returns every entity to its canonical start at the reset time. Paddles keep
/// their current direction input.
pub fn reset_entities(
    entities: &mut [ReplicatedEntity; 3],
    arena: &Arena,
    reset: &RoundReset,
    ball_velocity: i32,
) {
    for entity in entities.iter_mut() {
        let (rect, motion) = match entity.id() {
            EntityId::LeftPaddle => (arena.left_paddle_start(), entity.motion()),
            EntityId::RightPaddle => (arena.right_paddle_start(), entity.motion()),
            EntityId::Ball => (
                arena.ball_start(),
                Motion::new(reset.ball_direction, ball_velocity),
            ),
        };
        entity.reset(reset.time, rect, motion);
    }
}
