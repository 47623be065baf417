use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::history::StateHistory;
use crate::arena::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityId {
    LeftPaddle = 0,
    RightPaddle = 1,
    Ball = 2,
}

impl EntityId {
    pub const ALL: [EntityId; 3] = [Self::LeftPaddle, Self::RightPaddle, Self::Ball];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_paddle(self) -> bool {
        !matches!(self, Self::Ball)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftPaddle => "left paddle",
            Self::RightPaddle => "right paddle",
            Self::Ball => "ball",
        }
    }
}

/// Whether this node simulates the entity or only replays what the peer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motion {
    pub direction: IVec2,
    pub velocity: i32,
}

impl Motion {
    pub fn new(direction: IVec2, velocity: i32) -> Self {
        Self {
            direction,
            velocity,
        }
    }

    pub fn step(&self) -> IVec2 {
        self.direction * self.velocity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Local predictions disagreed and were replaced from this update onward.
    Reconciled,
    /// Not newer than the last accepted update for this entity.
    Stale,
    /// The entity is owned here; remote writes are not accepted.
    Rejected,
}

/// A paddle or the ball, replicated between the two nodes.
#[derive(Debug, Clone)]
pub struct ReplicatedEntity {
    id: EntityId,
    authority: Authority,
    motion: Motion,
    history: StateHistory,
    last_remote_time: Option<i64>,
}

impl ReplicatedEntity {
    pub fn new(
        id: EntityId,
        authority: Authority,
        rect: Rect,
        motion: Motion,
        time: i64,
        history_capacity: usize,
    ) -> Self {
        Self {
            id,
            authority,
            motion,
            history: StateHistory::new(history_capacity, time, rect),
            last_remote_time: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_owned(&self) -> bool {
        self.authority == Authority::Local
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn set_motion(&mut self, motion: Motion) {
        self.motion = motion;
    }

    pub fn set_direction(&mut self, direction: IVec2) {
        self.motion.direction = direction;
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Newest recorded rectangle; the base for the next simulation step.
    pub fn current(&self) -> Rect {
        self.history.latest().rect
    }

    /// Where the entity should be shown at game time `time`.
    ///
    /// Owned entities are always at their latest simulated state. Remote ones
    /// are replayed `remote_lag` behind so late updates do not cause snapping.
    pub fn position_at(&self, time: i64, remote_lag: i64) -> Rect {
        match self.authority {
            Authority::Local => self.history.latest().rect,
            Authority::Remote => self.history.sample_at(time.saturating_sub(remote_lag)),
        }
    }

    /// Rectangle after one step of the current motion, not yet recorded.
    pub fn advanced(&self) -> Rect {
        self.current().translated(self.motion.step())
    }

    /// Records a locally simulated or predicted state.
    pub fn record(&mut self, time: i64, rect: Rect) -> bool {
        self.history.record(time, rect)
    }

    /// Restamps states written ahead of `time` so local simulation can keep
    /// recording after game time moved backwards.
    pub fn rewind_to(&mut self, time: i64) {
        self.history.rewind_to(time);
    }

    pub fn apply_remote_update(
        &mut self,
        time: i64,
        rect: Rect,
        motion: Option<Motion>,
    ) -> UpdateOutcome {
        if self.is_owned() {
            return UpdateOutcome::Rejected;
        }
        if self.last_remote_time.is_some_and(|last| time <= last) {
            return UpdateOutcome::Stale;
        }
        self.last_remote_time = Some(time);

        if self.id.is_paddle() {
            self.history.record(time, rect);
            return UpdateOutcome::Applied;
        }

        let predicted = self.history.sample_at(time);
        let mut diverged = predicted.position() != rect.position();
        if let Some(motion) = motion {
            diverged |= motion != self.motion;
            self.motion = motion;
        }

        if diverged {
            self.history.clear_from(time, rect);
            self.history.record(time, rect);
            UpdateOutcome::Reconciled
        } else {
            self.history.record(time, rect);
            UpdateOutcome::Applied
        }
    }

    /// Puts the entity back at `rect` from `time` on and forgets anything
    /// recorded after it.
    pub fn reset(&mut self, time: i64, rect: Rect, motion: Motion) {
        self.history.clear_from(time, rect);
        self.history.record(time, rect);
        self.motion = motion;
        if !self.is_owned() {
            self.last_remote_time = Some(time);
        }
    }
}
