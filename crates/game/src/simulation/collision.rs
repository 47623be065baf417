use crate::arena::{Arena, Rect};
use crate::config::SessionConfig;
use crate::replication::Motion;
use crate::role::Side;

/// Ball speed-up rules applied on paddle hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallRules {
    pub initial_velocity: i32,
    pub max_velocity: i32,
    pub velocity_step: i32,
}

impl BallRules {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            initial_velocity: config.ball_initial_velocity,
            max_velocity: config.ball_max_velocity,
            velocity_step: config.ball_velocity_step,
        }
    }

    pub fn accelerate(&self, velocity: i32) -> i32 {
        (velocity + self.velocity_step).min(self.max_velocity)
    }
}

/// What happened to the ball during one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallStep {
    pub rect: Rect,
    pub motion: Motion,
    pub wall_bounce: bool,
    pub paddle_hit: Option<Side>,
    /// The side that scored, if the ball entered a goal.
    pub goal: Option<Side>,
}

pub fn move_paddle(arena: &Arena, paddle: Rect, motion: Motion) -> Rect {
    arena.clamp_paddle(paddle.translated(motion.step()))
}

/// Advances the ball by one step and resolves walls, paddles and goals.
///
/// Only the wall facing the vertical direction of travel, and only the
/// paddle and goal facing the horizontal direction, are checked.
pub fn step_ball(
    arena: &Arena,
    rules: &BallRules,
    ball: Rect,
    motion: Motion,
    left_paddle: Rect,
    right_paddle: Rect,
) -> BallStep {
    let mut rect = ball.translated(motion.step());
    let mut motion = motion;
    let mut wall_bounce = false;

    if motion.direction.y > 0 {
        if rect.intersects(&arena.bottom_wall) {
            rect.y = arena.bottom_wall.y - rect.h;
            motion.direction.y = -motion.direction.y;
            wall_bounce = true;
        }
    } else if rect.intersects(&arena.top_wall) {
        rect.y = arena.top_wall.bottom();
        motion.direction.y = -motion.direction.y;
        wall_bounce = true;
    }

    let mut paddle_hit = None;
    let mut goal = None;
    if motion.direction.x < 0 {
        if rect.intersects(&arena.left_goal) {
            goal = Some(Side::Right);
        } else if rect.intersects(&left_paddle) {
            rect.x = left_paddle.right();
            motion.direction.x = -motion.direction.x;
            motion.velocity = rules.accelerate(motion.velocity);
            paddle_hit = Some(Side::Left);
        }
    } else if rect.intersects(&arena.right_goal) {
        goal = Some(Side::Left);
    } else if rect.intersects(&right_paddle) {
        rect.x = right_paddle.x - rect.w;
        motion.direction.x = -motion.direction.x;
        motion.velocity = rules.accelerate(motion.velocity);
        paddle_hit = Some(Side::Right);
    }

    BallStep {
        rect,
        motion,
        wall_bounce,
        paddle_hit,
        goal,
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec2;

    use super::*;

    fn rules() -> BallRules {
        BallRules::from_config(&SessionConfig::default())
    }

    #[test]
    fn ball_bounces_off_the_top_wall() {
        let arena = Arena::default();
        let ball = Rect::new(400, 22, 20, 20);
        let motion = Motion::new(IVec2::new(1, -1), 4);

        let step = step_ball(
            &arena,
            &rules(),
            ball,
            motion,
            arena.left_paddle_start(),
            arena.right_paddle_start(),
        );

        assert!(step.wall_bounce);
        assert_eq!(step.rect.y, arena.top_wall.bottom());
        assert_eq!(step.motion.direction, IVec2::new(1, 1));
    }

    #[test]
    fn paddle_hit_reverses_and_speeds_up() {
        let arena = Arena::default();
        let paddle = arena.right_paddle_start();
        let ball = Rect::new(paddle.x - 22, 280, 20, 20);

        let step = step_ball(
            &arena,
            &rules(),
            ball,
            Motion::new(IVec2::new(1, 1), 3),
            arena.left_paddle_start(),
            paddle,
        );

        assert_eq!(step.paddle_hit, Some(Side::Right));
        assert_eq!(step.rect.right(), paddle.x);
        assert_eq!(step.motion, Motion::new(IVec2::new(-1, 1), 4));
    }

    #[test]
    fn velocity_never_exceeds_the_ceiling() {
        let rules = rules();
        let mut velocity = rules.initial_velocity;
        let mut seen = vec![velocity];
        for _ in 0..10 {
            velocity = rules.accelerate(velocity);
            seen.push(velocity);
        }

        assert_eq!(&seen[..8], &[2, 3, 4, 5, 6, 7, 8, 8]);
        assert!(seen.iter().all(|&v| v <= rules.max_velocity));
    }

    #[test]
    fn ball_in_left_goal_scores_for_right() {
        let arena = Arena::default();
        let ball = Rect::new(-20, 100, 20, 20);

        let step = step_ball(
            &arena,
            &rules(),
            ball,
            Motion::new(IVec2::new(-1, 1), 2),
            arena.left_paddle_start(),
            arena.right_paddle_start(),
        );

        assert_eq!(step.goal, Some(Side::Right));
        assert_eq!(step.paddle_hit, None);
    }

    #[test]
    fn goal_behind_the_ball_is_ignored() {
        let arena = Arena::default();
        let ball = Rect::new(-20, 100, 20, 20);

        let step = step_ball(
            &arena,
            &rules(),
            ball,
            Motion::new(IVec2::new(1, 1), 2),
            arena.left_paddle_start(),
            arena.right_paddle_start(),
        );

        assert_eq!(step.goal, None);
    }

    #[test]
    fn paddle_stops_at_the_walls() {
        let arena = Arena::default();
        let paddle = Rect::new(30, 22, 20, 100);

        let moved = move_paddle(&arena, paddle, Motion::new(IVec2::new(0, -1), 8));
        assert_eq!(moved.y, arena.top_wall.bottom());

        let low = Rect::new(30, 478, 20, 100);
        let moved = move_paddle(&arena, low, Motion::new(IVec2::new(0, 1), 8));
        assert_eq!(moved.bottom(), arena.bottom_wall.y);
    }
}
