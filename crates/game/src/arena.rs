use glam::IVec2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: i32 = 800;
pub const DEFAULT_HEIGHT: i32 = 600;

pub const DIRECTION_UP: i32 = -1;
pub const DIRECTION_DOWN: i32 = 1;
pub const DIRECTION_LEFT: i32 = -1;
pub const DIRECTION_RIGHT: i32 = 1;

/// Axis-aligned rectangle in arena pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn position(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn with_position(self, position: IVec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            ..self
        }
    }

    pub fn translated(self, delta: IVec2) -> Self {
        self.with_position(self.position() + delta)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.w <= 0 || self.h <= 0 || other.w <= 0 || other.h <= 0 {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Static field geometry shared by both nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    pub width: i32,
    pub height: i32,
    pub box_size: i32,
    pub edge_offset: i32,
    pub paddle_height: i32,
    pub top_wall: Rect,
    pub bottom_wall: Rect,
    pub left_goal: Rect,
    pub right_goal: Rect,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Arena {
    pub fn new(width: i32, height: i32) -> Self {
        let box_size = height / 30;
        let edge_offset = height / 20;
        let paddle_height = height / 6;

        Self {
            width,
            height,
            box_size,
            edge_offset,
            paddle_height,
            top_wall: Rect::new(0, 0, width, box_size),
            bottom_wall: Rect::new(0, height - box_size, width, box_size),
            left_goal: Rect::new(-1000, 0, 1000 - box_size, height),
            right_goal: Rect::new(width + box_size, 0, 1000, height),
        }
    }

    pub fn left_paddle_start(&self) -> Rect {
        Rect::new(
            self.edge_offset,
            self.height / 2 - self.paddle_height / 2,
            self.box_size,
            self.paddle_height,
        )
    }

    pub fn right_paddle_start(&self) -> Rect {
        Rect::new(
            self.width - self.edge_offset - self.box_size,
            self.height / 2 - self.paddle_height / 2,
            self.box_size,
            self.paddle_height,
        )
    }

    pub fn ball_start(&self) -> Rect {
        Rect::new(
            self.width / 2 - self.box_size / 2,
            self.height / 2 - self.box_size / 2,
            self.box_size,
            self.box_size,
        )
    }

    /// Whether `rect` lies on the field, goal areas included.
    pub fn admits(&self, rect: Rect) -> bool {
        rect.x >= self.left_goal.x
            && rect.x <= self.right_goal.right() - rect.w
            && rect.y >= 0
            && rect.y <= self.height - rect.h
    }

    /// Keeps a paddle between the two walls.
    pub fn clamp_paddle(&self, paddle: Rect) -> Rect {
        if paddle.intersects(&self.top_wall) {
            Rect {
                y: self.top_wall.bottom(),
                ..paddle
            }
        } else if paddle.intersects(&self.bottom_wall) {
            Rect {
                y: self.bottom_wall.y - paddle.h,
                ..paddle
            }
        } else {
            paddle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_reference_field() {
        let arena = Arena::default();

        assert_eq!(arena.box_size, 20);
        assert_eq!(arena.edge_offset, 30);
        assert_eq!(arena.paddle_height, 100);
        assert_eq!(arena.left_paddle_start(), Rect::new(30, 250, 20, 100));
        assert_eq!(arena.right_paddle_start(), Rect::new(750, 250, 20, 100));
        assert_eq!(arena.ball_start(), Rect::new(390, 290, 20, 20));
        assert_eq!(arena.left_goal, Rect::new(-1000, 0, 980, 600));
        assert_eq!(arena.right_goal, Rect::new(820, 0, 1000, 600));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.intersects(&Rect::new(10, 0, 10, 10)));
        assert!(a.intersects(&Rect::new(9, 9, 10, 10)));
    }

    #[test]
    fn paddle_is_clamped_between_walls() {
        let arena = Arena::default();
        let paddle = arena.left_paddle_start();

        let high = arena.clamp_paddle(Rect { y: 5, ..paddle });
        assert_eq!(high.y, arena.top_wall.bottom());

        let low = arena.clamp_paddle(Rect { y: 560, ..paddle });
        assert_eq!(low.y, arena.bottom_wall.y - paddle.h);
    }

    #[test]
    fn admits_only_positions_on_the_field() {
        let arena = Arena::default();
        let ball = arena.ball_start();

        assert!(arena.admits(ball));
        assert!(arena.admits(Rect { x: 900, ..ball }));
        assert!(!arena.admits(Rect { y: 590, ..ball }));
        assert!(!arena.admits(Rect { x: i32::MAX, ..ball }));
        assert!(!arena.admits(Rect { y: i32::MIN, ..ball }));
    }
}
