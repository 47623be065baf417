mod collision;
mod timestep;

pub use collision::{BallRules, BallStep, move_paddle, step_ball};
pub use timestep::FixedTimestep;
