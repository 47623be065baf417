mod entity;
mod history;

pub use entity::{Authority, EntityId, Motion, ReplicatedEntity, UpdateOutcome};
pub use history::{StateHistory, TimedState};
