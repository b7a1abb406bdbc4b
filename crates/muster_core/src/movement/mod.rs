//! Unit movement: components, systems and path-following agents.
//!
//! The ECS systems here only integrate directions into positions. Deciding
//! which direction to publish is the job of [`MoveAgent`] for pathed moves,
//! and of [`MoveToPositionSystem`] for direct ones.

mod agent;
mod body;
mod components;
mod systems;
mod tasks;

pub use agent::{AgentState, AgentTable, MoveAgent};
pub use body::{AgentCtx, Bodies};
pub use components::{
    AnimationState, MotionState, MoveSpeed, MoveState, MoveToPositionCommand, Transform,
};
pub use systems::{MoveAnimationSystem, MoveToPositionSystem, MovementSystem};
pub use tasks::{Cadence, TaskSet};
