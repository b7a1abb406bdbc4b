//! # Muster Core
//!
//! Movement simulation core for a top-down strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Pathfinding and obstacle queries are consumed through the traits in
//! [`navigation`]; the host supplies the implementations.
//!
//! ## Crate Structure
//!
//! - [`ecs`] - Entity ids, component stores, systems and the world
//! - [`movement`] - Movement components, systems and path-following agents
//! - [`groups`] - Group coordinators and their manager
//! - [`simulation`] - Fixed-step simulation facade
//! - [`selection`] - Selected-unit stack
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod ecs;
pub mod error;
pub mod groups;
pub mod math;
pub mod movement;
pub mod navigation;
pub mod selection;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AgentConfig, GroupConfig, SimConfig};
    pub use crate::ecs::{Component, EntityId, Phase, System, TickContext, World};
    pub use crate::error::{CoreError, Result};
    pub use crate::groups::{GroupCoordinator, GroupId, GroupManager};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{
        AgentState, AnimationState, MotionState, MoveAgent, MoveSpeed, MoveState,
        MoveToPositionCommand, Transform,
    };
    pub use crate::navigation::{
        LayerMask, NavPath, ObstacleOracle, PathOracle, PathStatus, RayHit,
    };
    pub use crate::selection::{SelectedUnits, SelectionEvent};
    pub use crate::simulation::{MoveOrder, Simulation};
}
