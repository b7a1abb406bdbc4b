//! Movement component definitions.
//!
//! Components are pure data with no behavior.

use serde::{Deserialize, Serialize};

use crate::ecs::Component;
use crate::math::{decimal_serde, Fixed, Vec2Fixed};

/// Ground-plane pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec2Fixed,
    /// Unit vector the unit faces.
    pub facing: Vec2Fixed,
}

impl Transform {
    /// A transform at `position` facing forward.
    #[must_use]
    pub const fn at(position: Vec2Fixed) -> Self {
        Self {
            position,
            facing: Vec2Fixed::FORWARD,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec2Fixed::ZERO)
    }
}

impl Component for Transform {}

/// Movement speed in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveSpeed {
    /// Units per second.
    #[serde(with = "decimal_serde")]
    pub value: Fixed,
}

impl Component for MoveSpeed {}

/// Movement requested for the current step.
///
/// Written by agents and direct-move orders, consumed (and reset) by the
/// movement system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveState {
    /// Whether the unit should move this step.
    pub move_required: bool,
    /// Unit direction to move in.
    pub direction: Vec2Fixed,
}

impl MoveState {
    /// Request a move along `direction`.
    #[must_use]
    pub const fn toward(direction: Vec2Fixed) -> Self {
        Self {
            move_required: true,
            direction,
        }
    }
}

impl Component for MoveState {}

/// Order to walk straight to a point, ignoring navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveToPositionCommand {
    /// Target point.
    pub destination: Vec2Fixed,
}

impl Component for MoveToPositionCommand {}

/// Locomotion state exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotionState {
    /// Standing still.
    #[default]
    Idle,
    /// Walking.
    Moving,
}

/// Derived animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    /// Current locomotion state.
    pub state: MotionState,
}

impl Component for AnimationState {}
