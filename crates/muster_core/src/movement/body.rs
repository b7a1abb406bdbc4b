//! The slice of the world agents and groups see.

use super::components::{MoveState, Transform};
use crate::ecs::{EntityId, StoreHandle, World};
use crate::error::Result;
use crate::math::{Fixed, Vec2Fixed};
use crate::navigation::Oracles;

/// Read access to unit poses and write access to their move requests.
#[derive(Debug, Clone)]
pub struct Bodies {
    transforms: StoreHandle<Transform>,
    states: StoreHandle<MoveState>,
}

impl Bodies {
    /// Wrap existing store handles.
    #[must_use]
    pub fn new(transforms: StoreHandle<Transform>, states: StoreHandle<MoveState>) -> Self {
        Self { transforms, states }
    }

    /// Resolve the stores from a world.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::UnboundComponent`] if either
    /// [`Transform`] or [`MoveState`] is not bound.
    pub fn from_world(world: &World) -> Result<Self> {
        Ok(Self::new(world.try_store()?, world.try_store()?))
    }

    /// Current position of `entity`.
    #[must_use]
    pub fn position(&self, entity: EntityId) -> Option<Vec2Fixed> {
        self.transforms.get_copy(entity).map(|t| t.position)
    }

    /// Facing of `entity`.
    #[must_use]
    pub fn facing(&self, entity: EntityId) -> Option<Vec2Fixed> {
        self.transforms.get_copy(entity).map(|t| t.facing)
    }

    /// Request a move along `direction` for this step.
    ///
    /// Entities without a [`MoveState`] are left alone.
    pub fn publish(&self, entity: EntityId, direction: Vec2Fixed) {
        let mut states = self.states.borrow_mut();
        if let Some(state) = states.get_mut(entity) {
            *state = MoveState::toward(direction);
        }
    }
}

/// Everything an agent consults while it runs.
#[derive(Debug, Clone, Copy)]
pub struct AgentCtx<'a> {
    /// Unit poses and move requests.
    pub bodies: &'a Bodies,
    /// Navigation services.
    pub oracles: Oracles<'a>,
    /// Simulation time in seconds.
    pub now: Fixed,
    /// Fixed timestep in seconds.
    pub step: Fixed,
}
