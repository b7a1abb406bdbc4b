//! Movement systems.
//!
//! Each system declares its phases and resolves its stores at install, then
//! checks component presence per entity itself.

use super::components::{
    AnimationState, MotionState, MoveSpeed, MoveState, MoveToPositionCommand, Transform,
};
use crate::ecs::{EntityId, Phase, Resolver, StoreHandle, System, TickContext};
use crate::error::Result;
use crate::math::Fixed;

/// Integrates requested moves into positions.
///
/// For every entity with a pending [`MoveState`], advances its
/// [`Transform`] by `direction * speed * dt`, turns it to face the
/// direction and clears the request.
#[derive(Debug, Default)]
pub struct MovementSystem {
    stores: Option<MovementStores>,
}

#[derive(Debug)]
struct MovementStores {
    states: StoreHandle<MoveState>,
    speeds: StoreHandle<MoveSpeed>,
    transforms: StoreHandle<Transform>,
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "MovementSystem"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Fixed]
    }

    fn install(&mut self, resolver: &Resolver<'_>) -> Result<()> {
        self.stores = Some(MovementStores {
            states: resolver.store()?,
            speeds: resolver.store()?,
            transforms: resolver.store()?,
        });
        Ok(())
    }

    fn fixed_update(&mut self, ctx: &TickContext, entity: EntityId) {
        let Some(stores) = &self.stores else {
            return;
        };

        let mut states = stores.states.borrow_mut();
        let Some(state) = states.get_mut(entity) else {
            return;
        };
        if !state.move_required {
            return;
        }

        let speed = stores
            .speeds
            .get_copy(entity)
            .map_or(Fixed::ZERO, |speed| speed.value);
        let mut transforms = stores.transforms.borrow_mut();
        if let Some(transform) = transforms.get_mut(entity) {
            let offset = state.direction.scale(speed * ctx.dt);
            transform.position += offset;
            if !state.direction.is_zero() {
                transform.facing = state.direction.normalize();
            }
        }

        state.move_required = false;
    }
}

/// Steers entities with a [`MoveToPositionCommand`] straight at its target.
///
/// Publishes the direction into [`MoveState`] while the target is farther
/// than the configured threshold, then drops the command.
#[derive(Debug)]
pub struct MoveToPositionSystem {
    min_distance_sq: Fixed,
    stores: Option<MoveToPositionStores>,
}

#[derive(Debug)]
struct MoveToPositionStores {
    commands: StoreHandle<MoveToPositionCommand>,
    states: StoreHandle<MoveState>,
    transforms: StoreHandle<Transform>,
}

impl MoveToPositionSystem {
    /// Create the system with the squared arrival threshold.
    #[must_use]
    pub fn new(min_distance_sq: Fixed) -> Self {
        Self {
            min_distance_sq,
            stores: None,
        }
    }
}

impl System for MoveToPositionSystem {
    fn name(&self) -> &'static str {
        "MoveToPositionSystem"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Fixed]
    }

    fn install(&mut self, resolver: &Resolver<'_>) -> Result<()> {
        self.stores = Some(MoveToPositionStores {
            commands: resolver.store()?,
            states: resolver.store()?,
            transforms: resolver.store()?,
        });
        Ok(())
    }

    fn fixed_update(&mut self, _ctx: &TickContext, entity: EntityId) {
        let Some(stores) = &self.stores else {
            return;
        };
        let Some(command) = stores.commands.get_copy(entity) else {
            return;
        };
        let Some(transform) = stores.transforms.get_copy(entity) else {
            return;
        };

        let offset = command.destination - transform.position;
        if offset.length_squared() > self.min_distance_sq {
            stores.states.set(entity, MoveState::toward(offset.normalize()));
        } else {
            stores.commands.remove(entity);
        }
    }
}

/// Derives [`AnimationState`] from [`MoveState`] after the frame's moves.
#[derive(Debug, Default)]
pub struct MoveAnimationSystem {
    stores: Option<AnimationStores>,
}

#[derive(Debug)]
struct AnimationStores {
    animations: StoreHandle<AnimationState>,
    states: StoreHandle<MoveState>,
}

impl System for MoveAnimationSystem {
    fn name(&self) -> &'static str {
        "MoveAnimationSystem"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Late]
    }

    fn install(&mut self, resolver: &Resolver<'_>) -> Result<()> {
        self.stores = Some(AnimationStores {
            animations: resolver.store()?,
            states: resolver.store()?,
        });
        Ok(())
    }

    fn late_update(&mut self, _ctx: &TickContext, entity: EntityId) {
        let Some(stores) = &self.stores else {
            return;
        };
        let Some(state) = stores.states.get_copy(entity) else {
            return;
        };
        let mut animations = stores.animations.borrow_mut();
        let Some(animation) = animations.get_mut(entity) else {
            return;
        };

        animation.state = if state.move_required {
            MotionState::Moving
        } else {
            MotionState::Idle
        };
    }
}
