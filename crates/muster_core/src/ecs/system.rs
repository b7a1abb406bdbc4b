//! Behavior units driven by the scheduler.

use super::component::{Component, StoreHandle, Stores};
use super::EntityId;
use crate::error::{CoreError, Result};
use crate::math::Fixed;

/// Points in a frame at which systems run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Once per rendered frame.
    Regular,
    /// Zero or more times per frame at the fixed simulation timestep.
    Fixed,
    /// Once per rendered frame, after the regular phase.
    Late,
}

impl Phase {
    /// Lowercase phase name for logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Fixed => "fixed",
            Self::Late => "late",
        }
    }
}

/// Timing passed to every per-entity callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickContext {
    /// Fixed steps completed before this one.
    pub tick: u64,
    /// Simulation time in seconds at the start of this step.
    pub now: Fixed,
    /// Step length in seconds. For the regular and late phases this is the
    /// frame delta; for the fixed phase it is the fixed timestep.
    pub dt: Fixed,
}

/// A behavior unit.
///
/// A system declares the phases it runs in once, at registration, and pulls
/// the component stores it needs from a [`Resolver`] during install. The
/// scheduler then calls the matching callback for every live entity in
/// ascending id order; the system checks component presence itself.
pub trait System {
    /// Name used in logs and install errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Phases this system runs in. Must not be empty.
    fn phases(&self) -> &'static [Phase];

    /// Resolve component stores. Called exactly once, before the first tick.
    fn install(&mut self, resolver: &Resolver<'_>) -> Result<()>;

    /// Regular phase callback.
    fn update(&mut self, _ctx: &TickContext, _entity: EntityId) {}

    /// Fixed phase callback.
    fn fixed_update(&mut self, _ctx: &TickContext, _entity: EntityId) {}

    /// Late phase callback.
    fn late_update(&mut self, _ctx: &TickContext, _entity: EntityId) {}
}

/// Hands out store handles to a system during install.
#[derive(Debug)]
pub struct Resolver<'w> {
    stores: &'w Stores,
    system: &'static str,
}

impl<'w> Resolver<'w> {
    pub(crate) fn new(stores: &'w Stores, system: &'static str) -> Self {
        Self { stores, system }
    }

    /// Handle to the store for `T`.
    ///
    /// Fails with [`CoreError::UnboundComponent`] naming the requesting
    /// system if `T` was never bound.
    pub fn store<T: Component>(&self) -> Result<StoreHandle<T>> {
        self.stores
            .handle::<T>()
            .cloned()
            .ok_or(CoreError::UnboundComponent {
                component: std::any::type_name::<T>(),
                system: Some(self.system),
            })
    }
}
