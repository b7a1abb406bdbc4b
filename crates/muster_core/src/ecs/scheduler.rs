//! Phase lists and the install step.

use std::fmt;

use super::component::Stores;
use super::entity::EntityRegistry;
use super::system::{Phase, Resolver, System, TickContext};
use crate::error::{CoreError, Result};

/// Progress of the one-shot install step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InstallState {
    #[default]
    Pending,
    Installed,
    /// Some systems may hold handles and others not; the scheduler is unusable.
    Failed,
}

/// Ordered system lists per phase.
///
/// Systems run in registration order. A system registered for several
/// phases appears in each list once; there is no priority or dependency
/// resolution between systems.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<Box<dyn System>>,
    regular: Vec<usize>,
    fixed: Vec<usize>,
    late: Vec<usize>,
    install: InstallState,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.systems.iter().map(|s| s.name()).collect();
        f.debug_struct("Scheduler")
            .field("systems", &names)
            .field("regular", &self.regular)
            .field("fixed", &self.fixed)
            .field("late", &self.late)
            .field("install", &self.install)
            .finish()
    }
}

impl Scheduler {
    /// Register a system into the phase lists it declares.
    pub fn register(&mut self, system: Box<dyn System>) -> Result<()> {
        if self.install != InstallState::Pending {
            return Err(CoreError::AlreadyInstalled(
                "systems cannot be registered after install",
            ));
        }

        let phases = system.phases();
        if phases.is_empty() {
            return Err(CoreError::NoPhases(system.name()));
        }

        let index = self.systems.len();
        for phase in phases {
            let list = self.list_mut(*phase);
            if !list.contains(&index) {
                list.push(index);
            }
        }

        tracing::debug!(system = system.name(), ?phases, "Registered system");
        self.systems.push(system);
        Ok(())
    }

    /// Resolve every system's store dependencies. Runs once.
    ///
    /// A failed install is fatal: systems before the failing one keep their
    /// handles, so every later install, register or tick call is rejected.
    pub fn install(&mut self, stores: &Stores) -> Result<()> {
        match self.install {
            InstallState::Pending => {}
            InstallState::Installed => {
                return Err(CoreError::AlreadyInstalled("install runs exactly once"));
            }
            InstallState::Failed => {
                return Err(CoreError::AlreadyInstalled(
                    "an earlier install failed and cannot be retried",
                ));
            }
        }

        // Marked failed up front so an early return leaves it that way.
        self.install = InstallState::Failed;
        for system in &mut self.systems {
            let resolver = Resolver::new(stores, system.name());
            system.install(&resolver)?;
        }

        self.install = InstallState::Installed;
        tracing::debug!(systems = self.systems.len(), "Scheduler installed");
        Ok(())
    }

    /// Returns true once install has succeeded.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self.install, InstallState::Installed)
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns true if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Names of the systems registered for `phase`, in run order.
    #[must_use]
    pub fn phase_systems(&self, phase: Phase) -> Vec<&'static str> {
        self.list(phase)
            .iter()
            .map(|&index| self.systems[index].name())
            .collect()
    }

    /// Run one phase over every live entity.
    pub fn run(
        &mut self,
        phase: Phase,
        ctx: &TickContext,
        entities: &EntityRegistry,
    ) -> Result<()> {
        if self.install != InstallState::Installed {
            return Err(CoreError::NotInstalled(phase.name()));
        }

        let Self {
            systems,
            regular,
            fixed,
            late,
            ..
        } = self;
        let list = match phase {
            Phase::Regular => regular,
            Phase::Fixed => fixed,
            Phase::Late => late,
        };

        for &index in list.iter() {
            let system = &mut systems[index];
            for entity in entities.live_ids() {
                match phase {
                    Phase::Regular => system.update(ctx, entity),
                    Phase::Fixed => system.fixed_update(ctx, entity),
                    Phase::Late => system.late_update(ctx, entity),
                }
            }
        }

        Ok(())
    }

    fn list(&self, phase: Phase) -> &Vec<usize> {
        match phase {
            Phase::Regular => &self.regular,
            Phase::Fixed => &self.fixed,
            Phase::Late => &self.late,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<usize> {
        match phase {
            Phase::Regular => &mut self.regular,
            Phase::Fixed => &mut self.fixed,
            Phase::Late => &mut self.late,
        }
    }
}
