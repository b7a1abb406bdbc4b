//! Scenario builders.
//!
//! Spin up a [`Simulation`] with units in a formation and the navigation
//! double of choice, then drive it until a condition holds.

use muster_core::config::SimConfig;
use muster_core::ecs::EntityId;
use muster_core::math::{Fixed, Vec2Fixed};
use muster_core::simulation::Simulation;

use crate::fixtures::{GridNav, OpenField};

/// Units placed in a row along +X.
#[must_use]
pub fn line_formation(origin: Vec2Fixed, count: usize, spacing: Fixed) -> Vec<Vec2Fixed> {
    (0..count)
        .map(|i| Vec2Fixed::new(origin.x + spacing * Fixed::from_num(i), origin.y))
        .collect()
}

/// Units placed in a `columns` wide block, filled row by row along +Y.
#[must_use]
pub fn block_formation(
    origin: Vec2Fixed,
    count: usize,
    columns: usize,
    spacing: Fixed,
) -> Vec<Vec2Fixed> {
    let columns = columns.max(1);
    (0..count)
        .map(|i| {
            Vec2Fixed::new(
                origin.x + spacing * Fixed::from_num(i % columns),
                origin.y + spacing * Fixed::from_num(i / columns),
            )
        })
        .collect()
}

/// Builder for test simulations.
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    config: SimConfig,
    grid: Option<GridNav>,
    units: Vec<(Vec2Fixed, Fixed)>,
}

impl ScenarioBuilder {
    /// Default config, open field, no units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Navigate on `grid` instead of an open field.
    #[must_use]
    pub fn grid(mut self, grid: GridNav) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Add one unit.
    #[must_use]
    pub fn unit(mut self, position: Vec2Fixed, speed: Fixed) -> Self {
        self.units.push((position, speed));
        self
    }

    /// Add a unit at every position, all with the same speed.
    #[must_use]
    pub fn units(mut self, positions: &[Vec2Fixed], speed: Fixed) -> Self {
        self.units
            .extend(positions.iter().map(|&position| (position, speed)));
        self
    }

    /// Build the simulation and spawn the units in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the config fails validation.
    #[must_use]
    pub fn build(self) -> TestScenario {
        let mut sim = match self.grid {
            Some(grid) => Simulation::new(self.config, grid.clone(), grid),
            None => Simulation::new(self.config, OpenField, OpenField),
        }
        .expect("scenario config must be valid");

        let units = self
            .units
            .iter()
            .map(|&(position, speed)| sim.spawn_unit(position, speed))
            .collect();

        TestScenario { sim, units }
    }
}

/// A built simulation and the units it spawned.
#[derive(Debug)]
pub struct TestScenario {
    /// The simulation.
    pub sim: Simulation,
    /// Spawned units in builder order.
    pub units: Vec<EntityId>,
}

impl TestScenario {
    /// Run `ticks` fixed steps.
    ///
    /// # Panics
    ///
    /// Panics if a step fails.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.sim.fixed_step().expect("fixed step");
        }
    }

    /// Step until `done` holds, for at most `max_ticks` steps.
    ///
    /// Returns the number of steps taken, or `None` if `done` never held.
    ///
    /// # Panics
    ///
    /// Panics if a step fails.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&Simulation) -> bool,
    ) -> Option<u64> {
        for tick in 0..max_ticks {
            if done(&self.sim) {
                return Some(tick);
            }
            self.sim.fixed_step().expect("fixed step");
        }
        done(&self.sim).then_some(max_ticks)
    }

    /// Returns true once every spawned unit's agent has completed.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.units.iter().all(|&unit| {
            self.sim
                .agent(unit)
                .is_some_and(muster_core::movement::MoveAgent::is_completed)
        })
    }

    /// Positions of the spawned units.
    #[must_use]
    pub fn positions(&self) -> Vec<Vec2Fixed> {
        self.units
            .iter()
            .filter_map(|&unit| self.sim.position(unit))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixed, vec2};

    #[test]
    fn test_formations() {
        assert_eq!(
            line_formation(vec2(1, 2), 3, fixed(2)),
            vec![vec2(1, 2), vec2(3, 2), vec2(5, 2)]
        );
        assert_eq!(
            block_formation(vec2(0, 0), 5, 2, fixed(1)),
            vec![vec2(0, 0), vec2(1, 0), vec2(0, 1), vec2(1, 1), vec2(0, 2)]
        );
    }

    #[test]
    fn test_builder_spawns_in_order() {
        let scenario = ScenarioBuilder::new()
            .unit(vec2(4, 4), fixed(3))
            .units(&[vec2(0, 0), vec2(1, 0)], fixed(3))
            .build();
        assert_eq!(scenario.units, vec![0, 1, 2]);
        assert_eq!(scenario.positions()[0], vec2(4, 4));
    }

    #[test]
    fn test_run_until_counts_steps() {
        let mut scenario = ScenarioBuilder::new().build();
        assert_eq!(scenario.run_until(10, |sim| sim.tick() >= 3), Some(3));
        assert_eq!(scenario.run_until(2, |_| false), None);
    }
}
