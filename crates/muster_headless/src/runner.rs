//! Scenario runner.
//!
//! Builds a [`Simulation`] from a [`Scenario`], replays its orders at their
//! ticks and reports where everything ended up.

use muster_core::config::SimConfig;
use muster_core::ecs::EntityId;
use muster_core::movement::{AgentState, MotionState, MoveAgent};
use muster_core::simulation::{MoveOrder, Simulation};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scenario::{to_fixed, to_vec2, Scenario};

/// Final state of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// Index in the scenario's unit list.
    pub index: usize,
    /// Entity id the unit was spawned as.
    pub entity: EntityId,
    /// Final position as decimals.
    pub position: (f64, f64),
    /// Agent state at the end of the run.
    pub state: Option<AgentState>,
    /// Locomotion state at the end of the run.
    pub motion: Option<MotionState>,
    /// Whether the unit's last move finished.
    pub completed: bool,
}

/// One issued order and how the simulation took it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderReport {
    /// Tick the order was issued before.
    pub tick: u64,
    /// Outcome, in entity ids.
    pub outcome: MoveOrder,
}

/// Summary of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Fixed steps executed.
    pub ticks_run: u64,
    /// Groups still coordinating at the end.
    pub groups_remaining: usize,
    /// Units whose last move completed.
    pub completed_units: usize,
    /// Per-unit results, in scenario order.
    pub units: Vec<UnitReport>,
    /// Orders in the order they were issued.
    pub orders: Vec<OrderReport>,
    /// Hash of the final simulation state.
    pub state_hash: u64,
}

/// Run a scenario to completion.
///
/// `ticks` and `config` override the values stored in the scenario.
pub fn run_scenario(
    scenario: &Scenario,
    ticks: Option<u64>,
    config: Option<SimConfig>,
) -> Result<RunReport> {
    let config = config.or(scenario.config).unwrap_or_default();
    let ticks = ticks.unwrap_or(scenario.ticks);
    let grid = scenario.build_grid()?;

    let mut sim = Simulation::new(config, grid.clone(), grid)?;
    let mut units = Vec::with_capacity(scenario.units.len());
    for unit in &scenario.units {
        let position = to_vec2(unit.position, "unit position")?;
        let speed = to_fixed(unit.speed, "unit speed")?;
        units.push(sim.spawn_unit(position, speed));
    }

    let mut pending: Vec<_> = scenario.orders.iter().collect();
    pending.sort_by_key(|order| order.at_tick);
    let mut pending = pending.into_iter().peekable();

    info!(
        scenario = %scenario.name,
        units = units.len(),
        orders = scenario.orders.len(),
        ticks,
        "Running scenario"
    );

    let mut orders = Vec::new();
    for _ in 0..ticks {
        let tick = sim.tick();
        while let Some(order) = pending.next_if(|order| order.at_tick <= tick) {
            let selected: Vec<EntityId> = order.units.iter().map(|&i| units[i]).collect();
            let destination = to_vec2(order.destination, "order destination")?;
            let outcome = sim.move_units(&selected, destination);
            if !outcome.failed.is_empty() {
                warn!(tick, failed = ?outcome.failed, "Some units could not path");
            }
            debug!(tick, group = ?outcome.group, accepted = outcome.accepted.len(), "Order issued");
            orders.push(OrderReport { tick, outcome });
        }
        sim.fixed_step()?;
    }

    let skipped = pending.count();
    if skipped > 0 {
        warn!(skipped, "Orders scheduled past the last tick were not issued");
    }

    let report = build_report(scenario, &sim, &units, orders);
    info!(
        scenario = %report.scenario,
        completed = report.completed_units,
        groups = report.groups_remaining,
        hash = report.state_hash,
        "Scenario finished"
    );
    Ok(report)
}

fn build_report(
    scenario: &Scenario,
    sim: &Simulation,
    units: &[EntityId],
    orders: Vec<OrderReport>,
) -> RunReport {
    let units: Vec<UnitReport> = units
        .iter()
        .enumerate()
        .map(|(index, &entity)| {
            let position = sim
                .position(entity)
                .map_or((0.0, 0.0), |p| (p.x.to_num(), p.y.to_num()));
            UnitReport {
                index,
                entity,
                position,
                state: sim.agent_state(entity).ok(),
                motion: sim.motion_state(entity),
                completed: sim.agent(entity).is_some_and(MoveAgent::is_completed),
            }
        })
        .collect();

    RunReport {
        scenario: scenario.name.clone(),
        ticks_run: sim.tick(),
        groups_remaining: sim.groups().len(),
        completed_units: units.iter().filter(|u| u.completed).count(),
        units,
        orders,
        state_hash: sim.state_hash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CROSSING: &str = r#"
        Scenario(
            name: "crossing",
            ticks: 1200,
            grid: GridSpec(width: 30, height: 30, blocked: [(15, 0, 15, 20)]),
            units: [
                UnitSpec(position: (5.5, 5.5), speed: 4.0),
                UnitSpec(position: (7.5, 5.5), speed: 4.0),
                UnitSpec(position: (5.5, 7.5), speed: 4.0),
            ],
            orders: [OrderSpec(at_tick: 0, units: [0, 1, 2], destination: (25.5, 5.5))],
        )
    "#;

    #[test]
    fn test_units_cross_the_wall() {
        let scenario = Scenario::from_ron_str(CROSSING).unwrap();
        let report = run_scenario(&scenario, None, None).unwrap();

        assert_eq!(report.ticks_run, 1200);
        assert_eq!(report.orders.len(), 1);
        assert_eq!(report.orders[0].outcome.accepted.len(), 3);
        assert_eq!(report.groups_remaining, 0);
        assert_eq!(report.completed_units, 3);
        for unit in &report.units {
            assert!(unit.position.0 > 15.0, "unit {} stayed behind the wall", unit.index);
            assert_eq!(unit.motion, Some(MotionState::Idle));
        }
    }

    #[test]
    fn test_runs_are_reproducible() {
        let scenario = Scenario::from_ron_str(CROSSING).unwrap();
        let a = run_scenario(&scenario, Some(200), None).unwrap();
        let b = run_scenario(&scenario, Some(200), None).unwrap();
        assert_eq!(a.ticks_run, 200);
        assert_eq!(a.state_hash, b.state_hash);
    }

    #[test]
    fn test_late_orders_are_not_issued() {
        let text = CROSSING.replace("at_tick: 0", "at_tick: 50");
        let scenario = Scenario::from_ron_str(&text).unwrap();
        let report = run_scenario(&scenario, Some(10), None).unwrap();
        assert!(report.orders.is_empty());
        assert_eq!(report.completed_units, 0);
    }

    #[test]
    fn test_config_override_changes_tick_length() {
        let scenario = Scenario::from_ron_str(CROSSING).unwrap();
        let config = SimConfig {
            tick_rate: 10,
            ..SimConfig::default()
        };
        let slow = run_scenario(&scenario, Some(20), Some(config)).unwrap();
        let fast = run_scenario(&scenario, Some(20), None).unwrap();
        let moved = |report: &RunReport| {
            let (x, y) = report.units[0].position;
            (x - 5.5).hypot(y - 5.5)
        };
        assert!(moved(&slow) > moved(&fast));
    }
}
