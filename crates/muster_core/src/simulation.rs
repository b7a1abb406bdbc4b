//! Simulation facade.
//!
//! [`Simulation`] owns the world, the agents, the group manager and the
//! navigation oracles, and drives them in a fixed order:
//!
//! 1. regular phase, once per frame
//! 2. for every whole fixed step banked by the frame:
//!    ECS fixed phase, group coordination, agent tasks, clock advance
//! 3. late phase, once per frame
//!
//! The fixed phase integrates the directions agents published on the
//! previous step, so the late phase sees this step's move requests.
//!
//! # Determinism
//!
//! Everything runs on one thread with fixed-point math. Systems run in
//! registration order, entities and agents in ascending id order and groups
//! in creation order, so identical orders always produce identical states.
//!
//! # Example
//!
//! ```
//! use muster_core::math::{Fixed, Vec2Fixed};
//! use muster_core::navigation::{
//!     LayerMask, NavPath, ObstacleOracle, PathOracle, RayHit,
//! };
//! use muster_core::simulation::Simulation;
//! use muster_core::config::SimConfig;
//!
//! struct OpenGround;
//!
//! impl PathOracle for OpenGround {
//!     fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
//!         NavPath::complete(vec![start, end])
//!     }
//!     fn sample_position(&self, point: Vec2Fixed, _radius: Fixed) -> Option<Vec2Fixed> {
//!         Some(point)
//!     }
//! }
//!
//! impl ObstacleOracle for OpenGround {
//!     fn raycast(&self, _: Vec2Fixed, _: Vec2Fixed, _: Fixed, _: LayerMask) -> Option<RayHit> {
//!         None
//!     }
//! }
//!
//! let mut sim = Simulation::new(SimConfig::default(), OpenGround, OpenGround).unwrap();
//! let unit = sim.spawn_unit(Vec2Fixed::ZERO, Fixed::from_num(5));
//! let order = sim.move_units(&[unit], Vec2Fixed::from_ints(0, 3));
//! assert_eq!(order.accepted, vec![unit]);
//!
//! for _ in 0..40 {
//!     sim.fixed_step().unwrap();
//! }
//! assert!(sim.agent(unit).unwrap().is_completed());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::ecs::{EntityId, Phase, World};
use crate::error::{CoreError, Result};
use crate::groups::{GroupId, GroupManager};
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::{
    AgentCtx, AgentState, AgentTable, AnimationState, Bodies, MotionState, MoveAgent,
    MoveAnimationSystem, MoveSpeed, MoveState, MoveToPositionCommand, MoveToPositionSystem,
    MovementSystem, Transform,
};
use crate::navigation::{ObstacleOracle, Oracles, PathOracle};

/// Outcome of a group move order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveOrder {
    /// Group created for the order.
    pub group: Option<GroupId>,
    /// Units now moving to the destination.
    pub accepted: Vec<EntityId>,
    /// Units whose path could not be planned. Their previous move, if any,
    /// continues outside any group.
    pub failed: Vec<EntityId>,
    /// Units without a move agent.
    pub ignored: Vec<EntityId>,
}

/// The movement simulation.
pub struct Simulation {
    world: World,
    bodies: Bodies,
    agents: AgentTable,
    groups: GroupManager,
    clock: SimClock,
    config: SimConfig,
    paths: Box<dyn PathOracle>,
    obstacles: Box<dyn ObstacleOracle>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("units", &self.world.entities().live_count())
            .field("agents", &self.agents.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

/// Build the context agents see, borrowing only the fields it needs.
fn agent_ctx<'a>(
    bodies: &'a Bodies,
    paths: &'a dyn PathOracle,
    obstacles: &'a dyn ObstacleOracle,
    clock: &SimClock,
) -> AgentCtx<'a> {
    AgentCtx {
        bodies,
        oracles: Oracles { paths, obstacles },
        now: clock.now(),
        step: clock.step(),
    }
}

impl Simulation {
    /// Create a simulation with the movement components and systems
    /// installed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: SimConfig,
        paths: impl PathOracle + 'static,
        obstacles: impl ObstacleOracle + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let mut world = World::new();
        world.bind_component::<Transform>();
        world.bind_component::<MoveSpeed>();
        world.bind_component::<MoveState>();
        world.bind_component::<MoveToPositionCommand>();
        world.bind_component::<AnimationState>();

        world.bind_system(MoveToPositionSystem::new(config.direct_move_min_distance_sq))?;
        world.bind_system(MovementSystem::default())?;
        world.bind_system(MoveAnimationSystem::default())?;
        world.install()?;

        let bodies = Bodies::from_world(&world)?;

        tracing::info!(tick_rate = config.tick_rate, "Simulation created");

        Ok(Self {
            world,
            bodies,
            agents: AgentTable::new(),
            groups: GroupManager::new(config.group),
            clock: SimClock::new(config.fixed_timestep()),
            config,
            paths: Box::new(paths),
            obstacles: Box::new(obstacles),
        })
    }

    /// Spawn a movable unit with an idle agent.
    pub fn spawn_unit(&mut self, position: Vec2Fixed, speed: Fixed) -> EntityId {
        let id = self.world.create_entity();
        self.world.store::<Transform>().set(id, Transform::at(position));
        self.world.store::<MoveSpeed>().set(id, MoveSpeed { value: speed });
        self.world.store::<MoveState>().set(id, MoveState::default());
        self.world
            .store::<AnimationState>()
            .set(id, AnimationState::default());

        self.agents.insert(MoveAgent::new(id, self.config.agent));
        tracing::debug!(entity = id, ?position, %speed, "Unit spawned");
        id
    }

    /// Destroy a unit, its agent and its group membership.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotAlive`] if the unit does not exist.
    pub fn despawn_unit(&mut self, id: EntityId) -> Result<()> {
        self.world.destroy_entity(id)?;
        self.agents.remove(id);
        self.groups.remove_agents(&[id]);
        tracing::debug!(entity = id, "Unit despawned");
        Ok(())
    }

    /// Order `units` to move to `destination` as one group.
    ///
    /// Units without an agent are ignored. Units whose path fails are
    /// reported and taken out of the new group again.
    pub fn move_units(&mut self, units: &[EntityId], destination: Vec2Fixed) -> MoveOrder {
        let mut order = MoveOrder::default();
        let mut members = Vec::with_capacity(units.len());
        for &unit in units {
            if members.contains(&unit) {
                continue;
            }
            if self.agents.contains(unit) {
                members.push(unit);
            } else {
                order.ignored.push(unit);
            }
        }

        if members.is_empty() {
            return order;
        }

        order.group = Some(self.groups.add_group(&members, destination));

        let ctx = agent_ctx(
            &self.bodies,
            self.paths.as_ref(),
            self.obstacles.as_ref(),
            &self.clock,
        );
        for unit in members {
            let Some(agent) = self.agents.get_mut(unit) else {
                continue;
            };
            match agent.move_to(&ctx, destination) {
                Ok(()) => order.accepted.push(unit),
                Err(_) => order.failed.push(unit),
            }
        }

        if !order.failed.is_empty() {
            self.groups.remove_agents(&order.failed);
        }

        tracing::debug!(
            group = ?order.group,
            accepted = order.accepted.len(),
            failed = order.failed.len(),
            ignored = order.ignored.len(),
            "Move order issued"
        );
        order
    }

    /// Order `unit` to walk straight to `destination`, ignoring navigation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotAlive`] if the unit does not exist.
    pub fn order_direct_move(&mut self, unit: EntityId, destination: Vec2Fixed) -> Result<()> {
        self.world.set(unit, MoveToPositionCommand { destination })
    }

    /// Advance by one rendered frame of `frame_dt` seconds.
    ///
    /// Returns the number of fixed steps run.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors; none occur once the world is installed.
    pub fn frame(&mut self, frame_dt: Fixed) -> Result<u32> {
        let ctx = self.clock.frame_context(frame_dt);
        self.world.run_phase(Phase::Regular, &ctx)?;

        self.clock.accumulate(frame_dt);
        let mut steps = 0;
        while self.clock.take_step() {
            self.fixed_step()?;
            steps += 1;
        }

        let ctx = self.clock.frame_context(frame_dt);
        self.world.run_phase(Phase::Late, &ctx)?;
        Ok(steps)
    }

    /// Run one fixed step.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors; none occur once the world is installed.
    pub fn fixed_step(&mut self) -> Result<()> {
        let tick = self.clock.fixed_context();
        self.world.run_phase(Phase::Fixed, &tick)?;

        let ctx = agent_ctx(
            &self.bodies,
            self.paths.as_ref(),
            self.obstacles.as_ref(),
            &self.clock,
        );
        self.groups.update(&mut self.agents, &ctx);
        self.agents.step_all(&ctx);

        self.clock.advance();

        #[cfg(debug_assertions)]
        {
            tracing::trace!(
                tick = self.clock.tick(),
                state_hash = self.state_hash(),
                "Simulation state hash"
            );
        }

        Ok(())
    }

    /// Hash of every unit pose, move request and agent flag.
    ///
    /// Two simulations fed the same orders produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.clock.tick().hash(&mut hasher);
        self.clock.now().to_bits().hash(&mut hasher);

        let ids: Vec<EntityId> = self.world.entities().live_ids().collect();
        ids.len().hash(&mut hasher);
        for id in ids {
            id.hash(&mut hasher);
            if let Some(transform) = self.world.get_copy::<Transform>(id) {
                transform.position.hash(&mut hasher);
                transform.facing.hash(&mut hasher);
            }
            if let Some(state) = self.world.get_copy::<MoveState>(id) {
                state.move_required.hash(&mut hasher);
                state.direction.hash(&mut hasher);
            }
            if let Some(agent) = self.agents.get(id) {
                agent.state().hash(&mut hasher);
                agent.is_completed().hash(&mut hasher);
                agent.pointer().hash(&mut hasher);
                agent.path().hash(&mut hasher);
            }
        }

        for group in self.groups.groups() {
            group.id().hash(&mut hasher);
            group.moving().hash(&mut hasher);
            group.completed().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// The ECS world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// All move agents.
    #[must_use]
    pub fn agents(&self) -> &AgentTable {
        &self.agents
    }

    /// Agent of `unit`.
    #[must_use]
    pub fn agent(&self, unit: EntityId) -> Option<&MoveAgent> {
        self.agents.get(unit)
    }

    /// Coarse agent state of `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownAgent`] if the unit has no agent.
    pub fn agent_state(&self, unit: EntityId) -> Result<AgentState> {
        self.agents
            .get(unit)
            .map(MoveAgent::state)
            .ok_or(CoreError::UnknownAgent(unit))
    }

    /// The group manager.
    #[must_use]
    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Fixed steps run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub fn now(&self) -> Fixed {
        self.clock.now()
    }

    /// Position of `unit`.
    #[must_use]
    pub fn position(&self, unit: EntityId) -> Option<Vec2Fixed> {
        self.bodies.position(unit)
    }

    /// Animation state of `unit`.
    #[must_use]
    pub fn motion_state(&self, unit: EntityId) -> Option<MotionState> {
        self.world
            .get_copy::<AnimationState>(unit)
            .map(|animation| animation.state)
    }

    /// Live units in ascending id order.
    #[must_use]
    pub fn units(&self) -> Vec<EntityId> {
        self.world.entities().live_ids().collect()
    }
}
