//! Per-unit path following.
//!
//! A [`MoveAgent`] walks its unit along the corners handed back by the path
//! oracle. It never moves the unit itself: every fixed step it publishes a
//! direction into the unit's [`MoveState`](super::MoveState) and leaves the
//! integration to the movement system.
//!
//! # Tasks
//!
//! | task            | cadence              | effect                                  |
//! |-----------------|----------------------|-----------------------------------------|
//! | `FollowPath`    | every step           | advance the pointer or steer at a corner |
//! | `ScanObstacles` | `obstacle_scan_period` | start or stop avoidance              |
//! | `AvoidObstacle` | every step           | steer along the escape direction        |
//! | `Complete`      | once, `complete_delay` | stop everything, mark completed       |
//!
//! Path following is skipped, not cancelled, while an avoidance task exists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::body::AgentCtx;
use super::tasks::TaskSet;
use crate::config::AgentConfig;
use crate::ecs::EntityId;
use crate::error::{CoreError, Result};
use crate::math::{side_of_line, Fixed, Vec2Fixed};
use crate::navigation::LayerMask;

/// Scheduled agent behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentTask {
    FollowPath,
    ScanObstacles,
    AvoidObstacle(Vec2Fixed),
    Complete,
}

/// Coarse agent state for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// No move in progress.
    Idle,
    /// Following the path.
    Moving,
    /// Steering around an obstacle; path following is suspended.
    Avoiding,
    /// Waiting out the completion delay.
    Completing,
}

/// Path-following state machine for one unit.
#[derive(Debug, Clone)]
pub struct MoveAgent {
    entity: EntityId,
    config: AgentConfig,
    destination: Vec2Fixed,
    path: Vec<Vec2Fixed>,
    pointer: usize,
    completed: bool,
    last_correction: Option<Fixed>,
    tasks: TaskSet<AgentTask>,
}

impl MoveAgent {
    /// Create an idle agent driving `entity`.
    #[must_use]
    pub fn new(entity: EntityId, config: AgentConfig) -> Self {
        Self {
            entity,
            config,
            destination: Vec2Fixed::ZERO,
            path: Vec::new(),
            pointer: 0,
            completed: false,
            last_correction: None,
            tasks: TaskSet::default(),
        }
    }

    /// Start moving to `destination`.
    ///
    /// The destination is snapped onto the navigable surface when the oracle
    /// offers a point within `sample_radius`. The previous move is only
    /// cancelled once a complete path exists.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MissingTransform`] if the unit has no position.
    /// - [`CoreError::PathUnavailable`] if the oracle returns a partial or
    ///   failed path. Nothing about the agent changes in that case.
    pub fn move_to(&mut self, ctx: &AgentCtx<'_>, destination: Vec2Fixed) -> Result<()> {
        let start = ctx
            .bodies
            .position(self.entity)
            .ok_or(CoreError::MissingTransform(self.entity))?;

        let destination = ctx
            .oracles
            .paths
            .sample_position(destination, self.config.sample_radius)
            .unwrap_or(destination);

        let planned = ctx.oracles.paths.compute_path(start, destination);
        if !planned.is_complete() {
            tracing::warn!(
                entity = self.entity,
                ?destination,
                status = ?planned.status,
                "Cannot plan a complete path; move aborted"
            );
            return Err(CoreError::PathUnavailable {
                destination,
                status: planned.status,
            });
        }

        self.stop(false);
        self.destination = destination;
        self.path = planned.corners;
        self.pointer = 0;
        self.tasks.every_step(AgentTask::FollowPath, ctx.now);
        self.tasks.every(
            AgentTask::ScanObstacles,
            self.config.obstacle_scan_period,
            ctx.now,
        );

        tracing::debug!(
            entity = self.entity,
            ?destination,
            corners = self.path.len(),
            "Move started"
        );
        Ok(())
    }

    /// Run every task due at `ctx.now`.
    pub fn step(&mut self, ctx: &AgentCtx<'_>) {
        while let Some(task) = self.tasks.poll(ctx.now, ctx.step) {
            match task {
                AgentTask::FollowPath => self.follow_path(ctx),
                AgentTask::ScanObstacles => self.scan_obstacles(ctx),
                AgentTask::AvoidObstacle(direction) => ctx.bodies.publish(self.entity, direction),
                AgentTask::Complete => {
                    self.stop(true);
                    tracing::debug!(entity = self.entity, "Move completed");
                }
            }
        }
    }

    fn follow_path(&mut self, ctx: &AgentCtx<'_>) {
        if self.is_avoiding_obstacle() {
            return;
        }

        let Some(position) = ctx.bodies.position(self.entity) else {
            return;
        };

        if let Some(&target) = self.path.get(self.pointer) {
            let offset = target - position;
            if offset.length_squared() > self.config.stopping_distance_sq {
                ctx.bodies.publish(self.entity, offset.normalize());
                return;
            }
            self.pointer += 1;
        }

        if self.pointer >= self.path.len() {
            self.tasks.cancel_where(|task| *task == AgentTask::FollowPath);
            self.complete_move(ctx.now);
        }
    }

    fn scan_obstacles(&mut self, ctx: &AgentCtx<'_>) {
        let Some(position) = ctx.bodies.position(self.entity) else {
            return;
        };

        let hit = self.path.get(self.pointer).and_then(|&target| {
            ctx.oracles.obstacles.raycast(
                position,
                (target - position).normalize(),
                self.config.obstacle_ray_distance,
                LayerMask::OBSTACLE,
            )
        });

        match hit {
            Some(hit) => {
                tracing::trace!(entity = self.entity, point = ?hit.point, "Obstacle ahead");
                self.start_avoiding(hit.normal.cross_up(), ctx.now);
            }
            None => self.stop_avoiding(),
        }
    }

    fn start_avoiding(&mut self, direction: Vec2Fixed, now: Fixed) {
        if self.is_avoiding_obstacle() {
            return;
        }
        self.tasks.every_step(AgentTask::AvoidObstacle(direction), now);
        tracing::debug!(entity = self.entity, ?direction, "Avoiding obstacle");
    }

    fn stop_avoiding(&mut self) {
        if self
            .tasks
            .cancel_where(|task| matches!(task, AgentTask::AvoidObstacle(_)))
        {
            tracing::trace!(entity = self.entity, "Obstacle cleared");
        }
    }

    /// Start steering along the unit's facing crossed with the up axis.
    ///
    /// Does nothing if the agent is already avoiding.
    pub fn start_avoid_obstacle(&mut self, ctx: &AgentCtx<'_>) {
        let Some(facing) = ctx.bodies.facing(self.entity) else {
            return;
        };
        self.start_avoiding(facing.cross_up(), ctx.now);
    }

    /// Nudge the path sideways to break a jam with a neighbour.
    ///
    /// Shifts a point between the unit and its next corner to the side the
    /// current corner lies on, then replans from there. If the replan fails
    /// the shifted point replaces the current corner instead.
    ///
    /// Returns false without changing anything while the cooldown runs, on
    /// the final waypoint, or when the unit has no position.
    pub fn correct_path(&mut self, ctx: &AgentCtx<'_>) -> bool {
        if !self.can_correct_path(ctx.now) || self.is_on_final_waypoint() {
            return false;
        }
        let Some(current) = ctx.bodies.position(self.entity) else {
            return false;
        };

        self.last_correction = Some(ctx.now);

        let target = self.path[self.pointer];
        let next = self.path[self.pointer + 1];
        let line = (next - current).normalize();

        let shift = if side_of_line(current, next, target) > Fixed::ZERO {
            line.cross_up()
        } else {
            line.cross_down()
        }
        .scale(self.config.shift_offset);

        let shifted = (current + shift).lerp(next - shift, self.config.shift_factor);
        let shifted = ctx
            .oracles
            .paths
            .sample_position(shifted, self.config.sample_radius)
            .unwrap_or(shifted);

        let replanned = ctx.oracles.paths.compute_path(shifted, self.destination);
        if replanned.is_complete() {
            self.path = replanned.corners;
            self.pointer = 0;
            tracing::debug!(entity = self.entity, ?shifted, "Path replanned");
        } else {
            self.path[self.pointer] = shifted;
            tracing::debug!(entity = self.entity, ?shifted, "Waypoint patched");
        }
        true
    }

    /// Finish the move after `complete_delay`.
    ///
    /// Does nothing if the agent is completed or already completing.
    pub fn complete_move(&mut self, now: Fixed) {
        if self.completed || self.is_completing() {
            return;
        }
        self.tasks
            .once(AgentTask::Complete, self.config.complete_delay, now);
    }

    /// Drop the current move without completing it.
    pub fn cancel(&mut self) {
        self.stop(false);
    }

    fn stop(&mut self, completed: bool) {
        self.tasks.clear();
        self.completed = completed;
    }

    /// Entity this agent drives.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Returns true once the last move finished.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns true while an avoidance task is active.
    #[must_use]
    pub fn is_avoiding_obstacle(&self) -> bool {
        self.tasks
            .any(|task| matches!(task, AgentTask::AvoidObstacle(_)))
    }

    /// Escape direction of the active avoidance task.
    #[must_use]
    pub fn avoidance_direction(&self) -> Option<Vec2Fixed> {
        match self
            .tasks
            .find(|task| matches!(task, AgentTask::AvoidObstacle(_)))
        {
            Some(AgentTask::AvoidObstacle(direction)) => Some(direction),
            _ => None,
        }
    }

    /// Returns true if the correction cooldown has elapsed at `now`.
    #[must_use]
    pub fn can_correct_path(&self, now: Fixed) -> bool {
        match self.last_correction {
            Some(at) => now - at >= self.config.correct_path_period,
            None => true,
        }
    }

    /// Returns true if the pointer is on (or past) the last corner.
    #[must_use]
    pub fn is_on_final_waypoint(&self) -> bool {
        self.pointer + 1 >= self.path.len()
    }

    /// Corner the agent is heading for, unless it is the final one.
    #[must_use]
    pub fn try_next_waypoint(&self) -> Option<Vec2Fixed> {
        if self.is_on_final_waypoint() {
            return None;
        }
        self.path.get(self.pointer).copied()
    }

    /// Destination of the last started move.
    #[must_use]
    pub const fn destination(&self) -> Vec2Fixed {
        self.destination
    }

    /// Corners of the current path.
    #[must_use]
    pub fn path(&self) -> &[Vec2Fixed] {
        &self.path
    }

    /// Index of the corner being walked to.
    #[must_use]
    pub const fn pointer(&self) -> usize {
        self.pointer
    }

    /// Returns true while path following is scheduled.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.tasks.any(|task| *task == AgentTask::FollowPath)
    }

    /// Returns true while the completion delay runs.
    #[must_use]
    pub fn is_completing(&self) -> bool {
        self.tasks.any(|task| *task == AgentTask::Complete)
    }

    /// Coarse state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        if self.is_completing() {
            AgentState::Completing
        } else if self.is_avoiding_obstacle() {
            AgentState::Avoiding
        } else if self.is_moving() {
            AgentState::Moving
        } else {
            AgentState::Idle
        }
    }
}

/// Every agent, keyed by the entity it drives.
///
/// Iteration is in ascending entity order.
#[derive(Debug, Clone, Default)]
pub struct AgentTable {
    agents: BTreeMap<EntityId, MoveAgent>,
}

impl AgentTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an agent, replacing any agent for the same entity.
    pub fn insert(&mut self, agent: MoveAgent) -> Option<MoveAgent> {
        self.agents.insert(agent.entity(), agent)
    }

    /// Remove the agent for `entity`.
    pub fn remove(&mut self, entity: EntityId) -> Option<MoveAgent> {
        self.agents.remove(&entity)
    }

    /// Agent for `entity`.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&MoveAgent> {
        self.agents.get(&entity)
    }

    /// Mutable agent for `entity`.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut MoveAgent> {
        self.agents.get_mut(&entity)
    }

    /// Returns true if `entity` has an agent.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.agents.contains_key(&entity)
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true if there are no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agents in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = &MoveAgent> + '_ {
        self.agents.values()
    }

    /// Step every agent.
    pub fn step_all(&mut self, ctx: &AgentCtx<'_>) {
        for agent in self.agents.values_mut() {
            agent.step(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::ecs::{Phase, TickContext, World};
    use crate::movement::{Bodies, MoveSpeed, MoveState, MovementSystem, Transform};
    use crate::navigation::{
        NavPath, ObstacleOracle, Oracles, PathOracle, PathStatus, RayHit,
    };

    /// Answers path requests from a queue, then with a straight line.
    #[derive(Default)]
    struct Paths {
        queued: RefCell<VecDeque<NavPath>>,
        snap: Option<Vec2Fixed>,
    }

    impl Paths {
        fn then(self, path: NavPath) -> Self {
            self.queued.borrow_mut().push_back(path);
            self
        }
    }

    impl PathOracle for Paths {
        fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
            self.queued
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| NavPath::complete(vec![start, end]))
        }

        fn sample_position(&self, point: Vec2Fixed, _max_radius: Fixed) -> Option<Vec2Fixed> {
            Some(self.snap.unwrap_or(point))
        }
    }

    #[derive(Default)]
    struct Obstacles {
        hit: Cell<Option<RayHit>>,
    }

    impl ObstacleOracle for Obstacles {
        fn raycast(
            &self,
            _origin: Vec2Fixed,
            _direction: Vec2Fixed,
            _max_distance: Fixed,
            layers: LayerMask,
        ) -> Option<RayHit> {
            assert!(layers.intersects(LayerMask::OBSTACLE));
            self.hit.get()
        }
    }

    struct Rig {
        world: World,
        bodies: Bodies,
        unit: EntityId,
        now: Fixed,
        step: Fixed,
    }

    impl Rig {
        fn new(position: Vec2Fixed) -> Self {
            let mut world = World::new();
            world.bind_component::<Transform>();
            world.bind_component::<MoveState>();
            world.bind_component::<MoveSpeed>();
            world.bind_system(MovementSystem::default()).unwrap();
            world.install().unwrap();

            let unit = world.create_entity();
            world.set(unit, Transform::at(position)).unwrap();
            world.set(unit, MoveState::default()).unwrap();
            world
                .set(
                    unit,
                    MoveSpeed {
                        value: Fixed::from_num(5),
                    },
                )
                .unwrap();

            let bodies = Bodies::from_world(&world).unwrap();
            Self {
                world,
                bodies,
                unit,
                now: Fixed::ZERO,
                step: Fixed::from_num(0.05),
            }
        }

        fn ctx<'a>(&'a self, paths: &'a Paths, obstacles: &'a Obstacles) -> AgentCtx<'a> {
            AgentCtx {
                bodies: &self.bodies,
                oracles: Oracles {
                    paths,
                    obstacles,
                },
                now: self.now,
                step: self.step,
            }
        }

        /// Integrate last step's request, run the agent, advance the clock.
        fn tick(&mut self, agent: &mut MoveAgent, paths: &Paths, obstacles: &Obstacles) {
            let tick = TickContext {
                tick: 0,
                now: self.now,
                dt: self.step,
            };
            self.world.run_phase(Phase::Fixed, &tick).unwrap();
            agent.step(&self.ctx(paths, obstacles));
            self.now += self.step;
        }

        fn position(&self) -> Vec2Fixed {
            self.bodies.position(self.unit).unwrap()
        }

        fn published(&self) -> MoveState {
            self.world.get_copy::<MoveState>(self.unit).unwrap()
        }
    }

    fn close(a: Vec2Fixed, b: Vec2Fixed) -> bool {
        a.distance_squared(b) < Fixed::from_num(0.000_001)
    }

    #[test]
    fn test_failed_path_changes_nothing() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default().then(NavPath {
            status: PathStatus::Partial,
            corners: vec![Vec2Fixed::ZERO],
        });
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());

        let err = agent
            .move_to(&rig.ctx(&paths, &obstacles), Vec2Fixed::from_ints(9, 9))
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::PathUnavailable {
                status: PathStatus::Partial,
                ..
            }
        ));
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(agent.path().is_empty());
        assert_eq!(agent.destination(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_failed_retask_keeps_previous_move() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default()
            .then(NavPath::complete(vec![
                Vec2Fixed::ZERO,
                Vec2Fixed::from_ints(0, 5),
            ]))
            .then(NavPath::failed());
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        let ctx = rig.ctx(&paths, &obstacles);

        agent.move_to(&ctx, Vec2Fixed::from_ints(0, 5)).unwrap();
        assert!(agent.move_to(&ctx, Vec2Fixed::from_ints(7, 7)).is_err());

        assert!(agent.is_moving());
        assert_eq!(agent.destination(), Vec2Fixed::from_ints(0, 5));
    }

    #[test]
    fn test_destination_is_snapped() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths {
            snap: Some(Vec2Fixed::from_ints(1, 1)),
            ..Paths::default()
        };
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());

        agent
            .move_to(&rig.ctx(&paths, &obstacles), Vec2Fixed::from_ints(1, 2))
            .unwrap();

        assert_eq!(agent.destination(), Vec2Fixed::from_ints(1, 1));
        assert_eq!(agent.state(), AgentState::Moving);
        assert_eq!(agent.pointer(), 0);
    }

    #[test]
    fn test_walks_path_then_completes_after_delay() {
        let mut rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        let goal = Vec2Fixed::from_ints(0, 3);
        agent.move_to(&rig.ctx(&paths, &obstacles), goal).unwrap();

        let mut completing_at = None;
        for _ in 0..200 {
            rig.tick(&mut agent, &paths, &obstacles);
            if completing_at.is_none() && agent.is_completing() {
                completing_at = Some(rig.now);
                assert!(rig.position().distance_squared(goal) <= Fixed::from_num(0.2));
            }
            if agent.is_completed() {
                break;
            }
        }

        let completing_at = completing_at.expect("agent never started completing");
        assert!(agent.is_completed());
        assert!(rig.now - completing_at <= Fixed::from_num(0.15));
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn test_scan_hit_starts_and_miss_stops_avoidance() {
        let mut rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        obstacles.hit.set(Some(RayHit {
            point: Vec2Fixed::from_ints(0, 1),
            normal: Vec2Fixed::from_ints(0, -1),
        }));
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        agent
            .move_to(&rig.ctx(&paths, &obstacles), Vec2Fixed::from_ints(0, 20))
            .unwrap();

        // The scan is due at 0.35 s. Tick n runs at (n - 1) * 0.05 s, so the
        // eighth tick is the first to reach it.
        for _ in 0..7 {
            rig.tick(&mut agent, &paths, &obstacles);
        }
        assert!(!agent.is_avoiding_obstacle());
        rig.tick(&mut agent, &paths, &obstacles);
        assert!(agent.is_avoiding_obstacle());
        assert_eq!(agent.avoidance_direction(), Some(Vec2Fixed::from_ints(1, 0)));
        assert_eq!(agent.state(), AgentState::Avoiding);

        let pointer = agent.pointer();
        rig.tick(&mut agent, &paths, &obstacles);
        assert_eq!(rig.published(), MoveState::toward(Vec2Fixed::from_ints(1, 0)));
        assert_eq!(agent.pointer(), pointer);

        obstacles.hit.set(None);
        for _ in 0..7 {
            rig.tick(&mut agent, &paths, &obstacles);
        }
        assert!(!agent.is_avoiding_obstacle());
        assert!(agent.is_moving());
    }

    #[test]
    fn test_external_avoidance_uses_facing_and_is_idempotent() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        let ctx = rig.ctx(&paths, &obstacles);

        agent.start_avoid_obstacle(&ctx);
        assert_eq!(agent.avoidance_direction(), Some(Vec2Fixed::from_ints(-1, 0)));

        rig.world
            .set(
                rig.unit,
                Transform {
                    position: Vec2Fixed::ZERO,
                    facing: Vec2Fixed::from_ints(1, 0),
                },
            )
            .unwrap();
        agent.start_avoid_obstacle(&ctx);
        assert_eq!(agent.avoidance_direction(), Some(Vec2Fixed::from_ints(-1, 0)));
    }

    fn three_corner_agent(rig: &Rig, paths: &Paths, obstacles: &Obstacles) -> MoveAgent {
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        agent
            .move_to(&rig.ctx(paths, obstacles), Vec2Fixed::from_ints(4, 4))
            .unwrap();
        agent
    }

    #[test]
    fn test_correction_patches_waypoint_when_replan_fails() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default()
            .then(NavPath::complete(vec![
                Vec2Fixed::ZERO,
                Vec2Fixed::from_ints(0, 4),
                Vec2Fixed::from_ints(4, 4),
            ]))
            .then(NavPath::failed());
        let obstacles = Obstacles::default();
        let mut agent = three_corner_agent(&rig, &paths, &obstacles);

        assert!(agent.correct_path(&rig.ctx(&paths, &obstacles)));

        // Target on the line: shift to the right, (2, 0), then 3/4 of the
        // way to (-2, 4).
        assert_eq!(agent.pointer(), 0);
        assert!(close(agent.path()[0], Vec2Fixed::from_ints(-1, 3)));
        assert_eq!(agent.path().len(), 3);
    }

    #[test]
    fn test_correction_replaces_path_when_replan_succeeds() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let replanned = vec![Vec2Fixed::from_ints(-1, 3), Vec2Fixed::from_ints(4, 4)];
        let paths = Paths::default()
            .then(NavPath::complete(vec![
                Vec2Fixed::ZERO,
                Vec2Fixed::from_ints(0, 4),
                Vec2Fixed::from_ints(4, 4),
            ]))
            .then(NavPath::complete(replanned.clone()));
        let obstacles = Obstacles::default();
        let mut agent = three_corner_agent(&rig, &paths, &obstacles);

        assert!(agent.correct_path(&rig.ctx(&paths, &obstacles)));
        assert_eq!(agent.path(), replanned.as_slice());
        assert_eq!(agent.pointer(), 0);
    }

    #[test]
    fn test_second_correction_inside_cooldown_is_noop() {
        let mut rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default()
            .then(NavPath::complete(vec![
                Vec2Fixed::ZERO,
                Vec2Fixed::from_ints(0, 4),
                Vec2Fixed::from_ints(4, 4),
            ]))
            .then(NavPath::failed())
            .then(NavPath::failed());
        let obstacles = Obstacles::default();
        let mut agent = three_corner_agent(&rig, &paths, &obstacles);

        assert!(agent.correct_path(&rig.ctx(&paths, &obstacles)));
        let patched = agent.path().to_vec();
        assert!(!agent.can_correct_path(rig.now));

        rig.now += Fixed::from_num(0.5);
        assert!(!agent.correct_path(&rig.ctx(&paths, &obstacles)));
        assert_eq!(agent.path(), patched.as_slice());

        rig.now += Fixed::from_num(0.25);
        assert!(agent.can_correct_path(rig.now));
    }

    #[test]
    fn test_no_correction_on_final_waypoint() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default().then(NavPath::complete(vec![Vec2Fixed::from_ints(0, 4)]));
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        let ctx = rig.ctx(&paths, &obstacles);
        agent.move_to(&ctx, Vec2Fixed::from_ints(0, 4)).unwrap();

        assert!(agent.is_on_final_waypoint());
        assert_eq!(agent.try_next_waypoint(), None);
        assert!(!agent.correct_path(&ctx));
        assert!(agent.can_correct_path(rig.now));
    }

    #[test]
    fn test_try_next_waypoint_before_final() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        assert_eq!(agent.try_next_waypoint(), None);

        agent
            .move_to(&rig.ctx(&paths, &obstacles), Vec2Fixed::from_ints(0, 6))
            .unwrap();
        assert_eq!(agent.try_next_waypoint(), Some(Vec2Fixed::ZERO));
    }

    #[test]
    fn test_complete_move_is_idempotent() {
        let mut rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        agent
            .move_to(&rig.ctx(&paths, &obstacles), Vec2Fixed::from_ints(0, 50))
            .unwrap();

        agent.complete_move(rig.now);
        rig.now += Fixed::from_num(0.05);
        agent.complete_move(rig.now);
        assert_eq!(agent.state(), AgentState::Completing);

        rig.now = Fixed::from_num(0.1);
        agent.step(&rig.ctx(&paths, &obstacles));
        assert!(agent.is_completed());
        assert!(!agent.is_moving());

        agent.complete_move(rig.now);
        assert!(!agent.is_completing());
    }

    #[test]
    fn test_cancel_clears_every_task() {
        let rig = Rig::new(Vec2Fixed::ZERO);
        let paths = Paths::default();
        let obstacles = Obstacles::default();
        let mut agent = MoveAgent::new(rig.unit, AgentConfig::default());
        let ctx = rig.ctx(&paths, &obstacles);
        agent.move_to(&ctx, Vec2Fixed::from_ints(0, 50)).unwrap();
        agent.start_avoid_obstacle(&ctx);
        agent.complete_move(rig.now);

        agent.cancel();
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(!agent.is_completed());
        assert!(!agent.is_avoiding_obstacle());
    }

    #[test]
    fn test_agent_table_orders_by_entity() {
        let mut table = AgentTable::new();
        table.insert(MoveAgent::new(7, AgentConfig::default()));
        table.insert(MoveAgent::new(2, AgentConfig::default()));
        table.insert(MoveAgent::new(4, AgentConfig::default()));

        let ids: Vec<_> = table.iter().map(MoveAgent::entity).collect();
        assert_eq!(ids, vec![2, 4, 7]);
        assert!(table.remove(4).is_some());
        assert!(!table.contains(4));
        assert_eq!(table.len(), 2);
    }
}
