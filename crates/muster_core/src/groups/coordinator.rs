//! Coordination of agents sharing one destination.

use serde::{Deserialize, Serialize};

use crate::config::GroupConfig;
use crate::ecs::EntityId;
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::{AgentCtx, AgentTable};

/// Identifier of a group, unique for the lifetime of its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Completion radius for a group of `members` agents.
///
/// `max(min_radius, members / 4π)`: big groups may stop on a wider ring
/// around the destination instead of all fighting for the same point.
#[must_use]
pub fn completion_radius(members: usize, min_radius: Fixed) -> Fixed {
    let coefficient = Fixed::from_num(4) * Fixed::from_num(fixed::consts::PI);
    let scaled = Fixed::saturating_from_num(members) / coefficient;
    scaled.max(min_radius)
}

/// Agents moving to one destination as a group.
///
/// Each fixed step the coordinator nudges members whose paths are about to
/// cross, fans obstacle avoidance out to close neighbours and decides which
/// members are close enough to stop.
#[derive(Debug, Clone)]
pub struct GroupCoordinator {
    id: GroupId,
    destination: Vec2Fixed,
    moving: Vec<EntityId>,
    completed: Vec<EntityId>,
    radius: Fixed,
    config: GroupConfig,
}

impl GroupCoordinator {
    /// Build a group. Duplicate entries in `agents` are ignored.
    #[must_use]
    pub fn new(
        id: GroupId,
        agents: &[EntityId],
        destination: Vec2Fixed,
        config: GroupConfig,
    ) -> Self {
        let mut moving = Vec::with_capacity(agents.len());
        for &agent in agents {
            if !moving.contains(&agent) {
                moving.push(agent);
            }
        }
        let radius = completion_radius(moving.len(), config.min_complete_radius);

        Self {
            id,
            destination,
            moving,
            completed: Vec::new(),
            radius,
            config,
        }
    }

    /// Run one coordination step.
    pub fn update(&mut self, agents: &mut AgentTable, ctx: &AgentCtx<'_>) {
        self.drop_missing(agents, ctx);

        let snapshot = self.moving.clone();
        self.correct_paths(&snapshot, agents, ctx);
        self.propagate_avoidance(&snapshot, agents, ctx);
        self.complete_agents(agents, ctx);
    }

    fn drop_missing(&mut self, agents: &AgentTable, ctx: &AgentCtx<'_>) {
        let present =
            |id: &EntityId| agents.contains(*id) && ctx.bodies.position(*id).is_some();
        let before = self.moving.len() + self.completed.len();
        self.moving.retain(present);
        self.completed.retain(present);
        let dropped = before - self.moving.len() - self.completed.len();
        if dropped > 0 {
            tracing::debug!(group = %self.id, dropped, "Dropped members without agents");
        }
    }

    fn correct_paths(&self, snapshot: &[EntityId], agents: &mut AgentTable, ctx: &AgentCtx<'_>) {
        for &id in snapshot {
            let Some(agent) = agents.get(id) else {
                continue;
            };
            if !agent.can_correct_path(ctx.now) {
                continue;
            }

            let reason = if self.near_corrected(id, snapshot, agents, ctx) {
                "near a corrected member"
            } else if self.converging(id, snapshot, agents, ctx) {
                "converging on a shared waypoint"
            } else {
                continue;
            };

            if let Some(agent) = agents.get_mut(id) {
                if agent.correct_path(ctx) {
                    tracing::debug!(group = %self.id, entity = id, reason, "Corrected path");
                }
            }
        }
    }

    /// A member that corrected within its cooldown stands within stopping
    /// distance of `id`.
    fn near_corrected(
        &self,
        id: EntityId,
        snapshot: &[EntityId],
        agents: &AgentTable,
        ctx: &AgentCtx<'_>,
    ) -> bool {
        let Some(position) = ctx.bodies.position(id) else {
            return false;
        };

        snapshot.iter().any(|&other| {
            other != id
                && agents
                    .get(other)
                    .is_some_and(|agent| !agent.can_correct_path(ctx.now))
                && ctx
                    .bodies
                    .position(other)
                    .is_some_and(|p| position.is_within(p, self.config.stopping_distance))
        })
    }

    /// `id` is about to reach its next waypoint while another member heads
    /// for the same point and is already close to it.
    fn converging(
        &self,
        id: EntityId,
        snapshot: &[EntityId],
        agents: &AgentTable,
        ctx: &AgentCtx<'_>,
    ) -> bool {
        let Some(position) = ctx.bodies.position(id) else {
            return false;
        };
        let Some(target) = agents.get(id).and_then(|agent| agent.try_next_waypoint()) else {
            return false;
        };
        if !position.is_within(target, self.config.stopping_distance) {
            return false;
        }

        snapshot.iter().any(|&other| {
            if other == id {
                return false;
            }
            let Some(other_target) = agents.get(other).and_then(|agent| agent.try_next_waypoint())
            else {
                return false;
            };
            if !target.is_within(other_target, self.config.equals_point_distance) {
                return false;
            }
            ctx.bodies
                .position(other)
                .is_some_and(|p| p.is_closer_than(target, self.config.stopping_distance))
        })
    }

    /// For each member not avoiding, find the first avoiding neighbour in
    /// range and start avoidance on that neighbour.
    fn propagate_avoidance(
        &self,
        snapshot: &[EntityId],
        agents: &mut AgentTable,
        ctx: &AgentCtx<'_>,
    ) {
        for &id in snapshot {
            let Some(agent) = agents.get(id) else {
                continue;
            };
            if agent.is_avoiding_obstacle() {
                continue;
            }
            let Some(position) = ctx.bodies.position(id) else {
                continue;
            };

            let neighbour = snapshot.iter().copied().find(|&other| {
                other != id
                    && agents
                        .get(other)
                        .is_some_and(|agent| agent.is_avoiding_obstacle())
                    && ctx.bodies.position(other).is_some_and(|p| {
                        position.is_within(p, self.config.obstacle_avoid_distance)
                    })
            });

            if let Some(neighbour) = neighbour.and_then(|other| agents.get_mut(other)) {
                neighbour.start_avoid_obstacle(ctx);
                tracing::trace!(
                    group = %self.id,
                    entity = id,
                    neighbour = neighbour.entity(),
                    "Avoiding neighbour in range"
                );
            }
        }
    }

    fn complete_agents(&mut self, agents: &mut AgentTable, ctx: &AgentCtx<'_>) {
        let (done, still_moving): (Vec<_>, Vec<_>) = self
            .moving
            .iter()
            .copied()
            .partition(|&id| agents.get(id).is_some_and(|agent| agent.is_completed()));
        self.moving = still_moving;
        self.completed.extend(done);

        for &id in &self.moving {
            let Some(position) = ctx.bodies.position(id) else {
                continue;
            };
            if !position.is_within(self.destination, self.radius) {
                continue;
            }

            let stop = position.is_within(self.destination, self.config.stopping_distance)
                || self.completed.iter().any(|&other| {
                    ctx.bodies
                        .position(other)
                        .is_some_and(|p| position.is_closer_than(p, self.config.stopping_distance))
                });

            if stop {
                if let Some(agent) = agents.get_mut(id) {
                    agent.complete_move(ctx.now);
                }
            }
        }
    }

    /// Drop `agents` from both the moving and completed sets.
    pub fn remove_agents(&mut self, agents: &[EntityId]) {
        self.moving.retain(|id| !agents.contains(id));
        self.completed.retain(|id| !agents.contains(id));
    }

    /// Returns true once no member is still moving.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.moving.is_empty()
    }

    /// Group identifier.
    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    /// Shared destination.
    #[must_use]
    pub const fn destination(&self) -> Vec2Fixed {
        self.destination
    }

    /// Radius within which members may stop.
    #[must_use]
    pub const fn completion_radius(&self) -> Fixed {
        self.radius
    }

    /// Members still moving.
    #[must_use]
    pub fn moving(&self) -> &[EntityId] {
        &self.moving
    }

    /// Members that finished.
    #[must_use]
    pub fn completed(&self) -> &[EntityId] {
        &self.completed
    }

    /// Returns true if `agent` is a member, moving or completed.
    #[must_use]
    pub fn contains(&self, agent: EntityId) -> bool {
        self.moving.contains(&agent) || self.completed.contains(&agent)
    }
}
