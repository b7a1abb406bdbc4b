//! Registry of active groups.

use super::coordinator::{GroupCoordinator, GroupId};
use crate::config::GroupConfig;
use crate::ecs::EntityId;
use crate::math::Vec2Fixed;
use crate::movement::{AgentCtx, AgentTable};

/// Owns every active [`GroupCoordinator`].
///
/// An agent belongs to at most one group: ordering it into a new group takes
/// it out of the old one, and groups left without moving members retire.
#[derive(Debug, Clone, Default)]
pub struct GroupManager {
    groups: Vec<GroupCoordinator>,
    next_id: u32,
    config: GroupConfig,
}

impl GroupManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new(config: GroupConfig) -> Self {
        Self {
            groups: Vec::new(),
            next_id: 0,
            config,
        }
    }

    /// Register a group moving `agents` to `destination`.
    ///
    /// The agents are first removed from whichever groups hold them; groups
    /// emptied that way retire immediately.
    pub fn add_group(&mut self, agents: &[EntityId], destination: Vec2Fixed) -> GroupId {
        self.groups.retain_mut(|group| {
            group.remove_agents(agents);
            if group.is_completed() {
                tracing::debug!(group = %group.id(), "Group emptied by re-tasking");
                return false;
            }
            true
        });

        let id = GroupId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let group = GroupCoordinator::new(id, agents, destination, self.config);
        tracing::debug!(
            group = %id,
            members = group.moving().len(),
            radius = %group.completion_radius(),
            "Group added"
        );
        self.groups.push(group);
        id
    }

    /// Update every group once, then retire completed ones.
    pub fn update(&mut self, agents: &mut AgentTable, ctx: &AgentCtx<'_>) {
        for group in &mut self.groups {
            group.update(agents, ctx);
        }

        self.groups.retain(|group| {
            if group.is_completed() {
                tracing::debug!(
                    group = %group.id(),
                    completed = group.completed().len(),
                    "Group retired"
                );
                return false;
            }
            true
        });
    }

    /// Take `agents` out of every group without retiring anything.
    pub fn remove_agents(&mut self, agents: &[EntityId]) {
        for group in &mut self.groups {
            group.remove_agents(agents);
        }
    }

    /// Number of active groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no group is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group currently holding `agent`.
    #[must_use]
    pub fn group_of(&self, agent: EntityId) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|group| group.contains(agent))
            .map(GroupCoordinator::id)
    }

    /// Active group by id.
    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&GroupCoordinator> {
        self.groups.iter().find(|group| group.id() == id)
    }

    /// Active groups in creation order.
    #[must_use]
    pub fn groups(&self) -> &[GroupCoordinator] {
        &self.groups
    }
}
