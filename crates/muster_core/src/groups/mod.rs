//! Group movement: coordinators for units ordered to one destination and
//! the manager that owns them.

mod coordinator;
mod manager;

pub use coordinator::{completion_radius, GroupCoordinator, GroupId};
pub use manager::GroupManager;
