//! Interfaces to the navigation services the core consumes.
//!
//! The core never plans paths or tests geometry itself. It asks a
//! [`PathOracle`] for corner lists and an [`ObstacleOracle`] for ray hits,
//! and treats both as black boxes. Hosts plug in their navmesh and physics
//! layers; tests plug in grids or scripted answers.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Outcome of a path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStatus {
    /// The corners reach the requested end point.
    Complete,
    /// The corners stop short of the end point.
    Partial,
    /// No path could be planned.
    Failed,
}

/// Planned path: ordered corners from start to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPath {
    /// Planning outcome.
    pub status: PathStatus,
    /// Waypoints, starting at (or near) the start point.
    pub corners: Vec<Vec2Fixed>,
}

impl NavPath {
    /// A complete path through `corners`.
    #[must_use]
    pub fn complete(corners: Vec<Vec2Fixed>) -> Self {
        Self {
            status: PathStatus::Complete,
            corners,
        }
    }

    /// A failed request.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            status: PathStatus::Failed,
            corners: Vec::new(),
        }
    }

    /// Returns true if the path is complete and has at least one corner.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == PathStatus::Complete && !self.corners.is_empty()
    }
}

/// Path planning service.
pub trait PathOracle {
    /// Plan a path between two ground points.
    fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath;

    /// Nearest navigable point within `max_radius`, if any.
    fn sample_position(&self, point: Vec2Fixed, max_radius: Fixed) -> Option<Vec2Fixed>;
}

impl<T: PathOracle + ?Sized> PathOracle for Rc<T> {
    fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
        (**self).compute_path(start, end)
    }

    fn sample_position(&self, point: Vec2Fixed, max_radius: Fixed) -> Option<Vec2Fixed> {
        (**self).sample_position(point, max_radius)
    }
}

/// Physics layers a ray can test against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Nothing.
    pub const NONE: Self = Self(0);
    /// Static obstacles units steer around.
    pub const OBSTACLE: Self = Self(1 << 0);
    /// Walkable ground.
    pub const GROUND: Self = Self(1 << 1);
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Returns true if any bit of `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// A ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayHit {
    /// Point of impact.
    pub point: Vec2Fixed,
    /// Surface normal at the point of impact.
    pub normal: Vec2Fixed,
}

/// Obstacle ray casting service.
pub trait ObstacleOracle {
    /// First hit along `direction` from `origin` within `max_distance`.
    fn raycast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
        layers: LayerMask,
    ) -> Option<RayHit>;
}

impl<T: ObstacleOracle + ?Sized> ObstacleOracle for Rc<T> {
    fn raycast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
        layers: LayerMask,
    ) -> Option<RayHit> {
        (**self).raycast(origin, direction, max_distance, layers)
    }
}

/// Borrowed pair of oracles handed to agents and groups each step.
#[derive(Clone, Copy)]
pub struct Oracles<'a> {
    /// Path planning.
    pub paths: &'a dyn PathOracle,
    /// Obstacle ray casting.
    pub obstacles: &'a dyn ObstacleOracle,
}

impl std::fmt::Debug for Oracles<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracles").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_intersection() {
        let mask = LayerMask::OBSTACLE | LayerMask::GROUND;
        assert!(mask.intersects(LayerMask::OBSTACLE));
        assert!(!LayerMask::GROUND.intersects(LayerMask::OBSTACLE));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }

    #[test]
    fn test_empty_complete_path_is_not_usable() {
        assert!(!NavPath::complete(Vec::new()).is_complete());
        assert!(!NavPath::failed().is_complete());
        assert!(NavPath::complete(vec![Vec2Fixed::ZERO]).is_complete());
    }
}
