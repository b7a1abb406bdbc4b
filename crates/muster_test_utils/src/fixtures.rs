//! Test fixtures and navigation doubles.
//!
//! [`GridNav`] is a small deterministic navigation service: A* over a grid
//! of walkable/blocked cells for paths, and a marched ray for obstacle
//! queries. [`OpenField`] and the scripted oracles cover unit tests that do
//! not need geometry.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use fixed::types::I32F32;
use muster_core::math::{Fixed, Vec2Fixed};
use muster_core::navigation::{LayerMask, NavPath, ObstacleOracle, PathOracle, RayHit};
use serde::{Deserialize, Serialize};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from integer coordinates.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Create a vector from float coordinates (for tests only).
#[must_use]
pub fn vec2_f(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// Straight-line navigation with no obstacles anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl PathOracle for OpenField {
    fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
        NavPath::complete(vec![start, end])
    }

    fn sample_position(&self, point: Vec2Fixed, _max_radius: Fixed) -> Option<Vec2Fixed> {
        Some(point)
    }
}

impl ObstacleOracle for OpenField {
    fn raycast(
        &self,
        _origin: Vec2Fixed,
        _direction: Vec2Fixed,
        _max_distance: Fixed,
        _layers: LayerMask,
    ) -> Option<RayHit> {
        None
    }
}

/// Path oracle that replays queued answers, then falls back to straight
/// lines. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedPaths {
    queued: RefCell<VecDeque<NavPath>>,
    requests: RefCell<Vec<(Vec2Fixed, Vec2Fixed)>>,
    snap: Cell<Option<Vec2Fixed>>,
}

impl ScriptedPaths {
    /// Oracle with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next path request.
    pub fn push(&self, path: NavPath) {
        self.queued.borrow_mut().push_back(path);
    }

    /// Make every `sample_position` answer `point`.
    pub fn snap_to(&self, point: Option<Vec2Fixed>) {
        self.snap.set(point);
    }

    /// `(start, end)` of every path request so far.
    #[must_use]
    pub fn requests(&self) -> Vec<(Vec2Fixed, Vec2Fixed)> {
        self.requests.borrow().clone()
    }
}

impl PathOracle for ScriptedPaths {
    fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
        self.requests.borrow_mut().push((start, end));
        self.queued
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| NavPath::complete(vec![start, end]))
    }

    fn sample_position(&self, point: Vec2Fixed, _max_radius: Fixed) -> Option<Vec2Fixed> {
        Some(self.snap.get().unwrap_or(point))
    }
}

/// Obstacle oracle reporting the same hit for every ray while armed.
#[derive(Debug, Default)]
pub struct ScriptedObstacles {
    hit: Cell<Option<RayHit>>,
}

impl ScriptedObstacles {
    /// Oracle that reports nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `hit` for every later ray, or nothing for `None`.
    pub fn set_hit(&self, hit: Option<RayHit>) {
        self.hit.set(hit);
    }
}

impl ObstacleOracle for ScriptedObstacles {
    fn raycast(
        &self,
        _origin: Vec2Fixed,
        _direction: Vec2Fixed,
        _max_distance: Fixed,
        layers: LayerMask,
    ) -> Option<RayHit> {
        if !layers.intersects(LayerMask::OBSTACLE) {
            return None;
        }
        self.hit.get()
    }
}

/// Walkable/blocked grid with A* paths and marched rays.
///
/// Cell `(x, y)` covers `[x * cell_size, (x + 1) * cell_size)` on both
/// axes. Everything outside the grid counts as blocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridNav {
    width: u32,
    height: u32,
    #[serde(with = "muster_core::math::decimal_serde")]
    cell_size: Fixed,
    blocked: Vec<bool>,
}

impl GridNav {
    /// Create a grid with every cell walkable.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero, or if `cell_size` is not positive.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: Fixed) -> Self {
        assert!(width > 0, "GridNav width must be positive");
        assert!(height > 0, "GridNav height must be positive");
        assert!(cell_size > Fixed::ZERO, "GridNav cell_size must be positive");

        Self {
            width,
            height,
            cell_size,
            blocked: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Check if coordinates are within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Block one cell. Returns false if out of bounds.
    pub fn block(&mut self, x: u32, y: u32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let index = self.index(x, y);
        self.blocked[index] = true;
        true
    }

    /// Block every cell in the inclusive rectangle.
    pub fn block_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.block(x, y);
            }
        }
    }

    /// Check if a cell is inside the grid and not blocked.
    #[must_use]
    pub fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.in_bounds(x, y) && !self.blocked[self.index(x, y)]
    }

    fn is_walkable_signed(&self, x: i64, y: i64) -> bool {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.is_walkable(x, y),
            _ => false,
        }
    }

    /// Cell containing a world position, if it lies inside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2Fixed) -> Option<(u32, u32)> {
        let (x, y) = self.cell_of(pos);
        if x >= 0 && x < i64::from(self.width) && y >= 0 && y < i64::from(self.height) {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }

    fn cell_of(&self, pos: Vec2Fixed) -> (i64, i64) {
        (
            (pos.x / self.cell_size).floor().to_num::<i64>(),
            (pos.y / self.cell_size).floor().to_num::<i64>(),
        )
    }

    /// Convert grid coordinates to world position (center of cell).
    #[must_use]
    pub fn grid_to_world(&self, x: u32, y: u32) -> Vec2Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(x) * self.cell_size + half,
            Fixed::from_num(y) * self.cell_size + half,
        )
    }

    fn walkable_at(&self, pos: Vec2Fixed) -> bool {
        let (x, y) = self.cell_of(pos);
        self.is_walkable_signed(x, y)
    }

    /// A* over cells from `start` to `goal`, as cell centers.
    fn find_cells(&self, start: (u32, u32), goal: (u32, u32)) -> Option<Vec<Vec2Fixed>> {
        let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
        let mut came_from: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
        let mut g_score: HashMap<(u32, u32), Fixed> = HashMap::new();

        g_score.insert(start, Fixed::ZERO);
        open_set.push(AStarNode {
            cell: start,
            f_score: chebyshev(start, goal),
        });

        while let Some(current) = open_set.pop() {
            if current.cell == goal {
                return Some(self.reconstruct(&came_from, goal));
            }

            let current_g = g_score.get(&current.cell).copied().unwrap_or(Fixed::MAX);

            for &(dx, dy) in &DIRECTIONS {
                let nx = i64::from(current.cell.0) + i64::from(dx);
                let ny = i64::from(current.cell.1) + i64::from(dy);
                if !self.is_walkable_signed(nx, ny) {
                    continue;
                }
                // No corner cutting.
                if dx != 0 && dy != 0 {
                    let cx = i64::from(current.cell.0);
                    let cy = i64::from(current.cell.1);
                    if !self.is_walkable_signed(nx, cy) || !self.is_walkable_signed(cx, ny) {
                        continue;
                    }
                }

                let next = (nx as u32, ny as u32);
                let tentative = current_g + Fixed::ONE;
                if tentative < g_score.get(&next).copied().unwrap_or(Fixed::MAX) {
                    came_from.insert(next, current.cell);
                    g_score.insert(next, tentative);
                    open_set.push(AStarNode {
                        cell: next,
                        f_score: tentative + chebyshev(next, goal),
                    });
                }
            }
        }

        None
    }

    fn reconstruct(
        &self,
        came_from: &HashMap<(u32, u32), (u32, u32)>,
        goal: (u32, u32),
    ) -> Vec<Vec2Fixed> {
        let mut path = vec![self.grid_to_world(goal.0, goal.1)];
        let mut current = goal;
        while let Some(&prev) = came_from.get(&current) {
            path.push(self.grid_to_world(prev.0, prev.1));
            current = prev;
        }
        path.reverse();
        path
    }

    /// Drop corners that have a clear line of sight past them.
    #[must_use]
    pub fn smooth_path(&self, path: Vec<Vec2Fixed>) -> Vec<Vec2Fixed> {
        if path.len() <= 2 {
            return path;
        }

        let mut smoothed = vec![path[0]];
        let mut current = 0;
        while current < path.len() - 1 {
            let mut furthest = current + 1;
            for check in (current + 2)..path.len() {
                if self.has_line_of_sight(path[current], path[check]) {
                    furthest = check;
                }
            }
            smoothed.push(path[furthest]);
            current = furthest;
        }
        smoothed
    }

    /// Bresenham walk between the cells of two positions.
    #[must_use]
    pub fn has_line_of_sight(&self, start: Vec2Fixed, end: Vec2Fixed) -> bool {
        let (x0, y0) = self.cell_of(start);
        let (x1, y1) = self.cell_of(end);

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if !self.is_walkable_signed(x, y) {
                return false;
            }
            if x == x1 && y == y1 {
                return true;
            }

            let e2 = 2 * err;
            if e2 > -dy && e2 < dx
                && (!self.is_walkable_signed(x + sx, y) || !self.is_walkable_signed(x, y + sy))
            {
                return false;
            }
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl PathOracle for GridNav {
    fn compute_path(&self, start: Vec2Fixed, end: Vec2Fixed) -> NavPath {
        let (Some(from), Some(to)) = (self.world_to_grid(start), self.world_to_grid(end)) else {
            return NavPath::failed();
        };
        if !self.is_walkable(from.0, from.1) || !self.is_walkable(to.0, to.1) {
            return NavPath::failed();
        }
        if from == to {
            return NavPath::complete(vec![start, end]);
        }

        let Some(mut cells) = self.find_cells(from, to) else {
            return NavPath::failed();
        };
        if let Some(first) = cells.first_mut() {
            *first = start;
        }
        if let Some(last) = cells.last_mut() {
            *last = end;
        }
        NavPath::complete(self.smooth_path(cells))
    }

    fn sample_position(&self, point: Vec2Fixed, max_radius: Fixed) -> Option<Vec2Fixed> {
        if self.walkable_at(point) {
            return Some(point);
        }

        let reach = (max_radius / self.cell_size).ceil().to_num::<i64>() + 1;
        let (cx, cy) = self.cell_of(point);
        let max_sq = max_radius * max_radius;

        let mut best: Option<(Fixed, Vec2Fixed)> = None;
        for y in (cy - reach)..=(cy + reach) {
            for x in (cx - reach)..=(cx + reach) {
                if !self.is_walkable_signed(x, y) {
                    continue;
                }
                let center = self.grid_to_world(x as u32, y as u32);
                let dist = center.distance_squared(point);
                if dist > max_sq {
                    continue;
                }
                // Scan order breaks ties.
                let closer = match best {
                    Some((best_dist, _)) => dist < best_dist,
                    None => true,
                };
                if closer {
                    best = Some((dist, center));
                }
            }
        }
        best.map(|(_, center)| center)
    }
}

impl ObstacleOracle for GridNav {
    fn raycast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
        layers: LayerMask,
    ) -> Option<RayHit> {
        if !layers.intersects(LayerMask::OBSTACLE) || direction.is_zero() {
            return None;
        }

        let direction = direction.normalize();
        let step = self.cell_size / Fixed::from_num(8);
        let mut previous = self.cell_of(origin);
        let mut travelled = step;

        while travelled <= max_distance {
            let point = origin + direction.scale(travelled);
            let cell = self.cell_of(point);
            if cell != previous {
                if !self.is_walkable_signed(cell.0, cell.1) {
                    let normal = if cell.0 != previous.0 {
                        Vec2Fixed::new(-Fixed::from_num((cell.0 - previous.0).signum()), Fixed::ZERO)
                    } else {
                        Vec2Fixed::new(Fixed::ZERO, -Fixed::from_num((cell.1 - previous.1).signum()))
                    };
                    return Some(RayHit { point, normal });
                }
                previous = cell;
            }
            travelled += step;
        }
        None
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: (u32, u32),
    f_score: Fixed,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, then lower (y, x) first for deterministic ties.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| (other.cell.1, other.cell.0).cmp(&(self.cell.1, self.cell.0)))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

#[inline]
fn chebyshev(a: (u32, u32), b: (u32, u32)) -> Fixed {
    Fixed::from_num(a.0.abs_diff(b.0).max(a.1.abs_diff(b.1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::navigation::PathStatus;

    fn walled() -> GridNav {
        // 10x10 unit cells with a wall at x = 5 from y = 0 to y = 7.
        let mut grid = GridNav::new(10, 10, fixed(1));
        grid.block_rect(5, 0, 5, 7);
        grid
    }

    #[test]
    fn test_straight_path_is_smoothed_to_endpoints() {
        let grid = GridNav::new(10, 10, fixed(1));
        let path = grid.compute_path(vec2_f(0.5, 0.5), vec2_f(8.5, 0.5));
        assert_eq!(path.status, PathStatus::Complete);
        assert_eq!(path.corners, vec![vec2_f(0.5, 0.5), vec2_f(8.5, 0.5)]);
    }

    #[test]
    fn test_path_goes_around_wall() {
        let grid = walled();
        let start = vec2_f(1.5, 1.5);
        let end = vec2_f(8.5, 1.5);
        let path = grid.compute_path(start, end);

        assert!(path.is_complete());
        assert_eq!(path.corners.first(), Some(&start));
        assert_eq!(path.corners.last(), Some(&end));
        assert!(path.corners.len() > 2);
        assert!(path.corners.iter().any(|c| c.y >= fixed(8)));
    }

    #[test]
    fn test_blocked_goal_fails() {
        let grid = walled();
        let path = grid.compute_path(vec2_f(1.5, 1.5), vec2_f(5.5, 3.5));
        assert_eq!(path.status, PathStatus::Failed);
    }

    #[test]
    fn test_enclosed_goal_fails() {
        let mut grid = GridNav::new(10, 10, fixed(1));
        grid.block_rect(6, 6, 8, 6);
        grid.block_rect(6, 8, 8, 8);
        grid.block(6, 7);
        grid.block(8, 7);
        let path = grid.compute_path(vec2_f(0.5, 0.5), vec2_f(7.5, 7.5));
        assert_eq!(path.status, PathStatus::Failed);
    }

    #[test]
    fn test_sample_position_snaps_to_nearest_walkable_center() {
        let grid = walled();
        assert_eq!(
            grid.sample_position(vec2_f(2.2, 2.2), fixed(2)),
            Some(vec2_f(2.2, 2.2))
        );
        assert_eq!(
            grid.sample_position(vec2_f(5.2, 3.5), fixed(2)),
            Some(vec2_f(4.5, 3.5))
        );
        assert_eq!(grid.sample_position(vec2_f(5.5, 3.5), fixed_f(0.4)), None);
    }

    #[test]
    fn test_raycast_reports_wall_face() {
        let grid = walled();
        let hit = grid
            .raycast(vec2_f(4.5, 2.5), vec2(1, 0), fixed(1), LayerMask::OBSTACLE)
            .unwrap();
        assert_eq!(hit.normal, vec2(-1, 0));
        assert!(hit.point.x >= fixed(5));

        assert!(grid
            .raycast(vec2_f(4.5, 2.5), vec2(-1, 0), fixed(1), LayerMask::OBSTACLE)
            .is_none());
        assert!(grid
            .raycast(vec2_f(4.5, 2.5), vec2(1, 0), fixed(1), LayerMask::GROUND)
            .is_none());
    }

    #[test]
    fn test_grid_map_loads_back_from_ron() {
        let mut grid = GridNav::new(12, 8, fixed_f(0.5));
        grid.block_rect(6, 0, 6, 5);

        let text = ron::to_string(&grid).unwrap();
        let loaded: GridNav = ron::from_str(&text).unwrap();

        assert_eq!(loaded.grid_to_world(3, 2), grid.grid_to_world(3, 2));
        assert!(!loaded.is_walkable(6, 5));
        assert!(loaded.is_walkable(6, 6));
        let (from, to) = (vec2_f(0.25, 0.25), vec2_f(5.75, 0.25));
        assert_eq!(
            loaded.compute_path(from, to).corners,
            grid.compute_path(from, to).corners
        );
    }

    #[test]
    fn test_astar_is_deterministic() {
        let grid = walled();
        let a = grid.compute_path(vec2_f(0.5, 0.5), vec2_f(9.5, 0.5));
        let b = grid.compute_path(vec2_f(0.5, 0.5), vec2_f(9.5, 0.5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_scripted_paths_replay_then_fall_back() {
        let paths = ScriptedPaths::new();
        paths.push(NavPath::failed());
        assert!(!paths.compute_path(vec2(0, 0), vec2(1, 1)).is_complete());
        assert!(paths.compute_path(vec2(0, 0), vec2(1, 1)).is_complete());
        assert_eq!(paths.requests().len(), 2);
    }
}
