//! Scenario loading.
//!
//! A scenario describes a grid map, the units on it and the move orders
//! issued while it runs. Coordinates are plain decimals in world units and
//! are converted to fixed point once, at load time.
//!
//! ```ron
//! Scenario(
//!     name: "wall_crossing",
//!     ticks: 600,
//!     grid: GridSpec(width: 40, height: 40, cell_size: 1.0, blocked: [(20, 0, 20, 28)]),
//!     units: [UnitSpec(position: (5.0, 5.0), speed: 4.0)],
//!     orders: [OrderSpec(at_tick: 0, units: [0], destination: (34.5, 6.5))],
//! )
//! ```

use std::path::Path;

use muster_core::config::SimConfig;
use muster_core::math::{Fixed, Vec2Fixed};
use muster_test_utils::fixtures::GridNav;
use serde::{Deserialize, Serialize};

use crate::error::{HeadlessError, Result};

/// Grid map description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Cell edge length in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    /// Blocked rectangles as inclusive `(x0, y0, x1, y1)` cell ranges.
    #[serde(default)]
    pub blocked: Vec<(u32, u32, u32, u32)>,
}

fn default_cell_size() -> f64 {
    1.0
}

/// One unit to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Spawn position.
    pub position: (f64, f64),
    /// Speed in units per second.
    pub speed: f64,
}

/// A group move order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Tick the order is issued before.
    pub at_tick: u64,
    /// Indices into the scenario's unit list.
    pub units: Vec<usize>,
    /// Destination.
    pub destination: (f64, f64),
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Fixed steps to run unless overridden.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Tuning; defaults apply when omitted.
    #[serde(default)]
    pub config: Option<SimConfig>,
    /// The map.
    pub grid: GridSpec,
    /// Units in spawn order.
    pub units: Vec<UnitSpec>,
    /// Orders, in any order.
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

fn default_ticks() -> u64 {
    600
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HeadlessError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check indices, map size and coordinate ranges.
    pub fn validate(&self) -> Result<()> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(HeadlessError::InvalidScenario(
                "grid must have at least one cell".into(),
            ));
        }
        if to_fixed(self.grid.cell_size, "grid.cell_size")? <= Fixed::ZERO {
            return Err(HeadlessError::InvalidScenario(
                "grid.cell_size must be positive".into(),
            ));
        }
        for (index, unit) in self.units.iter().enumerate() {
            to_vec2(unit.position, "unit position")?;
            if to_fixed(unit.speed, "unit speed")? <= Fixed::ZERO {
                return Err(HeadlessError::InvalidScenario(format!(
                    "unit {index} needs a positive speed"
                )));
            }
        }
        for order in &self.orders {
            to_vec2(order.destination, "order destination")?;
            if let Some(&bad) = order.units.iter().find(|&&i| i >= self.units.len()) {
                return Err(HeadlessError::InvalidScenario(format!(
                    "order at tick {} names unit {bad}, but only {} exist",
                    order.at_tick,
                    self.units.len()
                )));
            }
        }
        if let Some(config) = &self.config {
            config.validate()?;
        }
        Ok(())
    }

    /// Build the navigation grid.
    pub fn build_grid(&self) -> Result<GridNav> {
        let cell_size = to_fixed(self.grid.cell_size, "grid.cell_size")?;
        if self.grid.width == 0 || self.grid.height == 0 || cell_size <= Fixed::ZERO {
            return Err(HeadlessError::InvalidScenario("degenerate grid".into()));
        }
        let mut grid = GridNav::new(self.grid.width, self.grid.height, cell_size);
        for &(x0, y0, x1, y1) in &self.grid.blocked {
            grid.block_rect(x0, y0, x1, y1);
        }
        Ok(grid)
    }
}

pub(crate) fn to_fixed(value: f64, what: &str) -> Result<Fixed> {
    Fixed::checked_from_num(value)
        .ok_or_else(|| HeadlessError::InvalidScenario(format!("{what} {value} is out of range")))
}

pub(crate) fn to_vec2(value: (f64, f64), what: &str) -> Result<Vec2Fixed> {
    Ok(Vec2Fixed::new(to_fixed(value.0, what)?, to_fixed(value.1, what)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        Scenario(
            name: "sample",
            grid: GridSpec(width: 10, height: 10, blocked: [(5, 0, 5, 6)]),
            units: [
                UnitSpec(position: (1.5, 1.5), speed: 3.0),
                UnitSpec(position: (2.5, 1.5), speed: 3.0),
            ],
            orders: [OrderSpec(at_tick: 4, units: [0, 1], destination: (8.5, 1.5))],
        )
    "#;

    #[test]
    fn test_parse_applies_defaults() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        assert_eq!(scenario.ticks, 600);
        assert_eq!(scenario.grid.cell_size, 1.0);
        assert!(scenario.config.is_none());
        assert_eq!(scenario.orders[0].at_tick, 4);

        let grid = scenario.build_grid().unwrap();
        assert!(!grid.is_walkable(5, 3));
        assert!(grid.is_walkable(5, 7));
    }

    #[test]
    fn test_out_of_range_unit_index_is_rejected() {
        let text = SAMPLE.replace("units: [0, 1]", "units: [0, 7]");
        let err = Scenario::from_ron_str(&text).unwrap_err();
        assert!(matches!(err, HeadlessError::InvalidScenario(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let text = SAMPLE.replace("name: \"sample\",", "name: \"sample\", config: Some(SimConfig(tick_rate: 0)),");
        let err = Scenario::from_ron_str(&text).unwrap_err();
        assert!(matches!(err, HeadlessError::Core(_)));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Scenario::load("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, HeadlessError::FileNotFound(_)));
    }
}
