//! Tuning values for the simulation.
//!
//! Every distance and duration the movement layer uses lives here so it can
//! be tuned from a RON file without recompiling.
//!
//! # Example RON
//!
//! ```ron
//! SimConfig(
//!     tick_rate: 20,
//!     agent: AgentConfig(
//!         obstacle_scan_period: 0.35,
//!         correct_path_period: 0.75,
//!     ),
//!     group: GroupConfig(
//!         stopping_distance: 1.0,
//!     ),
//! )
//! ```
//!
//! Omitted fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::math::{decimal_serde, Fixed};

/// Per-agent path following and avoidance tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Squared distance at which a waypoint counts as reached.
    #[serde(with = "decimal_serde")]
    pub stopping_distance_sq: Fixed,
    /// Delay between `complete_move` and the agent reporting completed.
    #[serde(with = "decimal_serde")]
    pub complete_delay: Fixed,
    /// Minimum time between two path corrections.
    #[serde(with = "decimal_serde")]
    pub correct_path_period: Fixed,
    /// Lateral shift applied by a path correction.
    #[serde(with = "decimal_serde")]
    pub shift_offset: Fixed,
    /// Interpolation factor between the shifted current and next points.
    #[serde(with = "decimal_serde")]
    pub shift_factor: Fixed,
    /// Search radius when snapping points onto the navigable surface.
    #[serde(with = "decimal_serde")]
    pub sample_radius: Fixed,
    /// Period of the obstacle scan.
    #[serde(with = "decimal_serde")]
    pub obstacle_scan_period: Fixed,
    /// Length of the obstacle scan ray.
    #[serde(with = "decimal_serde")]
    pub obstacle_ray_distance: Fixed,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stopping_distance_sq: Fixed::from_num(0.2),
            complete_delay: Fixed::from_num(0.1),
            correct_path_period: Fixed::from_num(0.75),
            shift_offset: Fixed::from_num(2),
            shift_factor: Fixed::from_num(0.75),
            sample_radius: Fixed::from_num(2),
            obstacle_scan_period: Fixed::from_num(0.35),
            obstacle_ray_distance: Fixed::from_num(1),
        }
    }
}

/// Group coordination tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Proximity threshold for corrections and arrival.
    #[serde(with = "decimal_serde")]
    pub stopping_distance: Fixed,
    /// Radius within which an avoiding neighbour triggers propagation.
    #[serde(with = "decimal_serde")]
    pub obstacle_avoid_distance: Fixed,
    /// Two waypoints closer than this are treated as the same point.
    #[serde(with = "decimal_serde")]
    pub equals_point_distance: Fixed,
    /// Lower bound of the completion radius.
    #[serde(with = "decimal_serde")]
    pub min_complete_radius: Fixed,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            stopping_distance: Fixed::from_num(1),
            obstacle_avoid_distance: Fixed::from_num(2.5),
            equals_point_distance: Fixed::from_num(0.1),
            min_complete_radius: Fixed::from_num(4),
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed steps per simulated second.
    pub tick_rate: u32,
    /// Squared distance at which a direct move order is dropped.
    #[serde(with = "decimal_serde")]
    pub direct_move_min_distance_sq: Fixed,
    /// Agent tuning.
    pub agent: AgentConfig,
    /// Group tuning.
    pub group: GroupConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            direct_move_min_distance_sq: Fixed::from_num(0.01),
            agent: AgentConfig::default(),
            group: GroupConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|err| CoreError::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Length of one fixed step in seconds.
    #[must_use]
    pub fn fixed_timestep(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Reject values the movement layer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(CoreError::InvalidConfig("tick_rate must be positive".into()));
        }

        let positive = [
            ("agent.stopping_distance_sq", self.agent.stopping_distance_sq),
            ("agent.obstacle_scan_period", self.agent.obstacle_scan_period),
            ("agent.obstacle_ray_distance", self.agent.obstacle_ray_distance),
            ("agent.sample_radius", self.agent.sample_radius),
            ("group.stopping_distance", self.group.stopping_distance),
            ("group.obstacle_avoid_distance", self.group.obstacle_avoid_distance),
            ("group.equals_point_distance", self.group.equals_point_distance),
            ("group.min_complete_radius", self.group.min_complete_radius),
        ];
        for (name, value) in positive {
            if value <= Fixed::ZERO {
                return Err(CoreError::InvalidConfig(format!("{name} must be positive")));
            }
        }

        let non_negative = [
            ("agent.complete_delay", self.agent.complete_delay),
            ("agent.correct_path_period", self.agent.correct_path_period),
            ("agent.shift_offset", self.agent.shift_offset),
            ("direct_move_min_distance_sq", self.direct_move_min_distance_sq),
        ];
        for (name, value) in non_negative {
            if value < Fixed::ZERO {
                return Err(CoreError::InvalidConfig(format!("{name} must not be negative")));
            }
        }

        if self.agent.shift_factor < Fixed::ZERO || self.agent.shift_factor > Fixed::ONE {
            return Err(CoreError::InvalidConfig(
                "agent.shift_factor must be within 0..=1".into(),
            ));
        }

        Ok(())
    }
}
