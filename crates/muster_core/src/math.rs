//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation math uses fixed-point arithmetic so that two runs fed the
//! same orders produce bit-identical unit positions. Positions live on the
//! ground plane: `x` is world X and `y` is world Z. The vertical axis is
//! implicit and never stored.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y coordinate (world Z).
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

/// Serde support for human-written fixed-point numbers.
///
/// Tuning and scenario files are edited by hand, so values are written as
/// decimals (`0.35`) and converted once at load time. The conversion is
/// deterministic; only the text representation is lossy.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Ground-plane forward (+Z).
    pub const FORWARD: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ONE,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`] once the offset exceeds about 46341
    /// units, so comparisons against small radii stay correct.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        Self::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y))
            .length_squared()
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Returns true if `other` lies within `radius` (inclusive).
    #[must_use]
    pub fn is_within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) <= radius.saturating_mul(radius)
    }

    /// Returns true if `other` lies strictly closer than `radius`.
    #[must_use]
    pub fn is_closer_than(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) < radius.saturating_mul(radius)
    }

    /// Squared length, saturating like [`Self::distance_squared`].
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Dot product of two vectors. Saturates instead of overflowing.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// 2D cross product (z component of the 3D cross product).
    ///
    /// Saturates, so the sign stays right for far-apart points.
    #[must_use]
    pub fn cross(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.y)
            .saturating_sub(self.y.saturating_mul(other.x))
    }

    /// Cross product with the world up axis, flattened back to the ground.
    ///
    /// For a ground vector `(x, z)` this is `(-z, x)`.
    #[must_use]
    pub fn cross_up(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Cross product with the world down axis, flattened back to the ground.
    #[must_use]
    pub fn cross_down(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        if self.is_zero() {
            return Self::ZERO;
        }

        // Shrink long vectors first so the squared length cannot saturate.
        let largest = self.x.saturating_abs().max(self.y.saturating_abs());
        let v = if largest > NORMALIZE_SHRINK_ABOVE {
            Self::new(self.x / largest, self.y / largest)
        } else {
            self
        };

        let len = fixed_sqrt(v.length_squared());
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(v.x / len, v.y / len)
    }

    /// Returns true if both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }
}

/// Components above this are scaled down before normalizing.
const NORMALIZE_SHRINK_ABOVE: Fixed = Fixed::from_bits(16_384 << 32);

/// Which side of the directed line `start -> end` a point lies on.
///
/// Positive when `point` is to the right of the line (looking down from
/// above with +Z forward), negative to the left, zero on the line.
#[must_use]
pub fn side_of_line(start: Vec2Fixed, end: Vec2Fixed, point: Vec2Fixed) -> Fixed {
    (point - start).cross(end - start)
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}
