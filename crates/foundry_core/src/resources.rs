//! Resource vectors.
//!
//! All amounts are whole units held in `i64`; arithmetic is plain integer
//! arithmetic so results never depend on the platform.

use serde::{Deserialize, Serialize};

/// Stored or required amounts of every resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Metal amount.
    pub metal: i64,
    /// Crystal amount.
    pub crystal: i64,
    /// Deuterium amount.
    pub deuterium: i64,
}

impl Resources {
    /// No resources.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Create a new resource vector.
    #[must_use]
    pub const fn new(metal: i64, crystal: i64, deuterium: i64) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
    }

    /// Whether every component is at least the matching component of `other`.
    #[must_use]
    pub const fn greater_or_equal(&self, other: &Self) -> bool {
        self.metal >= other.metal
            && self.crystal >= other.crystal
            && self.deuterium >= other.deuterium
    }

    /// Sum of metal and crystal, the amount construction time is derived from.
    #[must_use]
    pub const fn structural(&self) -> i64 {
        self.metal.saturating_add(self.crystal)
    }

    /// Multiply every component by `numerator / denominator`, truncating.
    #[must_use]
    pub fn scaled(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let scale = |v: i64| {
            let wide = i128::from(v) * i128::from(numerator) / i128::from(denominator);
            i64::try_from(wide).unwrap_or(if wide < 0 { i64::MIN } else { i64::MAX })
        };
        Self::new(
            scale(self.metal),
            scale(self.crystal),
            scale(self.deuterium),
        )
    }
}

impl std::ops::Add for Resources {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.metal.saturating_add(rhs.metal),
            self.crystal.saturating_add(rhs.crystal),
            self.deuterium.saturating_add(rhs.deuterium),
        )
    }
}

impl std::ops::Sub for Resources {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.metal.saturating_sub(rhs.metal),
            self.crystal.saturating_sub(rhs.crystal),
            self.deuterium.saturating_sub(rhs.deuterium),
        )
    }
}

impl std::ops::AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::fmt::Display for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}M/{}C/{}D",
            self.metal, self.crystal, self.deuterium
        )
    }
}
