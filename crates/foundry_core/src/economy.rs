//! Economy collaborator: energy budget and production accrual.
//!
//! How production accrues is outside the building queue. The engine only
//! needs the total energy of a body and a way to bring stored resources up
//! to a point in time.

use serde::{Deserialize, Serialize};

use crate::body::{BodyState, Timestamp};
use crate::resources::Resources;

/// Seconds per hour, the unit income rates are expressed in.
const SECONDS_PER_HOUR: i64 = 3600;

/// Economy of a body as seen by the building queue.
pub trait Economy {
    /// Total energy production of the body.
    fn total_energy(&self, body: &BodyState) -> i64;

    /// Accrue production up to `at` and move `updated_at` there.
    ///
    /// Times at or before `updated_at` leave the body unchanged.
    fn advance_production(&self, body: &mut BodyState, at: Timestamp);
}

/// Economy with constant energy and constant hourly income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlatEconomy {
    /// Energy production available to every body.
    pub total_energy: i64,
    /// Resources produced per hour.
    #[serde(default)]
    pub income_per_hour: Resources,
}

impl FlatEconomy {
    /// Create an economy without income.
    #[must_use]
    pub const fn new(total_energy: i64) -> Self {
        Self {
            total_energy,
            income_per_hour: Resources::ZERO,
        }
    }

    /// Set the hourly income.
    #[must_use]
    pub const fn with_income(mut self, income_per_hour: Resources) -> Self {
        self.income_per_hour = income_per_hour;
        self
    }
}

impl Economy for FlatEconomy {
    fn total_energy(&self, _body: &BodyState) -> i64 {
        self.total_energy
    }

    fn advance_production(&self, body: &mut BodyState, at: Timestamp) {
        if at <= body.updated_at {
            return;
        }
        let elapsed = at.since(body.updated_at);
        let elapsed = i64::try_from(elapsed).unwrap_or(i64::MAX);
        body.resources += self.income_per_hour.scaled(elapsed, SECONDS_PER_HOUR);
        body.updated_at = at;
    }
}
