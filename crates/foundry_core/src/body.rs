//! Body state: the planet or moon a building queue belongs to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::items::{BodyKind, BuildingKind, TechnologyKind};
use crate::queue::BuildingQueue;
use crate::resources::Resources;

/// Unique identifier for bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in game time, in whole seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The timestamp `seconds` later.
    #[must_use]
    pub const fn plus(self, seconds: u64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is later.
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Committed state of one body.
///
/// `buildings` holds committed levels only; queued work is never reflected
/// here until its completion event fires. Technology levels belong to the
/// owning player and are a read-only snapshot from the engine's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyState {
    /// Body identifier.
    pub id: BodyId,
    /// Planet or moon.
    pub kind: BodyKind,
    /// Fields available before any permanent building bonus.
    pub base_fields: u32,
    /// Committed building levels; missing kinds are level 0.
    #[serde(default)]
    pub buildings: BTreeMap<BuildingKind, u32>,
    /// Technology levels of the owner.
    #[serde(default)]
    pub technologies: BTreeMap<TechnologyKind, u32>,
    /// Stored resources.
    #[serde(default)]
    pub resources: Resources,
    /// Time production was last accrued up to.
    #[serde(default)]
    pub updated_at: Timestamp,
    /// Pending building queue.
    #[serde(default)]
    pub queue: BuildingQueue,
}

impl BodyState {
    /// Create an empty body.
    #[must_use]
    pub fn new(id: BodyId, kind: BodyKind, base_fields: u32) -> Self {
        Self {
            id,
            kind,
            base_fields,
            buildings: BTreeMap::new(),
            technologies: BTreeMap::new(),
            resources: Resources::ZERO,
            updated_at: Timestamp::default(),
            queue: BuildingQueue::new(),
        }
    }

    /// Set a committed building level.
    #[must_use]
    pub fn with_building(mut self, kind: BuildingKind, level: u32) -> Self {
        self.set_building_level(kind, level);
        self
    }

    /// Set a technology level.
    #[must_use]
    pub fn with_technology(mut self, kind: TechnologyKind, level: u32) -> Self {
        self.technologies.insert(kind, level);
        self
    }

    /// Set stored resources.
    #[must_use]
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Set the production clock.
    #[must_use]
    pub fn at(mut self, time: Timestamp) -> Self {
        self.updated_at = time;
        self
    }

    /// Committed level of a building.
    #[must_use]
    pub fn building_level(&self, kind: BuildingKind) -> u32 {
        self.buildings.get(&kind).copied().unwrap_or(0)
    }

    /// Overwrite a committed building level.
    pub fn set_building_level(&mut self, kind: BuildingKind, level: u32) {
        if level == 0 {
            self.buildings.remove(&kind);
        } else {
            self.buildings.insert(kind, level);
        }
    }

    /// Level of one of the owner's technologies.
    #[must_use]
    pub fn technology_level(&self, kind: TechnologyKind) -> u32 {
        self.technologies.get(&kind).copied().unwrap_or(0)
    }

    /// Fields occupied by committed buildings.
    #[must_use]
    pub fn used_fields(&self) -> u32 {
        self.buildings.values().sum()
    }

    /// Field capacity including permanent-building bonuses.
    #[must_use]
    pub fn max_fields(&self, config: &QueueConfig) -> u32 {
        self.buildings
            .iter()
            .filter(|(kind, _)| kind.is_permanent())
            .fold(self.base_fields, |max, (&kind, &level)| {
                max.saturating_add(level.saturating_mul(config.field_bonus(kind)))
            })
    }

    /// Encode the body for storage between transactions.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| QueueError::Serialization(format!("Failed to serialize body: {e}")))
    }

    /// Decode a body stored with [`BodyState::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| QueueError::Serialization(format!("Failed to deserialize body: {e}")))
    }
}
