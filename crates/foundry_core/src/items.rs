//! Item kinds known to the building queue.

use serde::{Deserialize, Serialize};

/// Every building that can stand on a body.
///
/// The declaration order is the display order of read views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Metal mine.
    MetalMine,
    /// Crystal mine.
    CrystalMine,
    /// Deuterium synthesizer.
    DeuteriumSynthesizer,
    /// Solar plant.
    SolarPlant,
    /// Fusion reactor.
    FusionReactor,
    /// Robotics factory; shortens construction.
    RoboticsFactory,
    /// Nanite factory; halves construction time per level.
    NaniteFactory,
    /// Shipyard.
    Shipyard,
    /// Metal storage.
    MetalStorage,
    /// Crystal storage.
    CrystalStorage,
    /// Deuterium tank.
    DeuteriumTank,
    /// Research lab.
    ResearchLab,
    /// Terraformer; adds fields to a planet.
    Terraformer,
    /// Alliance depot.
    AllianceDepot,
    /// Missile silo.
    MissileSilo,
    /// Lunar base; adds fields to a moon.
    LunarBase,
    /// Sensor phalanx.
    SensorPhalanx,
    /// Jump gate.
    JumpGate,
}

impl BuildingKind {
    /// All building kinds in display order.
    pub const ALL: [Self; 18] = [
        Self::MetalMine,
        Self::CrystalMine,
        Self::DeuteriumSynthesizer,
        Self::SolarPlant,
        Self::FusionReactor,
        Self::RoboticsFactory,
        Self::NaniteFactory,
        Self::Shipyard,
        Self::MetalStorage,
        Self::CrystalStorage,
        Self::DeuteriumTank,
        Self::ResearchLab,
        Self::Terraformer,
        Self::AllianceDepot,
        Self::MissileSilo,
        Self::LunarBase,
        Self::SensorPhalanx,
        Self::JumpGate,
    ];

    /// Permanent buildings can never be destroyed and each of their levels
    /// raises the body's field capacity.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Terraformer | Self::LunarBase)
    }
}

impl std::fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Technologies that building requirements can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TechnologyKind {
    /// Energy technology.
    Energy,
    /// Computer technology.
    Computer,
    /// Hyperspace technology.
    Hyperspace,
}

/// What kind of celestial body owns the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// A planet.
    #[default]
    Planet,
    /// A moon.
    Moon,
}

/// Direction of a queued level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueAction {
    /// Add one level.
    Construct,
    /// Remove one level.
    Destroy,
}

impl QueueAction {
    /// Level change applied when the action completes.
    #[must_use]
    pub const fn delta(self) -> i64 {
        match self {
            Self::Construct => 1,
            Self::Destroy => -1,
        }
    }
}
