//! Item registry: costs, times and requirements of buildings.
//!
//! The queue engine only talks to the [`ItemRegistry`] trait. The
//! [`BlueprintRegistry`] implementation is data-driven: one
//! [`BuildingBlueprint`] per kind, loadable from RON.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::body::BodyState;
use crate::error::{QueueError, Result};
use crate::items::{BodyKind, BuildingKind, QueueAction, TechnologyKind};
use crate::math::{geometric, percent};
use crate::queue::QueueEntry;
use crate::resources::Resources;

static NO_BUILDINGS: BTreeMap<BuildingKind, u32> = BTreeMap::new();
static NO_TECHNOLOGIES: BTreeMap<TechnologyKind, u32> = BTreeMap::new();

/// Pure per-kind formulas and requirement data.
///
/// Implementations must be deterministic: the engine calls them repeatedly
/// while projecting and expects identical answers for identical inputs.
pub trait ItemRegistry {
    /// Cost of bringing `kind` to `level`.
    fn cost(&self, kind: BuildingKind, level: u32) -> Resources;

    /// Energy production needed to bring `kind` to `level`.
    fn required_energy(&self, kind: BuildingKind, level: u32) -> i64;

    /// Seconds needed to construct a level costing `cost`.
    fn construction_time(&self, cost: &Resources, robotics_level: u32, nanite_level: u32) -> u64;

    /// Seconds needed to destroy a level costing `cost`.
    fn destruction_time(&self, cost: &Resources, robotics_level: u32, nanite_level: u32) -> u64;

    /// Minimum building levels required before `kind` can be constructed.
    fn buildings_requirements(&self, kind: BuildingKind) -> &BTreeMap<BuildingKind, u32>;

    /// Minimum technology levels required before `kind` can be constructed.
    fn technology_requirements(&self, kind: BuildingKind) -> &BTreeMap<TechnologyKind, u32>;

    /// Body-specific eligibility (planet-only and moon-only buildings).
    fn meets_special_requirements(&self, kind: BuildingKind, body: &BodyState) -> bool;

    /// Level of `on` that `kind` requires, zero if none.
    fn building_requirement(&self, kind: BuildingKind, on: BuildingKind) -> u32 {
        self.buildings_requirements(kind)
            .get(&on)
            .copied()
            .unwrap_or(0)
    }

    /// Check building requirements of `kind` against `levels`.
    fn meets_buildings_requirements(
        &self,
        kind: BuildingKind,
        levels: &BTreeMap<BuildingKind, u32>,
    ) -> bool {
        self.buildings_requirements(kind)
            .iter()
            .all(|(req, &min)| levels.get(req).copied().unwrap_or(0) >= min)
    }

    /// Check technology requirements of `kind` against the owner's research.
    fn meets_technology_requirements(&self, kind: BuildingKind, body: &BodyState) -> bool {
        self.technology_requirements(kind)
            .iter()
            .all(|(&tech, &min)| body.technology_level(tech) >= min)
    }

    /// Check every requirement against the body's committed state.
    fn meets_requirements(&self, kind: BuildingKind, body: &BodyState) -> bool {
        self.meets_special_requirements(kind, body)
            && self.meets_buildings_requirements(kind, &body.buildings)
            && self.meets_technology_requirements(kind, body)
    }

    /// Seconds the entry takes, given the levels of the speed-up buildings.
    fn required_time(&self, entry: &QueueEntry, cost: &Resources, levels: &BTreeMap<BuildingKind, u32>) -> u64 {
        let robotics = levels.get(&BuildingKind::RoboticsFactory).copied().unwrap_or(0);
        let nanite = levels.get(&BuildingKind::NaniteFactory).copied().unwrap_or(0);
        match entry.action {
            QueueAction::Construct => self.construction_time(cost, robotics, nanite),
            QueueAction::Destroy => self.destruction_time(cost, robotics, nanite),
        }
    }
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingBlueprint(
///     kind: Terraformer,
///     base_cost: (metal: 0, crystal: 50000, deuterium: 100000),
///     cost_factor_percent: 200,
///     base_energy: 1000,
///     buildings_required: { NaniteFactory: 1 },
///     technologies_required: { Energy: 12 },
///     allowed_on: [Planet],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingBlueprint {
    /// The building this blueprint describes.
    pub kind: BuildingKind,
    /// Cost of level 1.
    pub base_cost: Resources,
    /// Cost growth per level in percent (150 means ×1.5).
    pub cost_factor_percent: u32,
    /// Energy required for level 1; zero for most buildings.
    #[serde(default)]
    pub base_energy: i64,
    /// Minimum building levels needed first.
    #[serde(default)]
    pub buildings_required: BTreeMap<BuildingKind, u32>,
    /// Minimum technology levels needed first.
    #[serde(default)]
    pub technologies_required: BTreeMap<TechnologyKind, u32>,
    /// Body kinds the building may stand on.
    #[serde(default = "all_body_kinds")]
    pub allowed_on: Vec<BodyKind>,
}

fn all_body_kinds() -> Vec<BodyKind> {
    vec![BodyKind::Planet, BodyKind::Moon]
}

impl BuildingBlueprint {
    /// Create a blueprint allowed on every body kind with no requirements.
    #[must_use]
    pub fn new(kind: BuildingKind, base_cost: Resources, cost_factor_percent: u32) -> Self {
        Self {
            kind,
            base_cost,
            cost_factor_percent,
            base_energy: 0,
            buildings_required: BTreeMap::new(),
            technologies_required: BTreeMap::new(),
            allowed_on: all_body_kinds(),
        }
    }

    /// Add a building requirement.
    #[must_use]
    pub fn requires_building(mut self, kind: BuildingKind, level: u32) -> Self {
        self.buildings_required.insert(kind, level);
        self
    }

    /// Add a technology requirement.
    #[must_use]
    pub fn requires_technology(mut self, kind: TechnologyKind, level: u32) -> Self {
        self.technologies_required.insert(kind, level);
        self
    }

    /// Set the energy needed for level 1.
    #[must_use]
    pub fn with_energy(mut self, base_energy: i64) -> Self {
        self.base_energy = base_energy;
        self
    }

    /// Restrict the building to one body kind.
    #[must_use]
    pub fn only_on(mut self, kind: BodyKind) -> Self {
        self.allowed_on = vec![kind];
        self
    }

    fn exponent(level: u32) -> i64 {
        i64::from(level) - 1
    }

    /// Cost of bringing the building to `level`.
    #[must_use]
    pub fn cost(&self, level: u32) -> Resources {
        let factor = percent(self.cost_factor_percent);
        let exponent = Self::exponent(level);
        Resources::new(
            geometric(self.base_cost.metal, factor, exponent),
            geometric(self.base_cost.crystal, factor, exponent),
            geometric(self.base_cost.deuterium, factor, exponent),
        )
    }

    /// Energy needed to bring the building to `level`.
    #[must_use]
    pub fn required_energy(&self, level: u32) -> i64 {
        if level == 0 {
            return 0;
        }
        geometric(
            self.base_energy,
            percent(self.cost_factor_percent),
            Self::exponent(level),
        )
    }
}

/// Registry of building blueprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintRegistry {
    buildings: HashMap<BuildingKind, BuildingBlueprint>,
    game_speed: u32,
}

impl Default for BlueprintRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BlueprintRegistry {
    /// Structural resources one robotics-free hour of construction consumes.
    pub const RESOURCES_PER_HOUR: i64 = 2500;

    /// Nanite levels beyond this no longer shorten construction.
    const MAX_NANITE_SHIFT: u32 = 32;

    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buildings: HashMap::new(),
            game_speed: 1,
        }
    }

    /// Registry with every building of the classic game.
    #[must_use]
    pub fn standard() -> Self {
        use BodyKind::{Moon, Planet};
        use BuildingKind as K;
        use TechnologyKind as T;

        let mut registry = Self::new();
        let blueprints = [
            BuildingBlueprint::new(K::MetalMine, Resources::new(60, 15, 0), 150).only_on(Planet),
            BuildingBlueprint::new(K::CrystalMine, Resources::new(48, 24, 0), 160).only_on(Planet),
            BuildingBlueprint::new(K::DeuteriumSynthesizer, Resources::new(225, 75, 0), 150)
                .only_on(Planet),
            BuildingBlueprint::new(K::SolarPlant, Resources::new(75, 30, 0), 150).only_on(Planet),
            BuildingBlueprint::new(K::FusionReactor, Resources::new(900, 360, 180), 180)
                .only_on(Planet)
                .requires_building(K::DeuteriumSynthesizer, 5)
                .requires_technology(T::Energy, 3),
            BuildingBlueprint::new(K::RoboticsFactory, Resources::new(400, 120, 200), 200),
            BuildingBlueprint::new(K::NaniteFactory, Resources::new(1_000_000, 500_000, 100_000), 200)
                .only_on(Planet)
                .requires_building(K::RoboticsFactory, 10)
                .requires_technology(T::Computer, 10),
            BuildingBlueprint::new(K::Shipyard, Resources::new(400, 200, 100), 200)
                .only_on(Planet)
                .requires_building(K::RoboticsFactory, 2),
            BuildingBlueprint::new(K::MetalStorage, Resources::new(1000, 0, 0), 200).only_on(Planet),
            BuildingBlueprint::new(K::CrystalStorage, Resources::new(1000, 500, 0), 200)
                .only_on(Planet),
            BuildingBlueprint::new(K::DeuteriumTank, Resources::new(1000, 1000, 0), 200)
                .only_on(Planet),
            BuildingBlueprint::new(K::ResearchLab, Resources::new(200, 400, 200), 200)
                .only_on(Planet),
            BuildingBlueprint::new(K::Terraformer, Resources::new(0, 50_000, 100_000), 200)
                .only_on(Planet)
                .with_energy(1000)
                .requires_building(K::NaniteFactory, 1)
                .requires_technology(T::Energy, 12),
            BuildingBlueprint::new(K::AllianceDepot, Resources::new(20_000, 40_000, 0), 200)
                .only_on(Planet),
            BuildingBlueprint::new(K::MissileSilo, Resources::new(20_000, 20_000, 1000), 200)
                .only_on(Planet)
                .requires_building(K::Shipyard, 1),
            BuildingBlueprint::new(K::LunarBase, Resources::new(20_000, 40_000, 20_000), 200)
                .only_on(Moon),
            BuildingBlueprint::new(K::SensorPhalanx, Resources::new(20_000, 40_000, 20_000), 200)
                .only_on(Moon)
                .requires_building(K::LunarBase, 1),
            BuildingBlueprint::new(
                K::JumpGate,
                Resources::new(2_000_000, 4_000_000, 2_000_000),
                200,
            )
            .only_on(Moon)
            .requires_building(K::LunarBase, 1)
            .requires_technology(T::Hyperspace, 7),
        ];
        for blueprint in blueprints {
            registry.register(blueprint);
        }
        registry
    }

    /// Parse a RON list of blueprints.
    ///
    /// Every building kind must be described exactly once.
    pub fn from_ron_str(ron: &str, game_speed: u32) -> Result<Self> {
        let blueprints: Vec<BuildingBlueprint> =
            ron::from_str(ron).map_err(|e| QueueError::DataParse {
                path: "<blueprints>".to_string(),
                message: e.to_string(),
            })?;

        let mut registry = Self::new().with_game_speed(game_speed);
        for blueprint in blueprints {
            let kind = blueprint.kind;
            if registry.get(kind).is_some() {
                return Err(QueueError::DataParse {
                    path: "<blueprints>".to_string(),
                    message: format!("duplicate blueprint for {kind}"),
                });
            }
            registry.register(blueprint);
        }
        if let Some(missing) = BuildingKind::ALL
            .into_iter()
            .find(|kind| registry.get(*kind).is_none())
        {
            return Err(QueueError::DataParse {
                path: "<blueprints>".to_string(),
                message: format!("missing blueprint for {missing}"),
            });
        }
        Ok(registry)
    }

    /// Use a different game speed; every duration is divided by it.
    #[must_use]
    pub fn with_game_speed(mut self, game_speed: u32) -> Self {
        self.game_speed = game_speed.max(1);
        self
    }

    /// Current game speed.
    #[must_use]
    pub const fn game_speed(&self) -> u32 {
        self.game_speed
    }

    /// Register or replace a blueprint.
    pub fn register(&mut self, blueprint: BuildingBlueprint) {
        self.buildings.insert(blueprint.kind, blueprint);
    }

    /// Get a blueprint by kind.
    #[must_use]
    pub fn get(&self, kind: BuildingKind) -> Option<&BuildingBlueprint> {
        self.buildings.get(&kind)
    }

    /// Get all registered blueprints.
    pub fn all(&self) -> impl Iterator<Item = &BuildingBlueprint> {
        self.buildings.values()
    }

    fn duration(&self, cost: &Resources, robotics_level: u32, nanite_level: u32) -> u64 {
        let structural = i128::from(cost.structural().max(0));
        let divisor = i128::from(Self::RESOURCES_PER_HOUR)
            * (1 + i128::from(robotics_level))
            * (1i128 << nanite_level.min(Self::MAX_NANITE_SHIFT))
            * i128::from(self.game_speed);
        let seconds = structural * 3600 / divisor;
        u64::try_from(seconds).unwrap_or(u64::MAX).max(1)
    }
}

impl ItemRegistry for BlueprintRegistry {
    fn cost(&self, kind: BuildingKind, level: u32) -> Resources {
        self.get(kind).map_or(Resources::ZERO, |b| b.cost(level))
    }

    fn required_energy(&self, kind: BuildingKind, level: u32) -> i64 {
        self.get(kind).map_or(0, |b| b.required_energy(level))
    }

    fn construction_time(&self, cost: &Resources, robotics_level: u32, nanite_level: u32) -> u64 {
        self.duration(cost, robotics_level, nanite_level)
    }

    fn destruction_time(&self, cost: &Resources, robotics_level: u32, nanite_level: u32) -> u64 {
        self.duration(cost, robotics_level, nanite_level)
    }

    fn buildings_requirements(&self, kind: BuildingKind) -> &BTreeMap<BuildingKind, u32> {
        self.get(kind).map_or(&NO_BUILDINGS, |b| &b.buildings_required)
    }

    fn technology_requirements(&self, kind: BuildingKind) -> &BTreeMap<TechnologyKind, u32> {
        self.get(kind)
            .map_or(&NO_TECHNOLOGIES, |b| &b.technologies_required)
    }

    fn meets_special_requirements(&self, kind: BuildingKind, body: &BodyState) -> bool {
        self.get(kind)
            .is_some_and(|b| b.allowed_on.contains(&body.kind))
    }
}
