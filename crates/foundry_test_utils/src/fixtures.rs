//! Test fixtures and helpers.
//!
//! Pre-built bodies and a bundle of in-memory collaborators for
//! consistent testing.

use foundry_core::prelude::*;

/// Production every fixture economy reports.
pub const TEST_ENERGY: i64 = 10_000;

/// Resources no early building can exhaust.
#[must_use]
pub const fn plenty() -> Resources {
    Resources::new(10_000_000, 10_000_000, 10_000_000)
}

/// An empty planet with `base_fields` fields at time 1000.
#[must_use]
pub fn planet(id: u64, base_fields: u32) -> BodyState {
    BodyState::new(BodyId(id), BodyKind::Planet, base_fields).at(Timestamp(1000))
}

/// An empty moon with `base_fields` fields at time 1000.
#[must_use]
pub fn moon(id: u64, base_fields: u32) -> BodyState {
    BodyState::new(BodyId(id), BodyKind::Moon, base_fields).at(Timestamp(1000))
}

/// A roomy planet with plenty of resources.
#[must_use]
pub fn rich_planet(id: u64) -> BodyState {
    planet(id, 200).with_resources(plenty())
}

/// A developed planet that meets the requirements of every planet building.
#[must_use]
pub fn developed_planet(id: u64) -> BodyState {
    rich_planet(id)
        .with_building(BuildingKind::DeuteriumSynthesizer, 5)
        .with_building(BuildingKind::RoboticsFactory, 10)
        .with_building(BuildingKind::Shipyard, 1)
        .with_technology(TechnologyKind::Energy, 12)
        .with_technology(TechnologyKind::Computer, 10)
        .with_technology(TechnologyKind::Hyperspace, 7)
}

/// Parse a body written in RON.
///
/// # Panics
///
/// Panics if the text is not a valid body.
#[must_use]
pub fn body_from_ron(text: &str) -> BodyState {
    ron::from_str(text).unwrap_or_else(|e| panic!("invalid body fixture: {e}"))
}

/// In-memory collaborators for driving an engine in tests.
#[derive(Debug)]
pub struct Collaborators {
    /// Queue configuration.
    pub config: QueueConfig,
    /// Standard building registry.
    pub registry: BlueprintRegistry,
    /// Flat economy with [`TEST_ENERGY`].
    pub economy: FlatEconomy,
    /// Scheduler holding pending events.
    pub scheduler: InMemoryScheduler,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl Collaborators {
    /// Default config, standard registry, no income.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            registry: BlueprintRegistry::standard(),
            economy: FlatEconomy::new(TEST_ENERGY),
            scheduler: InMemoryScheduler::new(),
        }
    }

    /// Use a different queue configuration.
    #[must_use]
    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different economy.
    #[must_use]
    pub fn with_economy(mut self, economy: FlatEconomy) -> Self {
        self.economy = economy;
        self
    }

    /// Engine over these collaborators.
    #[must_use]
    pub fn engine(&self) -> QueueEngine<'_, BlueprintRegistry, FlatEconomy, InMemoryScheduler> {
        QueueEngine::new(&self.config, &self.registry, &self.economy, &self.scheduler)
    }

    /// Pending event of a body.
    #[must_use]
    pub fn pending(&self, body: &BodyState) -> Option<PendingEvent> {
        self.scheduler.find_pending(body.id)
    }

    /// Fire the body's pending event, if any.
    pub fn complete_head(&self, body: &mut BodyState) -> Result<Vec<QueueEvent>> {
        match self.pending(body) {
            Some(event) => self.engine().handle(body, event),
            None => Ok(Vec::new()),
        }
    }
}
