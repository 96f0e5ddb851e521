//! Scenario loading and replay.
//!
//! A scenario is one body, the collaborators it lives with and a list of
//! player commands. Replaying it drives a [`BuildingsService`] with its own
//! game clock and records what every command did, so queue behavior can be
//! inspected and diffed as JSON.

use std::path::Path;
use std::result::Result;

use foundry_core::prelude::*;
use foundry_core::view::BuildingsAndQueue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Scenario config is out of range.
    #[error("Invalid scenario config: {0}")]
    Config(#[from] ConfigError),
    /// The engine reported a fault.
    #[error("Building queue fault: {0}")]
    Queue(#[from] QueueError),
    /// Failed to write the report.
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One scripted player action or clock step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Queue construction of the next level.
    Construct(BuildingKind),
    /// Queue destruction of one level.
    Destroy(BuildingKind),
    /// Move an entry towards the tail.
    MoveDown(u32),
    /// Move an entry towards the head.
    MoveUp(u32),
    /// Cancel an entry.
    Cancel(u32),
    /// Move the clock forward by some seconds and fire every due event.
    Advance(u64),
    /// Record the buildings and queue view.
    View,
}

const fn default_game_speed() -> u32 {
    1
}

/// A complete scenario.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Two mines",
///     economy: (total_energy: 100, income_per_hour: (metal: 3600, crystal: 1800, deuterium: 0)),
///     body: (id: (1), kind: Planet, base_fields: 20, resources: (metal: 500, crystal: 500, deuterium: 0)),
///     commands: [Construct(MetalMine), Construct(CrystalMine), Advance(600), View],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Queue configuration.
    #[serde(default)]
    pub config: QueueConfig,
    /// Divides every construction time.
    #[serde(default = "default_game_speed")]
    pub game_speed: u32,
    /// Energy and income of the body.
    pub economy: FlatEconomy,
    /// Starting body; its `updated_at` is where the clock starts.
    pub body: BodyState,
    /// Commands in order.
    pub commands: Vec<Command>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.config.validate()?;
        Ok(scenario)
    }
}

/// What one command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A new entry was queued.
    Queued {
        /// Its sequence number.
        sequence: u32,
    },
    /// A move or cancel went through.
    Applied,
    /// The engine refused the command; nothing changed.
    Rejected {
        /// Error message.
        error: String,
    },
    /// The clock moved and due events fired.
    Advanced {
        /// Everything the completion handler reported.
        events: Vec<QueueEvent>,
    },
    /// Snapshot of buildings and queue.
    Viewed {
        /// The view.
        view: BuildingsAndQueue,
    },
}

/// A command and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position in the command list.
    pub index: usize,
    /// Game time the command ran at.
    pub now: Timestamp,
    /// The command.
    pub command: Command,
    /// What happened.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of replaying a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Every command in order.
    pub steps: Vec<Step>,
    /// Body after the last command.
    pub body: BodyState,
}

impl ScenarioReport {
    /// Number of rejected commands.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Rejected { .. }))
            .count()
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Replay a scenario with the standard blueprints.
pub fn run(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    run_with(scenario, BlueprintRegistry::standard())
}

/// Replay a scenario with custom blueprints.
///
/// The scenario's game speed overrides the registry's. Refused commands are
/// recorded and replay continues; a fault stops it.
pub fn run_with(
    scenario: &Scenario,
    registry: BlueprintRegistry,
) -> Result<ScenarioReport, ScenarioError> {
    scenario.config.validate()?;
    let service = BuildingsService::new(
        scenario.config,
        registry.with_game_speed(scenario.game_speed),
        scenario.economy,
        InMemoryScheduler::new(),
    );
    let id = scenario.body.id;
    service.insert_body(scenario.body.clone());

    tracing::info!(scenario = %scenario.name, body_id = %id, commands = scenario.commands.len(), "Running scenario");

    let mut now = scenario.body.updated_at;
    let mut steps = Vec::with_capacity(scenario.commands.len());
    for (index, &command) in scenario.commands.iter().enumerate() {
        let result = match command {
            Command::Construct(kind) => service
                .construct(id, kind, now)
                .map(|sequence| Outcome::Queued { sequence }),
            Command::Destroy(kind) => service
                .destroy(id, kind, now)
                .map(|sequence| Outcome::Queued { sequence }),
            Command::MoveDown(sequence) => {
                service.move_down(id, sequence, now).map(|()| Outcome::Applied)
            }
            Command::MoveUp(sequence) => {
                service.move_up(id, sequence, now).map(|()| Outcome::Applied)
            }
            Command::Cancel(sequence) => {
                service.cancel(id, sequence, now).map(|()| Outcome::Applied)
            }
            Command::Advance(seconds) => {
                now = now.plus(seconds);
                service
                    .run_due(now)
                    .into_result()
                    .map(|events| Outcome::Advanced { events })
            }
            Command::View => service
                .buildings_and_queue(id, now)
                .map(|view| Outcome::Viewed { view }),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_fault() => {
                tracing::error!(scenario = %scenario.name, index, ?command, error = %e, "Scenario stopped");
                return Err(e.into());
            }
            Err(e) => {
                tracing::debug!(index, ?command, error = %e, "Command rejected");
                Outcome::Rejected {
                    error: e.to_string(),
                }
            }
        };
        steps.push(Step {
            index,
            now,
            command,
            outcome,
        });
    }

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        steps,
        body: service.body(id)?,
    })
}
