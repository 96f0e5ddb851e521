//! Data validation utilities.

use std::path::Path;
use std::result::Result;

use foundry_core::prelude::*;
use thiserror::Error;

/// A data file that cannot be used.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// File not found.
    #[error("Data file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read data file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Config parsed but holds unusable values.
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    /// Blueprint list failed to parse or is incomplete.
    #[error("Invalid blueprints: {0}")]
    Blueprints(#[from] QueueError),
    /// A blueprint may never be built anywhere.
    #[error("{0} is not allowed on any body")]
    NowhereAllowed(BuildingKind),
    /// Costs would shrink from level to level.
    #[error("{kind} cost factor must be at least 100%, got {percent}%")]
    ShrinkingCost {
        /// Offending building.
        kind: BuildingKind,
        /// Configured factor.
        percent: u32,
    },
    /// A level 1 cost with a negative component.
    #[error("{0} has a negative base cost")]
    NegativeCost(BuildingKind),
    /// A required building cannot stand on a body the dependent may stand on.
    #[error("{kind} on {body:?} requires {required}, which is not allowed there")]
    UnsatisfiableRequirement {
        /// Dependent building.
        kind: BuildingKind,
        /// Body kind the dependent is allowed on.
        body: BodyKind,
        /// Required building.
        required: BuildingKind,
    },
}

fn read(path: &Path) -> Result<String, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load and validate a [`QueueConfig`] RON file.
///
/// # Errors
///
/// Returns an error if the file is missing, malformed or out of range.
pub fn validate_config_file(path: &Path) -> Result<QueueConfig, ValidationError> {
    let config = QueueConfig::from_ron_str(&read(path)?)?;
    tracing::debug!(path = %path.display(), ?config, "Config is valid");
    Ok(config)
}

/// Load a blueprint RON file and check every blueprint.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_blueprints_file(
    path: &Path,
    game_speed: u32,
) -> Result<BlueprintRegistry, ValidationError> {
    let registry = BlueprintRegistry::from_ron_str(&read(path)?, game_speed).map_err(|e| {
        match e {
            QueueError::DataParse { message, .. } => QueueError::DataParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        }
    })?;
    validate_registry(&registry)?;
    Ok(registry)
}

/// Check that every blueprint of a registry can be built somewhere.
///
/// # Errors
///
/// Returns the first problem found, in building order.
pub fn validate_registry(registry: &BlueprintRegistry) -> Result<(), ValidationError> {
    for kind in BuildingKind::ALL {
        let Some(blueprint) = registry.get(kind) else {
            return Err(QueueError::DataParse {
                path: "<blueprints>".to_string(),
                message: format!("missing blueprint for {kind}"),
            }
            .into());
        };
        if blueprint.allowed_on.is_empty() {
            return Err(ValidationError::NowhereAllowed(kind));
        }
        if blueprint.cost_factor_percent < 100 {
            return Err(ValidationError::ShrinkingCost {
                kind,
                percent: blueprint.cost_factor_percent,
            });
        }
        let cost = blueprint.base_cost;
        if cost.metal < 0 || cost.crystal < 0 || cost.deuterium < 0 {
            return Err(ValidationError::NegativeCost(kind));
        }
        for &body in &blueprint.allowed_on {
            for &required in blueprint.buildings_required.keys() {
                let allowed = registry
                    .get(required)
                    .is_some_and(|r| r.allowed_on.contains(&body));
                if !allowed {
                    return Err(ValidationError::UnsatisfiableRequirement {
                        kind,
                        body,
                        required,
                    });
                }
            }
        }
    }
    tracing::debug!(blueprints = BuildingKind::ALL.len(), "Blueprints are valid");
    Ok(())
}
