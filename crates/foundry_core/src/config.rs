//! Engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::BuildingKind;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Queue capacity below one.
    #[error("building queue capacity must be at least 1, got {0}")]
    Capacity(usize),
    /// Field bonus of a permanent building must exceed one.
    #[error("fields per {kind} level must be greater than 1, got {value}")]
    FieldBonus {
        /// The permanent building.
        kind: BuildingKind,
        /// The configured value.
        value: u32,
    },
    /// Failed to parse RON.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Tunables of the building queue.
///
/// # Example RON
///
/// ```ron
/// QueueConfig(
///     capacity: 5,
///     fields_per_terraformer_level: 5,
///     fields_per_lunar_base_level: 3,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of entries in a body's queue.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Fields gained per completed Terraformer level.
    #[serde(default = "default_terraformer_fields")]
    pub fields_per_terraformer_level: u32,
    /// Fields gained per completed Lunar Base level.
    #[serde(default = "default_lunar_base_fields")]
    pub fields_per_lunar_base_level: u32,
}

const fn default_capacity() -> usize {
    5
}

const fn default_terraformer_fields() -> u32 {
    5
}

const fn default_lunar_base_fields() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            fields_per_terraformer_level: default_terraformer_fields(),
            fields_per_lunar_base_level: default_lunar_base_fields(),
        }
    }
}

impl QueueConfig {
    /// Configuration with a different queue capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Fields one completed level of `kind` adds to the body's capacity.
    #[must_use]
    pub const fn field_bonus(&self, kind: BuildingKind) -> u32 {
        match kind {
            BuildingKind::Terraformer => self.fields_per_terraformer_level,
            BuildingKind::LunarBase => self.fields_per_lunar_base_level,
            _ => 0,
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 1 {
            return Err(ConfigError::Capacity(self.capacity));
        }
        for kind in [BuildingKind::Terraformer, BuildingKind::LunarBase] {
            let value = self.field_bonus(kind);
            if value <= 1 {
                return Err(ConfigError::FieldBonus { kind, value });
            }
        }
        Ok(())
    }

    /// Parse and validate a RON configuration.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
