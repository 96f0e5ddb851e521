//! State projection.
//!
//! Replays queued entries on top of a body's committed levels to answer
//! "what will this body look like once these entries are done".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::BodyState;
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::items::{BuildingKind, QueueAction};
use crate::queue::QueueEntry;

/// Hypothetical building levels and field usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedState {
    /// Building levels; missing kinds are level 0.
    pub levels: BTreeMap<BuildingKind, u32>,
    /// Occupied fields.
    pub used_fields: u32,
    /// Field capacity.
    pub max_fields: u32,
}

impl ProjectedState {
    /// The body's committed state, with nothing replayed.
    #[must_use]
    pub fn committed(body: &BodyState, config: &QueueConfig) -> Self {
        Self {
            levels: body.buildings.clone(),
            used_fields: body.used_fields(),
            max_fields: body.max_fields(config),
        }
    }

    /// Projected level of a building.
    #[must_use]
    pub fn level(&self, kind: BuildingKind) -> u32 {
        self.levels.get(&kind).copied().unwrap_or(0)
    }

    /// Whether one more level could be constructed.
    #[must_use]
    pub const fn has_free_field(&self) -> bool {
        self.used_fields < self.max_fields
    }

    /// Apply one entry.
    ///
    /// Destroying a level-0 or permanent building is rejected earlier by the
    /// engine, so reaching it here means the stored queue is corrupt.
    pub fn apply(&mut self, entry: &QueueEntry, config: &QueueConfig) -> Result<()> {
        let level = self.level(entry.kind);
        match entry.action {
            QueueAction::Construct => {
                self.levels.insert(entry.kind, level + 1);
                self.used_fields += 1;
                self.max_fields += config.field_bonus(entry.kind);
            }
            QueueAction::Destroy => {
                if entry.kind.is_permanent() || level == 0 {
                    tracing::error!(
                        kind = %entry.kind,
                        level,
                        "Projection reached an impossible destruction"
                    );
                    return Err(QueueError::Invariant(format!(
                        "cannot project destruction of {} at level {level}",
                        entry.kind
                    )));
                }
                if level == 1 {
                    self.levels.remove(&entry.kind);
                } else {
                    self.levels.insert(entry.kind, level - 1);
                }
                self.used_fields -= 1;
            }
        }
        Ok(())
    }
}

/// Project the body's state after `entries` complete in order.
pub fn project(body: &BodyState, entries: &[QueueEntry], config: &QueueConfig) -> Result<ProjectedState> {
    let mut state = ProjectedState::committed(body, config);
    for entry in entries {
        state.apply(entry, config)?;
    }
    Ok(state)
}
