//! Read-only views of a body's buildings and queue.
//!
//! Nothing here mutates the body or the scheduler; the views describe what
//! the mutating operations would currently allow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::{BodyState, Timestamp};
use crate::economy::Economy;
use crate::engine::QueueEngine;
use crate::error::{QueueError, Result};
use crate::feasibility::{remove_feasible, swap_feasible};
use crate::items::{BuildingKind, QueueAction};
use crate::projection::{project, ProjectedState};
use crate::queue::QueueEntry;
use crate::registry::ItemRegistry;
use crate::resources::Resources;
use crate::scheduler::EventScheduler;

/// A building as offered to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingView {
    /// Building kind.
    pub kind: BuildingKind,
    /// Committed level.
    pub current_level: u32,
    /// Level once the whole queue completes.
    pub future_level: u32,
    /// Cost of the level after `future_level`.
    pub next_cost: Resources,
    /// Energy needed for the level after `future_level`.
    pub next_energy: i64,
    /// Seconds the next level would take, with projected factory levels.
    pub next_construction_time: u64,
    /// Whether `construct` would currently succeed.
    pub constructible_now: bool,
}

/// A queue entry with what it costs and what may be done with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryView {
    /// Stable sequence number.
    pub sequence: u32,
    /// Building kind.
    pub kind: BuildingKind,
    /// Construction or destruction.
    pub action: QueueAction,
    /// Level before the entry.
    pub from_level: u32,
    /// Level after the entry.
    pub to_level: u32,
    /// Resources the entry costs.
    pub cost: Resources,
    /// Energy the entry needs.
    pub energy: i64,
    /// Estimated completion time.
    pub finish_at: Timestamp,
    /// Whether `move_down` would pass its structural check.
    pub movable_down: bool,
    /// Whether `move_up` would pass its structural check.
    pub movable_up: bool,
    /// Whether `cancel` would pass its structural check.
    pub cancelable: bool,
}

/// Buildings and annotated queue of one body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildingsAndQueue {
    /// Buildings the player can see, sorted by kind.
    pub buildings: Vec<BuildingView>,
    /// Queue in order.
    pub queue: Vec<QueueEntryView>,
}

impl<R, E, S> QueueEngine<'_, R, E, S>
where
    R: ItemRegistry + ?Sized,
    E: Economy + ?Sized,
    S: EventScheduler + ?Sized,
{
    /// Buildings and annotated queue of `body`.
    ///
    /// A non-empty queue without a pending event is reported as
    /// [`QueueError::MissingEvent`].
    pub fn buildings_and_queue(&self, body: &BodyState) -> Result<BuildingsAndQueue> {
        let entries: Vec<(u32, QueueEntry)> = body.queue.iter().collect();
        let mut state = ProjectedState::committed(body, self.config);
        let mut queue = Vec::with_capacity(entries.len());
        let mut finish_at = body.updated_at;
        let mut movable_up = false;

        for (i, &(sequence, entry)) in entries.iter().enumerate() {
            let from_level = state.level(entry.kind);
            let pricing = self.price(&entry, from_level)?;

            finish_at = if i == 0 {
                self.scheduler
                    .find_pending(body.id)
                    .ok_or_else(|| {
                        tracing::error!(body_id = %body.id, "Building queue head has no pending event");
                        QueueError::MissingEvent(body.id)
                    })?
                    .at
            } else {
                finish_at.plus(self.registry.required_time(&entry, &pricing.cost, &state.levels))
            };

            let tail: Vec<QueueEntry> = entries[i..].iter().map(|&(_, e)| e).collect();
            let mut movable_down = swap_feasible(&state, &tail, self.registry);
            let mut cancelable = remove_feasible(&state, &tail, self.registry, self.config);

            // The head can only step aside for an entry that could start now.
            if i == 0 {
                if let Some(next) = tail.get(1) {
                    if !self.could_replace_head(body, &state, pricing.cost, next)? {
                        movable_down = false;
                        cancelable = false;
                    }
                }
            }

            queue.push(QueueEntryView {
                sequence,
                kind: entry.kind,
                action: entry.action,
                from_level,
                to_level: pricing.target,
                cost: pricing.cost,
                energy: pricing.energy,
                finish_at,
                movable_down,
                movable_up,
                cancelable,
            });

            state.apply(&entry, self.config)?;
            movable_up = movable_down;
        }

        let queue_has_room = !body.queue.is_full(self.config.capacity);
        let can_construct = state.has_free_field() && queue_has_room;
        let mut buildings = Vec::new();
        for kind in BuildingKind::ALL {
            let meets = self.registry.meets_special_requirements(kind, body)
                && self.registry.meets_buildings_requirements(kind, &state.levels)
                && (!body.queue.is_empty() || self.registry.meets_technology_requirements(kind, body));
            let future_level = state.level(kind);
            if !meets && future_level == 0 {
                continue;
            }

            let next = QueueEntry::construct(kind);
            let pricing = self.price(&next, future_level)?;
            let next_construction_time = self.registry.required_time(&next, &pricing.cost, &state.levels);
            let affordable = body.resources.greater_or_equal(&pricing.cost) && self.covers_energy(body, &pricing);

            buildings.push(BuildingView {
                kind,
                current_level: body.building_level(kind),
                future_level,
                next_cost: pricing.cost,
                next_energy: pricing.energy,
                next_construction_time,
                constructible_now: can_construct && meets && (!body.queue.is_empty() || affordable),
            });
        }

        Ok(BuildingsAndQueue { buildings, queue })
    }

    fn could_replace_head(
        &self,
        body: &BodyState,
        state: &ProjectedState,
        head_cost: Resources,
        next: &QueueEntry,
    ) -> Result<bool> {
        let pricing = self.price(next, state.level(next.kind))?;
        Ok((body.resources + head_cost).greater_or_equal(&pricing.cost)
            && self.covers_energy(body, &pricing)
            && self.registry.meets_technology_requirements(next.kind, body))
    }

    /// Committed and projected level of every building that has either.
    pub fn current_and_future_levels(&self, body: &BodyState) -> Result<BTreeMap<BuildingKind, (u32, u32)>> {
        let projected = project(body, &body.queue.entries(), self.config)?;
        Ok(BuildingKind::ALL
            .into_iter()
            .map(|kind| (kind, (body.building_level(kind), projected.level(kind))))
            .filter(|&(_, (current, future))| current > 0 || future > 0)
            .collect())
    }

    /// Kind and target level of the entry being built.
    pub fn ongoing_building(&self, body: &BodyState) -> Result<Option<(BuildingKind, u32)>> {
        body.queue
            .head()
            .map(|(_, head)| {
                self.price(&head, body.building_level(head.kind))
                    .map(|pricing| (head.kind, pricing.target))
            })
            .transpose()
    }

    /// When the entry being built completes.
    #[must_use]
    pub fn ongoing_finish_at(&self, body: &BodyState) -> Option<Timestamp> {
        self.scheduler.find_pending(body.id).map(|event| event.at)
    }

    /// Committed level of one building.
    #[must_use]
    pub fn level(&self, body: &BodyState, kind: BuildingKind) -> u32 {
        body.building_level(kind)
    }

    /// Forget the queue of a body that is being abandoned.
    ///
    /// No refund is made; the body's resources go with it.
    pub fn delete_buildings_and_queue(&self, body: &mut BodyState) {
        self.scheduler.delete(body.id);
        body.queue.clear();
        tracing::info!(body_id = %body.id, "Deleted building queue");
    }
}
