//! Queue mutator: the player-facing operations on a body's building queue.
//!
//! Only the head is committed: its cost has been debited and a completion
//! event is pending for it. Every later entry is speculative and is checked
//! for resources, energy and technology only once it becomes the head.
//!
//! Every operation runs all of its checks before touching the body or the
//! scheduler, so a failed operation leaves both exactly as they were.

use std::collections::BTreeMap;

use crate::body::BodyState;
use crate::config::QueueConfig;
use crate::economy::Economy;
use crate::error::{QueueError, Result};
use crate::feasibility::{remove_feasible, swap_feasible};
use crate::items::BuildingKind;
use crate::projection::{project, ProjectedState};
use crate::queue::QueueEntry;
use crate::registry::ItemRegistry;
use crate::resources::Resources;
use crate::scheduler::{EventScheduler, PendingEvent};

/// What it takes to carry out one entry from a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pricing {
    pub target: u32,
    pub cost: Resources,
    pub energy: i64,
}

/// Building queue operations over explicit collaborators.
///
/// The engine borrows everything it needs and owns nothing, so one can be
/// built per call.
#[derive(Debug)]
pub struct QueueEngine<'a, R: ?Sized, E: ?Sized, S: ?Sized> {
    pub(crate) config: &'a QueueConfig,
    pub(crate) registry: &'a R,
    pub(crate) economy: &'a E,
    pub(crate) scheduler: &'a S,
}

impl<R: ?Sized, E: ?Sized, S: ?Sized> Clone for QueueEngine<'_, R, E, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ?Sized, E: ?Sized, S: ?Sized> Copy for QueueEngine<'_, R, E, S> {}

impl<'a, R, E, S> QueueEngine<'a, R, E, S>
where
    R: ItemRegistry + ?Sized,
    E: Economy + ?Sized,
    S: EventScheduler + ?Sized,
{
    /// Create an engine over the given collaborators.
    #[must_use]
    pub const fn new(config: &'a QueueConfig, registry: &'a R, economy: &'a E, scheduler: &'a S) -> Self {
        Self {
            config,
            registry,
            economy,
            scheduler,
        }
    }

    /// Queue construction of one more level of `kind`.
    ///
    /// On an empty queue the entry becomes the head at once: its cost is
    /// debited and its completion is scheduled. Otherwise it is appended
    /// without resource, energy or technology checks. Returns the entry's
    /// sequence number.
    pub fn construct(&self, body: &mut BodyState, kind: BuildingKind) -> Result<u32> {
        if body.queue.is_full(self.config.capacity) {
            tracing::warn!(body_id = %body.id, %kind, "Constructing building failed, queue is full");
            return Err(QueueError::QueueFull);
        }

        let state = project(body, &body.queue.entries(), self.config)?;
        if !state.has_free_field() {
            tracing::warn!(
                body_id = %body.id,
                %kind,
                used_fields = state.used_fields,
                max_fields = state.max_fields,
                "Constructing building failed, no free fields"
            );
            return Err(QueueError::NoFreeFields);
        }

        // Technology only matters for an entry that starts right away.
        let technology_met =
            !body.queue.is_empty() || self.registry.meets_technology_requirements(kind, body);
        if !self.registry.meets_special_requirements(kind, body)
            || !self.registry.meets_buildings_requirements(kind, &state.levels)
            || !technology_met
        {
            tracing::warn!(body_id = %body.id, %kind, "Constructing building failed, requirements not met");
            return Err(QueueError::RequirementsNotMet);
        }

        self.enqueue(body, QueueEntry::construct(kind), &state)
    }

    /// Queue destruction of one level of `kind`.
    pub fn destroy(&self, body: &mut BodyState, kind: BuildingKind) -> Result<u32> {
        if kind.is_permanent() {
            tracing::warn!(body_id = %body.id, %kind, "Destroying building failed, building is permanent");
            return Err(QueueError::WrongBuildingKind);
        }

        if body.queue.is_full(self.config.capacity) {
            tracing::warn!(body_id = %body.id, %kind, "Destroying building failed, queue is full");
            return Err(QueueError::QueueFull);
        }

        let state = project(body, &body.queue.entries(), self.config)?;
        if state.level(kind) == 0 {
            tracing::warn!(body_id = %body.id, %kind, "Destroying building failed, nothing left to destroy");
            return Err(QueueError::BuildingAlreadyDestroyed);
        }

        self.enqueue(body, QueueEntry::destroy(kind), &state)
    }

    /// Swap the entry stored under `sequence` with the one after it.
    ///
    /// When `sequence` is the head, the head's cost is refunded and the
    /// following entry must be affordable with the refunded resources; it
    /// becomes the head and the completion event is moved to it.
    pub fn move_down(&self, body: &mut BodyState, sequence: u32) -> Result<()> {
        self.require_entry(body, sequence)?;

        let before = body.queue.entries_before(sequence);
        let tail = body.queue.entries_from(sequence);
        let state = project(body, &before, self.config)?;

        if !swap_feasible(&state, &tail, self.registry) {
            tracing::warn!(body_id = %body.id, sequence, "Moving down entry failed, swap not allowed");
            return Err(QueueError::CannotMove);
        }

        let (Some(next), [first, second, ..]) = (body.queue.following(sequence), tail.as_slice()) else {
            return Err(QueueError::Invariant(format!(
                "entry {sequence} passed the swap check without a successor"
            )));
        };

        if before.is_empty() {
            let first_pricing = self.price(first, state.level(first.kind))?;
            let second_pricing = self.price(second, state.level(second.kind))?;

            let refunded = body.resources + first_pricing.cost;
            self.check_affordable(body, refunded, second, &second_pricing)?;
            self.check_technology(body, second.kind)?;
            self.pending_event(body)?;

            body.resources = refunded - second_pricing.cost;
            self.schedule_head(body, second, &second_pricing.cost, &state.levels);
        }

        body.queue.swap(sequence, next);
        tracing::info!(body_id = %body.id, sequence, next, "Moved down building queue entry");
        Ok(())
    }

    /// Swap the entry stored under `sequence` with the one before it.
    pub fn move_up(&self, body: &mut BodyState, sequence: u32) -> Result<()> {
        self.require_entry(body, sequence)?;

        let Some(previous) = body.queue.preceding(sequence) else {
            tracing::warn!(body_id = %body.id, sequence, "Moving up entry failed, entry is first");
            return Err(QueueError::CannotMove);
        };

        self.move_down(body, previous)
    }

    /// Remove the entry stored under `sequence`.
    ///
    /// Cancelling the head refunds its cost. The entry after it then starts:
    /// it is debited and the completion event moves to it, or the event is
    /// deleted when nothing is left.
    pub fn cancel(&self, body: &mut BodyState, sequence: u32) -> Result<()> {
        self.require_entry(body, sequence)?;

        let before = body.queue.entries_before(sequence);
        let tail = body.queue.entries_from(sequence);
        let state = project(body, &before, self.config)?;

        if !remove_feasible(&state, &tail, self.registry, self.config) {
            tracing::warn!(body_id = %body.id, sequence, "Cancelling entry failed, later entries depend on it");
            return Err(QueueError::CannotCancel);
        }

        if !before.is_empty() {
            body.queue.remove(sequence);
            tracing::info!(body_id = %body.id, sequence, "Cancelled building queue entry");
            return Ok(());
        }

        let Some((cancelled, rest)) = tail.split_first() else {
            return Err(QueueError::Invariant(format!("entry {sequence} vanished while cancelling")));
        };

        let next = rest.first();
        if let Some(next) = next {
            if !self.registry.meets_technology_requirements(next.kind, body) {
                tracing::warn!(
                    body_id = %body.id,
                    sequence,
                    next_kind = %next.kind,
                    "Cancelling entry failed, next entry does not meet technology requirements"
                );
                return Err(QueueError::CannotCancel);
            }
        }

        let pricing = self.price(cancelled, state.level(cancelled.kind))?;
        let refunded = body.resources + pricing.cost;
        self.pending_event(body)?;

        match next {
            None => {
                body.resources = refunded;
                body.queue.remove(sequence);
                self.scheduler.delete(body.id);
            }
            Some(next) => {
                let next_pricing = self.price(next, state.level(next.kind))?;
                self.check_affordable(body, refunded, next, &next_pricing)?;

                body.resources = refunded - next_pricing.cost;
                body.queue.remove(sequence);
                self.schedule_head(body, next, &next_pricing.cost, &state.levels);
            }
        }

        tracing::info!(body_id = %body.id, sequence, kind = %cancelled.kind, "Cancelled building queue head");
        Ok(())
    }

    fn enqueue(&self, body: &mut BodyState, entry: QueueEntry, state: &ProjectedState) -> Result<u32> {
        if body.queue.is_empty() {
            let pricing = self.price(&entry, state.level(entry.kind))?;
            self.check_affordable(body, body.resources, &entry, &pricing)?;

            body.resources -= pricing.cost;
            self.schedule_head(body, &entry, &pricing.cost, &state.levels);
        }

        let sequence = body.queue.push(entry);
        tracing::info!(
            body_id = %body.id,
            kind = %entry.kind,
            action = ?entry.action,
            sequence,
            "Queued building"
        );
        Ok(sequence)
    }

    fn require_entry(&self, body: &BodyState, sequence: u32) -> Result<()> {
        if body.queue.contains(sequence) {
            return Ok(());
        }
        tracing::warn!(body_id = %body.id, sequence, "No such building queue entry");
        Err(QueueError::NoSuchQueueEntry(sequence))
    }

    pub(crate) fn price(&self, entry: &QueueEntry, level: u32) -> Result<Pricing> {
        let target = u32::try_from(entry.target_level(level)).map_err(|_| {
            tracing::error!(kind = %entry.kind, level, "Building queue entry has no valid target level");
            QueueError::Invariant(format!("{:?} of {} at level {level}", entry.action, entry.kind))
        })?;
        Ok(Pricing {
            target,
            cost: self.registry.cost(entry.kind, target),
            energy: self.registry.required_energy(entry.kind, target),
        })
    }

    pub(crate) fn covers_energy(&self, body: &BodyState, pricing: &Pricing) -> bool {
        pricing.energy <= 0 || pricing.energy <= self.economy.total_energy(body)
    }

    fn check_affordable(
        &self,
        body: &BodyState,
        available: Resources,
        entry: &QueueEntry,
        pricing: &Pricing,
    ) -> Result<()> {
        if !available.greater_or_equal(&pricing.cost) {
            tracing::warn!(
                body_id = %body.id,
                kind = %entry.kind,
                level = pricing.target,
                cost = %pricing.cost,
                available = %available,
                "Not enough resources"
            );
            return Err(QueueError::NotEnoughResources);
        }
        if !self.covers_energy(body, pricing) {
            tracing::warn!(
                body_id = %body.id,
                kind = %entry.kind,
                level = pricing.target,
                energy = pricing.energy,
                "Not enough energy"
            );
            return Err(QueueError::NotEnoughEnergy);
        }
        Ok(())
    }

    fn check_technology(&self, body: &BodyState, kind: BuildingKind) -> Result<()> {
        if self.registry.meets_technology_requirements(kind, body) {
            return Ok(());
        }
        tracing::warn!(body_id = %body.id, %kind, "Technology requirements not met");
        Err(QueueError::RequirementsNotMet)
    }

    fn pending_event(&self, body: &BodyState) -> Result<PendingEvent> {
        self.scheduler.find_pending(body.id).ok_or_else(|| {
            tracing::error!(body_id = %body.id, "Building queue head has no pending event");
            QueueError::MissingEvent(body.id)
        })
    }

    /// Schedule completion of a freshly started head, counting from `updated_at`.
    fn schedule_head(
        &self,
        body: &BodyState,
        entry: &QueueEntry,
        cost: &Resources,
        levels: &BTreeMap<BuildingKind, u32>,
    ) -> PendingEvent {
        let time = self.registry.required_time(entry, cost, levels);
        let event = PendingEvent::new(body.id, body.updated_at.plus(time));
        self.scheduler.schedule(event);
        tracing::info!(
            body_id = %body.id,
            kind = %entry.kind,
            action = ?entry.action,
            at = %event.at,
            "Started building queue head"
        );
        event
    }
}
