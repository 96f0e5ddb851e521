//! Body-keyed facade over the queue engine.
//!
//! Every operation is one transaction on one body: the body's lock is held
//! for the whole operation, production is brought up to the caller's clock,
//! and the engine works on a copy that replaces the stored body only when
//! the operation succeeds. Different bodies never wait on each other.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::body::{BodyId, BodyState, Timestamp};
use crate::completion::QueueEvent;
use crate::config::QueueConfig;
use crate::economy::{Economy, FlatEconomy};
use crate::engine::QueueEngine;
use crate::error::{QueueError, Result};
use crate::items::BuildingKind;
use crate::registry::{BlueprintRegistry, ItemRegistry};
use crate::scheduler::{EventScheduler, InMemoryScheduler, PendingEvent};
use crate::view::BuildingsAndQueue;

/// Bodies kept in memory, each behind its own lock.
#[derive(Debug, Default)]
pub struct InMemoryBodies {
    bodies: RwLock<HashMap<BodyId, Arc<Mutex<BodyState>>>>,
}

impl InMemoryBodies {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a body.
    pub fn insert(&self, body: BodyState) {
        self.bodies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(body.id, Arc::new(Mutex::new(body)));
    }

    /// Remove a body, returning its last state.
    pub fn remove(&self, id: BodyId) -> Result<BodyState> {
        let cell = self
            .bodies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(QueueError::BodyNotFound(id))?;
        let body = lock(&cell).clone();
        Ok(body)
    }

    /// Lock cell of a body.
    pub fn get(&self, id: BodyId) -> Result<Arc<Mutex<BodyState>>> {
        self.bodies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                tracing::warn!(body_id = %id, "Body not found");
                QueueError::BodyNotFound(id)
            })
    }

    /// Copy of a body's current state.
    pub fn snapshot(&self, id: BodyId) -> Result<BodyState> {
        let cell = self.get(id)?;
        let body = lock(&cell).clone();
        Ok(body)
    }

    /// Ids of every stored body, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<BodyId> {
        let mut ids: Vec<_> = self
            .bodies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Number of stored bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no body is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A stored body is only ever replaced wholesale, so a poisoned lock still
// holds a consistent body.
fn lock(cell: &Mutex<BodyState>) -> MutexGuard<'_, BodyState> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Building queue service for many bodies.
#[derive(Debug)]
pub struct BuildingsService<R = BlueprintRegistry, E = FlatEconomy, S = InMemoryScheduler> {
    config: QueueConfig,
    registry: R,
    economy: E,
    scheduler: S,
    bodies: InMemoryBodies,
}

impl<R, E, S> BuildingsService<R, E, S>
where
    R: ItemRegistry,
    E: Economy,
    S: EventScheduler,
{
    /// Create a service with no bodies.
    pub fn new(config: QueueConfig, registry: R, economy: E, scheduler: S) -> Self {
        Self {
            config,
            registry,
            economy,
            scheduler,
            bodies: InMemoryBodies::new(),
        }
    }

    /// Queue configuration.
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Item registry.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Event scheduler.
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Body store.
    pub const fn bodies(&self) -> &InMemoryBodies {
        &self.bodies
    }

    /// Engine over this service's collaborators.
    pub const fn engine(&self) -> QueueEngine<'_, R, E, S> {
        QueueEngine::new(&self.config, &self.registry, &self.economy, &self.scheduler)
    }

    /// Add or replace a body.
    pub fn insert_body(&self, body: BodyState) {
        self.bodies.insert(body);
    }

    /// Copy of a body's current state.
    pub fn body(&self, id: BodyId) -> Result<BodyState> {
        self.bodies.snapshot(id)
    }

    /// Remove a body together with its pending event.
    pub fn remove_body(&self, id: BodyId) -> Result<BodyState> {
        let body = self.bodies.remove(id)?;
        self.scheduler.delete(id);
        tracing::info!(body_id = %id, "Removed body");
        Ok(body)
    }

    fn transaction<T>(
        &self,
        id: BodyId,
        now: Option<Timestamp>,
        operation: impl FnOnce(QueueEngine<'_, R, E, S>, &mut BodyState) -> Result<T>,
    ) -> Result<T> {
        let cell = self.bodies.get(id)?;
        let mut stored = lock(&cell);

        let mut body = stored.clone();
        if let Some(now) = now {
            self.economy.advance_production(&mut body, now);
        }
        let value = operation(self.engine(), &mut body)?;
        #[cfg(feature = "debug-validation")]
        crate::projection::project(&body, &body.queue.entries(), &self.config)?;
        *stored = body;
        Ok(value)
    }

    fn read<T>(
        &self,
        id: BodyId,
        now: Timestamp,
        query: impl FnOnce(QueueEngine<'_, R, E, S>, &BodyState) -> Result<T>,
    ) -> Result<T> {
        let mut body = self.bodies.snapshot(id)?;
        self.economy.advance_production(&mut body, now);
        query(self.engine(), &body)
    }

    /// Queue construction of `kind` on a body.
    pub fn construct(&self, id: BodyId, kind: BuildingKind, now: Timestamp) -> Result<u32> {
        self.transaction(id, Some(now), |engine, body| engine.construct(body, kind))
    }

    /// Queue destruction of `kind` on a body.
    pub fn destroy(&self, id: BodyId, kind: BuildingKind, now: Timestamp) -> Result<u32> {
        self.transaction(id, Some(now), |engine, body| engine.destroy(body, kind))
    }

    /// Move an entry one place towards the tail.
    pub fn move_down(&self, id: BodyId, sequence: u32, now: Timestamp) -> Result<()> {
        self.transaction(id, Some(now), |engine, body| engine.move_down(body, sequence))
    }

    /// Move an entry one place towards the head.
    pub fn move_up(&self, id: BodyId, sequence: u32, now: Timestamp) -> Result<()> {
        self.transaction(id, Some(now), |engine, body| engine.move_up(body, sequence))
    }

    /// Cancel an entry.
    pub fn cancel(&self, id: BodyId, sequence: u32, now: Timestamp) -> Result<()> {
        self.transaction(id, Some(now), |engine, body| engine.cancel(body, sequence))
    }

    /// Handle a fired completion event.
    ///
    /// Production is advanced to the event's time by the handler itself.
    pub fn handle(&self, event: PendingEvent) -> Result<Vec<QueueEvent>> {
        self.transaction(event.body_id, None, |engine, body| engine.handle(body, event))
    }

    /// Buildings and annotated queue of a body at `now`.
    pub fn buildings_and_queue(&self, id: BodyId, now: Timestamp) -> Result<BuildingsAndQueue> {
        self.read(id, now, |engine, body| engine.buildings_and_queue(body))
    }

    /// Committed and projected levels of a body's buildings.
    pub fn current_and_future_levels(&self, id: BodyId) -> Result<BTreeMap<BuildingKind, (u32, u32)>> {
        let body = self.bodies.snapshot(id)?;
        self.engine().current_and_future_levels(&body)
    }

    /// Kind and target level of the entry being built on a body.
    pub fn ongoing_building(&self, id: BodyId) -> Result<Option<(BuildingKind, u32)>> {
        let body = self.bodies.snapshot(id)?;
        self.engine().ongoing_building(&body)
    }

    /// When the entry being built on a body completes.
    pub fn ongoing_finish_at(&self, id: BodyId) -> Result<Option<Timestamp>> {
        let body = self.bodies.snapshot(id)?;
        Ok(self.engine().ongoing_finish_at(&body))
    }

    /// Committed level of a building on a body.
    pub fn level(&self, id: BodyId, kind: BuildingKind) -> Result<u32> {
        let body = self.bodies.snapshot(id)?;
        Ok(self.engine().level(&body, kind))
    }

    /// Forget a body's queue and pending event.
    pub fn delete_buildings_and_queue(&self, id: BodyId) -> Result<()> {
        self.transaction(id, None, |engine, body| {
            engine.delete_buildings_and_queue(body);
            Ok(())
        })
    }
}

/// What delivering due events did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Everything the completion handler reported, in delivery order.
    pub events: Vec<QueueEvent>,
    /// Events whose handling failed, with the error.
    pub failures: Vec<(PendingEvent, QueueError)>,
}

impl Delivery {
    /// The reported events, or the first failure.
    pub fn into_result(self) -> Result<Vec<QueueEvent>> {
        match self.failures.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(self.events),
        }
    }
}

impl<R, E> BuildingsService<R, E, InMemoryScheduler>
where
    R: ItemRegistry,
    E: Economy,
{
    /// Handle every event due at `now`, including events that handling
    /// schedules before `now`.
    ///
    /// A failing event does not stop the others. It stays pending unless its
    /// body no longer exists, and is not retried within the same call.
    pub fn run_due(&self, now: Timestamp) -> Delivery {
        let mut delivery = Delivery::default();
        let mut delivered = HashSet::new();
        loop {
            let due: Vec<_> = self
                .scheduler
                .due(now)
                .into_iter()
                .filter(|event| delivered.insert(*event))
                .collect();
            if due.is_empty() {
                return delivery;
            }
            for event in due {
                match self.handle(event) {
                    Ok(events) => delivery.events.extend(events),
                    Err(QueueError::BodyNotFound(id)) => {
                        tracing::warn!(body_id = %id, at = %event.at, "Dropping event of a removed body");
                        self.scheduler.delete(id);
                        delivery.failures.push((event, QueueError::BodyNotFound(id)));
                    }
                    Err(e) => {
                        tracing::error!(body_id = %event.body_id, at = %event.at, error = %e, "Building queue event failed");
                        delivery.failures.push((event, e));
                    }
                }
            }
        }
    }
}
