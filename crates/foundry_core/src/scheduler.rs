//! Completion events and the scheduler contract.
//!
//! A body has at most one pending event: the completion of its queue head.
//! Waiting is pure data (a fire time); nothing in the engine sleeps.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::body::{BodyId, Timestamp};

/// A scheduled completion of a body's queue head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingEvent {
    /// Body whose head completes.
    pub body_id: BodyId,
    /// Fire time.
    pub at: Timestamp,
}

impl PendingEvent {
    /// Create a new event.
    #[must_use]
    pub const fn new(body_id: BodyId, at: Timestamp) -> Self {
        Self { body_id, at }
    }
}

/// Event scheduling collaborator.
///
/// Delivery is at-least-once and never before the fire time; handlers must
/// re-read body state instead of trusting anything captured at scheduling.
pub trait EventScheduler {
    /// Insert or replace the pending event of `event.body_id`.
    fn schedule(&self, event: PendingEvent);

    /// Remove the pending event of a body, if any.
    fn delete(&self, body_id: BodyId);

    /// The pending event of a body, if any.
    fn find_pending(&self, body_id: BodyId) -> Option<PendingEvent>;
}

/// Scheduler keeping events in memory.
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    events: Mutex<BTreeMap<BodyId, PendingEvent>>,
}

impl InMemoryScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> MutexGuard<'_, BTreeMap<BodyId, PendingEvent>> {
        // The map is always left consistent, so a poisoned lock is still usable.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every pending event, ordered by fire time then body.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingEvent> {
        let mut events: Vec<_> = self.events().values().copied().collect();
        events.sort_by_key(|e| (e.at, e.body_id));
        events
    }

    /// The events due at `now`, ordered by fire time then body.
    ///
    /// Events stay pending until the handler deletes them, so the head of a
    /// body keeps its event while delivery is in flight.
    #[must_use]
    pub fn due(&self, now: Timestamp) -> Vec<PendingEvent> {
        let mut due: Vec<_> = self.events().values().filter(|e| e.at <= now).copied().collect();
        due.sort_by_key(|e| (e.at, e.body_id));
        due
    }

    /// The earliest pending event.
    #[must_use]
    pub fn next(&self) -> Option<PendingEvent> {
        self.pending().into_iter().next()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl EventScheduler for InMemoryScheduler {
    fn schedule(&self, event: PendingEvent) {
        tracing::debug!(body_id = %event.body_id, at = %event.at, "Scheduling building queue event");
        self.events().insert(event.body_id, event);
    }

    fn delete(&self, body_id: BodyId) {
        self.events().remove(&body_id);
    }

    fn find_pending(&self, body_id: BodyId) -> Option<PendingEvent> {
        self.events().get(&body_id).copied()
    }
}
