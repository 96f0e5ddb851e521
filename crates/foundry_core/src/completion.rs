//! Completion handler.
//!
//! Runs when the head's completion event fires: commits the head's level
//! change, then walks the rest of the queue against the freshly committed
//! state. Entries that can no longer start are dropped for good; the first
//! one that can is debited and scheduled.

use serde::{Deserialize, Serialize};

use crate::body::{BodyState, Timestamp};
use crate::economy::Economy;
use crate::engine::{Pricing, QueueEngine};
use crate::error::{QueueError, Result};
use crate::items::{BuildingKind, QueueAction};
use crate::queue::QueueEntry;
use crate::registry::ItemRegistry;
use crate::scheduler::{EventScheduler, PendingEvent};

/// Why the cascade dropped an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// A construction found every field taken.
    NoFreeFields,
    /// A destruction found the building already at level 0.
    NothingToDestroy,
    /// The entry's cost exceeds stored resources.
    NotEnoughResources,
    /// The entry needs more energy than the body produces.
    NotEnoughEnergy,
    /// Technology, building or body requirements fail.
    RequirementsNotMet,
}

/// What handling a completion event did to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEvent {
    /// The head finished and its level change was committed.
    Completed {
        /// Sequence number the entry had.
        sequence: u32,
        /// Building changed.
        kind: BuildingKind,
        /// Construction or destruction.
        action: QueueAction,
        /// Committed level after the change.
        level: u32,
    },
    /// An entry was removed because it can no longer start.
    Dropped {
        /// Sequence number the entry had.
        sequence: u32,
        /// Building of the entry.
        kind: BuildingKind,
        /// Construction or destruction.
        action: QueueAction,
        /// First failed check.
        reason: DropReason,
    },
    /// An entry became the head and was debited.
    Started {
        /// Sequence number of the new head.
        sequence: u32,
        /// Building of the new head.
        kind: BuildingKind,
        /// Construction or destruction.
        action: QueueAction,
        /// When it completes.
        at: Timestamp,
    },
}

impl<R, E, S> QueueEngine<'_, R, E, S>
where
    R: ItemRegistry + ?Sized,
    E: Economy + ?Sized,
    S: EventScheduler + ?Sized,
{
    /// Handle a fired completion event for `body`.
    ///
    /// An event whose time no longer matches the body's pending event is a
    /// stale duplicate and is ignored. An empty queue is logged and left
    /// alone.
    pub fn handle(&self, body: &mut BodyState, event: PendingEvent) -> Result<Vec<QueueEvent>> {
        if event.body_id != body.id {
            tracing::error!(body_id = %body.id, event_body_id = %event.body_id, "Completion event delivered to the wrong body");
            return Err(QueueError::Invariant(format!(
                "event for body {} handled on body {}",
                event.body_id, body.id
            )));
        }

        if let Some(pending) = self.scheduler.find_pending(body.id) {
            if pending.at != event.at {
                tracing::warn!(
                    body_id = %body.id,
                    fired_at = %event.at,
                    pending_at = %pending.at,
                    "Ignoring stale building queue event"
                );
                return Ok(Vec::new());
            }
        }

        let Some((sequence, head)) = body.queue.head() else {
            self.scheduler.delete(body.id);
            tracing::error!(body_id = %body.id, at = %event.at, "Building queue event fired on an empty queue");
            return Ok(Vec::new());
        };
        let level = self.price(&head, body.building_level(head.kind))?.target;

        self.scheduler.delete(body.id);
        body.queue.pop_head();
        self.economy.advance_production(body, event.at);
        body.set_building_level(head.kind, level);
        tracing::info!(
            body_id = %body.id,
            kind = %head.kind,
            action = ?head.action,
            level,
            "Completed building queue head"
        );

        let mut events = vec![QueueEvent::Completed {
            sequence,
            kind: head.kind,
            action: head.action,
            level,
        }];

        let used_fields = body.used_fields();
        let max_fields = body.max_fields(self.config);
        let mut dropped = Vec::new();
        let mut next = None;
        for (sequence, entry) in body.queue.iter() {
            match self.viability(body, &entry, used_fields, max_fields) {
                Ok(pricing) => {
                    next = Some((sequence, entry, pricing));
                    break;
                }
                Err(reason) => {
                    if reason == DropReason::NothingToDestroy {
                        tracing::error!(body_id = %body.id, sequence, kind = %entry.kind, "Dropping destruction of a missing building");
                    } else {
                        tracing::info!(body_id = %body.id, sequence, kind = %entry.kind, ?reason, "Dropping building queue entry");
                    }
                    dropped.push((sequence, entry, reason));
                }
            }
        }

        for (sequence, entry, reason) in dropped {
            body.queue.remove(sequence);
            events.push(QueueEvent::Dropped {
                sequence,
                kind: entry.kind,
                action: entry.action,
                reason,
            });
        }

        if let Some((sequence, entry, pricing)) = next {
            body.resources -= pricing.cost;
            let time = self.registry.required_time(&entry, &pricing.cost, &body.buildings);
            let at = event.at.plus(time);
            self.scheduler.schedule(PendingEvent::new(body.id, at));
            tracing::info!(body_id = %body.id, sequence, kind = %entry.kind, %at, "Started next building queue entry");
            events.push(QueueEvent::Started {
                sequence,
                kind: entry.kind,
                action: entry.action,
                at,
            });
            events.extend(Self::prune_orphaned_destructions(body));
        }

        Ok(events)
    }

    /// Drop destructions whose construction was dropped ahead of them.
    ///
    /// The scan stops at the new head, so entries behind it were never
    /// looked at; a destruction there may now target a level that will not
    /// exist, which would leave the queue impossible to project.
    fn prune_orphaned_destructions(body: &mut BodyState) -> Vec<QueueEvent> {
        let mut levels = body.buildings.clone();
        let mut orphans = Vec::new();
        for (sequence, entry) in body.queue.iter() {
            let level = levels.entry(entry.kind).or_insert(0);
            match entry.action {
                QueueAction::Construct => *level += 1,
                QueueAction::Destroy if *level == 0 => orphans.push((sequence, entry)),
                QueueAction::Destroy => *level -= 1,
            }
        }

        orphans
            .into_iter()
            .map(|(sequence, entry)| {
                body.queue.remove(sequence);
                tracing::error!(body_id = %body.id, sequence, kind = %entry.kind, "Dropping destruction of a missing building");
                QueueEvent::Dropped {
                    sequence,
                    kind: entry.kind,
                    action: entry.action,
                    reason: DropReason::NothingToDestroy,
                }
            })
            .collect()
    }

    fn viability(
        &self,
        body: &BodyState,
        entry: &QueueEntry,
        used_fields: u32,
        max_fields: u32,
    ) -> std::result::Result<Pricing, DropReason> {
        let level = body.building_level(entry.kind);
        match entry.action {
            QueueAction::Construct if used_fields >= max_fields => return Err(DropReason::NoFreeFields),
            QueueAction::Destroy if level == 0 => return Err(DropReason::NothingToDestroy),
            _ => {}
        }

        let pricing = self
            .price(entry, level)
            .map_err(|_| DropReason::NothingToDestroy)?;
        if !body.resources.greater_or_equal(&pricing.cost) {
            return Err(DropReason::NotEnoughResources);
        }
        if !self.covers_energy(body, &pricing) {
            return Err(DropReason::NotEnoughEnergy);
        }
        if !self.registry.meets_requirements(entry.kind, body) {
            return Err(DropReason::RequirementsNotMet);
        }
        Ok(pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;
    use crate::config::QueueConfig;
    use crate::economy::FlatEconomy;
    use crate::items::{BodyKind, TechnologyKind};
    use crate::projection::project;
    use crate::registry::BlueprintRegistry;
    use crate::resources::Resources;
    use crate::scheduler::InMemoryScheduler;

    struct Fixture {
        config: QueueConfig,
        registry: BlueprintRegistry,
        economy: FlatEconomy,
        scheduler: InMemoryScheduler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: QueueConfig::default(),
                registry: BlueprintRegistry::standard(),
                economy: FlatEconomy::new(10_000),
                scheduler: InMemoryScheduler::new(),
            }
        }

        fn engine(&self) -> QueueEngine<'_, BlueprintRegistry, FlatEconomy, InMemoryScheduler> {
            QueueEngine::new(&self.config, &self.registry, &self.economy, &self.scheduler)
        }

        fn pending(&self, body: &BodyState) -> PendingEvent {
            self.scheduler.find_pending(body.id).unwrap()
        }

        /// Start `head` through the engine, then append `rest` unchecked.
        fn queue(&self, body: &mut BodyState, head: BuildingKind, rest: &[QueueEntry]) {
            self.engine().construct(body, head).unwrap();
            for entry in rest {
                body.queue.push(*entry);
            }
        }
    }

    fn create_test_body(base_fields: u32, resources: Resources) -> BodyState {
        BodyState::new(BodyId(1), BodyKind::Planet, base_fields)
            .with_resources(resources)
            .at(Timestamp(1000))
    }

    #[test]
    fn test_handle_commits_head() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(60, 15, 0));
        fx.queue(&mut body, BuildingKind::MetalMine, &[]);

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(
            events,
            vec![QueueEvent::Completed {
                sequence: 1,
                kind: BuildingKind::MetalMine,
                action: QueueAction::Construct,
                level: 1,
            }]
        );
        assert_eq!(body.building_level(BuildingKind::MetalMine), 1);
        assert!(body.queue.is_empty());
        assert!(fx.scheduler.is_empty());
        assert_eq!(body.updated_at, Timestamp(1108));
    }

    #[test]
    fn test_handle_accrues_production_to_event_time() {
        let mut fx = Fixture::new();
        fx.economy = FlatEconomy::new(0).with_income(Resources::new(3600, 3600, 0));
        let mut body = create_test_body(10, Resources::new(60, 15, 0));
        fx.queue(&mut body, BuildingKind::MetalMine, &[]);

        let event = fx.pending(&body);
        fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(body.resources, Resources::new(108, 108, 0));
    }

    #[test]
    fn test_handle_drops_construction_without_field() {
        let fx = Fixture::new();
        let mut body = create_test_body(2, Resources::new(1000, 1000, 0))
            .with_building(BuildingKind::SolarPlant, 1);
        fx.queue(
            &mut body,
            BuildingKind::MetalMine,
            &[
                QueueEntry::construct(BuildingKind::CrystalMine),
                QueueEntry::destroy(BuildingKind::SolarPlant),
            ],
        );

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(
            events[1],
            QueueEvent::Dropped {
                sequence: 2,
                kind: BuildingKind::CrystalMine,
                action: QueueAction::Construct,
                reason: DropReason::NoFreeFields,
            }
        );
        // Destroying solar level 1 costs level 0: 50/20/0, which takes 100 seconds.
        assert_eq!(
            events[2],
            QueueEvent::Started {
                sequence: 3,
                kind: BuildingKind::SolarPlant,
                action: QueueAction::Destroy,
                at: Timestamp(1208),
            }
        );
        assert_eq!(body.queue.head(), Some((3, QueueEntry::destroy(BuildingKind::SolarPlant))));
        assert_eq!(body.resources, Resources::new(890, 965, 0));
        assert_eq!(fx.pending(&body).at, Timestamp(1208));
    }

    #[test]
    fn test_handle_drops_unaffordable_entry() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(1060, 15, 0));
        fx.queue(
            &mut body,
            BuildingKind::MetalMine,
            &[
                QueueEntry::construct(BuildingKind::CrystalMine),
                QueueEntry::construct(BuildingKind::MetalStorage),
            ],
        );

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert!(matches!(
            events[1],
            QueueEvent::Dropped {
                reason: DropReason::NotEnoughResources,
                ..
            }
        ));
        assert_eq!(body.resources, Resources::ZERO);
        // 1000 structural resources take 1440 seconds.
        assert_eq!(fx.pending(&body).at, Timestamp(1108 + 1440));
    }

    #[test]
    fn test_handle_drops_entry_without_energy() {
        let mut fx = Fixture::new();
        fx.economy = FlatEconomy::new(500);
        let mut body = create_test_body(10, Resources::new(1_000_000, 1_000_000, 1_000_000))
            .with_building(BuildingKind::NaniteFactory, 1)
            .with_technology(TechnologyKind::Energy, 12);
        fx.queue(
            &mut body,
            BuildingKind::MetalMine,
            &[QueueEntry::construct(BuildingKind::Terraformer)],
        );

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert!(matches!(
            events[1],
            QueueEvent::Dropped {
                reason: DropReason::NotEnoughEnergy,
                ..
            }
        ));
        assert!(body.queue.is_empty());
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_handle_drops_entry_whose_requirement_was_destroyed() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(100_000, 100_000, 100_000))
            .with_building(BuildingKind::RoboticsFactory, 2);
        fx.engine().destroy(&mut body, BuildingKind::RoboticsFactory).unwrap();
        body.queue.push(QueueEntry::construct(BuildingKind::Shipyard));

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(body.building_level(BuildingKind::RoboticsFactory), 1);
        assert!(matches!(
            events[1],
            QueueEvent::Dropped {
                kind: BuildingKind::Shipyard,
                reason: DropReason::RequirementsNotMet,
                ..
            }
        ));
    }

    #[test]
    fn test_handle_drops_destruction_of_missing_building() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(1000, 1000, 0));
        fx.queue(
            &mut body,
            BuildingKind::MetalMine,
            &[QueueEntry::destroy(BuildingKind::CrystalMine)],
        );

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert!(matches!(
            events[1],
            QueueEvent::Dropped {
                reason: DropReason::NothingToDestroy,
                ..
            }
        ));
    }

    #[test]
    fn test_handle_prunes_destruction_behind_new_head() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(60, 15, 0));
        fx.queue(
            &mut body,
            BuildingKind::MetalMine,
            &[
                QueueEntry::construct(BuildingKind::CrystalMine),
                QueueEntry::construct(BuildingKind::MetalMine),
                QueueEntry::destroy(BuildingKind::CrystalMine),
            ],
        );
        // Only the second metal mine level is affordable once the first completes.
        body.resources = Resources::new(90, 22, 0);

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[3],
            QueueEvent::Dropped {
                sequence: 4,
                reason: DropReason::NothingToDestroy,
                ..
            }
        ));
        assert_eq!(body.queue.entries(), vec![QueueEntry::construct(BuildingKind::MetalMine)]);
        assert!(project(&body, &body.queue.entries(), &fx.config).is_ok());
    }

    #[test]
    fn test_handle_permanent_construction_adds_fields() {
        let fx = Fixture::new();
        let mut body = create_test_body(2, Resources::new(1_000_000, 1_000_000, 1_000_000))
            .with_building(BuildingKind::NaniteFactory, 1)
            .with_technology(TechnologyKind::Energy, 12);
        fx.queue(
            &mut body,
            BuildingKind::Terraformer,
            &[QueueEntry::construct(BuildingKind::MetalMine)],
        );

        let event = fx.pending(&body);
        let events = fx.engine().handle(&mut body, event).unwrap();

        assert_eq!(body.max_fields(&fx.config), 2 + fx.config.fields_per_terraformer_level);
        assert!(matches!(
            events[1],
            QueueEvent::Started {
                kind: BuildingKind::MetalMine,
                ..
            }
        ));
    }

    #[test]
    fn test_handle_empty_queue_is_noop() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::ZERO);
        fx.scheduler.schedule(PendingEvent::new(body.id, Timestamp(5)));
        let snapshot = body.clone();

        let event = PendingEvent::new(body.id, Timestamp(5));
        let events = fx
            .engine()
            .handle(&mut body, event)
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(body, snapshot);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_handle_ignores_stale_event() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(60, 15, 0));
        fx.queue(&mut body, BuildingKind::MetalMine, &[]);
        let snapshot = body.clone();

        let event = PendingEvent::new(body.id, Timestamp(1050));
        let events = fx
            .engine()
            .handle(&mut body, event)
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(body, snapshot);
        assert_eq!(fx.pending(&body).at, Timestamp(1108));
    }

    #[test]
    fn test_handle_rejects_foreign_event() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::ZERO);

        let err = fx
            .engine()
            .handle(&mut body, PendingEvent::new(BodyId(2), Timestamp(5)))
            .unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn test_draining_reaches_projection() {
        let fx = Fixture::new();
        let mut body = create_test_body(10, Resources::new(1_000_000, 1_000_000, 1_000_000))
            .with_building(BuildingKind::MetalMine, 3);
        for kind in [BuildingKind::MetalMine, BuildingKind::RoboticsFactory, BuildingKind::CrystalMine] {
            fx.engine().construct(&mut body, kind).unwrap();
        }
        fx.engine().destroy(&mut body, BuildingKind::MetalMine).unwrap();
        let projected = project(&body, &body.queue.entries(), &fx.config).unwrap();

        while let Some(event) = fx.scheduler.find_pending(body.id) {
            fx.engine().handle(&mut body, event).unwrap();
        }

        assert!(body.queue.is_empty());
        assert_eq!(body.buildings, projected.levels);
    }
}
