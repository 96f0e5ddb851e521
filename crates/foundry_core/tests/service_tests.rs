//! Service-level tests: many bodies, many threads, one clock.

use std::thread;

use foundry_core::prelude::*;
use foundry_test_utils::fixtures::{planet, plenty, rich_planet, TEST_ENERGY};

fn create_test_service(bodies: u64) -> BuildingsService {
    let service = BuildingsService::new(
        QueueConfig::default(),
        BlueprintRegistry::standard(),
        FlatEconomy::new(TEST_ENERGY),
        InMemoryScheduler::new(),
    );
    for id in 1..=bodies {
        service.insert_body(rich_planet(id));
    }
    service
}

#[test]
fn test_bodies_are_independent_across_threads() {
    let service = create_test_service(8);

    thread::scope(|s| {
        for id in 1..=8 {
            let service = &service;
            s.spawn(move || {
                for _ in 0..3 {
                    service
                        .construct(BodyId(id), BuildingKind::MetalMine, Timestamp(1000))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(service.scheduler().len(), 8);
    for id in 1..=8 {
        let body = service.body(BodyId(id)).unwrap();
        assert_eq!(body.queue.len(), 3);
        assert_eq!(body.resources, plenty() - Resources::new(60, 15, 0));
    }

    service.run_due(Timestamp(100_000)).into_result().unwrap();
    for id in 1..=8 {
        assert_eq!(service.level(BodyId(id), BuildingKind::MetalMine).unwrap(), 3);
    }
    assert!(service.scheduler().is_empty());
}

#[test]
fn test_one_body_serializes_operations() {
    let service = create_test_service(1);
    let capacity = service.config().capacity;

    let results: Vec<Result<u32>> = thread::scope(|s| {
        let handles: Vec<_> = (0..capacity * 2)
            .map(|_| {
                let service = &service;
                s.spawn(move || service.construct(BodyId(1), BuildingKind::CrystalMine, Timestamp(1000)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut accepted: Vec<u32> = results.iter().filter_map(|r| r.clone().ok()).collect();
    accepted.sort_unstable();
    assert_eq!(accepted, (1..=capacity as u32).collect::<Vec<_>>());
    assert!(results
        .iter()
        .filter_map(|r| r.clone().err())
        .all(|e| e == QueueError::QueueFull));

    let body = service.body(BodyId(1)).unwrap();
    assert_eq!(body.queue.len(), capacity);
    // Only the head was charged.
    assert_eq!(body.resources, plenty() - Resources::new(48, 24, 0));
}

#[test]
fn test_events_fire_in_time_order() {
    let service = create_test_service(0);
    service.insert_body(planet(1, 20).with_resources(plenty()));
    service.insert_body(planet(2, 20).with_resources(plenty()));

    // Metal mine: 108s. Research lab: 600 structural units, 864s.
    service.construct(BodyId(1), BuildingKind::ResearchLab, Timestamp(1000)).unwrap();
    service.construct(BodyId(2), BuildingKind::MetalMine, Timestamp(1000)).unwrap();

    let events = service.run_due(Timestamp(1200)).into_result().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(service.level(BodyId(2), BuildingKind::MetalMine).unwrap(), 1);
    assert_eq!(service.level(BodyId(1), BuildingKind::ResearchLab).unwrap(), 0);
    assert_eq!(service.ongoing_finish_at(BodyId(1)).unwrap(), Some(Timestamp(1864)));

    service.run_due(Timestamp(1864)).into_result().unwrap();
    assert_eq!(service.level(BodyId(1), BuildingKind::ResearchLab).unwrap(), 1);
}

#[test]
fn test_removed_body_is_not_found() {
    let service = create_test_service(1);
    service.bodies().remove(BodyId(1)).unwrap();

    assert_eq!(
        service.cancel(BodyId(1), 1, Timestamp(1000)),
        Err(QueueError::BodyNotFound(BodyId(1)))
    );
    assert!(service.buildings_and_queue(BodyId(1), Timestamp(1000)).is_err());
}

#[test]
fn test_removed_body_does_not_stall_other_bodies() {
    let service = create_test_service(2);
    service.construct(BodyId(1), BuildingKind::MetalMine, Timestamp(1000)).unwrap();
    service.construct(BodyId(2), BuildingKind::MetalMine, Timestamp(1000)).unwrap();
    service.construct(BodyId(2), BuildingKind::CrystalMine, Timestamp(1000)).unwrap();
    // Removed behind the service's back, so its event is still scheduled.
    service.bodies().remove(BodyId(1)).unwrap();

    let delivery = service.run_due(Timestamp(1200));

    assert_eq!(delivery.failures.len(), 1);
    assert_eq!(delivery.failures[0].1, QueueError::BodyNotFound(BodyId(1)));
    assert_eq!(service.scheduler().find_pending(BodyId(1)), None);
    assert_eq!(service.level(BodyId(2), BuildingKind::MetalMine).unwrap(), 1);
    let body = service.body(BodyId(2)).unwrap();
    assert_eq!(body.queue.len(), 1);
    assert!(service.scheduler().find_pending(BodyId(2)).is_some());

    service.cancel(BodyId(2), 2, Timestamp(1200)).unwrap();
    assert!(service.body(BodyId(2)).unwrap().queue.is_empty());
    assert!(service.scheduler().is_empty());
}

#[test]
fn test_remove_body_deletes_its_event() {
    let service = create_test_service(2);
    service.construct(BodyId(1), BuildingKind::MetalMine, Timestamp(1000)).unwrap();
    service.construct(BodyId(2), BuildingKind::MetalMine, Timestamp(1000)).unwrap();

    let removed = service.remove_body(BodyId(1)).unwrap();

    assert_eq!(removed.queue.len(), 1);
    assert_eq!(service.scheduler().find_pending(BodyId(1)), None);
    assert_eq!(service.scheduler().len(), 1);
    assert!(service.run_due(Timestamp(100_000)).failures.is_empty());
    assert_eq!(
        service.remove_body(BodyId(1)),
        Err(QueueError::BodyNotFound(BodyId(1)))
    );
}

#[test]
fn test_operation_between_delivery_and_handling() {
    let service = create_test_service(2);
    service.construct(BodyId(2), BuildingKind::MetalMine, Timestamp(1000)).unwrap();
    service.construct(BodyId(2), BuildingKind::CrystalMine, Timestamp(1000)).unwrap();

    let due = service.scheduler().due(Timestamp(5000));
    assert_eq!(due.len(), 1);

    // The head still has its event while the delivery is in flight.
    service.cancel(BodyId(2), 1, Timestamp(1050)).unwrap();
    let body = service.body(BodyId(2)).unwrap();
    assert_eq!(body.queue.head().map(|(_, e)| e.kind), Some(BuildingKind::CrystalMine));
    let pending = service.scheduler().find_pending(BodyId(2));
    assert!(pending.is_some());
    assert_ne!(pending, Some(due[0]));

    // The delivered event is now stale.
    assert!(service.handle(due[0]).unwrap().is_empty());
    assert_eq!(service.scheduler().find_pending(BodyId(2)), pending);
    assert_eq!(service.level(BodyId(2), BuildingKind::MetalMine).unwrap(), 0);
}
