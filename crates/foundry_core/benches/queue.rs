//! Building queue benchmarks for foundry_core.
//!
//! Run with: `cargo bench -p foundry_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use foundry_core::prelude::*;
use foundry_test_utils::fixtures::{developed_planet, Collaborators};
use foundry_test_utils::harness::drain;

fn create_full_queue(fx: &Collaborators) -> BodyState {
    let mut body = developed_planet(1).with_building(BuildingKind::MetalMine, 20);
    for kind in [
        BuildingKind::MetalMine,
        BuildingKind::CrystalMine,
        BuildingKind::RoboticsFactory,
        BuildingKind::NaniteFactory,
    ] {
        let _ = fx.engine().construct(&mut body, kind);
    }
    let _ = fx.engine().destroy(&mut body, BuildingKind::MetalMine);
    body
}

/// Projection and view of a full queue.
pub fn projection_benchmark(c: &mut Criterion) {
    let fx = Collaborators::new();
    let body = create_full_queue(&fx);
    let entries = body.queue.entries();

    c.bench_function("project_full_queue", |b| {
        b.iter(|| project(black_box(&body), black_box(&entries), &fx.config));
    });
    c.bench_function("buildings_and_queue", |b| {
        b.iter(|| fx.engine().buildings_and_queue(black_box(&body)));
    });
}

/// Firing completion events until a full queue drains.
pub fn completion_benchmark(c: &mut Criterion) {
    c.bench_function("drain_full_queue", |b| {
        b.iter_batched(
            || {
                let fx = Collaborators::new();
                let body = create_full_queue(&fx);
                (fx, body)
            },
            |(fx, mut body)| drain(&fx, &mut body, 10),
            BatchSize::SmallInput,
        );
    });
    c.bench_function("move_and_cancel", |b| {
        b.iter_batched(
            || {
                let fx = Collaborators::new();
                let body = create_full_queue(&fx);
                (fx, body)
            },
            |(fx, mut body)| {
                let _ = fx.engine().move_down(&mut body, 1);
                let _ = fx.engine().cancel(&mut body, 2);
                body
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, projection_benchmark, completion_benchmark);
criterion_main!(benches);
