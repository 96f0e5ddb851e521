//! Queue driving harness.
//!
//! Applies scripted or generated operations to a body and fires completion
//! events until the queue drains, so tests can check what every reachable
//! state has in common.
//!
//! # Properties worth checking
//!
//! - **Field accounting**: used fields always equal the sum of levels.
//! - **Permanence**: Terraformer and LunarBase levels never go down.
//! - **Convergence**: draining a queue that never runs short reaches the
//!   projected levels.
//! - **Determinism**: the same script on the same body always ends in the
//!   same snapshot.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use foundry_core::prelude::*;

use crate::fixtures::Collaborators;

/// One player action or a fired completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Queue construction.
    Construct(BuildingKind),
    /// Queue destruction.
    Destroy(BuildingKind),
    /// Move an entry towards the tail.
    MoveDown(u32),
    /// Move an entry towards the head.
    MoveUp(u32),
    /// Cancel an entry.
    Cancel(u32),
    /// Fire the pending completion event.
    Complete,
}

/// Apply one operation through the engine.
pub fn apply(fx: &Collaborators, body: &mut BodyState, op: Op) -> Result<Vec<QueueEvent>> {
    let engine = fx.engine();
    match op {
        Op::Construct(kind) => engine.construct(body, kind).map(|_| Vec::new()),
        Op::Destroy(kind) => engine.destroy(body, kind).map(|_| Vec::new()),
        Op::MoveDown(sequence) => engine.move_down(body, sequence).map(|()| Vec::new()),
        Op::MoveUp(sequence) => engine.move_up(body, sequence).map(|()| Vec::new()),
        Op::Cancel(sequence) => engine.cancel(body, sequence).map(|()| Vec::new()),
        Op::Complete => fx.complete_head(body),
    }
}

/// Outcome of draining a queue.
#[derive(Debug, Clone, Default)]
pub struct DrainResult {
    /// Events fired.
    pub fired: usize,
    /// Everything the completion handler reported.
    pub events: Vec<QueueEvent>,
}

impl DrainResult {
    /// Number of completed entries.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, QueueEvent::Completed { .. }))
            .count()
    }

    /// Number of dropped entries.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, QueueEvent::Dropped { .. }))
            .count()
    }
}

/// Fire pending events until the body's queue is empty.
///
/// # Panics
///
/// Panics if handling fails or the queue is still busy after `limit` events.
pub fn drain(fx: &Collaborators, body: &mut BodyState, limit: usize) -> DrainResult {
    let mut result = DrainResult::default();
    while let Some(event) = fx.pending(body) {
        assert!(
            result.fired < limit,
            "queue of body {} still busy after {limit} events",
            body.id
        );
        let events = fx
            .engine()
            .handle(body, event)
            .unwrap_or_else(|e| panic!("handling {event:?} failed: {e}"));
        tracing::debug!(body_id = %body.id, at = %event.at, ?events, "Fired event");
        result.fired += 1;
        result.events.extend(events);
    }
    assert!(
        body.queue.is_empty(),
        "queue of body {} has entries but no event",
        body.id
    );
    result
}

/// Check the invariants every reachable body satisfies.
///
/// # Panics
///
/// Panics with a description of the first broken invariant.
pub fn assert_consistent(fx: &Collaborators, body: &BodyState) {
    assert_eq!(
        body.used_fields(),
        body.buildings.values().sum::<u32>(),
        "used fields drifted from levels"
    );
    assert!(
        body.buildings.values().all(|&level| level > 0),
        "zero level stored"
    );
    if let Err(e) = project(body, &body.queue.entries(), &fx.config) {
        panic!("queue of body {} cannot be projected: {e}", body.id);
    }
    assert_eq!(
        fx.pending(body).is_some(),
        !body.queue.is_empty(),
        "pending event does not match queue"
    );
    assert!(body.queue.len() <= fx.config.capacity, "queue over capacity");
}

/// Stable hash of a body snapshot.
///
/// # Panics
///
/// Panics if the body cannot be encoded.
#[must_use]
pub fn state_hash(body: &BodyState) -> u64 {
    let bytes = body
        .to_bytes()
        .unwrap_or_else(|e| panic!("cannot snapshot body: {e}"));
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Run a script against fresh copies of `body` `runs` times.
///
/// Returns the final hash of each run; a deterministic engine yields
/// identical hashes. Failed operations are part of the script and ignored.
#[must_use]
pub fn replay_hashes(body: &BodyState, script: &[Op], runs: usize) -> Vec<u64> {
    (0..runs)
        .map(|_| {
            let fx = Collaborators::new();
            let mut body = body.clone();
            for &op in script {
                let _ = apply(&fx, &mut body, op);
            }
            state_hash(&body)
        })
        .collect()
}

/// Proptest strategies for queue testing.
pub mod strategies {
    use foundry_core::prelude::*;
    use proptest::prelude::*;

    use super::Op;

    /// Any building kind.
    pub fn arb_building_kind() -> impl Strategy<Value = BuildingKind> + Clone {
        proptest::sample::select(BuildingKind::ALL.to_vec())
    }

    /// Building kinds a fresh planet can queue without prerequisites.
    pub fn arb_basic_kind() -> impl Strategy<Value = BuildingKind> + Clone {
        proptest::sample::select(vec![
            BuildingKind::MetalMine,
            BuildingKind::CrystalMine,
            BuildingKind::DeuteriumSynthesizer,
            BuildingKind::SolarPlant,
            BuildingKind::RoboticsFactory,
            BuildingKind::MetalStorage,
            BuildingKind::ResearchLab,
        ])
    }

    /// Resources between nothing and `max` per component.
    pub fn arb_resources(max: i64) -> impl Strategy<Value = Resources> {
        (0..=max, 0..=max, 0..=max).prop_map(|(m, c, d)| Resources::new(m, c, d))
    }

    /// Sequence numbers a short queue can hold, plus a few that it cannot.
    pub fn arb_sequence() -> impl Strategy<Value = u32> {
        0u32..12
    }

    /// Any operation, with kinds drawn from `kinds`.
    pub fn arb_op(kinds: impl Strategy<Value = BuildingKind> + Clone) -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => kinds.clone().prop_map(Op::Construct),
            2 => kinds.prop_map(Op::Destroy),
            1 => arb_sequence().prop_map(Op::MoveDown),
            1 => arb_sequence().prop_map(Op::MoveUp),
            1 => arb_sequence().prop_map(Op::Cancel),
            2 => Just(Op::Complete),
        ]
    }

    /// A script of up to `max_len` operations on any building kind.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(arb_op(arb_building_kind()), 0..max_len)
    }

    /// A script of up to `max_len` operations on basic building kinds.
    pub fn arb_basic_script(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(arb_op(arb_basic_kind()), 0..max_len)
    }

    /// Constructions only, of basic kinds.
    pub fn arb_constructions(max_len: usize) -> impl Strategy<Value = Vec<BuildingKind>> {
        proptest::collection::vec(arb_basic_kind(), 1..max_len)
    }
}
