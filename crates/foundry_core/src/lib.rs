//! # Foundry Core
//!
//! Building queue engine for the planets and moons of a space strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No IO beyond parsing strings
//! - No wall clock (time is passed in as [`body::Timestamp`])
//! - No floating-point math (cost growth uses fixed-point)
//!
//! Only the head of a queue is committed: its cost has been paid and a
//! single completion event is pending for it. Everything behind the head is
//! speculative and is checked again when it reaches the front.
//!
//! ## Crate Structure
//!
//! - [`projection`] - Replaying queued entries on top of committed levels
//! - [`feasibility`] - Structural checks for reordering and cancelling
//! - [`engine`] - Construct, destroy, move and cancel
//! - [`completion`] - Handling a fired completion event
//! - [`view`] - Read-only views of buildings and queue
//! - [`service`] - Per-body transactions over a body store
//! - [`registry`], [`economy`], [`scheduler`] - Collaborator traits and defaults

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod body;
pub mod completion;
pub mod config;
pub mod economy;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod items;
pub mod math;
pub mod projection;
pub mod queue;
pub mod registry;
pub mod resources;
pub mod scheduler;
pub mod service;
pub mod view;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::body::{BodyId, BodyState, Timestamp};
    pub use crate::completion::{DropReason, QueueEvent};
    pub use crate::config::{ConfigError, QueueConfig};
    pub use crate::economy::{Economy, FlatEconomy};
    pub use crate::engine::QueueEngine;
    pub use crate::error::{QueueError, Result};
    pub use crate::feasibility::{remove_feasible, swap_feasible};
    pub use crate::items::{BodyKind, BuildingKind, QueueAction, TechnologyKind};
    pub use crate::projection::{project, ProjectedState};
    pub use crate::queue::{BuildingQueue, QueueEntry};
    pub use crate::registry::{BlueprintRegistry, BuildingBlueprint, ItemRegistry};
    pub use crate::resources::Resources;
    pub use crate::scheduler::{EventScheduler, InMemoryScheduler, PendingEvent};
    pub use crate::service::{BuildingsService, Delivery, InMemoryBodies};
    pub use crate::view::{BuildingView, BuildingsAndQueue, QueueEntryView};
}
