//! # Foundry Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture bodies and collaborator bundles
//! - A harness that drives a queue until it drains
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod harness;

/// Re-export proptest for convenience.
pub use proptest;
