//! # Foundry Development Tools
//!
//! Command-line tools for development:
//! - Config and blueprint validators
//! - A scenario runner that replays queue commands and prints JSON views

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod scenario;
pub mod validate;
