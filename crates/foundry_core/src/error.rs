//! Error types for the building queue engine.

use thiserror::Error;

use crate::body::BodyId;

/// Result type alias using [`QueueError`].
pub type Result<T> = std::result::Result<T, QueueError>;

/// Top-level error type for all building queue operations.
///
/// Every user-triggered variant is returned before any state is touched.
/// [`QueueError::MissingEvent`] and [`QueueError::Invariant`] are faults:
/// they mean stored state is inconsistent and are never repaired silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue already holds `capacity` entries.
    #[error("Building queue is full")]
    QueueFull,

    /// Every field of the body is (or will be) occupied.
    #[error("No more free fields")]
    NoFreeFields,

    /// Building, technology or body-specific requirements are not met.
    #[error("Requirements not met")]
    RequirementsNotMet,

    /// Stored resources do not cover the cost.
    #[error("Not enough resources")]
    NotEnoughResources,

    /// Energy production does not cover the required energy.
    #[error("Not enough energy")]
    NotEnoughEnergy,

    /// The building kind cannot be destroyed.
    #[error("Wrong building kind")]
    WrongBuildingKind,

    /// The building is already going to be fully destroyed.
    #[error("Building already destroyed")]
    BuildingAlreadyDestroyed,

    /// No queue entry with the given sequence number.
    #[error("No such queue entry: {0}")]
    NoSuchQueueEntry(u32),

    /// The entry cannot be moved.
    #[error("Cannot move queue entry")]
    CannotMove,

    /// The entry cannot be cancelled.
    #[error("Cannot cancel queue entry")]
    CannotCancel,

    /// The queue has a head but no pending completion event.
    #[error("Missing completion event for body {0}")]
    MissingEvent(BodyId),

    /// Unknown body.
    #[error("Body not found: {0}")]
    BodyNotFound(BodyId),

    /// A projection or bookkeeping invariant does not hold.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParse {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl QueueError {
    /// Whether this error signals corrupted state rather than a rejected request.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::MissingEvent(_) | Self::Invariant(_))
    }
}
