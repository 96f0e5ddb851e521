//! The per-body building queue.
//!
//! Entries are keyed by sequence numbers that only ever grow. A sequence
//! number identifies an entry for its whole life: removing an entry leaves a
//! gap, and moving an entry swaps the entries stored under two numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::items::{BuildingKind, QueueAction};

/// One queued level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Building the action applies to.
    pub kind: BuildingKind,
    /// Construct or destroy one level.
    pub action: QueueAction,
}

impl QueueEntry {
    /// Queue construction of one level of `kind`.
    #[must_use]
    pub const fn construct(kind: BuildingKind) -> Self {
        Self {
            kind,
            action: QueueAction::Construct,
        }
    }

    /// Queue destruction of one level of `kind`.
    #[must_use]
    pub const fn destroy(kind: BuildingKind) -> Self {
        Self {
            kind,
            action: QueueAction::Destroy,
        }
    }

    /// Level the building reaches once this entry completes, starting at `level`.
    #[must_use]
    pub const fn target_level(&self, level: u32) -> i64 {
        level as i64 + self.action.delta()
    }
}

/// Ordered building queue of a single body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildingQueue {
    entries: BTreeMap<u32, QueueEntry>,
}

impl BuildingQueue {
    /// First sequence number handed out by an empty queue.
    pub const FIRST_SEQUENCE: u32 = 1;

    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of entries in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue holds at least `capacity` entries.
    #[must_use]
    pub fn is_full(&self, capacity: usize) -> bool {
        self.entries.len() >= capacity
    }

    /// Whether an entry with this sequence number exists.
    #[must_use]
    pub fn contains(&self, sequence: u32) -> bool {
        self.entries.contains_key(&sequence)
    }

    /// Entry stored under `sequence`.
    #[must_use]
    pub fn get(&self, sequence: u32) -> Option<QueueEntry> {
        self.entries.get(&sequence).copied()
    }

    /// The head: the entry that is currently being built.
    #[must_use]
    pub fn head(&self) -> Option<(u32, QueueEntry)> {
        self.entries
            .first_key_value()
            .map(|(&seq, &entry)| (seq, entry))
    }

    /// Sequence number the next appended entry receives.
    #[must_use]
    pub fn next_sequence(&self) -> u32 {
        self.entries
            .last_key_value()
            .map_or(Self::FIRST_SEQUENCE, |(&seq, _)| seq + 1)
    }

    /// Append an entry at the tail, returning its sequence number.
    pub fn push(&mut self, entry: QueueEntry) -> u32 {
        let sequence = self.next_sequence();
        self.entries.insert(sequence, entry);
        sequence
    }

    /// Remove and return the entry stored under `sequence`.
    pub fn remove(&mut self, sequence: u32) -> Option<QueueEntry> {
        self.entries.remove(&sequence)
    }

    /// Remove and return the head.
    pub fn pop_head(&mut self) -> Option<(u32, QueueEntry)> {
        self.entries.pop_first()
    }

    /// Exchange the entries stored under two existing sequence numbers.
    ///
    /// Returns `false` (and changes nothing) if either is missing.
    pub fn swap(&mut self, a: u32, b: u32) -> bool {
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return false;
        };
        self.entries.insert(a, second);
        self.entries.insert(b, first);
        true
    }

    /// Sequence number of the entry right before `sequence`.
    #[must_use]
    pub fn preceding(&self, sequence: u32) -> Option<u32> {
        self.entries
            .range(..sequence)
            .next_back()
            .map(|(&seq, _)| seq)
    }

    /// Sequence number of the entry right after `sequence`.
    #[must_use]
    pub fn following(&self, sequence: u32) -> Option<u32> {
        self.entries
            .range(sequence.saturating_add(1)..)
            .next()
            .map(|(&seq, _)| seq)
    }

    /// Entries strictly before `sequence`, in order.
    #[must_use]
    pub fn entries_before(&self, sequence: u32) -> Vec<QueueEntry> {
        self.entries.range(..sequence).map(|(_, &e)| e).collect()
    }

    /// Entries from `sequence` (inclusive) to the tail, in order.
    #[must_use]
    pub fn entries_from(&self, sequence: u32) -> Vec<QueueEntry> {
        self.entries.range(sequence..).map(|(_, &e)| e).collect()
    }

    /// All entries in order.
    #[must_use]
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.values().copied().collect()
    }

    /// Iterate `(sequence, entry)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, QueueEntry)> + '_ {
        self.entries.iter().map(|(&seq, &entry)| (seq, entry))
    }

    /// Clear all entries from the queue.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
