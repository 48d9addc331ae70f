//! Undo/redo over whole-sequence snapshots.
//!
//! Two stacks: `undo` holds the states before each committed action (oldest
//! at the front), `redo` holds states that were undone. Pushing a new entry
//! clears `redo`. Once the undo side exceeds `limit`, the oldest entry is
//! dropped.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::HISTORY_LIMIT;
use crate::doc::Annotation;

/// Immutable deep copy of the full annotation sequence.
pub type Snapshot = Vec<Annotation>;

#[derive(Debug)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History keeping at most `limit` undo steps. A limit of zero keeps one.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), limit: limit.max(1) }
    }

    /// Record `before` as the state preceding a committed action.
    pub fn push(&mut self, before: Snapshot) {
        self.undo.push_back(before);
        self.redo.clear();
        while self.undo.len() > self.limit {
            self.undo.pop_front();
            tracing::debug!(limit = self.limit, "history: evicted oldest undo entry");
        }
    }

    /// Step back. Returns the state to restore, having stored `current` on
    /// the redo side. `None` (and no change) if there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let prev = self.undo.pop_back()?;
        self.redo.push(current);
        Some(prev)
    }

    /// Step forward. Mirror of [`History::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        tracing::debug!("history: cleared");
    }
}
