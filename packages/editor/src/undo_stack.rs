//! # Undo/Redo Stack
//!
//! Snapshot history for the form tree.
//!
//! ## Design
//!
//! - Entries are whole-tree snapshots. A [`FormTree`] clone shares its
//!   data, so a snapshot costs two reference-count bumps
//! - Rapid edits coalesce: the first change of a burst opens a pending
//!   entry holding the state *before* the burst, and the entry is only
//!   committed once no change arrived for the quiet period
//! - The host owns the timer: call [`UndoStack::poll`] (or arm a timer at
//!   [`UndoStack::next_deadline`]); undo and redo flush pending work first
//! - Committing skips a snapshot pointer-identical to the newest entry and
//!   clears the redo stack
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! let before = tree.clone();
//! mutation.apply(&mut tree, &mut ctx)?;
//! stack.record(&before, now);
//!
//! if let Some(previous) = stack.undo(&tree) {
//!     tree = previous;
//! }
//! ```

use crate::clock::Millis;
use crate::tree::FormTree;
use std::collections::VecDeque;

/// Immutable capture of `{nodes, rootIds}`
pub type Snapshot = FormTree;

pub const DEFAULT_MAX_LEVELS: usize = 50;
pub const DEFAULT_COALESCE_MS: Millis = 400;

/// Open burst of changes not yet committed to history
#[derive(Debug, Clone)]
struct PendingEntry {
    /// State before the first change of the burst
    before: Snapshot,

    /// Time of the most recent change
    last_change: Millis,
}

#[derive(Debug)]
pub struct UndoStack {
    /// Stack of previous states (most recent last)
    undo_stack: VecDeque<Snapshot>,

    /// Stack of undone states (most recent last)
    redo_stack: VecDeque<Snapshot>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Quiet period before a burst is committed (0 = every change)
    coalesce_ms: Millis,

    pending: Option<PendingEntry>,

    paused: bool,
}

impl UndoStack {
    /// Create a new undo stack with default limits (50 levels, 400ms)
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_LEVELS, DEFAULT_COALESCE_MS)
    }

    pub fn with_limits(max_levels: usize, coalesce_ms: Millis) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_levels,
            coalesce_ms: coalesce_ms.max(0),
            pending: None,
            paused: false,
        }
    }

    /// Record that the tree changed from `before` at time `now`
    pub fn record(&mut self, before: &Snapshot, now: Millis) {
        if self.paused {
            return;
        }

        // New edits invalidate the redo future right away
        self.redo_stack.clear();

        if self.coalesce_ms == 0 {
            self.commit(before.clone());
            return;
        }

        match &mut self.pending {
            Some(pending) => pending.last_change = now,
            None => {
                self.pending = Some(PendingEntry {
                    before: before.clone(),
                    last_change: now,
                })
            }
        }
    }

    /// Commit the pending burst if its quiet period elapsed. Returns true
    /// when something was committed.
    pub fn poll(&mut self, now: Millis) -> bool {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| now - p.last_change >= self.coalesce_ms);

        if due {
            self.flush();
        }
        due
    }

    /// Commit the pending burst immediately
    pub fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.commit(pending.before);
        }
    }

    /// When the pending burst becomes due, if there is one
    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending
            .as_ref()
            .map(|p| p.last_change + self.coalesce_ms)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn commit(&mut self, snapshot: Snapshot) {
        if self
            .undo_stack
            .back()
            .is_some_and(|top| top.ptr_eq(&snapshot))
        {
            return;
        }

        self.undo_stack.push_back(snapshot);
        self.trim();
        self.redo_stack.clear();
    }

    fn trim(&mut self) {
        if self.max_levels > 0 {
            while self.undo_stack.len() > self.max_levels {
                self.undo_stack.pop_front();
            }
        }
    }

    /// Step back. `current` moves to the redo stack and the previous state
    /// is returned for the caller to install.
    pub fn undo(&mut self, current: &Snapshot) -> Option<Snapshot> {
        self.flush();

        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(current.clone());
        Some(previous)
    }

    /// Inverse of [`UndoStack::undo`]
    pub fn redo(&mut self, current: &Snapshot) -> Option<Snapshot> {
        self.flush();

        let next = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(current.clone());
        self.trim();
        Some(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.pending.is_some()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of committed undo levels
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }

    /// Stop capturing; a pending burst is dropped
    pub fn pause(&mut self) {
        self.paused = true;
        self.pending = None;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, NodeMap};
    use formsmith_schema::Field;

    fn tree_with(ids: &[&str]) -> FormTree {
        let mut nodes = NodeMap::new();
        for id in ids {
            nodes.insert(id.to_string(), Node::new(*id, Field::new("text"), None, None));
        }
        FormTree::from_parts(nodes, ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_burst_coalesces_into_one_entry() {
        let mut stack = UndoStack::new();
        let t0 = tree_with(&[]);
        let t1 = tree_with(&["a"]);
        let t2 = tree_with(&["a", "b"]);

        stack.record(&t0, 1_000);
        stack.record(&t1, 1_100);
        assert_eq!(stack.next_deadline(), Some(1_500));

        assert!(!stack.poll(1_300));
        assert!(stack.poll(1_500));
        assert_eq!(stack.undo_levels(), 1);

        // The committed entry is the state before the burst
        let previous = stack.undo(&t2).unwrap();
        assert!(previous.ptr_eq(&t0));
        assert_eq!(stack.redo_levels(), 1);
    }

    #[test]
    fn test_undo_flushes_pending() {
        let mut stack = UndoStack::new();
        let t0 = tree_with(&[]);
        let t1 = tree_with(&["a"]);

        stack.record(&t0, 0);
        assert!(stack.can_undo());

        let previous = stack.undo(&t1).unwrap();
        assert!(previous.ptr_eq(&t0));

        let next = stack.redo(&previous).unwrap();
        assert!(next.ptr_eq(&t1));
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_identical_snapshot_skipped() {
        let mut stack = UndoStack::with_limits(10, 0);
        let t0 = tree_with(&["a"]);

        stack.record(&t0, 0);
        stack.record(&t0.clone(), 1);
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut stack = UndoStack::with_limits(10, 0);
        let t0 = tree_with(&[]);
        let t1 = tree_with(&["a"]);

        stack.record(&t0, 0);
        stack.undo(&t1).unwrap();
        assert_eq!(stack.redo_levels(), 1);

        stack.record(&t0, 5);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_limits(2, 0);
        for i in 0..3 {
            let id = format!("n{}", i);
            stack.record(&tree_with(&[id.as_str()]), i);
        }
        assert_eq!(stack.undo_levels(), 2);
    }

    #[test]
    fn test_paused_stack_ignores_changes() {
        let mut stack = UndoStack::new();
        stack.record(&tree_with(&[]), 0);
        stack.pause();
        assert!(!stack.has_pending());

        stack.record(&tree_with(&["a"]), 10);
        stack.flush();
        assert_eq!(stack.undo_levels(), 0);

        stack.resume();
        stack.record(&tree_with(&["b"]), 20);
        stack.flush();
        assert_eq!(stack.undo_levels(), 1);
    }
}
