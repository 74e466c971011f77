//! # Undo History
//!
//! A bounded, linear list of document snapshots with a cursor.
//!
//! ```text
//! push:  [S0 S1 S2]  cursor=1  ->  [S0 S1 S3]  cursor=2   (S2 discarded)
//! cap:   [S0 .. S49] cursor=49 ->  [S1 .. S50] cursor=49  (S0 evicted)
//! ```
//!
//! Snapshots are reference-counted so undo/redo hand out a copy without
//! re-cloning the stored entry.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::template::Template;

/// Default maximum number of snapshots kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// A named document snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Human-readable action that produced this state.
    pub label: String,
    /// Document after the action.
    pub template: Arc<Template>,
    /// When the snapshot was taken (ms since epoch).
    pub timestamp: u64,
}

impl Snapshot {
    /// Snapshot the given document.
    #[must_use]
    pub fn new(label: impl Into<String>, template: &Template) -> Self {
        Self {
            label: label.into(),
            template: Arc::new(template.clone()),
            timestamp: now_ms(),
        }
    }
}

/// Bounded linear undo/redo history.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty history holding at most `capacity` snapshots (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Drop every entry and start over from `template`.
    pub fn reset(&mut self, label: impl Into<String>, template: &Template) {
        self.entries.clear();
        self.entries.push_back(Snapshot::new(label, template));
        self.cursor = 0;
    }

    /// Record a new state after the cursor, discarding any redo future.
    pub fn push(&mut self, label: impl Into<String>, template: &Template) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(Snapshot::new(label, template));
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back, returning the state to restore.
    pub fn undo(&mut self) -> Option<Template> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.current().map(|s| (*s.template).clone())
    }

    /// Step forward, returning the state to restore.
    pub fn redo(&mut self) -> Option<Template> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.current().map(|s| (*s.template).clone())
    }

    /// Whether [`Self::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    /// Whether [`Self::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor < self.entries.len() - 1
    }

    /// Snapshot at the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    /// Cursor position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of snapshots kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Labels of every snapshot, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.label.as_str())
    }

    /// All snapshots, oldest first.
    #[must_use]
    pub fn entries(&self) -> &VecDeque<Snapshot> {
        &self.entries
    }
}

/// Current Unix timestamp in milliseconds.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
