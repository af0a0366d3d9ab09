//! # Row Index
//!
//! O(1) lookup from message id to the presenter's handle for its rendered
//! row. The handle is opaque to the core: the presenter issues it and is the
//! only party that can resolve it to something drawable.

use log::debug;
use std::collections::HashMap;
use std::fmt;

use crate::core::message::MessageId;

/// Opaque handle to a rendered row, issued by the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(pub u64);

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// Invariant: a key exists iff that message is currently materialized.
#[derive(Debug, Default)]
pub struct RowIndex {
    rows: HashMap<MessageId, RowHandle>,
}

impl RowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the row for `id`, replacing any previous handle
    /// (a group rerender hands out fresh rows for the same messages).
    pub fn register(&mut self, id: MessageId, handle: RowHandle) {
        self.rows.insert(id, handle);
    }

    pub fn lookup(&self, id: MessageId) -> Option<RowHandle> {
        self.rows.get(&id).copied()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn remove(&mut self, id: MessageId) -> Option<RowHandle> {
        self.rows.remove(&id)
    }

    /// Move the entry for `old` to `new`. Returns false (and changes nothing)
    /// when `old` is not materialized, since a rekey can race with an
    /// eviction, or when `new` already owns a row.
    pub fn rekey(&mut self, old: MessageId, new: MessageId) -> bool {
        if old == new {
            return self.rows.contains_key(&old);
        }
        if let Some(existing) = self.rows.get(&new) {
            debug!("rekey {old} -> {new}: {new} already owns {existing}");
            return false;
        }
        match self.rows.remove(&old) {
            Some(handle) => {
                self.rows.insert(new, handle);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
