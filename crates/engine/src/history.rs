//! Undo/redo history of variable snapshots.
//!
//! A linear log: every user edit pushes one entry holding the variable as
//! it was before and after. Recording clears the redo side. Entries are
//! kept for one editing session only.

use forecast_core::Variable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    Create,
    Edit,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    /// Snapshot before the change (`None` for creates).
    pub old: Option<Variable>,
    /// Snapshot after the change (`None` for deletes).
    pub new: Option<Variable>,
}

impl HistoryEntry {
    pub fn create(variable: Variable) -> Self {
        Self { kind: HistoryKind::Create, old: None, new: Some(variable) }
    }

    pub fn edit(old: Variable, new: Variable) -> Self {
        Self { kind: HistoryKind::Edit, old: Some(old), new: Some(new) }
    }

    pub fn delete(variable: Variable) -> Self {
        Self { kind: HistoryKind::Delete, old: Some(variable), new: None }
    }
}

pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// History keeping at most `max_entries` undo steps (oldest dropped first).
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record an entry. Clears anything that could have been redone.
    pub fn push_state(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the last entry for undo and move it to the redo side.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop the last undone entry and move it back to the undo side.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
