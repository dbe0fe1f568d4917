//! The narrow interface the sheet uses to persist variables.
//!
//! The sheet never reaches into a global store. Hosts hand it something
//! implementing `SheetStore`; `MemoryStore` is the in-process version used
//! by the CLI and the tests.

use forecast_core::{Variable, VariableId};

/// Why a variable update was dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOrigin {
    /// Direct user edit (editor commit, delete key, paste, rename).
    User,
    /// Undo or redo re-submitting a snapshot. Not recorded in history.
    HistoryReplay,
    /// Expression rewritten after a referenced variable was renamed.
    ExpressionRepair,
}

pub trait SheetStore {
    fn update_variable(&mut self, variable: &Variable, origin: MutationOrigin);
    fn create_variable(&mut self, variable: &Variable);
    fn delete_variable(&mut self, id: &VariableId);
    /// Version of the stored sheet; grows with every accepted mutation.
    fn version(&self) -> u64;
}

/// Update call as seen by `MemoryStore`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateRecord {
    pub id: VariableId,
    pub origin: MutationOrigin,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    variables: Vec<Variable>,
    version: u64,
    updates: Vec<UpdateRecord>,
    creates: usize,
    deletes: usize,
}

impl MemoryStore {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables, ..Default::default() }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| &v.id == id)
    }

    /// Every `update_variable` call received, in order.
    pub fn updates(&self) -> &[UpdateRecord] {
        &self.updates
    }

    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    pub fn create_count(&self) -> usize {
        self.creates
    }

    pub fn delete_count(&self) -> usize {
        self.deletes
    }
}

impl SheetStore for MemoryStore {
    fn update_variable(&mut self, variable: &Variable, origin: MutationOrigin) {
        match self.variables.iter_mut().find(|v| v.id == variable.id) {
            Some(slot) => *slot = variable.clone(),
            None => self.variables.push(variable.clone()),
        }
        self.updates.push(UpdateRecord { id: variable.id.clone(), origin });
        self.version += 1;
    }

    fn create_variable(&mut self, variable: &Variable) {
        self.variables.push(variable.clone());
        self.creates += 1;
        self.version += 1;
    }

    fn delete_variable(&mut self, id: &VariableId) {
        self.variables.retain(|v| &v.id != id);
        self.deletes += 1;
        self.version += 1;
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::VariableType;

    #[test]
    fn test_memory_store_tracks_calls() {
        let mut store = MemoryStore::new(vec![Variable::new("v1", "Revenue", VariableType::Real)]);
        let mut var = store.variables()[0].clone();
        var.title = "Sales".into();

        store.update_variable(&var, MutationOrigin::User);
        store.create_variable(&Variable::new("v2", "Cost", VariableType::Integer));
        store.delete_variable(&VariableId::new("v2"));

        assert_eq!(store.variable(&VariableId::new("v1")).unwrap().title, "Sales");
        assert_eq!(store.update_count(), 1);
        assert_eq!(store.updates()[0].origin, MutationOrigin::User);
        assert_eq!(store.create_count(), 1);
        assert_eq!(store.delete_count(), 1);
        assert_eq!(store.variables().len(), 1);
        assert_eq!(store.version(), 3);
    }
}
