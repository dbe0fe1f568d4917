//! Stored expression text for expression-valued time segments.
//!
//! The text is what the user typed (`Revenue * 0.2`). Identifiers are bound
//! to variable ids when the expression is parsed, and that binding is kept
//! alongside the text so a later rename of the referenced variable can
//! still find the identifier by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::variable::VariableId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    /// Source text as entered.
    pub text: String,
    /// Identifier text -> referenced variable id, captured at parse time.
    #[serde(default)]
    pub references: BTreeMap<String, VariableId>,
}

impl Expression {
    pub fn new(text: impl Into<String>, references: BTreeMap<String, VariableId>) -> Self {
        Self { text: text.into(), references }
    }

    /// True if some identifier in this expression is bound to `id`.
    pub fn references(&self, id: &VariableId) -> bool {
        self.references.values().any(|r| r == id)
    }

    /// Variable id bound to identifier `name`, if any.
    pub fn reference_for(&self, name: &str) -> Option<&VariableId> {
        self.references.get(name)
    }
}
