//! Sheet files: the JSON a replay starts from.
//!
//! ```json
//! {
//!   "today": "2024-01",
//!   "start": "2023-11",
//!   "end": "2024-06",
//!   "variables": [ { "id": "rev", "title": "Revenue", "variableType": "REAL" } ],
//!   "expanded": ["regions"],
//!   "hidden": []
//! }
//! ```
//!
//! `today` defaults to the current month; `start`/`end` default to the
//! range configured in settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use forecast_config::Settings;
use forecast_core::{Month, Variable, VariableId};
use forecast_engine::{ForecastSheet, MemoryStore, SheetContext};

use crate::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetFile {
    pub today: Option<Month>,
    pub start: Option<Month>,
    pub end: Option<Month>,
    pub readonly: bool,
    pub variables: Vec<Variable>,
    pub expanded: Vec<VariableId>,
    pub hidden: Vec<VariableId>,
}

impl SheetFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents).map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn context(&self, settings: &Settings) -> SheetContext {
        let today = self.today.unwrap_or_else(Month::current);
        let mut context = SheetContext::from_settings(today, settings);
        if let Some(start) = self.start {
            context.range.start = start;
        }
        if let Some(end) = self.end {
            context.range.end = end;
        }
        if self.readonly {
            context = context.read_only();
        }
        context
    }

    /// Open an in-memory sheet over this file's variables.
    pub fn open(self, settings: Settings) -> ForecastSheet<MemoryStore> {
        let context = self.context(&settings);
        log::debug!(
            "Opening {} variables over {}..{} (today {})",
            self.variables.len(),
            context.range.start,
            context.range.end,
            context.today
        );
        let store = MemoryStore::new(self.variables.clone());
        let mut sheet = ForecastSheet::new(store, self.variables, context, settings);
        for id in &self.expanded {
            sheet.set_expanded(id, true);
        }
        for id in &self.hidden {
            sheet.set_hidden(id, true);
        }
        sheet
    }
}
