//! Notifications the sheet raises for its host.
//!
//! Every store call is mirrored by exactly one `UpdateVariable`,
//! `VariableCreate` or `DeleteVariable` event, so a host that does not share
//! the store (a UI shell, the CLI's log) can follow what the sheet did. The
//! typed change events (`UpsertTimesegment`, `Paste`...) are pushed just
//! before the `UpdateVariable` they describe.

use forecast_core::{Month, TimeSegment, Variable, VariableId};

/// Events emitted by `ForecastSheet`.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    /// A variable was written to the store.
    UpdateVariable(Variable),
    /// A variable was created.
    VariableCreate(Variable),
    /// A variable was deleted.
    DeleteVariable(VariableId),
    /// A time segment was written (`None` = removed) at `date`.
    UpsertTimesegment(TimesegmentChange),
    /// An actual value was written (`None` = removed) at `date`.
    UpsertActualValue(ActualChange),
    /// A sub-category percentage was written.
    UpsertSubframe(SubframeChange),
    /// A paste run was applied.
    Paste(PasteApplied),
    /// A variable's title changed.
    UpdateVariableTitle { id: VariableId, old: String, new: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimesegmentChange {
    pub variable: VariableId,
    pub date: Month,
    pub segment: Option<TimeSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActualChange {
    pub variable: VariableId,
    pub date: Month,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubframeChange {
    pub variable: VariableId,
    pub date: Month,
    pub name: String,
    /// Percentage as entered (0..100).
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteApplied {
    pub variable: VariableId,
    pub start: Month,
    /// Entries written to `actuals`.
    pub actuals: usize,
    /// Entries written to `time_segments`.
    pub segments: usize,
}

/// Simple in-order event log.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<SheetEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: SheetEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SheetEvent] {
        &self.events
    }

    /// Take every event collected so far.
    pub fn drain(&mut self) -> Vec<SheetEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Variables written to the store, in order.
    pub fn updated_variables(&self) -> Vec<&Variable> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SheetEvent::UpdateVariable(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}
