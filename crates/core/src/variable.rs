//! Forecast variables and their persisted inputs.
//!
//! A variable owns two month-keyed lists: `time_segments` (rules that
//! project values from their start month onward) and `actuals` (observed
//! historical values). Neither list ever holds two entries for the same
//! month; every write goes through the `upsert_*` helpers, which drop the
//! existing entry for the month before appending.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::month::Month;

/// Named sub-category ratios of a breakdown variable (name -> ratio 0..1).
pub type Breakdown = BTreeMap<String, f64>;

/// Stable identity of a variable (the store's object id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(pub String);

impl VariableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    Real,
    #[default]
    Integer,
    Breakdown,
}

/// How a time segment produces values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "UPPERCASE")]
pub enum SegmentMethod {
    /// Constant value.
    Basic { value: f64 },
    /// Formula over other variables.
    Expression { expression: Expression },
    /// Distribution over the breakdown's sub-categories.
    Breakdown { breakdown: Breakdown },
}

/// A projection rule starting at `date`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSegment {
    pub date: Month,
    #[serde(flatten)]
    pub method: SegmentMethod,
}

impl TimeSegment {
    pub fn basic(date: Month, value: f64) -> Self {
        Self { date, method: SegmentMethod::Basic { value } }
    }

    pub fn expression(date: Month, expression: Expression) -> Self {
        Self { date, method: SegmentMethod::Expression { expression } }
    }

    pub fn breakdown(date: Month, breakdown: Breakdown) -> Self {
        Self { date, method: SegmentMethod::Breakdown { breakdown } }
    }

    /// The constant value, for basic segments.
    pub fn basic_value(&self) -> Option<f64> {
        match &self.method {
            SegmentMethod::Basic { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match &self.method {
            SegmentMethod::Expression { expression } => Some(expression),
            _ => None,
        }
    }
}

/// An observed historical value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actual {
    pub date: Month,
    pub value: f64,
}

/// A forecast variable as persisted by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: VariableId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "variableType")]
    pub kind: VariableType,
    #[serde(default)]
    pub time_segments: Vec<TimeSegment>,
    #[serde(default)]
    pub actuals: Vec<Actual>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_breakdown: Option<Breakdown>,
}

impl Variable {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: VariableType) -> Self {
        Self {
            id: VariableId::new(id),
            title: title.into(),
            description: String::new(),
            kind,
            time_segments: Vec::new(),
            actuals: Vec::new(),
            default_breakdown: None,
        }
    }

    pub fn is_breakdown(&self) -> bool {
        self.kind == VariableType::Breakdown
    }

    /// Segment starting exactly at `date`.
    pub fn time_segment_at(&self, date: Month) -> Option<&TimeSegment> {
        self.time_segments.iter().find(|seg| seg.date == date)
    }

    /// Segment in effect at `date` (latest start not after `date`).
    pub fn active_segment(&self, date: Month) -> Option<&TimeSegment> {
        self.time_segments
            .iter()
            .filter(|seg| seg.date <= date)
            .max_by_key(|seg| seg.date)
    }

    /// First segment starting after `date`.
    pub fn next_segment(&self, date: Month) -> Option<&TimeSegment> {
        self.time_segments
            .iter()
            .filter(|seg| seg.date > date)
            .min_by_key(|seg| seg.date)
    }

    pub fn actual_at(&self, date: Month) -> Option<f64> {
        self.actuals.iter().find(|a| a.date == date).map(|a| a.value)
    }

    /// Replace any segment at the same date, then append.
    pub fn upsert_time_segment(&mut self, segment: TimeSegment) {
        self.time_segments.retain(|seg| seg.date != segment.date);
        self.time_segments.push(segment);
    }

    /// Remove the segment starting at `date`. Returns true if one existed.
    pub fn remove_time_segment(&mut self, date: Month) -> bool {
        let before = self.time_segments.len();
        self.time_segments.retain(|seg| seg.date != date);
        self.time_segments.len() != before
    }

    /// Replace any actual at the same date, then append.
    pub fn upsert_actual(&mut self, date: Month, value: f64) {
        self.actuals.retain(|a| a.date != date);
        self.actuals.push(Actual { date, value });
    }

    /// Remove the actual at `date`. Returns true if one existed.
    pub fn remove_actual(&mut self, date: Month) -> bool {
        let before = self.actuals.len();
        self.actuals.retain(|a| a.date != date);
        self.actuals.len() != before
    }

    /// True if any expression segment refers to `id`.
    pub fn references(&self, id: &VariableId) -> bool {
        self.time_segments
            .iter()
            .filter_map(TimeSegment::as_expression)
            .any(|expr| expr.references(id))
    }
}
