//! Derived per-month values: frames, subframes and projections.
//!
//! None of these are persisted. A projection refresh (date-range change,
//! variable edit, visibility toggle) rebuilds them from the variables.

use serde::{Deserialize, Serialize};

use crate::month::Month;
use crate::variable::{TimeSegment, Variable};

/// One named sub-category value inside a breakdown frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubFrame {
    pub name: String,
    /// Ratio in 0..1 (shown to the user as a percentage).
    pub value: f64,
}

/// One variable's computed value for one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub date: Month,
    pub projected_value: Option<f64>,
    pub actual_value: Option<f64>,
    /// Segment in effect for this month, if any.
    pub time_segment: Option<TimeSegment>,
    #[serde(default)]
    pub sub_frames: Vec<SubFrame>,
}

impl Frame {
    pub fn new(date: Month) -> Self {
        Self {
            date,
            projected_value: None,
            actual_value: None,
            time_segment: None,
            sub_frames: Vec::new(),
        }
    }

    pub fn has_actual(&self) -> bool {
        self.actual_value.is_some()
    }

    /// True if the segment in effect starts exactly at this frame's month.
    pub fn has_segment_starting_here(&self) -> bool {
        self.time_segment.as_ref().is_some_and(|seg| seg.date == self.date)
    }

    pub fn sub_frame(&self, name: &str) -> Option<&SubFrame> {
        self.sub_frames.iter().find(|sf| sf.name == name)
    }

    /// Value shown in the cell: the actual when present, else the projection.
    pub fn display_value(&self) -> Option<f64> {
        self.actual_value.or(self.projected_value)
    }
}

/// A variable plus its frames and per-session view state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub variable: Variable,
    pub frames: Vec<Frame>,
    /// Sorted sub-category names (breakdown variables only).
    pub subframe_names: Vec<String>,
    pub is_expanded: bool,
    pub display: bool,
}

impl Projection {
    /// Build a projection, collecting and sorting sub-category names.
    pub fn new(variable: Variable, mut frames: Vec<Frame>) -> Self {
        let mut names: Vec<String> = Vec::new();
        for frame in &mut frames {
            frame.sub_frames.sort_by(|a, b| a.name.cmp(&b.name));
            for sf in &frame.sub_frames {
                if !names.contains(&sf.name) {
                    names.push(sf.name.clone());
                }
            }
        }
        if let Some(defaults) = &variable.default_breakdown {
            for name in defaults.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names.sort();

        Self {
            variable,
            frames,
            subframe_names: names,
            is_expanded: false,
            display: true,
        }
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.is_expanded = expanded;
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Subframe rows can be entered only while expanded and of breakdown type.
    pub fn is_subframe_navigable(&self) -> bool {
        self.is_expanded && self.variable.is_breakdown()
    }

    /// Number of subframe rows rendered beneath the frame row.
    pub fn subframe_row_count(&self) -> usize {
        if self.is_subframe_navigable() {
            self.subframe_names.len()
        } else {
            0
        }
    }

    pub fn frame(&self, col: usize) -> Option<&Frame> {
        self.frames.get(col)
    }

    pub fn frame_for(&self, date: Month) -> Option<&Frame> {
        self.frames.iter().find(|f| f.date == date)
    }

    /// Subframe `sub_index` (in `subframe_names` order) of the frame at `col`.
    pub fn sub_frame(&self, col: usize, sub_index: usize) -> Option<&SubFrame> {
        let name = self.subframe_names.get(sub_index)?;
        self.frame(col)?.sub_frame(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn breakdown_frame(date: &str, parts: &[(&str, f64)]) -> Frame {
        let mut frame = Frame::new(m(date));
        frame.sub_frames = parts
            .iter()
            .map(|(name, value)| SubFrame { name: name.to_string(), value: *value })
            .collect();
        frame
    }

    #[test]
    fn test_subframe_names_sorted() {
        let var = Variable::new("b", "Regions", VariableType::Breakdown);
        let frames = vec![
            breakdown_frame("2024-01", &[("West", 0.5), ("East", 0.5)]),
            breakdown_frame("2024-02", &[("North", 1.0)]),
        ];
        let proj = Projection::new(var, frames);

        assert_eq!(proj.subframe_names, vec!["East", "North", "West"]);
        assert_eq!(proj.frames[0].sub_frames[0].name, "East");
        assert_eq!(proj.sub_frame(0, 2).map(|sf| sf.value), Some(0.5));
        assert!(proj.sub_frame(0, 1).is_none());
    }

    #[test]
    fn test_subframe_rows_require_expanded_breakdown() {
        let var = Variable::new("b", "Regions", VariableType::Breakdown);
        let proj = Projection::new(var, vec![breakdown_frame("2024-01", &[("East", 0.4), ("West", 0.6)])]);
        assert_eq!(proj.subframe_row_count(), 0);
        let proj = proj.with_expanded(true);
        assert_eq!(proj.subframe_row_count(), 2);

        let real = Variable::new("r", "Revenue", VariableType::Real);
        let proj = Projection::new(real, vec![Frame::new(m("2024-01"))]).with_expanded(true);
        assert!(!proj.is_subframe_navigable());
        assert_eq!(proj.subframe_row_count(), 0);
    }

    #[test]
    fn test_segment_starting_here() {
        let mut frame = Frame::new(m("2024-03"));
        frame.time_segment = Some(TimeSegment::basic(m("2024-01"), 1.0));
        assert!(!frame.has_segment_starting_here());
        frame.time_segment = Some(TimeSegment::basic(m("2024-03"), 1.0));
        assert!(frame.has_segment_starting_here());
    }
}
