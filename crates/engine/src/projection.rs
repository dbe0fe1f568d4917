//! Turning variables into projections.
//!
//! The sheet does not own projection math; hosts supply a `Projector`.
//! `CarryForwardProjector` is a small reference implementation used by the
//! CLI and the tests.

use std::collections::{HashMap, HashSet};

use forecast_core::{
    Breakdown, Frame, Month, MonthRange, Projection, SegmentMethod, SubFrame, Variable, VariableId,
    VariableType,
};

use crate::expr;

pub trait Projector {
    /// One projection per variable, in input order, with one frame per
    /// month of `range`.
    fn project(&self, variables: &[Variable], range: &MonthRange) -> Vec<Projection>;
}

/// Holds each segment's value until the next segment starts.
///
/// Expression segments are evaluated month by month against the other
/// variables' values for the same month (the actual when present, else the
/// projection). Reference cycles and unknown names leave the month without
/// a value. Breakdown variables get subframes from the active breakdown
/// segment, or from `default_breakdown` before the first one.
#[derive(Clone, Copy, Debug, Default)]
pub struct CarryForwardProjector;

impl Projector for CarryForwardProjector {
    fn project(&self, variables: &[Variable], range: &MonthRange) -> Vec<Projection> {
        let months: Vec<Month> = range.iter().collect();
        let mut eval = Evaluator::new(variables, &months);

        variables
            .iter()
            .enumerate()
            .map(|(vi, var)| {
                let frames = months
                    .iter()
                    .enumerate()
                    .map(|(mi, &month)| {
                        let mut frame = Frame::new(month);
                        frame.time_segment = var.active_segment(month).cloned();
                        frame.actual_value = var.actual_at(month);
                        frame.projected_value = eval.projected(vi, mi);
                        if var.is_breakdown() {
                            frame.sub_frames = breakdown_at(var, month)
                                .map(|bd| {
                                    bd.iter()
                                        .map(|(name, value)| SubFrame { name: name.clone(), value: *value })
                                        .collect()
                                })
                                .unwrap_or_default();
                        }
                        frame
                    })
                    .collect();
                Projection::new(var.clone(), frames)
            })
            .collect()
    }
}

fn breakdown_at(var: &Variable, month: Month) -> Option<&Breakdown> {
    match var.active_segment(month).map(|seg| &seg.method) {
        Some(SegmentMethod::Breakdown { breakdown }) => Some(breakdown),
        _ => var.default_breakdown.as_ref(),
    }
}

struct Evaluator<'a> {
    variables: &'a [Variable],
    months: &'a [Month],
    index: HashMap<&'a VariableId, usize>,
    memo: HashMap<(usize, usize), Option<f64>>,
    visiting: HashSet<(usize, usize)>,
}

impl<'a> Evaluator<'a> {
    fn new(variables: &'a [Variable], months: &'a [Month]) -> Self {
        Self {
            variables,
            months,
            index: variables.iter().enumerate().map(|(i, v)| (&v.id, i)).collect(),
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Value other expressions see for variable `vi` at month `mi`.
    fn observed(&mut self, vi: usize, mi: usize) -> Option<f64> {
        let month = self.months[mi];
        self.variables[vi].actual_at(month).or_else(|| self.projected(vi, mi))
    }

    fn projected(&mut self, vi: usize, mi: usize) -> Option<f64> {
        if let Some(cached) = self.memo.get(&(vi, mi)) {
            return *cached;
        }
        if !self.visiting.insert((vi, mi)) {
            log::debug!("Reference cycle through '{}'", self.variables[vi].title);
            return None;
        }

        let variables = self.variables;
        let var = &variables[vi];
        let value = match var.active_segment(self.months[mi]).map(|seg| &seg.method) {
            Some(SegmentMethod::Basic { value }) => Some(*value),
            Some(SegmentMethod::Expression { expression }) => match expr::parse(&expression.text) {
                Ok(ast) => expr::evaluate(&ast, &mut |name| {
                    let id = expression.reference_for(name)?;
                    let target = *self.index.get(id)?;
                    self.observed(target, mi)
                }),
                Err(e) => {
                    log::warn!("Cannot evaluate expression '{}': {}", expression.text, e);
                    None
                }
            },
            Some(SegmentMethod::Breakdown { .. }) | None => None,
        };
        let value = match var.kind {
            VariableType::Integer => value.map(f64::round),
            _ => value,
        };

        self.visiting.remove(&(vi, mi));
        self.memo.insert((vi, mi), value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::TimeSegment;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn range() -> MonthRange {
        MonthRange::new(m("2024-01"), m("2024-04"))
    }

    #[test]
    fn test_basic_values_carry_forward() {
        let mut revenue = Variable::new("v1", "Revenue", VariableType::Real);
        revenue.upsert_time_segment(TimeSegment::basic(m("2024-02"), 10.0));
        revenue.upsert_time_segment(TimeSegment::basic(m("2024-04"), 20.0));
        revenue.upsert_actual(m("2024-01"), 7.0);

        let projections = CarryForwardProjector.project(&[revenue], &range());
        let frames = &projections[0].frames;
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].projected_value, None);
        assert_eq!(frames[0].actual_value, Some(7.0));
        assert_eq!(frames[1].projected_value, Some(10.0));
        assert_eq!(frames[2].projected_value, Some(10.0));
        assert_eq!(frames[2].time_segment.as_ref().map(|s| s.date), Some(m("2024-02")));
        assert_eq!(frames[3].projected_value, Some(20.0));
    }

    #[test]
    fn test_expressions_use_other_variables() {
        let mut revenue = Variable::new("v1", "Revenue", VariableType::Real);
        revenue.upsert_time_segment(TimeSegment::basic(m("2024-01"), 100.0));
        revenue.upsert_actual(m("2024-02"), 50.0);
        let mut margin = Variable::new("v2", "Margin", VariableType::Real);
        let variables = vec![revenue.clone(), margin.clone()];
        let e = expr::parse_expression("Revenue * 0.5", &variables).unwrap();
        margin.upsert_time_segment(TimeSegment::expression(m("2024-01"), e));

        let projections = CarryForwardProjector.project(&[margin, revenue], &range());
        let frames = &projections[0].frames;
        assert_eq!(frames[0].projected_value, Some(50.0));
        assert_eq!(frames[1].projected_value, Some(25.0));
    }

    #[test]
    fn test_cycles_yield_no_value() {
        let mut a = Variable::new("a", "A", VariableType::Real);
        let mut b = Variable::new("b", "B", VariableType::Real);
        let variables = vec![a.clone(), b.clone()];
        a.upsert_time_segment(TimeSegment::expression(m("2024-01"), expr::parse_expression("B + 1", &variables).unwrap()));
        b.upsert_time_segment(TimeSegment::expression(m("2024-01"), expr::parse_expression("A + 1", &variables).unwrap()));

        let projections = CarryForwardProjector.project(&[a, b], &range());
        assert_eq!(projections[0].frames[0].projected_value, None);
        assert_eq!(projections[1].frames[0].projected_value, None);
    }

    #[test]
    fn test_integer_values_round() {
        let mut units = Variable::new("u", "Units", VariableType::Integer);
        units.upsert_time_segment(TimeSegment::basic(m("2024-01"), 2.6));
        let projections = CarryForwardProjector.project(&[units], &range());
        assert_eq!(projections[0].frames[0].projected_value, Some(3.0));
    }

    #[test]
    fn test_breakdown_subframes() {
        let mut regions = Variable::new("r", "Regions", VariableType::Breakdown);
        let mut defaults = Breakdown::new();
        defaults.insert("West".into(), 0.5);
        defaults.insert("East".into(), 0.5);
        regions.default_breakdown = Some(defaults);
        let mut later = Breakdown::new();
        later.insert("West".into(), 0.3);
        later.insert("East".into(), 0.7);
        regions.upsert_time_segment(TimeSegment::breakdown(m("2024-03"), later));

        let projections = CarryForwardProjector.project(&[regions], &range());
        let proj = &projections[0];
        assert_eq!(proj.subframe_names, vec!["East", "West"]);
        assert_eq!(proj.frames[0].sub_frames[0].value, 0.5);
        assert_eq!(proj.frames[2].sub_frames[0].value, 0.7);
        assert_eq!(proj.frames[3].sub_frames[1].value, 0.3);
    }
}
