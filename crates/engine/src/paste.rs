//! Clipboard import into a frame row.
//!
//! Pasted text is a run of numbers separated by tabs (one spreadsheet row)
//! or newlines (one column). Thousands separators are dropped. The run is
//! written month by month starting at the selected cell and stops at the
//! end of the visible range.

use forecast_core::{Month, MonthRange, TimeSegment, Variable, VariableType};

use crate::error::ValidationError;
use crate::events::PasteApplied;

/// Where pasted values go when the run starts in a past month.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasteTarget {
    /// Past months take actuals; from the current month on, time segments.
    Actual,
    /// Every month takes a time segment.
    Projected,
}

/// Parse clipboard text into numbers.
///
/// Any empty or non-numeric token rejects the whole paste.
pub fn parse_paste(text: &str) -> Result<Vec<f64>, ValidationError> {
    let trimmed = text.trim_end_matches(['\n', '\r']);
    if trimmed.trim().is_empty() {
        return Err(ValidationError::NonNumericPaste(text.to_string()));
    }

    trimmed
        .split(['\t', '\n'])
        .map(|token| {
            let cleaned: String = token.chars().filter(|c| *c != ',').collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Err(ValidationError::NonNumericPaste(token.to_string()));
            }
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ValidationError::NonNumericPaste(token.to_string()))
        })
        .collect()
}

/// Write `values` into `variable` from `start` on.
///
/// Values past the end of `range` are dropped. Each write replaces whatever
/// the variable already had for that month.
pub fn apply_paste(
    variable: &Variable,
    start: Month,
    values: &[f64],
    target: PasteTarget,
    today: Month,
    range: &MonthRange,
) -> (Variable, PasteApplied) {
    let mut updated = variable.clone();
    let mut applied = PasteApplied {
        variable: variable.id.clone(),
        start,
        actuals: 0,
        segments: 0,
    };

    let count = values.len().min(range.remaining_from(start));
    if count < values.len() {
        log::debug!(
            "Paste into '{}' truncated from {} to {} values",
            variable.title,
            values.len(),
            count
        );
    }

    for (offset, &raw) in values.iter().take(count).enumerate() {
        let month = start.add_months(offset as i32);
        let value = match variable.kind {
            VariableType::Integer => raw.round(),
            _ => raw,
        };
        if target == PasteTarget::Actual && month.is_past(today) {
            updated.upsert_actual(month, value);
            applied.actuals += 1;
        } else {
            updated.upsert_time_segment(TimeSegment::basic(month, value));
            applied.segments += 1;
        }
    }

    (updated, applied)
}
