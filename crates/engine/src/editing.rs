//! Per-cell editors.
//!
//! Which editor opens is decided once, from the cell kind and month:
//!
//! - a frame in a past month opens the actual-value editor (the host may
//!   toggle it to the projected time segment);
//! - any other frame opens the time segment editor, as a constant or,
//!   when opened with `=`, as an expression;
//! - a subframe opens the percentage editor.
//!
//! An `EditSession` holds the editor plus what the cell held when it
//! opened, so that committing an unchanged value produces no mutation.

use forecast_config::Settings;
use forecast_core::{
    Month, Projection, SegmentMethod, TimeSegment, Variable, VariableId, VariableType,
};

use crate::error::ValidationError;
use crate::expr;
use crate::grid::{Coordinate, RowRef};
use crate::keys::{Key, KeyInput};

// ============================================================================
// Text input
// ============================================================================

/// Single-line text buffer with a caret (counted in chars).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    caret: usize,
}

impl TextInput {
    /// Buffer holding `text` with the caret at the end.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let caret = text.chars().count();
        Self { text, caret }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_at(self.caret);
        self.text.insert(at, c);
        self.caret += 1;
    }

    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        self.caret -= 1;
        let at = self.byte_at(self.caret);
        self.text.remove(at);
    }

    pub fn delete(&mut self) {
        if self.caret < self.text.chars().count() {
            let at = self.byte_at(self.caret);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.caret = (self.caret + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.caret = 0;
    }

    pub fn end(&mut self) {
        self.caret = self.text.chars().count();
    }
}

// ============================================================================
// Editors
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentMode {
    Basic,
    Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CellEditor {
    /// Projected value of a frame: a constant or an expression.
    Timesegment { mode: SegmentMode, input: TextInput },
    /// Observed value of a past frame.
    Actual { input: TextInput },
    /// Share of one sub-category, in percent.
    Percentage { input: TextInput },
}

impl CellEditor {
    pub fn input(&self) -> &TextInput {
        match self {
            CellEditor::Timesegment { input, .. }
            | CellEditor::Actual { input }
            | CellEditor::Percentage { input } => input,
        }
    }

    fn input_mut(&mut self) -> &mut TextInput {
        match self {
            CellEditor::Timesegment { input, .. }
            | CellEditor::Actual { input }
            | CellEditor::Percentage { input } => input,
        }
    }

    fn accepts(&self, c: char) -> bool {
        match self {
            CellEditor::Timesegment { mode: SegmentMode::Expression, .. } => !c.is_control(),
            CellEditor::Timesegment { mode: SegmentMode::Basic, .. } | CellEditor::Actual { .. } => {
                c.is_ascii_digit() || matches!(c, '.' | ',' | '-')
            }
            CellEditor::Percentage { .. } => c.is_ascii_digit() || c == '.',
        }
    }
}

/// What opened the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenTrigger {
    Enter,
    DoubleClick,
    /// A digit or `=` typed on the selected cell; it becomes the first input.
    Key(char),
}

/// What a key did inside an open editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// Content or caret changed, or the key was swallowed.
    Continue,
    Commit,
    Cancel,
}

/// Mutation produced by a commit.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitAction {
    /// Write (or with `None`, remove) the segment starting at `date`.
    Timesegment { variable: VariableId, date: Month, segment: Option<TimeSegment> },
    /// Write (or with `None`, remove) the actual at `date`.
    Actual { variable: VariableId, date: Month, value: Option<f64> },
    /// Set sub-category `name` to `percent` in the breakdown at `date`.
    Subframe { variable: VariableId, date: Month, name: String, percent: f64 },
}

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Text shown for a value in an editor.
pub fn format_value(value: f64, kind: VariableType, decimals: u32) -> String {
    match kind {
        VariableType::Integer => format!("{}", value.round()),
        _ => format!("{}", round_to(value, decimals)),
    }
}

/// Parse editor/paste text: thousands separators stripped, whitespace trimmed.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An open editor and the cell it edits.
#[derive(Clone, Debug, PartialEq)]
pub struct EditSession {
    pub coord: Coordinate,
    pub variable: VariableId,
    pub kind: VariableType,
    pub date: Month,
    /// Sub-category name, for percentage editors.
    pub sub_name: Option<String>,
    pub editor: CellEditor,
    /// Segment in effect when the editor opened.
    original_segment: Option<TimeSegment>,
    /// True if `original_segment` starts at `date`.
    segment_starts_here: bool,
    original_actual: Option<f64>,
    /// Percentage shown when the editor opened.
    original_percent: Option<f64>,
    past: bool,
}

impl EditSession {
    /// Open the editor for `coord` in `projection`.
    ///
    /// Returns `None` when the cell cannot be edited: breakdown frame rows,
    /// `=` on a subframe, or a coordinate with no frame.
    pub fn open(
        projection: &Projection,
        coord: Coordinate,
        trigger: OpenTrigger,
        today: Month,
        settings: &Settings,
    ) -> Option<Self> {
        let frame = projection.frame(coord.col)?;
        let var = &projection.variable;
        let forwarded = match trigger {
            OpenTrigger::Key(c) => Some(c),
            _ => None,
        };

        let mut session = Self {
            coord,
            variable: var.id.clone(),
            kind: var.kind,
            date: frame.date,
            sub_name: None,
            editor: CellEditor::Actual { input: TextInput::default() },
            original_segment: frame.time_segment.clone(),
            segment_starts_here: frame.has_segment_starting_here(),
            original_actual: frame.actual_value,
            original_percent: None,
            past: frame.date.is_past(today),
        };

        match coord.row {
            RowRef::SubFrame { sub_index, .. } => {
                if forwarded == Some('=') {
                    return None;
                }
                let name = projection.subframe_names.get(sub_index)?.clone();
                let value = frame.sub_frame(&name).map(|sf| sf.value).unwrap_or(0.0);
                let percent = round_to(value * 100.0, settings.breakdown_decimals);
                let text = match forwarded {
                    Some(c) => c.to_string(),
                    None => format!("{}", percent),
                };
                session.sub_name = Some(name);
                session.original_percent = Some(percent);
                session.editor = CellEditor::Percentage { input: TextInput::new(text) };
            }
            RowRef::Frame { .. } => {
                if var.is_breakdown() {
                    return None;
                }
                session.editor = match forwarded {
                    Some('=') => CellEditor::Timesegment {
                        mode: SegmentMode::Expression,
                        input: TextInput::default(),
                    },
                    Some(c) if session.past => CellEditor::Actual { input: TextInput::new(c.to_string()) },
                    Some(c) => CellEditor::Timesegment {
                        mode: SegmentMode::Basic,
                        input: TextInput::new(c.to_string()),
                    },
                    None if session.past => CellEditor::Actual {
                        input: TextInput::new(
                            frame
                                .actual_value
                                .map(|v| format_value(v, var.kind, settings.variable_decimals))
                                .unwrap_or_default(),
                        ),
                    },
                    None => session.segment_editor(settings),
                };
            }
        }

        Some(session)
    }

    /// Time segment editor prefilled from the segment in effect.
    fn segment_editor(&self, settings: &Settings) -> CellEditor {
        match self.original_segment.as_ref().map(|s| &s.method) {
            Some(SegmentMethod::Expression { expression }) => CellEditor::Timesegment {
                mode: SegmentMode::Expression,
                input: TextInput::new(expression.text.clone()),
            },
            Some(SegmentMethod::Basic { value }) => CellEditor::Timesegment {
                mode: SegmentMode::Basic,
                input: TextInput::new(format_value(*value, self.kind, settings.variable_decimals)),
            },
            _ => CellEditor::Timesegment { mode: SegmentMode::Basic, input: TextInput::default() },
        }
    }

    /// True for past frames, whose editor can switch between actual and projected.
    pub fn can_toggle(&self) -> bool {
        self.past && self.sub_name.is_none()
    }

    /// Switch a past frame's editor between the actual value and the time segment.
    pub fn toggle_target(&mut self, settings: &Settings) -> bool {
        if !self.can_toggle() {
            return false;
        }
        self.editor = match self.editor {
            CellEditor::Actual { .. } => self.segment_editor(settings),
            _ => CellEditor::Actual {
                input: TextInput::new(
                    self.original_actual
                        .map(|v| format_value(v, self.kind, settings.variable_decimals))
                        .unwrap_or_default(),
                ),
            },
        };
        true
    }

    /// Switch the time segment editor between constant and expression,
    /// carrying the text across.
    pub fn set_segment_mode(&mut self, new_mode: SegmentMode) -> bool {
        match &mut self.editor {
            CellEditor::Timesegment { mode, .. } => {
                *mode = new_mode;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> &str {
        self.editor.input().text()
    }

    /// Feed one key to the editor.
    pub fn handle_key(&mut self, input: KeyInput) -> EditorAction {
        let is_actual = matches!(self.editor, CellEditor::Actual { .. });
        match input.key {
            Key::Escape => EditorAction::Cancel,
            Key::Enter | Key::Tab => EditorAction::Commit,
            Key::Up | Key::Down | Key::Left | Key::Right if is_actual => EditorAction::Commit,
            Key::Left => {
                self.editor.input_mut().move_left();
                EditorAction::Continue
            }
            Key::Right => {
                self.editor.input_mut().move_right();
                EditorAction::Continue
            }
            Key::Home => {
                self.editor.input_mut().home();
                EditorAction::Continue
            }
            Key::End => {
                self.editor.input_mut().end();
                EditorAction::Continue
            }
            Key::Backspace => {
                self.editor.input_mut().backspace();
                EditorAction::Continue
            }
            Key::Delete => {
                self.editor.input_mut().delete();
                EditorAction::Continue
            }
            Key::Char(c) if !input.primary && self.editor.accepts(c) => {
                self.editor.input_mut().insert(c);
                EditorAction::Continue
            }
            _ => EditorAction::Continue,
        }
    }

    /// Turn the editor content into a mutation.
    ///
    /// `Ok(None)` means nothing changed and the editor should just close.
    /// An error leaves the session untouched so the user can correct it.
    pub fn commit(
        &self,
        variables: &[Variable],
        settings: &Settings,
    ) -> Result<Option<CommitAction>, ValidationError> {
        let text = self.text().trim();
        match &self.editor {
            CellEditor::Timesegment { mode: SegmentMode::Basic, .. } => {
                if text.is_empty() {
                    return Ok(self.segment_starts_here.then(|| CommitAction::Timesegment {
                        variable: self.variable.clone(),
                        date: self.date,
                        segment: None,
                    }));
                }
                let mut value = parse_number(text)
                    .ok_or_else(|| ValidationError::InvalidNumber(text.to_string()))?;
                if self.kind == VariableType::Integer {
                    value = value.round();
                }
                let unchanged = self
                    .original_segment
                    .as_ref()
                    .and_then(TimeSegment::basic_value)
                    .is_some_and(|orig| self.same_value(orig, value, settings));
                if unchanged {
                    return Ok(None);
                }
                Ok(Some(CommitAction::Timesegment {
                    variable: self.variable.clone(),
                    date: self.date,
                    segment: Some(TimeSegment::basic(self.date, value)),
                }))
            }
            CellEditor::Timesegment { mode: SegmentMode::Expression, .. } => {
                let expression = expr::parse_expression(text, variables)?;
                let unchanged = self
                    .original_segment
                    .as_ref()
                    .and_then(TimeSegment::as_expression)
                    .is_some_and(|orig| orig.text == expression.text);
                if unchanged {
                    return Ok(None);
                }
                Ok(Some(CommitAction::Timesegment {
                    variable: self.variable.clone(),
                    date: self.date,
                    segment: Some(TimeSegment::expression(self.date, expression)),
                }))
            }
            CellEditor::Actual { .. } => {
                if text.is_empty() {
                    return Ok(self.original_actual.map(|_| CommitAction::Actual {
                        variable: self.variable.clone(),
                        date: self.date,
                        value: None,
                    }));
                }
                let value = parse_number(text)
                    .ok_or_else(|| ValidationError::InvalidNumber(text.to_string()))?;
                if self
                    .original_actual
                    .is_some_and(|orig| self.same_value(orig, value, settings))
                {
                    return Ok(None);
                }
                Ok(Some(CommitAction::Actual {
                    variable: self.variable.clone(),
                    date: self.date,
                    value: Some(value),
                }))
            }
            CellEditor::Percentage { .. } => {
                if text.is_empty() {
                    return Ok(None);
                }
                let percent = parse_number(text)
                    .ok_or_else(|| ValidationError::InvalidNumber(text.to_string()))?;
                if self.original_percent == Some(round_to(percent, settings.breakdown_decimals)) {
                    return Ok(None);
                }
                Ok(Some(CommitAction::Subframe {
                    variable: self.variable.clone(),
                    date: self.date,
                    name: self.sub_name.clone().unwrap_or_default(),
                    percent,
                }))
            }
        }
    }

    fn same_value(&self, original: f64, value: f64, settings: &Settings) -> bool {
        match self.kind {
            VariableType::Integer => original.round() == value.round(),
            _ => {
                round_to(original, settings.variable_decimals)
                    == round_to(value, settings.variable_decimals)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{Frame, SubFrame};

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn revenue(frame: Frame) -> Projection {
        Projection::new(Variable::new("v1", "Revenue", VariableType::Real), vec![frame])
    }

    fn type_keys(session: &mut EditSession, text: &str) {
        for c in text.chars() {
            session.handle_key(KeyInput::char(c));
        }
    }

    #[test]
    fn test_text_input_caret() {
        let mut input = TextInput::new("12");
        input.move_left();
        input.insert('5');
        assert_eq!(input.text(), "152");
        input.home();
        input.delete();
        assert_eq!(input.text(), "52");
        input.end();
        input.backspace();
        assert_eq!(input.text(), "5");
        input.move_right();
        assert_eq!(input.caret(), 1);
    }

    #[test]
    fn test_digit_opens_prefilled_basic() {
        let proj = revenue(Frame::new(m("2024-01")));
        let session = EditSession::open(
            &proj,
            Coordinate::frame(0, 0),
            OpenTrigger::Key('5'),
            m("2024-01"),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(session.text(), "5");
        assert!(matches!(session.editor, CellEditor::Timesegment { mode: SegmentMode::Basic, .. }));

        let action = session.commit(&[proj.variable.clone()], &Settings::default()).unwrap();
        assert_eq!(
            action,
            Some(CommitAction::Timesegment {
                variable: VariableId::new("v1"),
                date: m("2024-01"),
                segment: Some(TimeSegment::basic(m("2024-01"), 5.0)),
            })
        );
    }

    #[test]
    fn test_equals_opens_expression() {
        let proj = revenue(Frame::new(m("2023-06")));
        let mut session = EditSession::open(
            &proj,
            Coordinate::frame(0, 0),
            OpenTrigger::Key('='),
            m("2024-01"),
            &Settings::default(),
        )
        .unwrap();
        assert!(matches!(session.editor, CellEditor::Timesegment { mode: SegmentMode::Expression, .. }));
        type_keys(&mut session, "Revenue * 2");
        let action = session.commit(&[proj.variable.clone()], &Settings::default()).unwrap();
        match action {
            Some(CommitAction::Timesegment { segment: Some(seg), .. }) => {
                assert_eq!(seg.as_expression().unwrap().text, "Revenue * 2");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_past_frame_opens_actual_and_toggles() {
        let mut frame = Frame::new(m("2023-12"));
        frame.actual_value = Some(4.0);
        frame.time_segment = Some(TimeSegment::basic(m("2023-12"), 9.0));
        let proj = revenue(frame);
        let settings = Settings::default();
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &settings).unwrap();
        assert!(matches!(session.editor, CellEditor::Actual { .. }));
        assert_eq!(session.text(), "4");

        assert!(session.toggle_target(&settings));
        assert!(matches!(session.editor, CellEditor::Timesegment { .. }));
        assert_eq!(session.text(), "9");
    }

    #[test]
    fn test_actual_editor_commits_on_arrows() {
        let proj = revenue(Frame::new(m("2023-12")));
        let mut session = EditSession::open(
            &proj,
            Coordinate::frame(0, 0),
            OpenTrigger::Key('7'),
            m("2024-01"),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(session.handle_key(KeyInput::plain(Key::Down)), EditorAction::Commit);

        let mut frame = Frame::new(m("2024-02"));
        frame.time_segment = Some(TimeSegment::basic(m("2024-02"), 1.0));
        let proj = revenue(frame);
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &Settings::default())
                .unwrap();
        assert_eq!(session.handle_key(KeyInput::plain(Key::Down)), EditorAction::Continue);
        assert_eq!(session.handle_key(KeyInput::plain(Key::Left)), EditorAction::Continue);
        assert_eq!(session.editor.input().caret(), 0);
        assert_eq!(session.handle_key(KeyInput::plain(Key::Escape)), EditorAction::Cancel);
    }

    #[test]
    fn test_unchanged_commit_is_noop() {
        let mut frame = Frame::new(m("2024-02"));
        frame.time_segment = Some(TimeSegment::basic(m("2024-01"), 5.004));
        let proj = revenue(frame);
        let settings = Settings::default();
        let session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &settings).unwrap();
        assert_eq!(session.text(), "5");
        assert_eq!(session.commit(&[], &settings).unwrap(), None);
    }

    #[test]
    fn test_empty_basic_deletes_only_existing() {
        let settings = Settings::default();
        let proj = revenue(Frame::new(m("2024-02")));
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &settings).unwrap();
        session.handle_key(KeyInput::plain(Key::Backspace));
        assert_eq!(session.commit(&[], &settings).unwrap(), None);

        let mut frame = Frame::new(m("2024-02"));
        frame.time_segment = Some(TimeSegment::basic(m("2024-02"), 3.0));
        let proj = revenue(frame);
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &settings).unwrap();
        session.handle_key(KeyInput::plain(Key::Backspace));
        assert_eq!(
            session.commit(&[], &settings).unwrap(),
            Some(CommitAction::Timesegment { variable: VariableId::new("v1"), date: m("2024-02"), segment: None })
        );
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let settings = Settings::default();
        let proj = revenue(Frame::new(m("2024-02")));
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Key('='), m("2024-01"), &settings).unwrap();
        type_keys(&mut session, "Revenue +");
        assert!(matches!(session.commit(&[], &settings), Err(ValidationError::InvalidExpression(_))));

        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Key('1'), m("2024-01"), &settings).unwrap();
        type_keys(&mut session, "-");
        assert_eq!(
            session.commit(&[], &settings),
            Err(ValidationError::InvalidNumber("1-".into()))
        );
    }

    #[test]
    fn test_integer_values_round() {
        let settings = Settings::default();
        let proj = Projection::new(
            Variable::new("u", "Units", VariableType::Integer),
            vec![Frame::new(m("2024-02"))],
        );
        let mut session =
            EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Key('2'), m("2024-01"), &settings).unwrap();
        type_keys(&mut session, ".6");
        match session.commit(&[], &settings).unwrap() {
            Some(CommitAction::Timesegment { segment: Some(seg), .. }) => assert_eq!(seg.basic_value(), Some(3.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_percentage_editor() {
        let settings = Settings::default();
        let mut frame = Frame::new(m("2024-02"));
        frame.sub_frames = vec![
            SubFrame { name: "East".into(), value: 0.4 },
            SubFrame { name: "West".into(), value: 0.6 },
        ];
        let proj = Projection::new(Variable::new("r", "Regions", VariableType::Breakdown), vec![frame])
            .with_expanded(true);

        assert!(EditSession::open(&proj, Coordinate::frame(0, 0), OpenTrigger::Enter, m("2024-01"), &settings).is_none());
        assert!(EditSession::open(&proj, Coordinate::sub_frame(0, 1, 0), OpenTrigger::Key('='), m("2024-01"), &settings)
            .is_none());

        let mut session =
            EditSession::open(&proj, Coordinate::sub_frame(0, 1, 0), OpenTrigger::Enter, m("2024-01"), &settings)
                .unwrap();
        assert_eq!(session.text(), "60");
        assert_eq!(session.commit(&[], &settings).unwrap(), None);

        session.handle_key(KeyInput::plain(Key::Backspace));
        session.handle_key(KeyInput::plain(Key::Backspace));
        type_keys(&mut session, "75");
        assert_eq!(
            session.commit(&[], &settings).unwrap(),
            Some(CommitAction::Subframe {
                variable: VariableId::new("r"),
                date: m("2024-02"),
                name: "West".into(),
                percent: 75.0,
            })
        );
    }
}
