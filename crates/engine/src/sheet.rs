//! The forecast sheet controller.
//!
//! `ForecastSheet` ties the pieces together: it owns the selection, the
//! open editor, any blocking prompt and the edit history, and it talks to
//! the store only through `SheetStore`. Every mutation goes through
//! `dispatch_update`, which writes the store, records history, raises
//! events and re-projects while keeping the selected cell anchored to the
//! same variable and month.

use std::collections::HashSet;

use forecast_config::Settings;
use forecast_core::{
    validate_variable_name, Breakdown, Month, MonthRange, Projection, TimeSegment, Variable,
    VariableId, VariableType,
};

use crate::editing::{CommitAction, EditSession, EditorAction, OpenTrigger, SegmentMode};
use crate::error::SheetError;
use crate::events::{
    ActualChange, EventCollector, SheetEvent, SubframeChange, TimesegmentChange,
};
use crate::expr;
use crate::grid::{Coordinate, GridModel, RowRef};
use crate::history::{History, HistoryEntry, HistoryKind};
use crate::keys::{Key, KeyInput};
use crate::navigation::{navigate, NavCommand};
use crate::paste::{apply_paste, parse_paste, PasteTarget};
use crate::projection::{CarryForwardProjector, Projector};
use crate::selection::SelectionContext;
use crate::store::{MutationOrigin, SheetStore};
use crate::viewport::{ensure_visible, FocusManager, ScrollIntoView};

// ============================================================================
// Context and outcomes
// ============================================================================

/// What the host tells the sheet when opening it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SheetContext {
    /// Current month. Months before it are "past".
    pub today: Month,
    pub range: MonthRange,
    /// Viewing a release: every mutation is refused.
    pub readonly: bool,
}

impl SheetContext {
    pub fn new(today: Month, range: MonthRange) -> Self {
        Self { today, range, readonly: false }
    }

    /// Default range around `today`, from settings.
    pub fn from_settings(today: Month, settings: &Settings) -> Self {
        Self::new(
            today,
            MonthRange::around(today, settings.default_months_back, settings.default_months_ahead),
        )
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// Answer to a blocking prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Actual,
    Projected,
    /// Delete prompt only.
    Both,
}

/// Question the sheet is waiting on. Everything but the answer (or Escape)
/// is ignored while one is pending.
#[derive(Clone, Debug, PartialEq)]
pub enum Prompt {
    /// Delete on a past cell holding an actual and a segment starting there.
    DeleteChoice { coord: Coordinate },
    /// Paste starting in a past month: actuals or projections?
    PasteTarget { coord: Coordinate, values: Vec<f64> },
}

/// What a key press (or an equivalent call) did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing happened (no selection, non-editable cell, read-only...).
    Ignored,
    Moved(Coordinate),
    EditorOpened,
    /// The open editor consumed the key.
    EditorInput,
    /// The editor closed after issuing one mutation.
    Committed,
    /// The editor or prompt closed without a mutation.
    Closed,
    Prompted,
    /// A mutation was issued without an editor (delete, paste, undo...).
    Mutated,
}

/// Selected cell by identity, so it survives a re-projection.
struct Anchor {
    variable: VariableId,
    sub_name: Option<String>,
    col: usize,
}

fn nav_command(input: KeyInput) -> Option<NavCommand> {
    if input.primary {
        return None;
    }
    Some(match input.key {
        Key::Up => NavCommand::Up,
        Key::Down => NavCommand::Down,
        Key::Left => NavCommand::Left,
        Key::Right => NavCommand::Right,
        Key::PageUp => NavCommand::PageUp,
        Key::PageDown => NavCommand::PageDown,
        Key::Tab if input.shift => NavCommand::BackTab,
        Key::Tab => NavCommand::Tab,
        _ => return None,
    })
}

// ============================================================================
// Sheet
// ============================================================================

pub struct ForecastSheet<S: SheetStore, P: Projector = CarryForwardProjector> {
    store: S,
    projector: P,
    settings: Settings,
    today: Month,
    range: MonthRange,
    readonly: bool,
    /// Cleared by a sync conflict until `reload`.
    editing_enabled: bool,
    version: u64,

    variables: Vec<Variable>,
    projections: Vec<Projection>,
    expanded: HashSet<VariableId>,
    hidden: HashSet<VariableId>,
    grid: GridModel,

    selection: SelectionContext,
    session: Option<EditSession>,
    prompt: Option<Prompt>,
    history: History,
    events: EventCollector,

    scroller: Option<Box<dyn ScrollIntoView>>,
    focus: Option<Box<dyn FocusManager>>,
}

impl<S: SheetStore> ForecastSheet<S> {
    pub fn new(store: S, variables: Vec<Variable>, context: SheetContext, settings: Settings) -> Self {
        Self::with_projector(store, CarryForwardProjector, variables, context, settings)
    }
}

impl<S: SheetStore, P: Projector> ForecastSheet<S, P> {
    pub fn with_projector(
        store: S,
        projector: P,
        variables: Vec<Variable>,
        context: SheetContext,
        settings: Settings,
    ) -> Self {
        let history = History::with_capacity(settings.history_max_entries);
        let version = store.version();
        let mut sheet = Self {
            store,
            projector,
            settings,
            today: context.today,
            range: context.range,
            readonly: context.readonly,
            editing_enabled: true,
            version,
            variables,
            projections: Vec::new(),
            expanded: HashSet::new(),
            hidden: HashSet::new(),
            grid: GridModel::default(),
            selection: SelectionContext::new(),
            session: None,
            prompt: None,
            history,
            events: EventCollector::new(),
            scroller: None,
            focus: None,
        };
        sheet.reproject(None);
        sheet
    }

    pub fn with_scroller(mut self, scroller: Box<dyn ScrollIntoView>) -> Self {
        self.scroller = Some(scroller);
        self
    }

    pub fn with_focus(mut self, focus: Box<dyn FocusManager>) -> Self {
        self.focus = Some(focus);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn today(&self) -> Month {
        self.today
    }

    pub fn range(&self) -> MonthRange {
        self.range
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// False when read-only or after a sync conflict.
    pub fn is_editable(&self) -> bool {
        !self.readonly && self.editing_enabled
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| &v.id == id)
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn selection(&self) -> Option<Coordinate> {
        self.selection.current()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn events(&self) -> &[SheetEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<SheetEvent> {
        self.events.drain()
    }

    /// Projection rendered on `row`.
    pub fn projection_at(&self, row: RowRef) -> Option<&Projection> {
        let grid_row = self.grid.row(row.frame_index())?;
        self.projections.get(grid_row.projection)
    }

    fn ensure_editable(&self) -> Result<(), SheetError> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(SheetError::ReadOnly)
        }
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Expand or collapse a breakdown variable's subframe rows.
    /// Returns the new state, or `None` for non-breakdown variables.
    pub fn toggle_expanded(&mut self, id: &VariableId) -> Option<bool> {
        let expanded = !self.expanded.contains(id);
        self.set_expanded(id, expanded).then_some(expanded)
    }

    pub fn set_expanded(&mut self, id: &VariableId, expanded: bool) -> bool {
        if !self.variable(id).is_some_and(Variable::is_breakdown) {
            return false;
        }
        if expanded {
            self.expanded.insert(id.clone());
        } else {
            self.expanded.remove(id);
        }
        let anchor = self.selection_anchor();
        self.reproject(anchor);
        true
    }

    pub fn set_hidden(&mut self, id: &VariableId, hidden: bool) {
        if hidden {
            self.hidden.insert(id.clone());
        } else {
            self.hidden.remove(id);
        }
        let anchor = self.selection_anchor();
        self.reproject(anchor);
    }

    pub fn set_range(&mut self, range: MonthRange) {
        let anchor = self.selection_anchor();
        self.range = range;
        self.reproject(anchor);
    }

    /// Take projections computed by the host at store `version`.
    ///
    /// An older version than the last one seen means the sheet was changed
    /// elsewhere: editing is disabled until `reload`.
    pub fn refresh(&mut self, projections: Vec<Projection>, version: u64) -> Result<(), SheetError> {
        if version < self.version {
            log::warn!(
                "Store version went backwards ({} < {}); disabling editing",
                version,
                self.version
            );
            self.editing_enabled = false;
            self.prompt = None;
            self.close_editor();
            return Err(SheetError::Sync { local: self.version, remote: version });
        }

        let anchor = self.selection_anchor();
        self.version = version;
        self.variables = projections.iter().map(|p| p.variable.clone()).collect();
        self.expanded = projections
            .iter()
            .filter(|p| p.is_expanded)
            .map(|p| p.variable.id.clone())
            .collect();
        self.hidden = projections
            .iter()
            .filter(|p| !p.display)
            .map(|p| p.variable.id.clone())
            .collect();
        self.install(projections, anchor);
        Ok(())
    }

    /// Start over from freshly loaded variables; re-enables editing.
    pub fn reload(&mut self, variables: Vec<Variable>, version: u64) {
        log::info!("Reloading sheet at version {}", version);
        self.variables = variables;
        self.version = version;
        self.editing_enabled = true;
        self.prompt = None;
        self.close_editor();
        self.history.clear();
        let anchor = self.selection_anchor();
        self.reproject(anchor);
    }

    fn reproject(&mut self, anchor: Option<Anchor>) {
        let projections = self.projector.project(&self.variables, &self.range);
        self.install(projections, anchor);
    }

    fn install(&mut self, projections: Vec<Projection>, anchor: Option<Anchor>) {
        self.projections = projections
            .into_iter()
            .map(|p| {
                let expanded = self.expanded.contains(&p.variable.id);
                let display = !self.hidden.contains(&p.variable.id);
                p.with_expanded(expanded).with_display(display)
            })
            .collect();
        self.grid = GridModel::build(&self.projections, self.range.len());
        self.restore_anchor(anchor);
    }

    fn selection_anchor(&self) -> Option<Anchor> {
        let coord = self.selection.current()?;
        let projection = self.projection_at(coord.row)?;
        let sub_name = match coord.row {
            RowRef::SubFrame { sub_index, .. } => Some(projection.subframe_names.get(sub_index)?.clone()),
            RowRef::Frame { .. } => None,
        };
        Some(Anchor { variable: projection.variable.id.clone(), sub_name, col: coord.col })
    }

    fn restore_anchor(&mut self, anchor: Option<Anchor>) {
        self.selection.clear();
        let Some(anchor) = anchor else {
            return;
        };
        let Some(index) = self.grid.frame_index_of(&anchor.variable) else {
            return;
        };
        let sub_index = anchor.sub_name.as_ref().and_then(|name| {
            self.projection_at(RowRef::Frame { index })?
                .subframe_names
                .iter()
                .position(|n| n == name)
        });
        if let Some(sub_index) = sub_index {
            if self.selection.select(&self.grid, Coordinate::sub_frame(index, sub_index, anchor.col)) {
                return;
            }
        }
        self.selection.select(&self.grid, Coordinate::frame(index, anchor.col));
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Select `coord`. An open editor is committed first; if that commit is
    /// rejected the editor stays open and the selection does not move.
    pub fn select(&mut self, coord: Coordinate) -> Result<bool, SheetError> {
        if self.session.is_some() {
            self.commit_edit()?;
        }
        if !self.selection.select(&self.grid, coord) {
            log::debug!("Ignoring selection outside the grid: {:?}", coord);
            return Ok(false);
        }
        self.scroll_to_selection();
        Ok(true)
    }

    /// Select the frame cell of `id` at `month`.
    pub fn select_cell(&mut self, id: &VariableId, month: Month) -> Result<bool, SheetError> {
        let (Some(index), Some(col)) = (self.grid.frame_index_of(id), self.range.index_of(month)) else {
            return Ok(false);
        };
        self.select(Coordinate::frame(index, col))
    }

    /// Select sub-category `name` of `id` at `month`.
    pub fn select_sub_frame(&mut self, id: &VariableId, name: &str, month: Month) -> Result<bool, SheetError> {
        let (Some(index), Some(col)) = (self.grid.frame_index_of(id), self.range.index_of(month)) else {
            return Ok(false);
        };
        let Some(sub_index) = self
            .projection_at(RowRef::Frame { index })
            .and_then(|p| p.subframe_names.iter().position(|n| n == name))
        else {
            return Ok(false);
        };
        self.select(Coordinate::sub_frame(index, sub_index, col))
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn move_selection(&mut self, cmd: NavCommand) -> KeyOutcome {
        match navigate(&self.grid, self.selection.current(), cmd) {
            Some(to) if self.selection.select(&self.grid, to) => {
                log::debug!("{:?} -> {:?}", cmd, to);
                self.scroll_to_selection();
                KeyOutcome::Moved(to)
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn scroll_to_selection(&mut self) {
        let Some(coord) = self.selection.current() else {
            return;
        };
        let Some(row) = self.grid.display_row(coord.row) else {
            return;
        };
        if let Some(scroller) = self.scroller.as_deref_mut() {
            ensure_visible(scroller, row, coord.col);
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    pub fn handle_key(&mut self, input: KeyInput) -> Result<KeyOutcome, SheetError> {
        if self.prompt.is_some() {
            if input.key == Key::Escape {
                self.dismiss_prompt();
                return Ok(KeyOutcome::Closed);
            }
            return Ok(KeyOutcome::Ignored);
        }

        if self.session.is_some() {
            return self.editor_key(input);
        }

        if let Some(cmd) = nav_command(input) {
            return Ok(self.move_selection(cmd));
        }

        if !self.is_editable() {
            return Ok(KeyOutcome::Ignored);
        }

        if input.is_undo() {
            return Ok(match self.undo()? {
                Some(_) => KeyOutcome::Mutated,
                None => KeyOutcome::Ignored,
            });
        }
        if input.is_redo() {
            return Ok(match self.redo()? {
                Some(_) => KeyOutcome::Mutated,
                None => KeyOutcome::Ignored,
            });
        }
        if input.primary {
            return Ok(KeyOutcome::Ignored);
        }

        match input.key {
            Key::Enter => Ok(self.open_editor(OpenTrigger::Enter)),
            Key::Char(c) if c.is_ascii_digit() || c == '=' => Ok(self.open_editor(OpenTrigger::Key(c))),
            Key::Delete | Key::Backspace => self.delete_selection(),
            _ => Ok(KeyOutcome::Ignored),
        }
    }

    fn editor_key(&mut self, input: KeyInput) -> Result<KeyOutcome, SheetError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(KeyOutcome::Ignored);
        };
        match session.handle_key(input) {
            EditorAction::Continue => Ok(KeyOutcome::EditorInput),
            EditorAction::Cancel => {
                self.cancel_edit();
                Ok(KeyOutcome::Closed)
            }
            EditorAction::Commit => {
                let outcome = self.commit_edit()?;
                // Arrows and Tab also move once the value is in.
                if let Some(cmd) = nav_command(input) {
                    self.move_selection(cmd);
                }
                Ok(outcome)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Open the editor on the selected cell.
    pub fn open_editor(&mut self, trigger: OpenTrigger) -> KeyOutcome {
        if !self.is_editable() || self.session.is_some() {
            return KeyOutcome::Ignored;
        }
        let Some(coord) = self.selection.current() else {
            log::debug!("No selection; not opening an editor");
            return KeyOutcome::Ignored;
        };
        let Some(projection) = self.projection_at(coord.row) else {
            return KeyOutcome::Ignored;
        };
        let Some(session) = EditSession::open(projection, coord, trigger, self.today, &self.settings) else {
            log::debug!("Cell {:?} of '{}' is not editable", coord, projection.variable.title);
            return KeyOutcome::Ignored;
        };

        log::debug!("Opened {:?} on {:?}", session.editor, coord);
        self.session = Some(session);
        if let Some(focus) = self.focus.as_deref_mut() {
            focus.focus_editor();
        }
        KeyOutcome::EditorOpened
    }

    /// Select `coord` and open its editor.
    pub fn double_click(&mut self, coord: Coordinate) -> Result<KeyOutcome, SheetError> {
        if !self.select(coord)? {
            return Ok(KeyOutcome::Ignored);
        }
        Ok(self.open_editor(OpenTrigger::DoubleClick))
    }

    /// Focus left the editor: commit it.
    pub fn click_outside(&mut self) -> Result<KeyOutcome, SheetError> {
        if self.session.is_none() {
            return Ok(KeyOutcome::Ignored);
        }
        self.commit_edit()
    }

    /// Commit the open editor. A rejected value leaves it open.
    pub fn commit_edit(&mut self) -> Result<KeyOutcome, SheetError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(KeyOutcome::Ignored);
        };
        let action = match session.commit(&self.variables, &self.settings) {
            Ok(action) => action,
            Err(e) => {
                log::warn!("Rejected edit '{}': {}", session.text(), e);
                return Err(e.into());
            }
        };
        self.close_editor();

        match action {
            None => Ok(KeyOutcome::Closed),
            Some(action) => {
                self.apply_commit(action)?;
                Ok(KeyOutcome::Committed)
            }
        }
    }

    /// Close the editor without writing anything.
    pub fn cancel_edit(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        log::debug!("Edit cancelled");
        self.close_editor();
        true
    }

    /// Switch a past frame's editor between its actual and projected value.
    pub fn toggle_editor_target(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => session.toggle_target(&self.settings),
            None => false,
        }
    }

    pub fn set_segment_mode(&mut self, mode: SegmentMode) -> bool {
        self.session.as_mut().is_some_and(|s| s.set_segment_mode(mode))
    }

    /// Type `text` into the open editor, one char at a time.
    pub fn type_text(&mut self, text: &str) -> Result<KeyOutcome, SheetError> {
        let mut outcome = KeyOutcome::Ignored;
        for c in text.chars() {
            outcome = self.handle_key(KeyInput::char(c))?;
        }
        Ok(outcome)
    }

    fn close_editor(&mut self) {
        if self.session.take().is_some() {
            if let Some(focus) = self.focus.as_deref_mut() {
                focus.focus_grid();
            }
        }
    }

    fn apply_commit(&mut self, action: CommitAction) -> Result<bool, SheetError> {
        match action {
            CommitAction::Timesegment { variable, date, segment } => {
                self.upsert_timesegment(&variable, date, segment)
            }
            CommitAction::Actual { variable, date, value } => self.upsert_actual_value(&variable, date, value),
            CommitAction::Subframe { variable, date, name, percent } => {
                self.upsert_subframe(&variable, date, &name, percent)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Delete and prompts
    // ------------------------------------------------------------------------

    fn delete_selection(&mut self) -> Result<KeyOutcome, SheetError> {
        let Some(coord) = self.selection.current() else {
            return Ok(KeyOutcome::Ignored);
        };
        let Some(projection) = self.projection_at(coord.row) else {
            return Ok(KeyOutcome::Ignored);
        };
        let Some(date) = projection.frame(coord.col).map(|f| f.date) else {
            return Ok(KeyOutcome::Ignored);
        };
        let var = &projection.variable;
        let id = var.id.clone();
        let segment_here = var.time_segment_at(date).is_some();
        let has_actual = var.actual_at(date).is_some();
        let breakdown = var.is_breakdown();

        if coord.row.is_sub_frame() {
            if !segment_here {
                return Ok(KeyOutcome::Ignored);
            }
            self.upsert_timesegment(&id, date, None)?;
            return Ok(KeyOutcome::Mutated);
        }
        if breakdown {
            return Ok(KeyOutcome::Ignored);
        }

        let past = date.is_past(self.today);
        if past && has_actual && segment_here {
            log::debug!("Asking which value to delete at {}", date);
            self.prompt = Some(Prompt::DeleteChoice { coord });
            Ok(KeyOutcome::Prompted)
        } else if past && has_actual {
            self.upsert_actual_value(&id, date, None)?;
            Ok(KeyOutcome::Mutated)
        } else if segment_here {
            self.upsert_timesegment(&id, date, None)?;
            Ok(KeyOutcome::Mutated)
        } else {
            Ok(KeyOutcome::Ignored)
        }
    }

    /// Answer the pending prompt.
    pub fn choose(&mut self, choice: Choice) -> Result<KeyOutcome, SheetError> {
        let Some(prompt) = self.prompt.take() else {
            return Ok(KeyOutcome::Ignored);
        };
        match (prompt, choice) {
            (Prompt::DeleteChoice { coord }, choice) => self.resolve_delete(coord, choice),
            (Prompt::PasteTarget { coord, values }, Choice::Actual) => {
                self.paste_into(coord, &values, PasteTarget::Actual)
            }
            (Prompt::PasteTarget { coord, values }, Choice::Projected) => {
                self.paste_into(coord, &values, PasteTarget::Projected)
            }
            (prompt @ Prompt::PasteTarget { .. }, Choice::Both) => {
                self.prompt = Some(prompt);
                Ok(KeyOutcome::Ignored)
            }
        }
    }

    pub fn dismiss_prompt(&mut self) -> bool {
        self.prompt.take().is_some()
    }

    fn resolve_delete(&mut self, coord: Coordinate, choice: Choice) -> Result<KeyOutcome, SheetError> {
        let Some(projection) = self.projection_at(coord.row) else {
            return Ok(KeyOutcome::Ignored);
        };
        let Some(date) = projection.frame(coord.col).map(|f| f.date) else {
            return Ok(KeyOutcome::Ignored);
        };
        let id = projection.variable.id.clone();
        let changed = match choice {
            Choice::Actual => self.upsert_actual_value(&id, date, None)?,
            Choice::Projected => self.upsert_timesegment(&id, date, None)?,
            Choice::Both => {
                self.ensure_editable()?;
                let Some(old) = self.variable(&id).cloned() else {
                    return Ok(KeyOutcome::Ignored);
                };
                let mut new = old.clone();
                new.remove_actual(date);
                new.remove_time_segment(date);
                self.events.push(SheetEvent::UpsertActualValue(ActualChange {
                    variable: id.clone(),
                    date,
                    value: None,
                }));
                self.events.push(SheetEvent::UpsertTimesegment(TimesegmentChange {
                    variable: id,
                    date,
                    segment: None,
                }));
                self.dispatch_update(old, new, MutationOrigin::User);
                true
            }
        };
        Ok(if changed { KeyOutcome::Mutated } else { KeyOutcome::Ignored })
    }

    // ------------------------------------------------------------------------
    // Paste
    // ------------------------------------------------------------------------

    /// Paste clipboard text starting at the selected frame cell.
    ///
    /// Nothing is written if any token is not a number. A run starting in a
    /// past month waits for `choose(Actual | Projected)`.
    pub fn paste(&mut self, text: &str) -> Result<KeyOutcome, SheetError> {
        self.ensure_editable()?;
        if self.session.is_some() || self.prompt.is_some() {
            return Ok(KeyOutcome::Ignored);
        }
        let Some(coord) = self.selection.current() else {
            return Ok(KeyOutcome::Ignored);
        };
        if coord.row.is_sub_frame() {
            return Ok(KeyOutcome::Ignored);
        }
        let Some(projection) = self.projection_at(coord.row) else {
            return Ok(KeyOutcome::Ignored);
        };
        if projection.variable.is_breakdown() {
            return Ok(KeyOutcome::Ignored);
        }
        let Some(start) = projection.frame(coord.col).map(|f| f.date) else {
            return Ok(KeyOutcome::Ignored);
        };

        let values = parse_paste(text).map_err(|e| {
            log::warn!("Rejected paste: {}", e);
            SheetError::from(e)
        })?;

        if start.is_past(self.today) {
            self.prompt = Some(Prompt::PasteTarget { coord, values });
            return Ok(KeyOutcome::Prompted);
        }
        self.paste_into(coord, &values, PasteTarget::Projected)
    }

    fn paste_into(&mut self, coord: Coordinate, values: &[f64], target: PasteTarget) -> Result<KeyOutcome, SheetError> {
        self.ensure_editable()?;
        let Some(projection) = self.projection_at(coord.row) else {
            return Ok(KeyOutcome::Ignored);
        };
        let Some(start) = projection.frame(coord.col).map(|f| f.date) else {
            return Ok(KeyOutcome::Ignored);
        };
        let Some(old) = self.variable(&projection.variable.id).cloned() else {
            return Ok(KeyOutcome::Ignored);
        };

        let (new, applied) = apply_paste(&old, start, values, target, self.today, &self.range);
        log::info!(
            "Pasted {} actuals and {} segments into '{}' from {}",
            applied.actuals,
            applied.segments,
            old.title,
            start
        );
        self.events.push(SheetEvent::Paste(applied));
        self.dispatch_update(old, new, MutationOrigin::User);
        Ok(KeyOutcome::Mutated)
    }

    // ------------------------------------------------------------------------
    // Mutation entry points
    // ------------------------------------------------------------------------

    /// Write the segment starting at `date`, or remove it with `None`.
    /// Returns false when there was nothing to change.
    pub fn upsert_timesegment(
        &mut self,
        id: &VariableId,
        date: Month,
        segment: Option<TimeSegment>,
    ) -> Result<bool, SheetError> {
        self.ensure_editable()?;
        let Some(old) = self.variable(id).cloned() else {
            return Ok(false);
        };
        let mut new = old.clone();
        let removed = new.remove_time_segment(date);
        let segment = segment.map(|mut seg| {
            seg.date = date;
            seg
        });
        match &segment {
            Some(seg) => new.upsert_time_segment(seg.clone()),
            None if !removed => return Ok(false),
            None => {}
        }

        self.events.push(SheetEvent::UpsertTimesegment(TimesegmentChange {
            variable: id.clone(),
            date,
            segment,
        }));
        self.dispatch_update(old, new, MutationOrigin::User);
        Ok(true)
    }

    /// Write the actual at `date`, or remove it with `None`.
    pub fn upsert_actual_value(&mut self, id: &VariableId, date: Month, value: Option<f64>) -> Result<bool, SheetError> {
        self.ensure_editable()?;
        let Some(old) = self.variable(id).cloned() else {
            return Ok(false);
        };
        let mut new = old.clone();
        let value = match (value, old.kind) {
            (Some(v), VariableType::Integer) => Some(v.round()),
            (v, _) => v,
        };
        match value {
            Some(v) => new.upsert_actual(date, v),
            None => {
                if !new.remove_actual(date) {
                    return Ok(false);
                }
            }
        }

        self.events.push(SheetEvent::UpsertActualValue(ActualChange {
            variable: id.clone(),
            date,
            value,
        }));
        self.dispatch_update(old, new, MutationOrigin::User);
        Ok(true)
    }

    /// Set sub-category `name` to `percent` for the month at `date`.
    ///
    /// Writes a breakdown segment at `date` holding every sub-category's
    /// current share with the edited one replaced.
    pub fn upsert_subframe(&mut self, id: &VariableId, date: Month, name: &str, percent: f64) -> Result<bool, SheetError> {
        self.ensure_editable()?;
        let Some(old) = self.variable(id).cloned() else {
            return Ok(false);
        };
        if !old.is_breakdown() {
            return Ok(false);
        }

        let mut breakdown: Breakdown = self
            .projections
            .iter()
            .find(|p| &p.variable.id == id)
            .and_then(|p| p.frame_for(date))
            .map(|f| f.sub_frames.iter().map(|sf| (sf.name.clone(), sf.value)).collect())
            .unwrap_or_default();
        breakdown.insert(name.to_string(), percent / 100.0);

        let mut new = old.clone();
        new.upsert_time_segment(TimeSegment::breakdown(date, breakdown));

        self.events.push(SheetEvent::UpsertSubframe(SubframeChange {
            variable: id.clone(),
            date,
            name: name.to_string(),
            percent,
        }));
        self.dispatch_update(old, new, MutationOrigin::User);
        Ok(true)
    }

    /// Replace a whole variable.
    pub fn update_variable(&mut self, variable: Variable) -> Result<bool, SheetError> {
        self.ensure_editable()?;
        let Some(old) = self.variable(&variable.id).cloned() else {
            return Ok(false);
        };
        if old == variable {
            return Ok(false);
        }
        self.dispatch_update(old, variable, MutationOrigin::User);
        Ok(true)
    }

    /// Create an integer variable titled `title`.
    pub fn create_variable(&mut self, title: &str) -> Result<VariableId, SheetError> {
        self.ensure_editable()?;
        validate_variable_name(title, &self.variables, None).map_err(|e| {
            log::warn!("Rejected variable name '{}': {}", title, e);
            SheetError::from(e)
        })?;

        let id = self.next_variable_id();
        let variable = Variable::new(id.as_str(), title, VariableType::Integer);
        let anchor = self.selection_anchor();

        self.store.create_variable(&variable);
        self.history.push_state(HistoryEntry::create(variable.clone()));
        self.events.push(SheetEvent::VariableCreate(variable.clone()));
        log::info!("Created variable '{}' ({})", title, id);

        self.variables.push(variable);
        self.version = self.store.version();
        self.reproject(anchor);
        Ok(id)
    }

    pub fn delete_variable(&mut self, id: &VariableId) -> Result<bool, SheetError> {
        self.ensure_editable()?;
        let Some(pos) = self.variables.iter().position(|v| &v.id == id) else {
            return Ok(false);
        };
        if self.session.as_ref().is_some_and(|s| &s.variable == id) {
            self.close_editor();
        }
        let anchor = self.selection_anchor();
        let variable = self.variables.remove(pos);

        self.store.delete_variable(id);
        log::info!("Deleted variable '{}'", variable.title);
        self.history.push_state(HistoryEntry::delete(variable));
        self.events.push(SheetEvent::DeleteVariable(id.clone()));

        self.expanded.remove(id);
        self.hidden.remove(id);
        self.version = self.store.version();
        self.reproject(anchor);
        Ok(true)
    }

    /// Rename a variable and fix expressions that refer to it by name.
    /// Returns the number of other variables whose expressions changed.
    pub fn update_variable_title(&mut self, id: &VariableId, title: &str) -> Result<usize, SheetError> {
        self.ensure_editable()?;
        let Some(old) = self.variable(id).cloned() else {
            return Ok(0);
        };
        if old.title == title {
            return Ok(0);
        }
        validate_variable_name(title, &self.variables, Some(id)).map_err(|e| {
            log::warn!("Rejected variable name '{}': {}", title, e);
            SheetError::from(e)
        })?;

        let mut renamed = old.clone();
        renamed.title = title.to_string();
        self.events.push(SheetEvent::UpdateVariableTitle {
            id: id.clone(),
            old: old.title.clone(),
            new: title.to_string(),
        });
        self.dispatch_update(old, renamed.clone(), MutationOrigin::User);

        let repaired = expr::repair_references(&self.variables, &renamed);
        let count = repaired.len();
        for new in repaired {
            if let Some(old) = self.variable(&new.id).cloned() {
                self.dispatch_update(old, new, MutationOrigin::ExpressionRepair);
            }
        }
        if count > 0 {
            log::info!("Rewrote expressions in {} variables after renaming to '{}'", count, title);
        }
        Ok(count)
    }

    fn next_variable_id(&self) -> VariableId {
        let mut n = self.variables.len() + 1;
        loop {
            let id = VariableId::new(format!("var-{}", n));
            if self.variable(&id).is_none() {
                return id;
            }
            n += 1;
        }
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    /// Revert the last recorded change. Only edits are replayed; create and
    /// delete entries are stepped over without a mutation.
    pub fn undo(&mut self) -> Result<Option<HistoryEntry>, SheetError> {
        self.ensure_editable()?;
        let Some(entry) = self.history.undo() else {
            return Ok(None);
        };
        self.replay(entry.kind, entry.old.clone());
        Ok(Some(entry))
    }

    /// Re-apply the last undone change.
    pub fn redo(&mut self) -> Result<Option<HistoryEntry>, SheetError> {
        self.ensure_editable()?;
        let Some(entry) = self.history.redo() else {
            return Ok(None);
        };
        self.replay(entry.kind, entry.new.clone());
        Ok(Some(entry))
    }

    fn replay(&mut self, kind: HistoryKind, snapshot: Option<Variable>) {
        if kind != HistoryKind::Edit {
            log::debug!("Not replaying {:?} entry", kind);
            return;
        }
        let Some(target) = snapshot else {
            return;
        };
        let Some(current) = self.variable(&target.id).cloned() else {
            log::warn!("Cannot replay edit of missing variable '{}'", target.title);
            return;
        };
        log::info!("Replaying snapshot of '{}'", target.title);
        self.dispatch_update(current, target, MutationOrigin::HistoryReplay);
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn dispatch_update(&mut self, old: Variable, new: Variable, origin: MutationOrigin) {
        let anchor = self.selection_anchor();

        self.store.update_variable(&new, origin);
        if origin != MutationOrigin::HistoryReplay {
            self.history.push_state(HistoryEntry::edit(old, new.clone()));
        }
        log::info!("Updated '{}' ({:?})", new.title, origin);
        self.events.push(SheetEvent::UpdateVariable(new.clone()));

        match self.variables.iter_mut().find(|v| v.id == new.id) {
            Some(slot) => *slot = new,
            None => self.variables.push(new),
        }
        self.version = self.store.version();
        self.reproject(anchor);
    }
}
