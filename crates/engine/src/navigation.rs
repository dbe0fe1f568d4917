//! Keyboard navigation between grid cells.
//!
//! Horizontal commands only change the column and stop at the edges (Tab
//! does not wrap to the next row). Vertical commands cross between frame
//! and subframe rows:
//!
//! - Down from a frame row enters its first subframe row when expanded,
//!   else the next frame row.
//! - Down from the last subframe row lands on the next projection's first
//!   subframe row when that projection is expanded, else its frame row.
//! - Up from a frame row lands on the previous projection's last subframe
//!   row when that projection is expanded, else its frame row.
//! - Up from the first subframe row lands on the previous projection's last
//!   subframe row when that projection is expanded, else on the frame row
//!   it belongs to.
//!
//! A candidate outside the grid makes the whole command a no-op; there is
//! no clamping or wrapping at the vertical ends.

use crate::grid::{Coordinate, GridModel, RowRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavCommand {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Tab,
    BackTab,
}

impl NavCommand {
    pub const ALL: [NavCommand; 8] = [
        NavCommand::Up,
        NavCommand::Down,
        NavCommand::Left,
        NavCommand::Right,
        NavCommand::PageUp,
        NavCommand::PageDown,
        NavCommand::Tab,
        NavCommand::BackTab,
    ];

    pub fn is_vertical(&self) -> bool {
        matches!(
            self,
            NavCommand::Up | NavCommand::Down | NavCommand::PageUp | NavCommand::PageDown
        )
    }
}

/// Next cell for `cmd` from `from`, or `None` when the command is a no-op.
pub fn navigate(grid: &GridModel, from: Option<Coordinate>, cmd: NavCommand) -> Option<Coordinate> {
    let from = from?;
    if !grid.contains(from) {
        return None;
    }

    let candidate = match cmd {
        NavCommand::Left | NavCommand::BackTab => Coordinate {
            row: from.row,
            col: from.col.checked_sub(1)?,
        },
        NavCommand::Right | NavCommand::Tab => Coordinate { row: from.row, col: from.col + 1 },
        NavCommand::Down | NavCommand::PageDown => Coordinate { row: row_below(grid, from.row)?, col: from.col },
        NavCommand::Up | NavCommand::PageUp => Coordinate { row: row_above(grid, from.row)?, col: from.col },
    };

    grid.contains(candidate).then_some(candidate)
}

/// First subframe row of projection `index` if it has any, else its frame row.
fn entry_from_above(grid: &GridModel, index: usize) -> RowRef {
    if grid.subframe_row_count(index) > 0 {
        RowRef::SubFrame { frame_index: index, sub_index: 0 }
    } else {
        RowRef::Frame { index }
    }
}

/// Last subframe row of projection `index` if it has any, else its frame row.
fn entry_from_below(grid: &GridModel, index: usize) -> RowRef {
    match grid.subframe_row_count(index) {
        0 => RowRef::Frame { index },
        n => RowRef::SubFrame { frame_index: index, sub_index: n - 1 },
    }
}

fn row_below(grid: &GridModel, row: RowRef) -> Option<RowRef> {
    match row {
        RowRef::Frame { index } => {
            if grid.subframe_row_count(index) > 0 {
                Some(RowRef::SubFrame { frame_index: index, sub_index: 0 })
            } else {
                Some(RowRef::Frame { index: index + 1 })
            }
        }
        RowRef::SubFrame { frame_index, sub_index } => {
            if sub_index + 1 < grid.subframe_row_count(frame_index) {
                Some(RowRef::SubFrame { frame_index, sub_index: sub_index + 1 })
            } else if frame_index + 1 < grid.frame_row_count() {
                Some(entry_from_above(grid, frame_index + 1))
            } else {
                None
            }
        }
    }
}

fn row_above(grid: &GridModel, row: RowRef) -> Option<RowRef> {
    match row {
        RowRef::Frame { index } => {
            let prev = index.checked_sub(1)?;
            Some(entry_from_below(grid, prev))
        }
        RowRef::SubFrame { frame_index, sub_index } => {
            if sub_index > 0 {
                return Some(RowRef::SubFrame { frame_index, sub_index: sub_index - 1 });
            }
            match frame_index.checked_sub(1) {
                Some(prev) if grid.subframe_row_count(prev) > 0 => Some(entry_from_below(grid, prev)),
                _ => Some(RowRef::Frame { index: frame_index }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{Frame, Month, Projection, SubFrame, Variable, VariableType};

    fn frames(cols: usize, names: &[&str]) -> Vec<Frame> {
        let start = Month::new(2024, 1).unwrap();
        (0..cols)
            .map(|i| {
                let mut frame = Frame::new(start.add_months(i as i32));
                frame.sub_frames = names
                    .iter()
                    .map(|n| SubFrame { name: n.to_string(), value: 0.5 })
                    .collect();
                frame
            })
            .collect()
    }

    fn plain(id: &str) -> Projection {
        Projection::new(Variable::new(id, id, VariableType::Real), frames(3, &[]))
    }

    fn breakdown(id: &str, names: &[&str], expanded: bool) -> Projection {
        Projection::new(Variable::new(id, id, VariableType::Breakdown), frames(3, names))
            .with_expanded(expanded)
    }

    /// a | b (East, West, expanded) | c | d (North, expanded)
    fn grid() -> GridModel {
        let projections = vec![
            plain("a"),
            breakdown("b", &["East", "West"], true),
            plain("c"),
            breakdown("d", &["North"], true),
        ];
        GridModel::build(&projections, 3)
    }

    #[test]
    fn test_no_selection_is_noop() {
        for cmd in NavCommand::ALL {
            assert_eq!(navigate(&grid(), None, cmd), None);
        }
    }

    #[test]
    fn test_horizontal_stops_at_edges() {
        let g = grid();
        assert_eq!(navigate(&g, Some(Coordinate::frame(0, 0)), NavCommand::Left), None);
        assert_eq!(navigate(&g, Some(Coordinate::frame(0, 0)), NavCommand::BackTab), None);
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(0, 0)), NavCommand::Right),
            Some(Coordinate::frame(0, 1))
        );
        // Tab at the last column does not wrap
        assert_eq!(navigate(&g, Some(Coordinate::frame(0, 2)), NavCommand::Tab), None);
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(1, 1, 2)), NavCommand::BackTab),
            Some(Coordinate::sub_frame(1, 1, 1))
        );
    }

    #[test]
    fn test_down_enters_expanded_breakdown() {
        let g = grid();
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(0, 1)), NavCommand::Down),
            Some(Coordinate::frame(1, 1))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(1, 1)), NavCommand::Down),
            Some(Coordinate::sub_frame(1, 0, 1))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(1, 0, 1)), NavCommand::PageDown),
            Some(Coordinate::sub_frame(1, 1, 1))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(1, 1, 1)), NavCommand::Down),
            Some(Coordinate::frame(2, 1))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(2, 1)), NavCommand::Down),
            Some(Coordinate::frame(3, 1))
        );
    }

    #[test]
    fn test_down_from_last_subframe_into_next_expanded() {
        let projections = vec![
            breakdown("a", &["East", "West"], true),
            breakdown("b", &["North"], true),
        ];
        let g = GridModel::build(&projections, 3);
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(0, 1, 0)), NavCommand::Down),
            Some(Coordinate::sub_frame(1, 0, 0))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(1, 0, 0)), NavCommand::Up),
            Some(Coordinate::sub_frame(0, 1, 0))
        );
    }

    #[test]
    fn test_vertical_ends_are_noops() {
        let g = grid();
        assert_eq!(navigate(&g, Some(Coordinate::frame(0, 0)), NavCommand::Up), None);
        assert_eq!(navigate(&g, Some(Coordinate::sub_frame(3, 0, 0)), NavCommand::Down), None);
        assert_eq!(navigate(&g, Some(Coordinate::sub_frame(3, 0, 0)), NavCommand::PageDown), None);
    }

    #[test]
    fn test_up_into_expanded_predecessor() {
        let g = grid();
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(2, 0)), NavCommand::Up),
            Some(Coordinate::sub_frame(1, 1, 0))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::sub_frame(1, 0, 0)), NavCommand::Up),
            Some(Coordinate::frame(1, 0))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(1, 0)), NavCommand::PageUp),
            Some(Coordinate::frame(0, 0))
        );
    }

    #[test]
    fn test_collapsed_breakdown_is_skipped_over() {
        let projections = vec![plain("a"), breakdown("b", &["East"], false), plain("c")];
        let g = GridModel::build(&projections, 3);
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(1, 0)), NavCommand::Down),
            Some(Coordinate::frame(2, 0))
        );
        assert_eq!(
            navigate(&g, Some(Coordinate::frame(2, 0)), NavCommand::Up),
            Some(Coordinate::frame(1, 0))
        );
    }

    #[test]
    fn test_stale_coordinate_is_noop() {
        let g = grid();
        assert_eq!(navigate(&g, Some(Coordinate::sub_frame(0, 0, 0)), NavCommand::Down), None);
        assert_eq!(navigate(&g, Some(Coordinate::frame(9, 0)), NavCommand::Up), None);
    }
}
