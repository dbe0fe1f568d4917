//! Grid model: the row layout derived from the visible projections.
//!
//! Each visible projection contributes one frame row. An expanded
//! breakdown projection also contributes one subframe row per sub-category,
//! rendered directly beneath its frame row. Rows are addressed with
//! `RowRef`, which names the projection (`frame_index`, counted over
//! visible projections only) and, for subframe rows, the sub-category.

use forecast_core::{Projection, VariableId};

/// A row of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowRef {
    Frame { index: usize },
    SubFrame { frame_index: usize, sub_index: usize },
}

impl RowRef {
    /// Index of the projection this row belongs to.
    pub fn frame_index(&self) -> usize {
        match *self {
            RowRef::Frame { index } => index,
            RowRef::SubFrame { frame_index, .. } => frame_index,
        }
    }

    pub fn is_sub_frame(&self) -> bool {
        matches!(self, RowRef::SubFrame { .. })
    }
}

/// A cell: row plus month column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub row: RowRef,
    pub col: usize,
}

impl Coordinate {
    pub fn frame(index: usize, col: usize) -> Self {
        Self { row: RowRef::Frame { index }, col }
    }

    pub fn sub_frame(frame_index: usize, sub_index: usize, col: usize) -> Self {
        Self { row: RowRef::SubFrame { frame_index, sub_index }, col }
    }
}

/// Layout of one visible projection.
#[derive(Clone, Debug, PartialEq)]
pub struct GridRow {
    /// Position in the full projection list (hidden ones included).
    pub projection: usize,
    pub variable: VariableId,
    /// Number of subframe rows beneath the frame row (0 when collapsed).
    pub subframes: usize,
    /// Frame cells of breakdown variables are selectable but not editable.
    pub editable: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridModel {
    rows: Vec<GridRow>,
    cols: usize,
}

impl GridModel {
    /// Build the layout from the full projection list; hidden projections
    /// are skipped.
    pub fn build(projections: &[Projection], cols: usize) -> Self {
        let rows = projections
            .iter()
            .enumerate()
            .filter(|(_, p)| p.display)
            .map(|(i, p)| GridRow {
                projection: i,
                variable: p.variable.id.clone(),
                subframes: p.subframe_row_count(),
                editable: !p.variable.is_breakdown(),
            })
            .collect();
        Self { rows, cols }
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    /// Number of frame rows (visible projections).
    pub fn frame_row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of subframe rows under frame row `frame_index`.
    pub fn subframe_row_count(&self, frame_index: usize) -> usize {
        self.rows.get(frame_index).map(|r| r.subframes).unwrap_or(0)
    }

    pub fn row(&self, frame_index: usize) -> Option<&GridRow> {
        self.rows.get(frame_index)
    }

    pub fn frame_index_of(&self, id: &VariableId) -> Option<usize> {
        self.rows.iter().position(|r| &r.variable == id)
    }

    /// True if `row` exists in the current layout.
    pub fn contains_row(&self, row: RowRef) -> bool {
        match row {
            RowRef::Frame { index } => index < self.rows.len(),
            RowRef::SubFrame { frame_index, sub_index } => {
                sub_index < self.subframe_row_count(frame_index)
            }
        }
    }

    /// True if `coord` exists in the current layout.
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.col < self.cols && self.contains_row(coord.row)
    }

    /// Rendered position of `row`, counting frame and subframe rows from 0.
    pub fn display_row(&self, row: RowRef) -> Option<usize> {
        if !self.contains_row(row) {
            return None;
        }
        let before: usize = self.rows[..row.frame_index()]
            .iter()
            .map(|r| 1 + r.subframes)
            .sum();
        Some(match row {
            RowRef::Frame { .. } => before,
            RowRef::SubFrame { sub_index, .. } => before + 1 + sub_index,
        })
    }

    /// Total rendered rows.
    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|r| 1 + r.subframes).sum()
    }

    /// Every row in rendered order.
    pub fn rows_in_order(&self) -> Vec<RowRef> {
        let mut out = Vec::with_capacity(self.total_rows());
        for (index, row) in self.rows.iter().enumerate() {
            out.push(RowRef::Frame { index });
            for sub_index in 0..row.subframes {
                out.push(RowRef::SubFrame { frame_index: index, sub_index });
            }
        }
        out
    }
}
