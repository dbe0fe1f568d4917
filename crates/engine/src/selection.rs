//! The sheet's single selection.

use crate::grid::{Coordinate, GridModel};

/// Holds the one selected cell, if any.
///
/// Threaded explicitly through the sheet controller; nothing else owns a
/// copy of the selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionContext {
    current: Option<Coordinate>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn current(&self) -> Option<Coordinate> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Select `coord` if it exists in `grid`. Returns false (and keeps the
    /// previous selection) otherwise.
    pub fn select(&mut self, grid: &GridModel, coord: Coordinate) -> bool {
        if grid.contains(coord) {
            self.current = Some(coord);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
