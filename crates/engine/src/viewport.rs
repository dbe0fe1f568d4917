//! Host capabilities for scrolling and focus.
//!
//! The sheet never touches a rendering toolkit. After a selection move it
//! asks a `ScrollIntoView` implementation for the cell's box and the
//! visible window, and scrolls only when the box is not fully visible.
//! Editor focus changes go through `FocusManager`.

use forecast_config::Settings;

/// A box in content coordinates (header row and title column excluded).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// The scrollable area currently visible.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollWindow {
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scroll offsets that bring `cell` into `window`, or `None` if it is
/// already fully visible. Each axis moves the minimum distance.
pub fn scroll_adjustment(window: &ScrollWindow, cell: &Rect) -> Option<(f64, f64)> {
    let mut left = window.scroll_left;
    let mut top = window.scroll_top;

    if cell.top < window.scroll_top {
        top = cell.top;
    } else if cell.bottom() > window.scroll_top + window.height {
        top = cell.bottom() - window.height;
    }
    if cell.left < window.scroll_left {
        left = cell.left;
    } else if cell.right() > window.scroll_left + window.width {
        left = cell.right() - window.width;
    }

    if left == window.scroll_left && top == window.scroll_top {
        None
    } else {
        Some((left, top))
    }
}

pub trait ScrollIntoView {
    fn scroll_window(&self) -> ScrollWindow;
    /// Box of the cell at rendered row `display_row`, month column `col`.
    fn cell_rect(&self, display_row: usize, col: usize) -> Rect;
    fn scroll_to(&mut self, left: f64, top: f64);
}

pub trait FocusManager {
    /// An editor opened on the selected cell.
    fn focus_editor(&mut self);
    /// The editor closed; keyboard input goes back to the grid.
    fn focus_grid(&mut self);
}

/// Scroll `cell` into view if needed. Returns true if the host scrolled.
pub fn ensure_visible(host: &mut dyn ScrollIntoView, display_row: usize, col: usize) -> bool {
    let window = host.scroll_window();
    let rect = host.cell_rect(display_row, col);
    match scroll_adjustment(&window, &rect) {
        Some((left, top)) => {
            log::debug!("Scrolling to ({}, {}) for row {} col {}", left, top, display_row, col);
            host.scroll_to(left, top);
            true
        }
        None => false,
    }
}

/// Uniform row heights and column widths, sized from settings.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedGeometry {
    pub row_height: f64,
    pub column_width: f64,
    window: ScrollWindow,
}

impl FixedGeometry {
    /// Geometry for a viewport of `width` x `height`, including the header
    /// row and the variable title column.
    pub fn new(settings: &Settings, width: f64, height: f64) -> Self {
        Self {
            row_height: settings.row_height as f64,
            column_width: settings.column_width as f64,
            window: ScrollWindow {
                scroll_left: 0.0,
                scroll_top: 0.0,
                width: (width - settings.left_column_width as f64).max(0.0),
                height: (height - settings.header_height as f64).max(0.0),
            },
        }
    }

    pub fn window(&self) -> ScrollWindow {
        self.window
    }
}

impl ScrollIntoView for FixedGeometry {
    fn scroll_window(&self) -> ScrollWindow {
        self.window
    }

    fn cell_rect(&self, display_row: usize, col: usize) -> Rect {
        Rect {
            left: col as f64 * self.column_width,
            top: display_row as f64 * self.row_height,
            width: self.column_width,
            height: self.row_height,
        }
    }

    fn scroll_to(&mut self, left: f64, top: f64) {
        self.window.scroll_left = left;
        self.window.scroll_top = top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> ScrollWindow {
        ScrollWindow { scroll_left: 0.0, scroll_top: 100.0, width: 300.0, height: 200.0 }
    }

    #[test]
    fn test_visible_cell_does_not_scroll() {
        let cell = Rect { left: 10.0, top: 120.0, width: 90.0, height: 24.0 };
        assert_eq!(scroll_adjustment(&window(), &cell), None);
    }

    #[test]
    fn test_scrolls_minimum_distance() {
        let above = Rect { left: 0.0, top: 50.0, width: 90.0, height: 24.0 };
        assert_eq!(scroll_adjustment(&window(), &above), Some((0.0, 50.0)));

        let below = Rect { left: 0.0, top: 290.0, width: 90.0, height: 24.0 };
        assert_eq!(scroll_adjustment(&window(), &below), Some((0.0, 114.0)));

        let right = Rect { left: 270.0, top: 150.0, width: 90.0, height: 24.0 };
        assert_eq!(scroll_adjustment(&window(), &right), Some((60.0, 100.0)));
    }

    #[test]
    fn test_fixed_geometry_scrolls() {
        let settings = Settings::default();
        let mut geometry = FixedGeometry::new(&settings, 175.0 + 90.0 * 4.0, 32.0 + 24.0 * 5.0);
        assert!(!ensure_visible(&mut geometry, 4, 3));
        assert!(ensure_visible(&mut geometry, 5, 3));
        assert_eq!(geometry.window().scroll_top, 24.0);
        assert!(ensure_visible(&mut geometry, 0, 5));
        assert_eq!(geometry.window().scroll_top, 0.0);
        assert_eq!(geometry.window().scroll_left, 180.0);
    }
}
