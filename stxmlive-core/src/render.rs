//! Grid rendering: value-to-color conversion and overlay planning.
//!
//! One grid cell maps to exactly one pixel of the produced raster. Zooming is
//! done by the display backend scaling the raster with nearest-neighbour
//! sampling, never by resampling here, so each cell keeps its exact color.

use rayon::prelude::*;

use crate::colormap::{color_for, ColorScheme};
use crate::grid::{CellWindow, GridState};
use crate::surface::{PixelBuffer, RasterSurface};
use crate::util::usize_to_f64;

/// Minimum on-screen cell size, in device pixels, before value labels are drawn.
pub const LABEL_MIN_CELL_PX: f64 = 20.0;

/// Minimum on-screen cell size before grid lines are drawn.
pub const GRID_LINES_MIN_CELL_PX: f64 = 6.0;

/// Grids with at least this many cells are colorized row-parallel.
const PARALLEL_MIN_CELLS: usize = 64 * 64;

/// RGBA written for cells that have never held a valid value.
pub const UNSET_RGBA: [u8; 4] = [0, 0, 0, 0];

/// Normalize `value` into [0, 1] against `range`.
///
/// The span is floored at 1 so a flat range does not divide by zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn normalize(value: u32, range: (f64, f64)) -> f32 {
    let (min, max) = range;
    let span = (max - min).max(1.0);
    ((f64::from(value) - min) / span).clamp(0.0, 1.0) as f32
}

/// Which overlays to draw for the current cell size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayPlan {
    pub grid_lines: bool,
    pub labels: bool,
}

/// Numeric label for one visible cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLabel {
    pub x: usize,
    pub y: usize,
    pub text: String,
}

/// Converts grid values into colored rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    /// User toggle for the cell grid overlay.
    pub show_grid_lines: bool,
    /// User toggle for per-cell value labels.
    pub show_labels: bool,
}

impl Renderer {
    /// Colorize `grid` into a fresh buffer of `width x height` pixels.
    #[must_use]
    pub fn render_buffer(grid: &GridState, range: (f64, f64), scheme: ColorScheme) -> PixelBuffer {
        let width = grid.width();
        let height = grid.height();
        let mut buffer = PixelBuffer::new(width, height, UNSET_RGBA);
        if width == 0 || height == 0 {
            return buffer;
        }

        let values = grid.values();
        let valid = grid.validity();
        let colorize_row = |(y, row): (usize, &mut [u8])| {
            for x in 0..width {
                let index = y * width + x;
                let rgba = if valid[index] {
                    let [r, g, b] = color_for(normalize(values[index], range), scheme);
                    [r, g, b, 255]
                } else {
                    UNSET_RGBA
                };
                row[x * 4..x * 4 + 4].copy_from_slice(&rgba);
            }
        };

        if width * height >= PARALLEL_MIN_CELLS {
            buffer
                .as_rgba_mut()
                .par_chunks_mut(width * 4)
                .enumerate()
                .for_each(colorize_row);
        } else {
            buffer
                .as_rgba_mut()
                .chunks_mut(width * 4)
                .enumerate()
                .for_each(colorize_row);
        }
        buffer
    }

    /// Colorize `grid` and blit the result onto `surface` at the origin.
    pub fn render<S: RasterSurface>(
        grid: &GridState,
        range: (f64, f64),
        scheme: ColorScheme,
        surface: &mut S,
    ) {
        let buffer = Self::render_buffer(grid, range, scheme);
        surface.blit(&buffer, 0, 0);
    }

    /// Decide which overlays are visible at `cell_px` device pixels per cell.
    #[must_use]
    pub fn overlay(&self, cell_px: f64) -> OverlayPlan {
        OverlayPlan {
            grid_lines: self.show_grid_lines && cell_px >= GRID_LINES_MIN_CELL_PX,
            labels: self.show_labels && cell_px > LABEL_MIN_CELL_PX,
        }
    }

    /// Labels for every valid cell inside `window`.
    ///
    /// Empty unless labels are enabled and legible at `cell_px`.
    #[must_use]
    pub fn cell_labels(&self, grid: &GridState, window: CellWindow, cell_px: f64) -> Vec<CellLabel> {
        if !self.overlay(cell_px).labels {
            return Vec::new();
        }
        let x_end = window.x_end.min(grid.width());
        let y_end = window.y_end.min(grid.height());
        let mut labels = Vec::new();
        for y in window.y_start..y_end {
            for x in window.x_start..x_end {
                let index = y * grid.width() + x;
                if grid.is_valid(index) {
                    labels.push(CellLabel {
                        x,
                        y,
                        text: grid.values()[index].to_string(),
                    });
                }
            }
        }
        labels
    }

    /// Device-pixel positions of vertical and horizontal grid lines inside `window`.
    #[must_use]
    pub fn grid_lines(&self, window: CellWindow, cell_px: f64) -> (Vec<f64>, Vec<f64>) {
        if !self.overlay(cell_px).grid_lines {
            return (Vec::new(), Vec::new());
        }
        let verticals = (window.x_start..=window.x_end)
            .map(|x| usize_to_f64(x) * cell_px)
            .collect();
        let horizontals = (window.y_start..=window.y_end)
            .map(|y| usize_to_f64(y) * cell_px)
            .collect();
        (verticals, horizontals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps_and_floors_span() {
        assert!((normalize(5, (0.0, 10.0)) - 0.5).abs() < f32::EPSILON);
        assert!((normalize(20, (0.0, 10.0)) - 1.0).abs() < f32::EPSILON);
        assert!(normalize(0, (5.0, 10.0)).abs() < f32::EPSILON);
        // Flat range: span floored to 1.
        assert!(normalize(7, (7.0, 7.0)).abs() < f32::EPSILON);
        assert!((normalize(8, (7.0, 7.0)) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_render_buffer_maps_each_cell() {
        let mut grid = GridState::new("t1", 2, 2);
        grid.apply_cell_update(0, 0).unwrap();
        grid.apply_cell_update(3, 100).unwrap();
        let buf = Renderer::render_buffer(&grid, (0.0, 100.0), ColorScheme::Grayscale);
        assert_eq!(buf.measure(), (2, 2));
        assert_eq!(buf.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(buf.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(buf.pixel(1, 0), Some(UNSET_RGBA));
    }

    #[test]
    fn test_render_large_grid_matches_small_path() {
        let mut grid = GridState::new("t1", 80, 80);
        let values: Vec<u32> = (0..6400).collect();
        grid.apply_snapshot(&values, &[]).unwrap();
        let buf = Renderer::render_buffer(&grid, (0.0, 6399.0), ColorScheme::Viridis);
        let index = 41 * 80 + 17;
        let [r, g, b] = color_for(normalize(values[index], (0.0, 6399.0)), ColorScheme::Viridis);
        assert_eq!(buf.pixel(17, 41), Some([r, g, b, 255]));
    }

    #[test]
    fn test_render_onto_surface() {
        let mut grid = GridState::new("t1", 1, 1);
        grid.apply_cell_update(0, 3).unwrap();
        let mut surface = PixelBuffer::new(3, 3, [9, 9, 9, 9]);
        Renderer::render(&grid, (3.0, 3.0), ColorScheme::Linear, &mut surface);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(1, 1), Some([9, 9, 9, 9]));
    }

    #[test]
    fn test_labels_hidden_below_threshold() {
        let renderer = Renderer {
            show_grid_lines: true,
            show_labels: true,
        };
        assert!(!renderer.overlay(20.0).labels);
        assert!(renderer.overlay(20.5).labels);
        assert!(!renderer.overlay(4.0).grid_lines);
        assert!(renderer.overlay(8.0).grid_lines);

        let disabled = Renderer::default();
        assert_eq!(disabled.overlay(100.0), OverlayPlan::default());
    }

    #[test]
    fn test_cell_labels_limited_to_window() {
        let mut grid = GridState::new("t1", 3, 3);
        grid.apply_snapshot(&[1, 2, 3, 4, 5, 6, 7, 8, 9], &[]).unwrap();
        let renderer = Renderer {
            show_grid_lines: false,
            show_labels: true,
        };
        let window = CellWindow {
            x_start: 1,
            x_end: 3,
            y_start: 2,
            y_end: 3,
        };
        let labels = renderer.cell_labels(&grid, window, 32.0);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["8", "9"]);
        assert!(renderer.cell_labels(&grid, window, 10.0).is_empty());
    }

    #[test]
    fn test_grid_lines_positions() {
        let renderer = Renderer {
            show_grid_lines: true,
            show_labels: false,
        };
        let (v, h) = renderer.grid_lines(CellWindow::full(2, 1), 10.0);
        assert_eq!(v, vec![0.0, 10.0, 20.0]);
        assert_eq!(h, vec![0.0, 10.0]);
    }
}
