//! Per-threshold grid state with incrementally maintained statistics.
//!
//! A [`GridState`] owns the dense value buffer for one threshold together
//! with the caches derived from it: running extrema, per-column and per-row
//! sums, and per-column/per-row counts of populated cells. Single-cell
//! updates adjust every cache by delta; snapshots rebuild them in one pass.
//!
//! Data is stored in row-major order: `values[y * width + x]`.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::util::{u64_to_f64, usize_to_f64};

/// Default on-screen size of one cell at zoom 1, in device pixels.
pub const DEFAULT_BASE_PIXEL_SIZE: f64 = 4.0;

/// View geometry of one grid inside its scrollable container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Current zoom factor.
    pub zoom: f64,
    /// Device pixels per cell at zoom 1.
    pub base_pixel_size: f64,
    /// Scroll offset of the container, in device pixels.
    pub offset: (f64, f64),
    /// Container size, in device pixels.
    pub viewport: (f64, f64),
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            base_pixel_size: DEFAULT_BASE_PIXEL_SIZE,
            offset: (0.0, 0.0),
            viewport: (0.0, 0.0),
        }
    }
}

impl GridGeometry {
    /// Device pixels covered by one cell at the current zoom.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.base_pixel_size * self.zoom
    }
}

/// Half-open window of cells `[x_start, x_end) x [y_start, y_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellWindow {
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
}

impl CellWindow {
    /// Window covering a whole `width` x `height` grid.
    #[must_use]
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x_start: 0,
            x_end: width,
            y_start: 0,
            y_end: height,
        }
    }

    /// Number of visible columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.x_end.saturating_sub(self.x_start)
    }

    /// Number of visible rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.y_end.saturating_sub(self.y_start)
    }

    /// Returns true if the window covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns() == 0 || self.rows() == 0
    }
}

/// Summary statistics over the valid cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridSummary {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub mean: f64,
    pub valid_count: usize,
}

/// Value buffer and derived caches for one threshold.
#[derive(Debug, Clone)]
pub struct GridState {
    name: String,
    width: usize,
    height: usize,
    values: Vec<u32>,
    valid: Vec<bool>,
    min_value: Option<u32>,
    max_value: Option<u32>,
    col_sums: Vec<f64>,
    row_sums: Vec<f64>,
    col_population: Vec<usize>,
    row_population: Vec<usize>,
    dirty: bool,
    /// View geometry, managed by the viewport controller.
    pub geometry: GridGeometry,
}

impl GridState {
    /// Create an empty grid: every cell zero and unpopulated.
    #[must_use]
    pub fn new(name: impl Into<String>, width: usize, height: usize) -> Self {
        let mut grid = Self {
            name: name.into(),
            width: 0,
            height: 0,
            values: Vec::new(),
            valid: Vec::new(),
            min_value: None,
            max_value: None,
            col_sums: Vec::new(),
            row_sums: Vec::new(),
            col_population: Vec::new(),
            row_population: Vec::new(),
            dirty: true,
            geometry: GridGeometry::default(),
        };
        grid.reset(width, height);
        grid
    }

    /// Reallocate every buffer for new dimensions and clear all statistics.
    ///
    /// View geometry other than the base pixel size is reset too.
    pub fn reset(&mut self, width: usize, height: usize) {
        let len = width * height;
        self.width = width;
        self.height = height;
        self.values = vec![0; len];
        self.valid = vec![false; len];
        self.min_value = None;
        self.max_value = None;
        self.col_sums = vec![0.0; width];
        self.row_sums = vec![0.0; height];
        self.col_population = vec![0; width];
        self.row_population = vec![0; height];
        self.dirty = true;
        self.geometry = GridGeometry {
            base_pixel_size: self.geometry.base_pixel_size,
            ..GridGeometry::default()
        };
    }

    /// Write one cell and update every cache by delta.
    ///
    /// Returns `true` if the running extrema changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= width * height`; the
    /// grid is left untouched.
    pub fn apply_cell_update(&mut self, index: usize, new_value: u32) -> Result<bool> {
        if index >= self.values.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        let x = index % self.width;
        let y = index / self.width;

        let was_valid = self.valid[index];
        // Masked cells contribute nothing to the sums.
        let previous = if was_valid { self.values[index] } else { 0 };
        let delta = f64::from(new_value) - f64::from(previous);

        self.values[index] = new_value;
        self.col_sums[x] += delta;
        self.row_sums[y] += delta;
        if !was_valid {
            self.valid[index] = true;
            self.col_population[x] += 1;
            self.row_population[y] += 1;
        }
        self.dirty = true;

        Ok(self.observe(new_value))
    }

    /// Replace the whole buffer and rebuild every cache in one pass.
    ///
    /// Cells whose `mask` entry is `false` are stored but excluded from sums,
    /// populations, and extrema. An empty mask marks every cell valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotLength`] if `values` (or a non-empty `mask`)
    /// does not have exactly `width * height` entries; the grid is left
    /// untouched.
    pub fn apply_snapshot(&mut self, values: &[u32], mask: &[bool]) -> Result<()> {
        let expected = self.values.len();
        if values.len() != expected || !(mask.is_empty() || mask.len() == expected) {
            return Err(Error::SnapshotLength {
                threshold: self.name.clone(),
                expected,
                got: if values.len() == expected {
                    mask.len()
                } else {
                    values.len()
                },
            });
        }

        self.values.copy_from_slice(values);
        self.col_sums.fill(0.0);
        self.row_sums.fill(0.0);
        self.col_population.fill(0);
        self.row_population.fill(0);
        self.min_value = None;
        self.max_value = None;

        for (index, &value) in values.iter().enumerate() {
            let valid = mask.get(index).copied().unwrap_or(true);
            self.valid[index] = valid;
            if !valid {
                continue;
            }
            let x = index % self.width;
            let y = index / self.width;
            let v = f64::from(value);
            self.col_sums[x] += v;
            self.row_sums[y] += v;
            self.col_population[x] += 1;
            self.row_population[y] += 1;
            self.observe(value);
        }
        self.dirty = true;
        Ok(())
    }

    fn observe(&mut self, value: u32) -> bool {
        let mut changed = false;
        if self.min_value.map_or(true, |min| value < min) {
            self.min_value = Some(value);
            changed = true;
        }
        if self.max_value.map_or(true, |max| value > max) {
            self.max_value = Some(value);
            changed = true;
        }
        changed
    }

    /// Threshold name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in cells.
    #[must_use]
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[must_use]
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major value buffer.
    #[must_use]
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Validity flag per cell.
    #[must_use]
    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    /// Value at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Returns true if the cell at `index` holds an observed value.
    #[must_use]
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    /// Smallest observed value since the last reset.
    #[must_use]
    pub fn min_value(&self) -> Option<u32> {
        self.min_value
    }

    /// Largest observed value since the last reset.
    #[must_use]
    pub fn max_value(&self) -> Option<u32> {
        self.max_value
    }

    /// Running per-column sums over valid cells.
    #[must_use]
    pub fn col_sums(&self) -> &[f64] {
        &self.col_sums
    }

    /// Running per-row sums over valid cells.
    #[must_use]
    pub fn row_sums(&self) -> &[f64] {
        &self.row_sums
    }

    /// Number of valid cells per column.
    #[must_use]
    pub fn col_population(&self) -> &[usize] {
        &self.col_population
    }

    /// Number of valid cells per row.
    #[must_use]
    pub fn row_population(&self) -> &[usize] {
        &self.row_population
    }

    /// Returns true if the grid changed since the last [`take_dirty`](Self::take_dirty).
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the redraw flag, returning its previous value.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Force a redraw on the next frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Summary statistics over the valid cells.
    #[must_use]
    pub fn summary(&self) -> GridSummary {
        let valid_count: usize = self.row_population.iter().sum();
        let total: f64 = self.row_sums.iter().sum();
        let mean = if valid_count > 0 {
            total / usize_to_f64(valid_count)
        } else {
            0.0
        };
        GridSummary {
            min: self.min_value,
            max: self.max_value,
            mean,
            valid_count,
        }
    }

    /// Recompute column and row sums from the buffer.
    ///
    /// Used by tests and diagnostics to check the incremental caches.
    #[must_use]
    pub fn recompute_sums(&self) -> (Vec<f64>, Vec<f64>) {
        let mut cols = vec![0u64; self.width];
        let mut rows = vec![0u64; self.height];
        for (index, &value) in self.values.iter().enumerate() {
            if !self.valid[index] {
                continue;
            }
            cols[index % self.width] += u64::from(value);
            rows[index / self.width] += u64::from(value);
        }
        (
            cols.into_iter().map(u64_to_f64).collect(),
            rows.into_iter().map(u64_to_f64).collect(),
        )
    }
}
