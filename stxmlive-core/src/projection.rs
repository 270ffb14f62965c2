//! Row and column mean-intensity profiles over the visible window.
//!
//! Each profile value is a running axis sum divided by the number of
//! populated cells on that column or row. Profiles are log-compressed for
//! plotting with `log10(1 + (v - local_min))`; the end labels report the
//! untransformed extremes.

use crate::grid::{CellWindow, GridState};
use crate::util::usize_to_f64;

/// Axis a profile runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAxis {
    /// One value per visible column, plotted under the grid.
    Columns,
    /// One value per visible row, plotted beside the grid.
    Rows,
}

/// A windowed, log-compressed mean profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub axis: ProfileAxis,
    /// Index of the first column/row in `means`.
    pub start: usize,
    /// Untransformed means, one per visible column/row.
    pub means: Vec<f64>,
    /// `log10(1 + (mean - min))` per entry.
    pub scaled: Vec<f64>,
    /// Smallest untransformed mean.
    pub min: f64,
    /// Largest untransformed mean.
    pub max: f64,
}

impl Profile {
    fn from_means(axis: ProfileAxis, start: usize, means: Vec<f64>) -> Self {
        if means.is_empty() {
            return Self {
                axis,
                start,
                means,
                scaled: Vec::new(),
                min: 0.0,
                max: 0.0,
            };
        }
        let min = means.iter().copied().fold(f64::INFINITY, f64::min);
        let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let scaled = means.iter().map(|v| (1.0 + (v - min)).log10()).collect();
        Self {
            axis,
            start,
            means,
            scaled,
            min,
            max,
        }
    }

    /// Returns true if the profile has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Axis end labels as `(low, high)`, showing untransformed values.
    #[must_use]
    pub fn end_labels(&self) -> (String, String) {
        (format_mean(self.min), format_mean(self.max))
    }

    /// Polyline for a filled chart occupying `length x depth` device pixels.
    ///
    /// `length` runs along the profile axis (width for columns, height for
    /// rows); `depth` is the value axis. Samples sit at cell centers. Column
    /// charts grow upward from the bottom edge, row charts grow rightward from
    /// the left edge. Returned points are `(x, y)` in chart-local pixels.
    #[must_use]
    pub fn chart_points(&self, length: f64, depth: f64) -> Vec<(f64, f64)> {
        if self.scaled.is_empty() || length <= 0.0 || depth <= 0.0 {
            return Vec::new();
        }
        let peak = self.scaled.iter().copied().fold(0.0, f64::max);
        let step = length / usize_to_f64(self.scaled.len());
        self.scaled
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let along = (usize_to_f64(i) + 0.5) * step;
                let extent = if peak > 0.0 { s / peak * depth } else { 0.0 };
                match self.axis {
                    ProfileAxis::Columns => (along, depth - extent),
                    ProfileAxis::Rows => (extent, along),
                }
            })
            .collect()
    }

    /// Closed outline of the filled area: the chart polyline plus its baseline.
    #[must_use]
    pub fn filled_outline(&self, length: f64, depth: f64) -> Vec<(f64, f64)> {
        let mut points = self.chart_points(length, depth);
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return points;
        };
        match self.axis {
            ProfileAxis::Columns => {
                points.push((last.0, depth));
                points.push((first.0, depth));
            }
            ProfileAxis::Rows => {
                points.push((0.0, last.1));
                points.push((0.0, first.1));
            }
        }
        points
    }
}

fn format_mean(value: f64) -> String {
    if value.abs() >= 100.0 || value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Derives projection profiles from a grid's axis caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionEngine;

impl ProjectionEngine {
    /// Column means for the visible columns of `window`.
    ///
    /// Each value is `col_sums[x] / max(1, col_population[x])`.
    #[must_use]
    pub fn column_profile(grid: &GridState, window: CellWindow) -> Profile {
        let end = window.x_end.min(grid.width());
        let start = window.x_start.min(end);
        let means = (start..end)
            .map(|x| mean(grid.col_sums()[x], grid.col_population()[x]))
            .collect();
        Profile::from_means(ProfileAxis::Columns, start, means)
    }

    /// Row means for the visible rows of `window`.
    ///
    /// Each value is `row_sums[y] / max(1, row_population[y])`.
    #[must_use]
    pub fn row_profile(grid: &GridState, window: CellWindow) -> Profile {
        let end = window.y_end.min(grid.height());
        let start = window.y_start.min(end);
        let means = (start..end)
            .map(|y| mean(grid.row_sums()[y], grid.row_population()[y]))
            .collect();
        Profile::from_means(ProfileAxis::Rows, start, means)
    }

    /// Both profiles for `window`, as `(columns, rows)`.
    #[must_use]
    pub fn profiles(grid: &GridState, window: CellWindow) -> (Profile, Profile) {
        (
            Self::column_profile(grid, window),
            Self::row_profile(grid, window),
        )
    }
}

fn mean(sum: f64, population: usize) -> f64 {
    sum / usize_to_f64(population.max(1))
}
