//! Value distribution for the active grid and the contrast-handle drag.
//!
//! Bins span the grid's active contrast range. Dragging a handle maps the
//! pointer back to a data value and writes it into the shared
//! [`ContrastModel`], turning auto-scale off on first contact.

use crate::contrast::ContrastModel;
use crate::grid::GridState;
use crate::util::{f64_to_usize_clamped, u64_to_f64, usize_to_f64};

/// Fixed number of histogram bins.
pub const HISTOGRAM_BINS: usize = 64;

/// Binned distribution of a grid's valid cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    range: (f64, f64),
    log_scale: bool,
}

impl Histogram {
    /// Bin every valid cell of `grid` linearly across `range`.
    ///
    /// Values outside the range land in the first or last bin.
    #[must_use]
    pub fn compute(grid: &GridState, range: (f64, f64), log_scale: bool) -> Self {
        let mut counts = vec![0u64; HISTOGRAM_BINS];
        for (value, _) in grid
            .values()
            .iter()
            .zip(grid.validity())
            .filter(|(_, valid)| **valid)
        {
            counts[bin_index(f64::from(*value), range)] += 1;
        }
        Self {
            counts,
            range,
            log_scale,
        }
    }

    /// Raw per-bin counts.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Axis range the bins were computed over.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub fn log_scale(&self) -> bool {
        self.log_scale
    }

    /// Bar heights: counts, or `log10(1 + count)` when log scaling is on.
    #[must_use]
    pub fn heights(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|&c| {
                let c = u64_to_f64(c);
                if self.log_scale {
                    (1.0 + c).log10()
                } else {
                    c
                }
            })
            .collect()
    }

    /// Tallest bar, used to normalize drawing.
    #[must_use]
    pub fn max_height(&self) -> f64 {
        self.heights().into_iter().fold(0.0, f64::max)
    }

    /// Total number of binned cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Data-value interval `[start, end)` covered by bin `index`.
    #[must_use]
    pub fn bin_bounds(&self, index: usize) -> (f64, f64) {
        let width = axis_span(self.range) / usize_to_f64(HISTOGRAM_BINS);
        let start = self.range.0 + usize_to_f64(index) * width;
        (start, start + width)
    }
}

fn axis_span(range: (f64, f64)) -> f64 {
    (range.1 - range.0).max(1.0)
}

/// Bin index for `value` on an axis spanning `range`, clamped to the edge bins.
#[must_use]
pub fn bin_index(value: f64, range: (f64, f64)) -> usize {
    let fraction = (value - range.0) / axis_span(range);
    f64_to_usize_clamped(fraction * usize_to_f64(HISTOGRAM_BINS), HISTOGRAM_BINS - 1)
}

/// Data value under horizontal position `x` of a histogram `width` pixels wide.
#[must_use]
pub fn value_at_x(x: f64, width: f64, range: (f64, f64)) -> f64 {
    if width <= 0.0 {
        return range.0;
    }
    let fraction = (x / width).clamp(0.0, 1.0);
    range.0 + fraction * axis_span(range)
}

/// Horizontal position of `value` on a histogram `width` pixels wide.
#[must_use]
pub fn x_for_value(value: f64, width: f64, range: (f64, f64)) -> f64 {
    let fraction = ((value - range.0) / axis_span(range)).clamp(0.0, 1.0);
    fraction * width
}

/// One of the two contrast handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Min,
    Max,
}

/// Pointer input over the histogram, in histogram-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, width: f64 },
    Move { x: f64, width: f64 },
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    handle: Handle,
    axis: (f64, f64),
}

/// Drag state for the histogram's contrast handles.
///
/// The axis range is frozen when the pointer goes down, so bins do not move
/// under the pointer while the bounds change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramInteraction {
    drag: Option<Drag>,
}

impl HistogramInteraction {
    /// Whether a handle is currently captured.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Handle being dragged, if any.
    #[must_use]
    pub fn active_handle(&self) -> Option<Handle> {
        self.drag.map(|d| d.handle)
    }

    /// Feed one pointer event. `axis` is the histogram's current axis range.
    ///
    /// Returns true when the contrast range changed and every grid needs a
    /// redraw.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        contrast: &mut ContrastModel,
        axis: (f64, f64),
    ) -> bool {
        match event {
            PointerEvent::Down { x, width } => {
                contrast.capture_auto_seed(axis);
                let value = value_at_x(x, width, axis);
                let handle = nearest_handle(contrast, value);
                self.drag = Some(Drag { handle, axis });
                apply(contrast, handle, value);
                true
            }
            PointerEvent::Move { x, width } => match self.drag {
                Some(drag) => apply(contrast, drag.handle, value_at_x(x, width, drag.axis)),
                None => false,
            },
            PointerEvent::Up | PointerEvent::Cancel => {
                self.drag = None;
                false
            }
        }
    }
}

fn nearest_handle(contrast: &ContrastModel, value: f64) -> Handle {
    let (min, max) = contrast.manual_range();
    if (value - min).abs() <= (value - max).abs() {
        Handle::Min
    } else {
        Handle::Max
    }
}

fn apply(contrast: &mut ContrastModel, handle: Handle, value: f64) -> bool {
    let before = contrast.manual_range();
    let result = match handle {
        Handle::Min => contrast.set_manual_min(value),
        Handle::Max => contrast.set_manual_max(value),
    };
    if let Err(e) = result {
        log::debug!("ignoring histogram drag: {e}");
        return false;
    }
    contrast.manual_range() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bins_valid_cells_only() {
        let mut grid = GridState::new("t1", 2, 2);
        grid.apply_snapshot(&[0, 100, 50, 255], &[true, true, false, true])
            .unwrap();
        let hist = Histogram::compute(&grid, (0.0, 255.0), false);
        assert_eq!(hist.counts().len(), HISTOGRAM_BINS);
        assert_eq!(hist.total(), 3);
        assert_eq!(hist.counts()[0], 1);
        assert_eq!(hist.counts()[bin_index(100.0, (0.0, 255.0))], 1);
        assert_eq!(hist.counts()[HISTOGRAM_BINS - 1], 1);
    }

    #[test]
    fn test_out_of_range_values_clamp_to_edge_bins() {
        assert_eq!(bin_index(-10.0, (5.0, 10.0)), 0);
        assert_eq!(bin_index(1e9, (5.0, 10.0)), HISTOGRAM_BINS - 1);
        assert_eq!(bin_index(7.0, (7.0, 7.0)), 0);
    }

    #[test]
    fn test_log_heights() {
        let mut grid = GridState::new("t1", 3, 3);
        grid.apply_snapshot(&[1; 9], &[]).unwrap();
        let linear = Histogram::compute(&grid, (0.0, 10.0), false);
        let log = Histogram::compute(&grid, (0.0, 10.0), true);
        assert_relative_eq!(linear.max_height(), 9.0);
        assert_relative_eq!(log.max_height(), 1.0);
        assert!(log.log_scale());
    }

    #[test]
    fn test_value_and_position_inverse() {
        let range = (0.0, 255.0);
        assert_relative_eq!(value_at_x(127.0, 255.0, range), 127.0);
        assert_relative_eq!(value_at_x(-5.0, 255.0, range), 0.0);
        assert_relative_eq!(value_at_x(400.0, 255.0, range), 255.0);
        assert_relative_eq!(value_at_x(10.0, 0.0, range), 0.0);
        assert_relative_eq!(x_for_value(51.0, 100.0, range), 20.0);
    }

    #[test]
    fn test_bin_bounds() {
        let grid = GridState::new("t1", 1, 1);
        let hist = Histogram::compute(&grid, (0.0, 128.0), false);
        assert_eq!(hist.bin_bounds(0), (0.0, 2.0));
        assert_eq!(hist.bin_bounds(63), (126.0, 128.0));
    }

    #[test]
    fn test_drag_picks_nearer_handle_and_disables_auto() {
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        let changed = interaction.handle(
            PointerEvent::Down {
                x: 127.0,
                width: 255.0,
            },
            &mut contrast,
            (0.0, 255.0),
        );
        assert!(changed);
        assert!(!contrast.auto_scale());
        assert_eq!(interaction.active_handle(), Some(Handle::Min));
        assert_eq!(contrast.manual_min(), 127);
        assert_eq!(contrast.manual_max(), 255);
    }

    #[test]
    fn test_drag_near_max_handle() {
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        interaction.handle(
            PointerEvent::Down { x: 90.0, width: 100.0 },
            &mut contrast,
            (0.0, 100.0),
        );
        assert_eq!(interaction.active_handle(), Some(Handle::Max));
        assert_eq!(contrast.manual_max(), 90);
    }

    #[test]
    fn test_axis_frozen_during_drag() {
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        interaction.handle(
            PointerEvent::Down { x: 0.0, width: 100.0 },
            &mut contrast,
            (0.0, 200.0),
        );
        // The caller now passes the narrowed manual range as the axis; the
        // drag keeps mapping against the range captured at pointer-down.
        let narrowed = contrast.manual_range();
        interaction.handle(
            PointerEvent::Move { x: 50.0, width: 100.0 },
            &mut contrast,
            narrowed,
        );
        assert_eq!(contrast.manual_min(), 100);
    }

    #[test]
    fn test_min_handle_cannot_cross_max() {
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        interaction.handle(
            PointerEvent::Down { x: 10.0, width: 100.0 },
            &mut contrast,
            (0.0, 100.0),
        );
        interaction.handle(
            PointerEvent::Move { x: 100.0, width: 100.0 },
            &mut contrast,
            (0.0, 100.0),
        );
        assert_eq!(contrast.manual_min(), 99);
        assert!(contrast.manual_min() < contrast.manual_max());
    }

    #[test]
    fn test_release_clears_capture() {
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        interaction.handle(
            PointerEvent::Down { x: 10.0, width: 100.0 },
            &mut contrast,
            (0.0, 100.0),
        );
        assert!(interaction.is_dragging());
        interaction.handle(PointerEvent::Cancel, &mut contrast, (0.0, 100.0));
        assert!(!interaction.is_dragging());

        let before = contrast;
        let changed = interaction.handle(
            PointerEvent::Move { x: 70.0, width: 100.0 },
            &mut contrast,
            (0.0, 100.0),
        );
        assert!(!changed);
        assert_eq!(contrast, before);
    }

    #[test]
    fn test_bin_unit_positions_drive_the_drag() {
        let bins = usize_to_f64(HISTOGRAM_BINS);
        let mut contrast = ContrastModel::default();
        let mut interaction = HistogramInteraction::default();
        interaction.handle(
            PointerEvent::Down { x: 16.0, width: bins },
            &mut contrast,
            (0.0, 640.0),
        );
        assert_eq!(contrast.manual_min(), 160);
        assert_eq!(contrast.manual_max(), 640);

        // The redrawn histogram now spans the new range; the drag keeps the
        // axis it started on.
        interaction.handle(
            PointerEvent::Move { x: 48.0, width: bins },
            &mut contrast,
            (160.0, 640.0),
        );
        assert_eq!(contrast.manual_min(), 480);
        assert_relative_eq!(x_for_value(480.0, bins, (0.0, 640.0)), 48.0);
    }
}
