//! Contrast range selection shared by every grid.

use crate::error::{Error, Result};
use crate::grid::GridState;
use crate::util::{i64_to_f64, round_to_i64};

/// Default manual range before the user ever edits it.
pub const DEFAULT_MANUAL_RANGE: (i64, i64) = (0, 255);

/// Auto-scale versus manual-range contrast state.
///
/// Manual bounds are integer counts and always satisfy `manual_min < manual_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastModel {
    auto_scale: bool,
    manual_min: i64,
    manual_max: i64,
}

impl Default for ContrastModel {
    fn default() -> Self {
        Self {
            auto_scale: true,
            manual_min: DEFAULT_MANUAL_RANGE.0,
            manual_max: DEFAULT_MANUAL_RANGE.1,
        }
    }
}

impl ContrastModel {
    /// Whether the active range follows each grid's extrema.
    #[must_use]
    pub fn auto_scale(&self) -> bool {
        self.auto_scale
    }

    /// Lower manual bound.
    #[must_use]
    pub fn manual_min(&self) -> i64 {
        self.manual_min
    }

    /// Upper manual bound.
    #[must_use]
    pub fn manual_max(&self) -> i64 {
        self.manual_max
    }

    /// Switch auto-scale on or off without touching the manual bounds.
    pub fn set_auto_scale(&mut self, enabled: bool) {
        self.auto_scale = enabled;
    }

    /// Active `(min, max)` for `grid`.
    ///
    /// Grid-local extrema under auto-scale, the shared manual range otherwise.
    /// A grid with no observed values reports `(0, 0)` under auto-scale.
    #[must_use]
    pub fn active_range(&self, grid: &GridState) -> (f64, f64) {
        if self.auto_scale {
            auto_range(grid)
        } else {
            self.manual_range()
        }
    }

    /// Manual range as floats.
    #[must_use]
    pub fn manual_range(&self) -> (f64, f64) {
        (i64_to_f64(self.manual_min), i64_to_f64(self.manual_max))
    }

    /// Set the lower bound, rounded and clamped to `[0, manual_max - 1]`.
    ///
    /// Returns the applied value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite input; the model is left unchanged.
    pub fn set_manual_min(&mut self, value: f64) -> Result<i64> {
        let rounded = checked_round(value)?;
        self.manual_min = rounded.max(0).min(self.manual_max - 1);
        Ok(self.manual_min)
    }

    /// Set the upper bound, rounded and clamped above the lower bound.
    ///
    /// Returns the applied value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite input; the model is left unchanged.
    pub fn set_manual_max(&mut self, value: f64) -> Result<i64> {
        let rounded = checked_round(value)?;
        self.manual_max = rounded.max(self.manual_min + 1);
        Ok(self.manual_max)
    }

    /// Turn auto-scale off, seeding the manual range from `range`.
    ///
    /// Does nothing if auto-scale is already off, so the visible image does
    /// not jump when a manual edit begins.
    pub fn capture_auto_seed(&mut self, range: (f64, f64)) {
        if !self.auto_scale {
            return;
        }
        self.auto_scale = false;
        let low = if range.0.is_finite() {
            round_to_i64(range.0)
        } else {
            DEFAULT_MANUAL_RANGE.0
        };
        let high = if range.1.is_finite() {
            round_to_i64(range.1)
        } else {
            DEFAULT_MANUAL_RANGE.1
        };
        self.manual_min = low.min(high).max(0);
        self.manual_max = high.max(self.manual_min + 1);
    }
}

/// Grid-local extrema as floats, `(0, 0)` for an unobserved grid.
#[must_use]
pub fn auto_range(grid: &GridState) -> (f64, f64) {
    match (grid.min_value(), grid.max_value()) {
        (Some(min), Some(max)) => (f64::from(min), f64::from(max)),
        _ => (0.0, 0.0),
    }
}

fn checked_round(value: f64) -> Result<i64> {
    if value.is_finite() {
        Ok(round_to_i64(value))
    } else {
        Err(Error::InvalidInput(format!(
            "contrast bound must be finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_range_follows_grid() {
        let mut grid = GridState::new("t1", 2, 2);
        let contrast = ContrastModel::default();
        assert_eq!(contrast.active_range(&grid), (0.0, 0.0));
        grid.apply_cell_update(0, 12).unwrap();
        grid.apply_cell_update(1, 30).unwrap();
        assert_eq!(contrast.active_range(&grid), (12.0, 30.0));
    }

    #[test]
    fn test_manual_range_is_shared() {
        let mut a = GridState::new("a", 1, 1);
        let b = GridState::new("b", 1, 1);
        a.apply_cell_update(0, 500).unwrap();
        let mut contrast = ContrastModel::default();
        contrast.set_auto_scale(false);
        contrast.set_manual_max(100.0).unwrap();
        assert_eq!(contrast.active_range(&a), (0.0, 100.0));
        assert_eq!(contrast.active_range(&b), (0.0, 100.0));
    }

    #[test]
    fn test_bounds_clamp_against_each_other() {
        let mut contrast = ContrastModel::default();
        assert_eq!(contrast.set_manual_min(300.0).unwrap(), 254);
        assert_eq!(contrast.set_manual_max(10.0).unwrap(), 255);
        assert_eq!(contrast.set_manual_max(400.4).unwrap(), 400);
        assert_eq!(contrast.set_manual_min(399.6).unwrap(), 399);
        assert_eq!(contrast.set_manual_min(12.5).unwrap(), 13);
        assert_eq!(contrast.set_manual_min(-40.0).unwrap(), 0);
    }

    #[test]
    fn test_min_below_max_after_any_sequence() {
        let mut contrast = ContrastModel::default();
        let inputs = [
            5.0, -20.0, 1e12, -1e12, 0.49, 0.51, 255.0, 254.5, 3.0, 3.0, 2.0, 4.0,
        ];
        for (i, value) in inputs.iter().enumerate() {
            if i % 2 == 0 {
                contrast.set_manual_min(*value).unwrap();
            } else {
                contrast.set_manual_max(*value).unwrap();
            }
            assert!(contrast.manual_min() < contrast.manual_max());
        }
    }

    #[test]
    fn test_non_finite_bounds_are_rejected() {
        let mut contrast = ContrastModel::default();
        assert!(contrast.set_manual_min(f64::NAN).is_err());
        assert!(contrast.set_manual_max(f64::INFINITY).is_err());
        assert_eq!(contrast.manual_range(), (0.0, 255.0));
    }

    #[test]
    fn test_capture_auto_seed() {
        let mut contrast = ContrastModel::default();
        contrast.capture_auto_seed((17.2, 90.8));
        assert!(!contrast.auto_scale());
        assert_eq!(contrast.manual_range(), (17.0, 91.0));

        // Already manual: a second capture keeps the user's bounds.
        contrast.capture_auto_seed((0.0, 1.0));
        assert_eq!(contrast.manual_range(), (17.0, 91.0));
    }

    #[test]
    fn test_capture_degenerate_range() {
        let mut contrast = ContrastModel::default();
        contrast.capture_auto_seed((5.0, 5.0));
        assert_eq!(contrast.manual_range(), (5.0, 6.0));
    }
}
