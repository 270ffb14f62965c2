//! Zoom and pan state for every grid view, with optional synchronization.
//!
//! All zoom changes go through one clamped setter so the bounds have a
//! single source of truth: a grid is never zoomed out past the point where
//! it would be smaller than its container, nor beyond [`MAX_ZOOM`].

use crate::grid::{CellWindow, GridState};
use crate::util::{f64_to_usize_bounded, f64_to_usize_clamped, usize_to_f64};

/// Absolute lower zoom bound, applied before the container-fit bound.
pub const MIN_ZOOM_FLOOR: f64 = 0.5;

/// Upper zoom bound.
pub const MAX_ZOOM: f64 = 8.0;

/// Multiplicative zoom step for one wheel notch or a double-click.
pub const ZOOM_STEP: f64 = 1.25;

/// Smallest zoom at which `grid` still fills its container on both axes.
#[must_use]
pub fn compute_min_zoom(grid: &GridState) -> f64 {
    let geometry = &grid.geometry;
    let content_w = usize_to_f64(grid.width()) * geometry.base_pixel_size;
    let content_h = usize_to_f64(grid.height()) * geometry.base_pixel_size;
    let fit_w = if content_w > 0.0 {
        geometry.viewport.0 / content_w
    } else {
        0.0
    };
    let fit_h = if content_h > 0.0 {
        geometry.viewport.1 / content_h
    } else {
        0.0
    };
    MIN_ZOOM_FLOOR.max(fit_w).max(fit_h)
}

/// Clamp `zoom` to `[compute_min_zoom(grid), MAX_ZOOM]`.
///
/// The container-fit bound wins if it exceeds [`MAX_ZOOM`].
#[must_use]
pub fn clamp_zoom(grid: &GridState, zoom: f64) -> f64 {
    let min = compute_min_zoom(grid);
    let zoom = if zoom.is_finite() { zoom } else { 1.0 };
    zoom.min(MAX_ZOOM).max(min)
}

/// Rendered size of `grid` in device pixels at its current zoom.
#[must_use]
pub fn content_size(grid: &GridState) -> (f64, f64) {
    let cell = grid.geometry.cell_size();
    (
        usize_to_f64(grid.width()) * cell,
        usize_to_f64(grid.height()) * cell,
    )
}

/// Cells currently visible through the grid's container.
#[must_use]
pub fn visible_window(grid: &GridState) -> CellWindow {
    let cell = grid.geometry.cell_size();
    if cell <= 0.0 || grid.width() == 0 || grid.height() == 0 {
        return CellWindow::default();
    }
    let (ox, oy) = grid.geometry.offset;
    let (vw, vh) = grid.geometry.viewport;
    // An unmeasured container shows the whole grid.
    if vw <= 0.0 || vh <= 0.0 {
        return CellWindow::full(grid.width(), grid.height());
    }
    let x_start = f64_to_usize_clamped(ox / cell, grid.width());
    let y_start = f64_to_usize_clamped(oy / cell, grid.height());
    let x_end = f64_to_usize_clamped(((ox + vw) / cell).ceil(), grid.width());
    let y_end = f64_to_usize_clamped(((oy + vh) / cell).ceil(), grid.height());
    CellWindow {
        x_start,
        x_end: x_end.max(x_start),
        y_start,
        y_end: y_end.max(y_start),
    }
}

/// Cell under a container-relative pointer position, if any.
#[must_use]
pub fn cell_at(grid: &GridState, pointer: (f64, f64)) -> Option<(usize, usize)> {
    let cell = grid.geometry.cell_size();
    if cell <= 0.0 {
        return None;
    }
    let x = (grid.geometry.offset.0 + pointer.0) / cell;
    let y = (grid.geometry.offset.1 + pointer.1) / cell;
    match (
        f64_to_usize_bounded(x, grid.width()),
        f64_to_usize_bounded(y, grid.height()),
    ) {
        (Some(x), Some(y)) => Some((x, y)),
        _ => None,
    }
}

fn clamp_offset(grid: &GridState, offset: (f64, f64)) -> (f64, f64) {
    let (content_w, content_h) = content_size(grid);
    let (vw, vh) = grid.geometry.viewport;
    let max_x = (content_w - vw).max(0.0);
    let max_y = (content_h - vh).max(0.0);
    let sanitize = |v: f64| if v.is_finite() { v } else { 0.0 };
    (
        sanitize(offset.0).clamp(0.0, max_x),
        sanitize(offset.1).clamp(0.0, max_y),
    )
}

/// Zoom/pan events, from any input source.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// Mouse wheel over a grid; positive `delta` zooms in by notches.
    Wheel {
        grid: usize,
        delta: f64,
        anchor: (f64, f64),
    },
    /// Double-click zooms in one step around the pointer.
    DoubleClick { grid: usize, anchor: (f64, f64) },
    /// Pinch gesture with a multiplicative `scale`; forces synchronization on.
    Pinch {
        grid: usize,
        scale: f64,
        anchor: (f64, f64),
    },
    /// Container scrolled to `offset`.
    Scroll { grid: usize, offset: (f64, f64) },
    /// Container resized to `size`.
    Resize { grid: usize, size: (f64, f64) },
    /// Explicit global zoom (slider).
    SetGlobalZoom(f64),
    /// Explicit zoom for one grid.
    SetGridZoom { grid: usize, zoom: f64 },
    /// Toggle synchronization of zoom and scroll across grids.
    SetSync(bool),
}

/// Global and per-grid zoom/pan controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    global_zoom: f64,
    sync_enabled: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self {
            global_zoom: 1.0,
            sync_enabled: true,
        }
    }
}

impl ViewportController {
    /// Requested global zoom (each grid may clamp it further).
    #[must_use]
    pub fn global_zoom(&self) -> f64 {
        self.global_zoom
    }

    /// Whether zoom and scroll are shared across grids.
    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    /// Reset to defaults, keeping the sync preference. Called on config change.
    pub fn reset(&mut self) {
        self.global_zoom = 1.0;
    }

    /// Dispatch one event. Returns true if any grid's geometry changed.
    pub fn handle(&mut self, grids: &mut [GridState], event: ViewportEvent) -> bool {
        match event {
            ViewportEvent::Wheel {
                grid,
                delta,
                anchor,
            } => {
                if !delta.is_finite() || delta == 0.0 {
                    return false;
                }
                self.zoom_by(grids, grid, ZOOM_STEP.powf(delta), anchor)
            }
            ViewportEvent::DoubleClick { grid, anchor } => {
                self.zoom_by(grids, grid, ZOOM_STEP, anchor)
            }
            ViewportEvent::Pinch {
                grid,
                scale,
                anchor,
            } => {
                if !self.sync_enabled {
                    self.set_sync(grids, true);
                }
                if !scale.is_finite() || scale <= 0.0 {
                    return false;
                }
                self.zoom_by(grids, grid, scale, anchor)
            }
            ViewportEvent::Scroll { grid, offset } => self.scroll(grids, grid, offset),
            ViewportEvent::Resize { grid, size } => self.resize(grids, grid, size),
            ViewportEvent::SetGlobalZoom(zoom) => self.set_global_zoom(grids, zoom),
            ViewportEvent::SetGridZoom { grid, zoom } => self.set_grid_zoom(grids, grid, zoom),
            ViewportEvent::SetSync(enabled) => self.set_sync(grids, enabled),
        }
    }

    /// Set the shared zoom and apply it to every grid, each clamped to its own bounds.
    pub fn set_global_zoom(&mut self, grids: &mut [GridState], zoom: f64) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        self.global_zoom = zoom.clamp(MIN_ZOOM_FLOOR, MAX_ZOOM);
        let mut changed = false;
        for grid in grids.iter_mut() {
            changed |= apply_zoom(grid, self.global_zoom);
        }
        changed
    }

    /// Set one grid's zoom; routed through the global setter while synchronized.
    pub fn set_grid_zoom(&mut self, grids: &mut [GridState], index: usize, zoom: f64) -> bool {
        if self.sync_enabled {
            return self.set_global_zoom(grids, zoom);
        }
        match grids.get_mut(index) {
            Some(grid) if zoom.is_finite() => apply_zoom(grid, zoom),
            _ => false,
        }
    }

    /// Enable or disable synchronization. Enabling snaps every grid to the global zoom.
    pub fn set_sync(&mut self, grids: &mut [GridState], enabled: bool) -> bool {
        self.sync_enabled = enabled;
        if enabled {
            let zoom = self.global_zoom;
            self.set_global_zoom(grids, zoom)
        } else {
            false
        }
    }

    /// Scroll one grid; mirrored to every grid while synchronized.
    pub fn scroll(&mut self, grids: &mut [GridState], index: usize, offset: (f64, f64)) -> bool {
        let mut changed = false;
        if self.sync_enabled {
            for grid in grids.iter_mut() {
                changed |= set_offset(grid, offset);
            }
        } else if let Some(grid) = grids.get_mut(index) {
            changed = set_offset(grid, offset);
        }
        changed
    }

    /// Record a new container size and re-clamp that grid's zoom and offset.
    pub fn resize(&mut self, grids: &mut [GridState], index: usize, size: (f64, f64)) -> bool {
        let Some(grid) = grids.get_mut(index) else {
            return false;
        };
        let size = (size.0.max(0.0), size.1.max(0.0));
        if grid.geometry.viewport == size {
            return false;
        }
        grid.geometry.viewport = size;
        let target = if self.sync_enabled {
            self.global_zoom
        } else {
            grid.geometry.zoom
        };
        apply_zoom(grid, target);
        let offset = grid.geometry.offset;
        grid.geometry.offset = clamp_offset(grid, offset);
        grid.mark_dirty();
        true
    }

    /// Multiply the zoom of `index` (or all grids when synchronized) by `factor`,
    /// keeping the content point under `anchor` fixed.
    pub fn zoom_by(
        &mut self,
        grids: &mut [GridState],
        index: usize,
        factor: f64,
        anchor: (f64, f64),
    ) -> bool {
        let Some(grid) = grids.get(index) else {
            return false;
        };
        let old_cell = grid.geometry.cell_size();
        let content_point = (
            grid.geometry.offset.0 + anchor.0,
            grid.geometry.offset.1 + anchor.1,
        );
        let base = grid.geometry.zoom;

        let changed = self.set_grid_zoom(grids, index, base * factor);
        if !changed {
            return false;
        }

        let grid = &grids[index];
        let new_cell = grid.geometry.cell_size();
        if old_cell <= 0.0 {
            return true;
        }
        let ratio = new_cell / old_cell;
        let offset = (
            content_point.0 * ratio - anchor.0,
            content_point.1 * ratio - anchor.1,
        );
        self.scroll(grids, index, offset);
        true
    }
}

fn apply_zoom(grid: &mut GridState, zoom: f64) -> bool {
    let clamped = clamp_zoom(grid, zoom);
    if (grid.geometry.zoom - clamped).abs() <= f64::EPSILON {
        return false;
    }
    grid.geometry.zoom = clamped;
    let offset = grid.geometry.offset;
    grid.geometry.offset = clamp_offset(grid, offset);
    grid.mark_dirty();
    true
}

fn set_offset(grid: &mut GridState, offset: (f64, f64)) -> bool {
    let clamped = clamp_offset(grid, offset);
    if grid.geometry.offset == clamped {
        return false;
    }
    grid.geometry.offset = clamped;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_with_viewport(name: &str, size: (f64, f64)) -> GridState {
        let mut grid = GridState::new(name, 100, 50);
        grid.geometry.base_pixel_size = 4.0;
        grid.geometry.viewport = size;
        grid
    }

    #[test]
    fn test_min_zoom_fills_container() {
        // 100x50 cells at 4px = 400x200 content.
        let grid = grid_with_viewport("a", (800.0, 300.0));
        assert_relative_eq!(compute_min_zoom(&grid), 2.0);
        let small = grid_with_viewport("b", (100.0, 50.0));
        assert_relative_eq!(compute_min_zoom(&small), MIN_ZOOM_FLOOR);
    }

    #[test]
    fn test_global_zoom_respects_each_grid_minimum() {
        let mut grids = vec![
            grid_with_viewport("a", (800.0, 100.0)),
            grid_with_viewport("b", (200.0, 100.0)),
        ];
        let mut viewport = ViewportController::default();
        viewport.set_global_zoom(&mut grids, 0.1);
        for grid in &grids {
            assert!(grid.geometry.zoom >= compute_min_zoom(grid));
        }
        assert_relative_eq!(grids[0].geometry.zoom, 2.0);
        assert_relative_eq!(grids[1].geometry.zoom, 0.5);

        viewport.set_global_zoom(&mut grids, 50.0);
        assert_relative_eq!(grids[0].geometry.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_unsynced_grid_zoom_is_independent() {
        let mut grids = vec![
            grid_with_viewport("a", (100.0, 100.0)),
            grid_with_viewport("b", (100.0, 100.0)),
        ];
        let mut viewport = ViewportController::default();
        viewport.handle(&mut grids, ViewportEvent::SetSync(false));
        viewport.handle(&mut grids, ViewportEvent::SetGridZoom { grid: 1, zoom: 3.0 });
        assert_relative_eq!(grids[0].geometry.zoom, 1.0);
        assert_relative_eq!(grids[1].geometry.zoom, 3.0);

        viewport.handle(&mut grids, ViewportEvent::SetSync(true));
        assert_relative_eq!(grids[1].geometry.zoom, 1.0);
    }

    #[test]
    fn test_synced_grid_zoom_routes_through_global() {
        let mut grids = vec![
            grid_with_viewport("a", (100.0, 100.0)),
            grid_with_viewport("b", (100.0, 100.0)),
        ];
        let mut viewport = ViewportController::default();
        viewport.handle(&mut grids, ViewportEvent::SetGridZoom { grid: 0, zoom: 2.5 });
        assert_relative_eq!(viewport.global_zoom(), 2.5);
        assert_relative_eq!(grids[1].geometry.zoom, 2.5);
    }

    #[test]
    fn test_scroll_propagates_when_synced() {
        let mut grids = vec![
            grid_with_viewport("a", (100.0, 100.0)),
            grid_with_viewport("b", (100.0, 100.0)),
        ];
        let mut viewport = ViewportController::default();
        viewport.handle(
            &mut grids,
            ViewportEvent::Scroll {
                grid: 0,
                offset: (40.0, 30.0),
            },
        );
        assert_eq!(grids[1].geometry.offset, (40.0, 30.0));

        viewport.handle(&mut grids, ViewportEvent::SetSync(false));
        viewport.handle(
            &mut grids,
            ViewportEvent::Scroll {
                grid: 0,
                offset: (10.0, 10.0),
            },
        );
        assert_eq!(grids[0].geometry.offset, (10.0, 10.0));
        assert_eq!(grids[1].geometry.offset, (40.0, 30.0));
    }

    #[test]
    fn test_scroll_is_clamped_to_content() {
        let mut grids = vec![grid_with_viewport("a", (100.0, 100.0))];
        let mut viewport = ViewportController::default();
        viewport.scroll(&mut grids, 0, (10_000.0, -5.0));
        // 400x200 content in a 100x100 container.
        assert_eq!(grids[0].geometry.offset, (300.0, 0.0));
    }

    #[test]
    fn test_pinch_forces_sync() {
        let mut grids = vec![
            grid_with_viewport("a", (100.0, 100.0)),
            grid_with_viewport("b", (100.0, 100.0)),
        ];
        let mut viewport = ViewportController::default();
        viewport.set_sync(&mut grids, false);
        viewport.handle(
            &mut grids,
            ViewportEvent::Pinch {
                grid: 0,
                scale: 2.0,
                anchor: (0.0, 0.0),
            },
        );
        assert!(viewport.sync_enabled());
        assert_relative_eq!(grids[0].geometry.zoom, 2.0);
        assert_relative_eq!(grids[1].geometry.zoom, 2.0);
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor_fixed() {
        let mut grids = vec![grid_with_viewport("a", (100.0, 100.0))];
        let mut viewport = ViewportController::default();
        viewport.scroll(&mut grids, 0, (40.0, 20.0));
        let anchor = (50.0, 50.0);
        let before = cell_at(&grids[0], anchor);
        viewport.handle(
            &mut grids,
            ViewportEvent::Wheel {
                grid: 0,
                delta: 1.0,
                anchor,
            },
        );
        assert_relative_eq!(grids[0].geometry.zoom, ZOOM_STEP);
        assert_eq!(cell_at(&grids[0], anchor), before);
    }

    #[test]
    fn test_double_click_and_bounds_share_setter() {
        let mut grids = vec![grid_with_viewport("a", (100.0, 100.0))];
        let mut viewport = ViewportController::default();
        for _ in 0..40 {
            viewport.handle(
                &mut grids,
                ViewportEvent::DoubleClick {
                    grid: 0,
                    anchor: (0.0, 0.0),
                },
            );
        }
        assert_relative_eq!(grids[0].geometry.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_resize_reclamps_zoom() {
        let mut grids = vec![grid_with_viewport("a", (100.0, 100.0))];
        let mut viewport = ViewportController::default();
        assert!(viewport.handle(
            &mut grids,
            ViewportEvent::Resize {
                grid: 0,
                size: (1200.0, 100.0),
            },
        ));
        assert_relative_eq!(grids[0].geometry.zoom, 3.0);
    }

    #[test]
    fn test_visible_window() {
        let mut grid = grid_with_viewport("a", (40.0, 20.0));
        grid.geometry.offset = (8.0, 4.0);
        let window = visible_window(&grid);
        assert_eq!(
            window,
            CellWindow {
                x_start: 2,
                x_end: 12,
                y_start: 1,
                y_end: 6,
            }
        );

        grid.geometry.viewport = (0.0, 0.0);
        assert_eq!(visible_window(&grid), CellWindow::full(100, 50));
    }

    #[test]
    fn test_cell_at() {
        let grid = grid_with_viewport("a", (40.0, 20.0));
        assert_eq!(cell_at(&grid, (9.0, 5.0)), Some((2, 1)));
        assert_eq!(cell_at(&grid, (-1.0, 5.0)), None);
        assert_eq!(cell_at(&grid, (4000.0, 5.0)), None);
    }
}
