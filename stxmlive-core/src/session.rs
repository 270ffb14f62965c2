//! The client session: every piece of mutable view state in one place.
//!
//! A [`Session`] owns the grids and the settings shared between them
//! (contrast, color scheme, zoom/sync, overlays, histogram mode) and is the
//! [`StreamTarget`] the protocol handler writes into. Display code borrows it;
//! nothing is global.

use serde::Serialize;

use crate::colormap::ColorScheme;
use crate::config::{ClientConfig, ConnectionInfo, GlobalConfig};
use crate::contrast::ContrastModel;
use crate::error::{Error, Result};
use crate::grid::{GridState, GridSummary};
use crate::histogram::{Histogram, HistogramInteraction, PointerEvent};
use crate::projection::{Profile, ProjectionEngine};
use crate::protocol::{ConfigMessage, ServerMessage, SnapshotMessage, UpdateMessage};
use crate::redraw::{RedrawKind, RedrawScheduler};
use crate::render::Renderer;
use crate::stream::{ConnectionState, StreamTarget};
use crate::viewport::{visible_window, ViewportController, ViewportEvent};

/// Message counters since the session started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    pub configs: u64,
    pub updates: u64,
    pub snapshots: u64,
    /// Updates or snapshot entries that could not be applied.
    pub rejected: u64,
}

/// Statistics for one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSummary {
    pub name: String,
    #[serde(flatten)]
    pub stats: GridSummary,
}

/// Snapshot of the session for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub width: usize,
    pub height: usize,
    pub thresholds: Vec<ThresholdSummary>,
    pub counters: SessionCounters,
}

/// Live client state.
#[derive(Debug)]
pub struct Session {
    config: Option<GlobalConfig>,
    connection_info: ConnectionInfo,
    grids: Vec<GridState>,
    active_grid: usize,
    base_pixel_size: f64,
    contrast: ContrastModel,
    scheme: ColorScheme,
    viewport: ViewportController,
    /// Grid-line and label toggles.
    pub renderer: Renderer,
    histogram_log: bool,
    histogram_interaction: HistogramInteraction,
    connection: ConnectionState,
    redraw: RedrawScheduler,
    counters: SessionCounters,
}

impl Session {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            config: None,
            connection_info: ConnectionInfo::default(),
            grids: Vec::new(),
            active_grid: 0,
            base_pixel_size: config.base_pixel_size,
            contrast: ContrastModel::default(),
            scheme: config.scheme,
            viewport: ViewportController::default(),
            renderer: Renderer::default(),
            histogram_log: false,
            histogram_interaction: HistogramInteraction::default(),
            connection: ConnectionState::Disconnected,
            redraw: RedrawScheduler::new(config.redraw_profile),
            counters: SessionCounters::default(),
        }
    }

    /// Apply any server message, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error only for a rejected config; updates and snapshots that
    /// cannot be applied are logged and counted.
    pub fn apply_message(&mut self, message: ServerMessage) -> Result<()> {
        match message {
            ServerMessage::Config(config) => return self.apply_config(config),
            ServerMessage::Update(update) => self.apply_update(update),
            ServerMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
        }
        Ok(())
    }

    /// Active layout, if a config has been received.
    #[must_use]
    pub fn config(&self) -> Option<&GlobalConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.connection_info
    }

    #[must_use]
    pub fn grids(&self) -> &[GridState] {
        &self.grids
    }

    /// Grids, for draining dirty flags.
    pub fn grids_mut(&mut self) -> &mut [GridState] {
        &mut self.grids
    }

    #[must_use]
    pub fn grid(&self, name: &str) -> Option<&GridState> {
        self.grids.iter().find(|g| g.name() == name)
    }

    #[must_use]
    pub fn grid_index(&self, name: &str) -> Option<usize> {
        self.grids.iter().position(|g| g.name() == name)
    }

    /// Contrast range used to color the named grid.
    #[must_use]
    pub fn active_range(&self, name: &str) -> Option<(f64, f64)> {
        self.grid(name).map(|g| self.contrast.active_range(g))
    }

    /// Contrast range used to color grid `index`.
    #[must_use]
    pub fn active_range_at(&self, index: usize) -> Option<(f64, f64)> {
        self.grids.get(index).map(|g| self.contrast.active_range(g))
    }

    #[must_use]
    pub fn contrast(&self) -> &ContrastModel {
        &self.contrast
    }

    /// Switch auto-scale. Turning it off seeds the manual range from the
    /// active grid's observed extrema so the image keeps its contrast.
    pub fn set_auto_scale(&mut self, enabled: bool) {
        if self.contrast.auto_scale() == enabled {
            return;
        }
        let observed = self
            .grids
            .get(self.active_grid)
            .filter(|grid| grid.min_value().is_some())
            .map(|grid| self.contrast.active_range(grid));
        match observed {
            Some(range) if !enabled => self.contrast.capture_auto_seed(range),
            _ => self.contrast.set_auto_scale(enabled),
        }
        self.contrast_changed();
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite input; nothing changes.
    pub fn set_manual_min(&mut self, value: f64) -> Result<i64> {
        let applied = self.contrast.set_manual_min(value)?;
        self.contrast_changed();
        Ok(applied)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite input; nothing changes.
    pub fn set_manual_max(&mut self, value: f64) -> Result<i64> {
        let applied = self.contrast.set_manual_max(value)?;
        self.contrast_changed();
        Ok(applied)
    }

    #[must_use]
    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        if self.scheme != scheme {
            self.scheme = scheme;
            self.contrast_changed();
        }
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    /// Route a zoom/scroll/resize event to the viewport controller.
    pub fn handle_viewport(&mut self, event: ViewportEvent) -> bool {
        let changed = self.viewport.handle(&mut self.grids, event);
        if changed {
            self.redraw.request(RedrawKind::Projections);
            self.redraw.request(RedrawKind::Labels);
        }
        changed
    }

    /// Index of the grid the histogram describes.
    #[must_use]
    pub fn active_grid(&self) -> usize {
        self.active_grid
    }

    pub fn set_active_grid(&mut self, index: usize) {
        if index < self.grids.len() && index != self.active_grid {
            self.active_grid = index;
            self.redraw.request(RedrawKind::Histogram);
        }
    }

    #[must_use]
    pub fn histogram_log(&self) -> bool {
        self.histogram_log
    }

    pub fn set_histogram_log(&mut self, enabled: bool) {
        self.histogram_log = enabled;
        self.redraw.request(RedrawKind::Histogram);
    }

    /// Histogram of the active grid over its active range.
    #[must_use]
    pub fn histogram(&self) -> Option<Histogram> {
        let grid = self.grids.get(self.active_grid)?;
        Some(Histogram::compute(
            grid,
            self.contrast.active_range(grid),
            self.histogram_log,
        ))
    }

    #[must_use]
    pub fn histogram_interaction(&self) -> &HistogramInteraction {
        &self.histogram_interaction
    }

    /// Route a pointer event on the histogram to the handle drag.
    ///
    /// `axis` is the range the histogram is currently drawn over.
    pub fn handle_histogram(&mut self, event: PointerEvent, axis: (f64, f64)) -> bool {
        let changed = self
            .histogram_interaction
            .handle(event, &mut self.contrast, axis);
        if changed {
            self.contrast_changed();
        }
        changed
    }

    /// Column and row profiles of grid `index` over its visible window.
    #[must_use]
    pub fn profiles(&self, index: usize) -> Option<(Profile, Profile)> {
        let grid = self.grids.get(index)?;
        Some(ProjectionEngine::profiles(grid, visible_window(grid)))
    }

    /// Last reported state of the stream connection.
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn redraw(&self) -> &RedrawScheduler {
        &self.redraw
    }

    pub fn redraw_mut(&mut self) -> &mut RedrawScheduler {
        &mut self.redraw
    }

    #[must_use]
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Per-threshold statistics over valid cells.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let (width, height) = self
            .config
            .as_ref()
            .map_or((0, 0), |c| (c.width, c.height));
        SessionSummary {
            width,
            height,
            thresholds: self
                .grids
                .iter()
                .map(|g| ThresholdSummary {
                    name: g.name().to_string(),
                    stats: g.summary(),
                })
                .collect(),
            counters: self.counters,
        }
    }

    fn contrast_changed(&mut self) {
        for grid in &mut self.grids {
            grid.mark_dirty();
        }
        self.redraw.request_all();
    }

    fn cell_index(&self, image_id: i64) -> Result<usize> {
        let len = self.config.as_ref().map_or(0, GlobalConfig::cell_count);
        usize::try_from(image_id)
            .ok()
            .filter(|&i| i < len)
            .ok_or_else(|| Error::Protocol(format!("image_id {image_id} outside grid of {len} cells")))
    }
}

impl StreamTarget for Session {
    fn apply_config(&mut self, message: ConfigMessage) -> Result<()> {
        let config = GlobalConfig::from_message(&message)?;
        log::info!(
            "config: {}x{} grid, thresholds {:?}",
            config.width,
            config.height,
            config.thresholds
        );
        self.grids = config
            .thresholds
            .iter()
            .map(|name| {
                let mut grid = GridState::new(name.as_str(), config.width, config.height);
                grid.geometry.base_pixel_size = self.base_pixel_size;
                grid
            })
            .collect();
        self.viewport.reset();
        self.active_grid = 0;
        self.connection_info = ConnectionInfo::from_message(&message);
        self.config = Some(config);
        self.counters.configs += 1;
        self.redraw.request_all();
        Ok(())
    }

    fn apply_update(&mut self, update: UpdateMessage) {
        let index = match self.cell_index(update.image_id) {
            Ok(index) => index,
            Err(e) => {
                self.counters.rejected += 1;
                log::warn!("dropping update: {e}");
                return;
            }
        };
        self.counters.updates += 1;
        for (name, value) in &update.data {
            let Some(grid) = self.grids.iter_mut().find(|g| g.name() == name) else {
                log::debug!("update for unknown threshold '{name}'");
                continue;
            };
            match grid.apply_cell_update(index, *value) {
                Ok(extrema_changed) => {
                    if extrema_changed {
                        self.redraw.request(RedrawKind::Labels);
                    }
                }
                Err(e) => {
                    self.counters.rejected += 1;
                    log::warn!("update for '{name}' rejected: {e}");
                }
            }
        }
        self.redraw.request(RedrawKind::Grids);
        self.redraw.request(RedrawKind::Projections);
        self.redraw.request(RedrawKind::Histogram);
    }

    fn apply_snapshot(&mut self, snapshot: SnapshotMessage) {
        self.counters.snapshots += 1;
        for (name, data) in &snapshot.data {
            let Some(grid) = self.grids.iter_mut().find(|g| g.name() == name) else {
                log::debug!("snapshot for unknown threshold '{name}'");
                continue;
            };
            if let Err(e) = grid.apply_snapshot(&data.values, &data.mask) {
                self.counters.rejected += 1;
                log::warn!("{e}");
            }
        }
        self.redraw.request_all();
    }

    fn on_disconnect(&mut self) {
        self.connection = ConnectionState::Disconnected;
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        self.connection = state;
    }
}
