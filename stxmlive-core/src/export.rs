//! Still-image and metadata export of the current session.
//!
//! The image shows every grid side by side at the current zoom, with the
//! active grid's histogram and the color legend underneath. A JSON record
//! with the same file stem describes the contrast and view settings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::colormap::{color_for, ColorScheme};
use crate::error::{Error, Result};
use crate::grid::GridState;
use crate::histogram::HISTOGRAM_BINS;
use crate::render::Renderer;
use crate::session::Session;
use crate::surface::{PixelBuffer, RasterSurface};
use crate::util::{f64_to_usize_clamped, usize_to_f32, usize_to_f64};

/// Gap between panels, in pixels.
const PADDING: usize = 8;

/// Height of the histogram panel.
const HISTOGRAM_HEIGHT: usize = 96;

/// Width of one histogram bar.
const BAR_WIDTH: usize = 4;

/// Height of the legend strip under the histogram.
const LEGEND_HEIGHT: usize = 10;

/// Largest integer upscale applied to grids.
const MAX_SCALE: usize = 32;

/// Largest composed image edge reached by upscaling. Grids wider than this
/// at one pixel per cell are exported at one pixel per cell.
pub const MAX_EXPORT_EDGE: usize = 8192;

const BACKGROUND: [u8; 4] = [18, 18, 18, 255];
const PANEL: [u8; 4] = [32, 32, 32, 255];

/// Contrast range of one threshold at export time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// Sidecar JSON record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub timestamp: String,
    pub scheme: ColorScheme,
    pub autoscale: bool,
    pub manual_min: i64,
    pub manual_max: i64,
    pub zoom: f64,
    pub sync_views: bool,
    pub histogram_log: bool,
    pub thresholds: Vec<ThresholdRange>,
}

/// Files written by [`write_export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub image: PathBuf,
    pub metadata: PathBuf,
}

/// Integer pixels per cell for the exported image.
///
/// Follows the on-screen cell size, reduced so the composed image stays
/// within [`MAX_EXPORT_EDGE`] on both axes.
fn export_scale(session: &Session) -> usize {
    let grids = session.grids();
    let base = grids.first().map_or(1.0, |g| g.geometry.base_pixel_size);
    let wanted = f64_to_usize_clamped(
        (base * session.viewport().global_zoom()).round(),
        MAX_SCALE,
    );

    let total_width: usize = grids.iter().map(GridState::width).sum();
    let gaps = PADDING * (grids.len() + 1);
    let max_height = grids.iter().map(GridState::height).max().unwrap_or(0);
    let fixed_height = 3 * PADDING + HISTOGRAM_HEIGHT + LEGEND_HEIGHT;

    let fit_width = MAX_EXPORT_EDGE
        .saturating_sub(gaps)
        .checked_div(total_width)
        .unwrap_or(MAX_SCALE);
    let fit_height = MAX_EXPORT_EDGE
        .saturating_sub(fixed_height)
        .checked_div(max_height)
        .unwrap_or(MAX_SCALE);
    wanted.min(fit_width).min(fit_height).max(1)
}

/// Compose every grid, the active histogram, and the legend into one image.
#[must_use]
pub fn compose_image(session: &Session) -> PixelBuffer {
    let scale = export_scale(session);
    let panels: Vec<PixelBuffer> = session
        .grids()
        .iter()
        .map(|grid| {
            let range = session.contrast().active_range(grid);
            Renderer::render_buffer(grid, range, session.scheme()).upscale(scale)
        })
        .collect();

    let grids_width = panels.iter().map(|p| p.width() + PADDING).sum::<usize>() + PADDING;
    let grids_height = panels.iter().map(PixelBuffer::height).max().unwrap_or(0);
    let hist_width = HISTOGRAM_BINS * BAR_WIDTH;
    let width = grids_width.max(hist_width + 2 * PADDING);
    let height = PADDING + grids_height + PADDING + HISTOGRAM_HEIGHT + LEGEND_HEIGHT + PADDING;

    let mut canvas = PixelBuffer::new(width, height, BACKGROUND);
    let mut x = PADDING;
    for panel in &panels {
        canvas.blit(panel, x, PADDING);
        x += panel.width() + PADDING;
    }

    let hist_top = PADDING + grids_height + PADDING;
    canvas.fill_rect(PADDING, hist_top, hist_width, HISTOGRAM_HEIGHT, PANEL);
    if let Some(histogram) = session.histogram() {
        let heights = histogram.heights();
        let peak = histogram.max_height();
        for (bin, h) in heights.iter().enumerate() {
            if peak <= 0.0 || *h <= 0.0 {
                continue;
            }
            let bar = f64_to_usize_clamped(
                (h / peak * usize_to_f64(HISTOGRAM_HEIGHT)).ceil(),
                HISTOGRAM_HEIGHT,
            );
            let [r, g, b] = color_for(bin_center(bin), session.scheme());
            canvas.fill_rect(
                PADDING + bin * BAR_WIDTH,
                hist_top + HISTOGRAM_HEIGHT - bar,
                BAR_WIDTH - 1,
                bar,
                [r, g, b, 255],
            );
        }
    }

    let legend_top = hist_top + HISTOGRAM_HEIGHT;
    for column in 0..hist_width {
        let t = usize_to_f32(column) / usize_to_f32(hist_width - 1);
        let [r, g, b] = color_for(t, session.scheme());
        canvas.fill_rect(PADDING + column, legend_top, 1, LEGEND_HEIGHT, [r, g, b, 255]);
    }
    canvas
}

fn bin_center(bin: usize) -> f32 {
    (usize_to_f32(bin) + 0.5) / usize_to_f32(HISTOGRAM_BINS)
}

/// Metadata describing the session at `timestamp`.
#[must_use]
pub fn metadata(session: &Session, timestamp: DateTime<Local>) -> ExportMetadata {
    let contrast = session.contrast();
    ExportMetadata {
        timestamp: timestamp.to_rfc3339(),
        scheme: session.scheme(),
        autoscale: contrast.auto_scale(),
        manual_min: contrast.manual_min(),
        manual_max: contrast.manual_max(),
        zoom: session.viewport().global_zoom(),
        sync_views: session.viewport().sync_enabled(),
        histogram_log: session.histogram_log(),
        thresholds: session
            .grids()
            .iter()
            .map(|grid| {
                let (min, max) = contrast.active_range(grid);
                ThresholdRange {
                    name: grid.name().to_string(),
                    min,
                    max,
                }
            })
            .collect(),
    }
}

/// File stem for an export taken at `timestamp`.
#[must_use]
pub fn file_stem(timestamp: DateTime<Local>) -> String {
    format!("stxm_snapshot_{}", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Write `<stem>.png` and `<stem>.json` into `dir`, stamped with the current time.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or either file cannot
/// be written.
pub fn write_export(session: &Session, dir: &Path) -> Result<ExportPaths> {
    write_export_at(session, dir, Local::now())
}

/// [`write_export`] with an explicit timestamp.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or either file cannot
/// be written.
pub fn write_export_at(session: &Session, dir: &Path, timestamp: DateTime<Local>) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;
    let stem = file_stem(timestamp);
    let paths = ExportPaths {
        image: dir.join(format!("{stem}.png")),
        metadata: dir.join(format!("{stem}.json")),
    };

    let canvas = compose_image(session);
    let (width, height) = (dimension(canvas.width())?, dimension(canvas.height())?);
    let rgba = image::RgbaImage::from_raw(width, height, canvas.into_rgba())
        .ok_or_else(|| Error::InvalidInput("export buffer size mismatch".into()))?;
    rgba.save(&paths.image)?;

    let record = metadata(session, timestamp);
    std::fs::write(&paths.metadata, serde_json::to_string_pretty(&record)?)?;

    log::info!(
        "exported {} and {}",
        paths.image.display(),
        paths.metadata.display()
    );
    Ok(paths)
}

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidInput(format!("export dimension {value} too large")))
}
