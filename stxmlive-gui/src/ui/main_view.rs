//! Main view (central panel): one grid view per threshold with its profiles.

use eframe::egui::{self, pos2, vec2, Color32, Rect, Stroke};
use egui_plot::{Bar, BarChart, Line, Plot, PlotBounds, PlotPoints};
use stxmlive_core::util::{usize_to_f32, usize_to_f64};
use stxmlive_core::viewport::{cell_at, content_size, visible_window};
use stxmlive_core::{ConnectionState, Profile, ProfileAxis, ViewportEvent};

use super::theme::{accent, ThemeColors};
use crate::app::StxmLiveApp;
use crate::state::CursorInfo;
use crate::util::{f64_to_f32, pair_to_vec, vec_to_pair};

/// Thickness of the projection strips.
const PROFILE_DEPTH: f32 = 56.0;

/// Smallest grid view edge.
const MIN_VIEW: f32 = 120.0;

/// Scroll distance, in points, that counts as one wheel notch.
const WHEEL_NOTCH: f64 = 50.0;

const HEADER_HEIGHT: f32 = 22.0;

impl StxmLiveApp {
    /// Render the central panel with every grid.
    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let count = self.session.grids().len();
            if count == 0 {
                let text = match self.handler.state() {
                    ConnectionState::Connected => "Waiting for configuration".to_string(),
                    ConnectionState::Connecting => format!("Connecting to {}", self.client.url()),
                    ConnectionState::Disconnected => "Disconnected".to_string(),
                };
                ui.centered_and_justified(|ui| ui.label(text));
                return;
            }

            let depth = if self.ui_state.show_projections {
                PROFILE_DEPTH
            } else {
                0.0
            };
            let spacing = ui.spacing().item_spacing;
            let avail = ui.available_size();
            let per_panel =
                (avail.x - spacing.x * usize_to_f32(count - 1)) / usize_to_f32(count);
            let width = (per_panel - depth - spacing.x).max(MIN_VIEW);
            let height = (avail.y - depth - HEADER_HEIGHT - 2.0 * spacing.y).max(MIN_VIEW);
            let view = vec2(width, width.min(height));

            let mut hovered = None;
            ui.horizontal_wrapped(|ui| {
                for index in 0..count {
                    ui.vertical(|ui| {
                        if let Some(info) = self.render_grid_panel(ui, index, view, depth) {
                            hovered = Some(info);
                        }
                    });
                }
            });
            self.cursor_info = hovered;
        });
    }

    fn render_grid_panel(
        &mut self,
        ui: &mut egui::Ui,
        index: usize,
        view: egui::Vec2,
        depth: f32,
    ) -> Option<CursorInfo> {
        let (name, range) = {
            let grid = self.session.grids().get(index)?;
            (grid.name().to_string(), self.session.active_range_at(index)?)
        };
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(name).strong());
            ui.label(egui::RichText::new(format!("[{:.0} .. {:.0}]", range.0, range.1)).weak());
        });

        let hovered = ui
            .horizontal_top(|ui| {
                let hovered = self.render_grid_view(ui, index, view);
                if depth > 0.0 {
                    let rows = self.profiles.get(index).and_then(Option::as_ref).map(|(_, r)| r);
                    render_profile(ui, (index, ProfileAxis::Rows), rows, vec2(depth, view.y));
                }
                hovered
            })
            .inner;
        if depth > 0.0 {
            let cols = self.profiles.get(index).and_then(Option::as_ref).map(|(c, _)| c);
            render_profile(ui, (index, ProfileAxis::Columns), cols, vec2(view.x, depth));
        }
        hovered
    }

    fn render_grid_view(
        &mut self,
        ui: &mut egui::Ui,
        index: usize,
        size: egui::Vec2,
    ) -> Option<CursorInfo> {
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let size = vec_to_pair(size);
        let resized = self
            .session
            .grids()
            .get(index)
            .is_some_and(|grid| grid.geometry.viewport != size);
        if resized {
            self.session
                .handle_viewport(ViewportEvent::Resize { grid: index, size });
        }
        self.handle_view_input(ui, index, rect, &response);

        let colors = ThemeColors::from_ui(ui);
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, colors.canvas);

        let grid = self.session.grids().get(index)?;
        let cell = grid.geometry.cell_size();
        let origin = rect.min - pair_to_vec(grid.geometry.offset);
        if let Some(Some(texture)) = self.textures.get(index) {
            let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
            let image_rect = Rect::from_min_size(origin, pair_to_vec(content_size(grid)));
            painter.image(texture.id(), image_rect, uv, Color32::WHITE);
        }

        let window = visible_window(grid);
        let (verticals, horizontals) = self.session.renderer.grid_lines(window, cell);
        let stroke = Stroke::new(1.0, colors.grid_line);
        for x in verticals {
            painter.vline(origin.x + f64_to_f32(x), rect.y_range(), stroke);
        }
        for y in horizontals {
            painter.hline(rect.x_range(), origin.y + f64_to_f32(y), stroke);
        }

        let cell_pt = f64_to_f32(cell);
        let font = egui::FontId::monospace((cell_pt * 0.35).clamp(8.0, 14.0));
        for label in self.session.renderer.cell_labels(grid, window, cell) {
            let center = origin
                + vec2(
                    (usize_to_f32(label.x) + 0.5) * cell_pt,
                    (usize_to_f32(label.y) + 0.5) * cell_pt,
                );
            painter.text(
                center,
                egui::Align2::CENTER_CENTER,
                label.text,
                font.clone(),
                Color32::WHITE,
            );
        }
        painter.rect_stroke(rect, 0.0, Stroke::new(1.0, colors.border));

        let pointer = response.hover_pos()?;
        let (x, y) = cell_at(grid, vec_to_pair(pointer - rect.min))?;
        let cell_index = y * grid.width() + x;
        Some(CursorInfo {
            grid: index,
            x,
            y,
            value: grid
                .values()
                .get(cell_index)
                .copied()
                .filter(|_| grid.is_valid(cell_index)),
        })
    }

    /// Translate wheel, pinch, double-click and drag over a grid into viewport events.
    fn handle_view_input(
        &mut self,
        ui: &egui::Ui,
        index: usize,
        rect: Rect,
        response: &egui::Response,
    ) {
        if let Some(pos) = response.hover_pos() {
            let anchor = vec_to_pair(pos - rect.min);
            let (scroll, zoom) = ui.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));
            if (zoom - 1.0).abs() > f32::EPSILON {
                self.session.handle_viewport(ViewportEvent::Pinch {
                    grid: index,
                    scale: f64::from(zoom),
                    anchor,
                });
            } else if scroll != 0.0 {
                self.session.handle_viewport(ViewportEvent::Wheel {
                    grid: index,
                    delta: f64::from(scroll) / WHEEL_NOTCH,
                    anchor,
                });
            }
            if response.double_clicked() {
                self.session
                    .handle_viewport(ViewportEvent::DoubleClick { grid: index, anchor });
            }
        }

        if response.dragged() {
            let (dx, dy) = vec_to_pair(response.drag_delta());
            let offset = self.session.grids().get(index).map(|g| g.geometry.offset);
            if let Some((ox, oy)) = offset {
                self.session.handle_viewport(ViewportEvent::Scroll {
                    grid: index,
                    offset: (ox - dx, oy - dy),
                });
            }
        }
    }
}

/// Plot a profile into a strip of `size` points.
///
/// The plot spans the strip in chart pixels with y flipped, so samples line
/// up with the cells of the grid view next to it.
fn render_profile(
    ui: &mut egui::Ui,
    id: (usize, ProfileAxis),
    profile: Option<&Profile>,
    size: egui::Vec2,
) {
    let colors = ThemeColors::from_ui(ui);
    let (width, height) = (f64::from(size.x), f64::from(size.y));
    let profile = profile.filter(|p| !p.is_empty());

    let (line, bars) = profile.map_or_else(
        || (Vec::new(), Vec::new()),
        |profile| {
            let (length, depth) = match profile.axis {
                ProfileAxis::Columns => (width, height),
                ProfileAxis::Rows => (height, width),
            };
            let points: Vec<[f64; 2]> = profile
                .chart_points(length, depth)
                .into_iter()
                .map(|(x, y)| [x, height - y])
                .collect();
            let step = length / usize_to_f64(points.len().max(1));
            let bars = points
                .iter()
                .map(|&[x, y]| match profile.axis {
                    ProfileAxis::Columns => Bar::new(x, y).width(step),
                    ProfileAxis::Rows => Bar::new(y, x).width(step),
                })
                .map(|bar| bar.fill(colors.profile_fill).stroke(Stroke::NONE))
                .collect();
            (points, bars)
        },
    );
    let horizontal = matches!(id.1, ProfileAxis::Rows);

    let response = Plot::new(("stxm_profile", id.0, horizontal))
        .width(size.x)
        .height(size.y)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .allow_double_click_reset(false)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, 0.0], [width, height]));
            let chart = BarChart::new(bars);
            plot_ui.bar_chart(if horizontal { chart.horizontal() } else { chart });
            if !line.is_empty() {
                plot_ui.line(Line::new(PlotPoints::new(line)).color(accent::BLUE).width(1.5));
            }
        })
        .response;

    let Some(profile) = profile else {
        return;
    };
    let rect = response.rect;
    let painter = ui.painter_at(rect);
    let (low, high) = profile.end_labels();
    let font = egui::FontId::monospace(9.0);
    let (low_pos, low_align, high_pos, high_align) = match profile.axis {
        ProfileAxis::Columns => (
            rect.left_bottom(),
            egui::Align2::LEFT_BOTTOM,
            rect.left_top(),
            egui::Align2::LEFT_TOP,
        ),
        ProfileAxis::Rows => (
            rect.left_top(),
            egui::Align2::LEFT_TOP,
            rect.right_top(),
            egui::Align2::RIGHT_TOP,
        ),
    };
    painter.text(low_pos, low_align, low, font.clone(), colors.text_muted);
    painter.text(high_pos, high_align, high, font, colors.text_muted);
}
