//! Histogram window with draggable contrast handles.
//!
//! Bars are plotted over bin positions `0..HISTOGRAM_BINS`; the pointer's
//! plot coordinate is handed to the session as a position along that span,
//! so the drag maps through the axis captured at pointer-down.

use eframe::egui::{self, pos2, vec2, Color32, Rect, Sense};
use egui_plot::{Bar, BarChart, Plot, PlotBounds, PlotPoint, VLine};
use stxmlive_core::histogram::{x_for_value, Handle, PointerEvent, HISTOGRAM_BINS};
use stxmlive_core::util::{format_number, usize_to_f32, usize_to_f64};
use stxmlive_core::{color_for, gradient_for, Histogram};

use super::theme::{accent, ThemeColors};
use crate::app::StxmLiveApp;
use crate::util::f64_to_f32;

const CHART_SIZE: egui::Vec2 = vec2(360.0, 140.0);
const LEGEND_HEIGHT: f32 = 12.0;
const LEGEND_STEPS: usize = 96;

/// Headroom above the tallest bar.
const PEAK_MARGIN: f64 = 1.05;

struct PlotPointer {
    position: Option<PlotPoint>,
    over_plot: bool,
}

impl StxmLiveApp {
    /// Render the histogram window (if visible).
    pub(crate) fn render_histogram_window(&mut self, ctx: &egui::Context) {
        if !self.ui_state.show_histogram || self.session.grids().is_empty() {
            return;
        }
        let mut open = true;
        egui::Window::new("Histogram")
            .open(&mut open)
            .resizable(false)
            .default_pos(pos2(320.0, 480.0))
            .show(ctx, |ui| self.render_histogram_contents(ui));
        if !open {
            self.ui_state.show_histogram = false;
        }
    }

    fn render_histogram_contents(&mut self, ui: &mut egui::Ui) {
        let Some(histogram) = self.histogram.clone() else {
            ui.label("No data");
            return;
        };
        let name = self
            .session
            .grids()
            .get(self.session.active_grid())
            .map_or("", |g| g.name())
            .to_string();
        ui.label(format!("{name}: {} cells", format_number(histogram.total())));

        let pointer = self.plot_histogram(ui, &histogram);
        self.handle_histogram_pointer(ui, &pointer, histogram.range());
        paint_legend(ui, self.session.scheme(), CHART_SIZE.x);

        let (low, high) = histogram.range();
        ui.horizontal(|ui| {
            ui.label(format!("{low:.0}"));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{high:.0}"));
            });
        });
        if histogram.log_scale() {
            ui.label(egui::RichText::new("log10(1 + count)").weak());
        }
    }

    /// Draw bars and handles; returns where the pointer is in bin units.
    fn plot_histogram(&self, ui: &mut egui::Ui, histogram: &Histogram) -> PlotPointer {
        let colors = ThemeColors::from_ui(ui);
        let scheme = self.session.scheme();
        let bins = usize_to_f64(HISTOGRAM_BINS);
        let heights = histogram.heights();
        let peak = histogram.max_height().max(1.0) * PEAK_MARGIN;

        let bars: Vec<Bar> = heights
            .iter()
            .enumerate()
            .map(|(i, &height)| {
                let center = usize_to_f64(i) + 0.5;
                let [r, g, b] = color_for(f64_to_f32(center / bins), scheme);
                Bar::new(center, height)
                    .width(0.9)
                    .fill(Color32::from_rgb(r, g, b))
            })
            .collect();

        let axis = histogram.range();
        let active = self.session.histogram_interaction().active_handle();
        let handles: Vec<VLine> = self
            .session
            .active_range_at(self.session.active_grid())
            .map(|(min, max)| {
                [(Handle::Min, min), (Handle::Max, max)]
                    .into_iter()
                    .map(|(handle, value)| {
                        let color = if active == Some(handle) {
                            accent::AMBER
                        } else {
                            colors.text_primary
                        };
                        VLine::new(x_for_value(value, bins, axis)).color(color).width(2.0)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Plot::new("stxm_histogram")
            .width(CHART_SIZE.x)
            .height(CHART_SIZE.y)
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
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, 0.0], [bins, peak]));
                plot_ui.bar_chart(BarChart::new(bars).name("counts"));
                for handle in handles {
                    plot_ui.vline(handle);
                }
                let position = plot_ui
                    .ctx()
                    .input(|i| i.pointer.latest_pos())
                    .map(|pos| plot_ui.plot_from_screen(pos));
                PlotPointer {
                    position,
                    over_plot: plot_ui.response().contains_pointer(),
                }
            })
            .inner
    }

    fn handle_histogram_pointer(
        &mut self,
        ui: &egui::Ui,
        pointer: &PlotPointer,
        axis: (f64, f64),
    ) {
        let width = usize_to_f64(HISTOGRAM_BINS);
        let (pressed, released) =
            ui.input(|i| (i.pointer.primary_pressed(), i.pointer.primary_released()));
        let dragging = self.session.histogram_interaction().is_dragging();

        if dragging && released {
            self.session.handle_histogram(PointerEvent::Up, axis);
        } else if let Some(PlotPoint { x, .. }) = pointer.position {
            if pressed && pointer.over_plot {
                self.session.handle_histogram(PointerEvent::Down { x, width }, axis);
            } else if dragging {
                self.session.handle_histogram(PointerEvent::Move { x, width }, axis);
            }
        }
    }
}

/// Horizontal color legend for `scheme`.
fn paint_legend(ui: &mut egui::Ui, scheme: stxmlive_core::ColorScheme, width: f32) {
    let (rect, _) = ui.allocate_exact_size(vec2(width, LEGEND_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let gradient = gradient_for(scheme, false);
    let step = width / usize_to_f32(LEGEND_STEPS);
    for i in 0..LEGEND_STEPS {
        let t = usize_to_f32(i) / usize_to_f32(LEGEND_STEPS - 1);
        let [r, g, b] = gradient.sample(t);
        let left = rect.left() + usize_to_f32(i) * step;
        painter.rect_filled(
            Rect::from_min_max(pos2(left, rect.top()), pos2(left + step + 0.5, rect.bottom())),
            0.0,
            Color32::from_rgb(r, g, b),
        );
    }
}
