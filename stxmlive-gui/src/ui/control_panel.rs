//! Control panel (left sidebar) and bottom status bar rendering.

use eframe::egui::{self, RichText};
use rfd::FileDialog;
use stxmlive_core::util::{format_number, i64_to_f64};
use stxmlive_core::viewport::{MAX_ZOOM, MIN_ZOOM_FLOOR};
use stxmlive_core::{ColorScheme, ConnectionState, RedrawProfile, ViewportEvent};

use super::theme::{
    accent, connection_color, primary_button, section_header, stat_label, stat_value,
};
use crate::app::StxmLiveApp;

impl StxmLiveApp {
    /// Render the bottom bar with the status message and cursor readout.
    pub(crate) fn render_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let state = self.handler.state();
                ui.label(RichText::new("●").color(connection_color(state)));
                ui.label(state.to_string());
                ui.separator();
                ui.label(self.ui_state.status_text.as_str());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(info) = self.cursor_info {
                        let name = self
                            .session
                            .grids()
                            .get(info.grid)
                            .map_or("", |g| g.name());
                        let value = info.value.map_or_else(|| "-".to_string(), |v| v.to_string());
                        ui.monospace(format!("{name} x={} y={} value={value}", info.x, info.y));
                    }
                });
            });
        });
    }

    /// Render the left control panel.
    pub(crate) fn render_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(290.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.label(
                        RichText::new("STXM LIVE")
                            .size(14.0)
                            .strong()
                            .color(accent::BLUE),
                    );
                    ui.add_space(6.0);
                    self.render_connection_section(ui);
                    ui.separator();
                    self.render_display_section(ui);
                    ui.separator();
                    self.render_view_section(ui);
                    ui.separator();
                    self.render_statistics_section(ui);
                    ui.separator();
                    self.render_export_section(ui);
                });
            });
    }

    fn render_connection_section(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Stream"));
        ui.horizontal(|ui| {
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.ui_state.url_input).desired_width(180.0),
            );
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add(primary_button("Connect")).clicked() || submitted {
                self.reconnect_to_input();
            }
        });
        if self.handler.state() == ConnectionState::Disconnected
            && self.handler.pending_reconnect().is_some()
        {
            ui.label(stat_label("Reconnect scheduled"));
        }

        let connection = self.session.connection();
        egui::Grid::new("subsystems").num_columns(2).show(ui, |ui| {
            ui.label(stat_label("Connection"));
            ui.label(
                RichText::new(connection.to_string())
                    .size(11.0)
                    .color(connection_color(connection)),
            );
            ui.end_row();
        });

        let info = self.session.connection_info();
        if !info.is_empty() {
            ui.collapsing("Detector endpoint", |ui| {
                egui::Grid::new("endpoint").num_columns(2).show(ui, |ui| {
                    let rows = [
                        ("Detector IP", info.detector_ip.clone()),
                        ("ZMQ port", info.zmq_port.map(|p| p.to_string())),
                        ("API port", info.api_port.map(|p| p.to_string())),
                        ("Endpoint", info.endpoint.clone()),
                        ("SIMPLON", info.simplon_base_url.clone()),
                    ];
                    for (label, value) in rows {
                        if let Some(value) = value {
                            ui.label(stat_label(label));
                            ui.label(stat_value(&value));
                            ui.end_row();
                        }
                    }
                });
            });
        }
    }

    fn render_display_section(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Display"));

        let mut scheme = self.session.scheme();
        egui::ComboBox::from_label("Colors")
            .selected_text(scheme.to_string())
            .show_ui(ui, |ui| {
                for option in ColorScheme::ALL {
                    ui.selectable_value(&mut scheme, option, option.to_string());
                }
            });
        self.session.set_scheme(scheme);

        let mut auto = self.session.contrast().auto_scale();
        if ui.checkbox(&mut auto, "Auto scale").changed() {
            self.session.set_auto_scale(auto);
        }

        let mut min = self.session.contrast().manual_min();
        let mut max = self.session.contrast().manual_max();
        ui.add_enabled_ui(!auto, |ui| {
            ui.horizontal(|ui| {
                ui.label("Min");
                let min_changed = ui.add(egui::DragValue::new(&mut min).speed(1.0)).changed();
                ui.label("Max");
                let max_changed = ui.add(egui::DragValue::new(&mut max).speed(1.0)).changed();
                let result = if min_changed {
                    self.session.set_manual_min(i64_to_f64(min))
                } else if max_changed {
                    self.session.set_manual_max(i64_to_f64(max))
                } else {
                    return;
                };
                if let Err(e) = result {
                    log::debug!("ignoring contrast edit: {e}");
                    self.ui_state.status_text = e.to_string();
                }
            });
        });

        let mut log = self.session.histogram_log();
        if ui.checkbox(&mut log, "Log histogram").changed() {
            self.session.set_histogram_log(log);
        }
        ui.checkbox(&mut self.ui_state.show_histogram, "Show histogram");
    }

    fn render_view_section(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("View"));

        let mut zoom = self.session.viewport().global_zoom();
        let slider = egui::Slider::new(&mut zoom, MIN_ZOOM_FLOOR..=MAX_ZOOM)
            .logarithmic(true)
            .text("Zoom");
        if ui.add(slider).changed() {
            self.session.handle_viewport(ViewportEvent::SetGlobalZoom(zoom));
        }

        let mut sync = self.session.viewport().sync_enabled();
        if ui.checkbox(&mut sync, "Sync zoom and scroll").changed() {
            self.session.handle_viewport(ViewportEvent::SetSync(sync));
        }

        ui.checkbox(&mut self.session.renderer.show_grid_lines, "Grid lines");
        ui.checkbox(&mut self.session.renderer.show_labels, "Cell values");
        ui.checkbox(&mut self.ui_state.show_projections, "Projections");

        let mut constrained = self.session.redraw().interval() == RedrawProfile::Constrained.interval();
        if ui.checkbox(&mut constrained, "Constrained redraw").changed() {
            let profile = if constrained {
                RedrawProfile::Constrained
            } else {
                RedrawProfile::Display
            };
            self.session.redraw_mut().set_profile(profile);
        }

        let names: Vec<String> = self
            .session
            .grids()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        if !names.is_empty() {
            let mut active = self.session.active_grid();
            egui::ComboBox::from_label("Histogram of")
                .selected_text(names.get(active).cloned().unwrap_or_default())
                .show_ui(ui, |ui| {
                    for (i, name) in names.iter().enumerate() {
                        ui.selectable_value(&mut active, i, name.as_str());
                    }
                });
            self.session.set_active_grid(active);
        }
    }

    fn render_statistics_section(&self, ui: &mut egui::Ui) {
        ui.label(section_header("Statistics"));
        let summary = self.session.summary();
        if summary.thresholds.is_empty() {
            ui.label(stat_label("Waiting for configuration"));
            return;
        }
        ui.label(stat_value(&format!("{} x {} cells", summary.width, summary.height)));

        egui::Grid::new("threshold_stats")
            .num_columns(4)
            .striped(true)
            .show(ui, |ui| {
                for header in ["Threshold", "Min", "Max", "Mean"] {
                    ui.label(stat_label(header));
                }
                ui.end_row();
                for t in &summary.thresholds {
                    let fmt = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
                    ui.label(stat_value(&t.name));
                    ui.label(stat_value(&fmt(t.stats.min)));
                    ui.label(stat_value(&fmt(t.stats.max)));
                    ui.label(stat_value(&format!("{:.1}", t.stats.mean)));
                    ui.end_row();
                }
            });

        let counters = summary.counters;
        egui::Grid::new("counters").num_columns(2).show(ui, |ui| {
            for (label, value) in [
                ("Updates", counters.updates),
                ("Snapshots", counters.snapshots),
                ("Rejected", counters.rejected + self.handler.dropped_messages()),
            ] {
                ui.label(stat_label(label));
                ui.label(stat_value(&format_number(value)));
                ui.end_row();
            }
        });
    }

    fn render_export_section(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Export"));
        let can_export = !self.session.grids().is_empty();
        if ui
            .add_enabled(can_export, egui::Button::new("Export snapshot..."))
            .clicked()
        {
            if let Some(dir) = FileDialog::new().pick_folder() {
                self.ui_state.status_text = match self.export(&dir) {
                    Ok(paths) => format!("Exported {}", paths.image.display()),
                    Err(e) => {
                        log::warn!("{e:#}");
                        format!("Error: {e:#}")
                    }
                };
            }
        }
    }
}
