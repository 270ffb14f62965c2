//! Colors and widget styling.
//!
//! Two slate-tinted palettes picked from the system light/dark preference,
//! plus the accent colors used for indicators and chart strokes.

use std::sync::atomic::{AtomicBool, Ordering};

use eframe::egui::{self, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};
use stxmlive_core::ConnectionState;

/// Accent colors shared by both palettes.
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x38, 0x8b, 0xfd);
    pub const GREEN: Color32 = Color32::from_rgb(0x22, 0xc5, 0x5e);
    pub const AMBER: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
    pub const RED: Color32 = Color32::from_rgb(0xe5, 0x48, 0x4d);
}

struct Palette {
    canvas: Color32,
    panel: Color32,
    input: Color32,
    border: Color32,
    border_strong: Color32,
    text: Color32,
    text_muted: Color32,
    hover: Color32,
    grid_line: Color32,
    selection_alpha: f32,
    fill_alpha: f32,
}

const DARK: Palette = Palette {
    canvas: Color32::from_rgb(0x12, 0x16, 0x1c),
    panel: Color32::from_rgb(0x1b, 0x20, 0x27),
    input: Color32::from_rgb(0x24, 0x2a, 0x33),
    border: Color32::from_rgb(0x30, 0x37, 0x41),
    border_strong: Color32::from_rgb(0x41, 0x4a, 0x56),
    text: Color32::from_rgb(0xdc, 0xe3, 0xea),
    text_muted: Color32::from_rgb(0x8a, 0x94, 0xa0),
    hover: Color32::from_rgb(0x2e, 0x35, 0x40),
    grid_line: Color32::from_rgba_premultiplied(110, 110, 110, 40), // == Color32::from_white_alpha(40), which is not const
    selection_alpha: 0.3,
    fill_alpha: 0.35,
};

const LIGHT: Palette = Palette {
    canvas: Color32::from_rgb(0xee, 0xf1, 0xf4),
    panel: Color32::from_rgb(0xfa, 0xfb, 0xfc),
    input: Color32::from_rgb(0xe8, 0xec, 0xf0),
    border: Color32::from_rgb(0xcb, 0xd2, 0xd9),
    border_strong: Color32::from_rgb(0xb4, 0xbd, 0xc7),
    text: Color32::from_rgb(0x1c, 0x23, 0x2b),
    text_muted: Color32::from_rgb(0x5f, 0x6b, 0x78),
    hover: Color32::from_rgb(0xd9, 0xdf, 0xe5),
    grid_line: Color32::from_black_alpha(50),
    selection_alpha: 0.2,
    fill_alpha: 0.25,
};

fn palette(dark_mode: bool) -> &'static Palette {
    if dark_mode {
        &DARK
    } else {
        &LIGHT
    }
}

/// Colors for custom painting in the current mode.
#[derive(Clone, Copy)]
pub struct ThemeColors {
    /// Background behind grid views and charts.
    pub canvas: Color32,
    pub border: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    /// Grid-line overlay.
    pub grid_line: Color32,
    /// Filled area under profile curves.
    pub profile_fill: Color32,
}

impl ThemeColors {
    pub fn from_ui(ui: &egui::Ui) -> Self {
        let p = palette(ui.visuals().dark_mode);
        Self {
            canvas: p.canvas,
            border: p.border,
            text_primary: p.text,
            text_muted: p.text_muted,
            grid_line: p.grid_line,
            profile_fill: accent::BLUE.gamma_multiply(p.fill_alpha),
        }
    }
}

/// Indicator color for the stream connection.
pub fn connection_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Connected => accent::GREEN,
        ConnectionState::Connecting => accent::AMBER,
        ConnectionState::Disconnected => accent::RED,
    }
}

fn build_visuals(base: Visuals, p: &Palette) -> Visuals {
    let mut visuals = base;
    let rounding = Rounding::same(3.0);

    visuals.window_fill = p.panel;
    visuals.panel_fill = p.panel;
    visuals.faint_bg_color = p.canvas;
    visuals.extreme_bg_color = p.input;

    let widgets = &mut visuals.widgets;
    widgets.noninteractive.bg_fill = p.input;
    widgets.noninteractive.fg_stroke = Stroke::new(1.0, p.text_muted);
    widgets.noninteractive.bg_stroke = Stroke::new(1.0, p.border);
    widgets.inactive.bg_fill = p.input;
    widgets.inactive.fg_stroke = Stroke::new(1.0, p.text);
    widgets.inactive.bg_stroke = Stroke::new(1.0, p.border_strong);
    widgets.hovered.bg_fill = p.hover;
    widgets.hovered.fg_stroke = Stroke::new(1.0, p.text);
    widgets.hovered.bg_stroke = Stroke::new(1.0, accent::BLUE);
    widgets.active.bg_fill = accent::BLUE;
    widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
    widgets.active.bg_stroke = Stroke::new(1.0, accent::BLUE);
    widgets.open.bg_fill = p.input;
    widgets.open.fg_stroke = Stroke::new(1.0, p.text);
    widgets.open.bg_stroke = Stroke::new(1.0, p.border_strong);
    for state in [
        &mut widgets.noninteractive,
        &mut widgets.inactive,
        &mut widgets.hovered,
        &mut widgets.active,
        &mut widgets.open,
    ] {
        state.rounding = rounding;
    }

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(p.selection_alpha);
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);
    visuals
}

fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mono = |size| FontId::new(size, FontFamily::Monospace);
    let mut style = (*ctx.style()).clone();
    style.text_styles = [
        (TextStyle::Small, mono(10.0)),
        (TextStyle::Body, mono(12.0)),
        (TextStyle::Button, mono(12.0)),
        (TextStyle::Heading, mono(14.0)),
        (TextStyle::Monospace, mono(12.0)),
    ]
    .into();
    style.spacing.item_spacing = egui::vec2(8.0, 5.0);
    style.spacing.button_padding = egui::vec2(9.0, 5.0);
    style.spacing.slider_width = 140.0;
    ctx.set_style(style);
}

/// Style the context for its current light or dark mode.
pub fn configure_style(ctx: &egui::Context) {
    let dark_mode = ctx.style().visuals.dark_mode;
    let base = if dark_mode { Visuals::dark() } else { Visuals::light() };
    ctx.set_visuals(build_visuals(base, palette(dark_mode)));
    configure_fonts_and_spacing(ctx);
}

static STYLED: AtomicBool = AtomicBool::new(false);
static STYLED_DARK: AtomicBool = AtomicBool::new(true);

/// Restyle on the first frame and whenever the system mode flips.
pub fn apply_system_theme(ctx: &egui::Context) {
    let dark_mode = ctx.style().visuals.dark_mode;
    let styled = STYLED.swap(true, Ordering::Relaxed);
    if !styled || STYLED_DARK.swap(dark_mode, Ordering::Relaxed) != dark_mode {
        configure_style(ctx);
    }
}

/// Filled button for the main action of a section.
pub fn primary_button(text: &str) -> egui::Button<'_> {
    egui::Button::new(egui::RichText::new(text).strong().color(Color32::WHITE))
        .fill(accent::BLUE)
        .rounding(Rounding::same(3.0))
}

pub fn section_header(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).small().strong()
}

/// Left column of a statistics grid.
pub fn stat_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).small().weak()
}

/// Right column of a statistics grid.
pub fn stat_value(text: &str) -> egui::RichText {
    egui::RichText::new(text).small().monospace()
}
