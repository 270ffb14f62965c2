//! UI rendering modules.
//!
//! - `control_panel`: left sidebar and bottom status bar
//! - `main_view`: per-threshold grid views with projections
//! - `histogram_window`: histogram with draggable contrast handles
//! - `theme`: colors and widget styling

mod control_panel;
mod histogram_window;
mod main_view;
pub mod theme;
