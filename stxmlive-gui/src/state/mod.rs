//! Application state modules.

mod ui;

pub use ui::{CursorInfo, UiState};
