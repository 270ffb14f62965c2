//! UI panel visibility and transient view state.

/// Cell under the pointer, reported as `(x, y, value)` for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorInfo {
    pub grid: usize,
    pub x: usize,
    pub y: usize,
    /// `None` for a cell that has never held a valid value.
    pub value: Option<u32>,
}

/// UI panel visibility and toggle state.
pub struct UiState {
    /// Whether the histogram window is visible.
    pub show_histogram: bool,
    /// Whether row/column profiles are drawn beside each grid.
    pub show_projections: bool,
    /// Editable copy of the stream URL.
    pub url_input: String,
    /// User-facing status message for the bottom bar.
    pub status_text: String,
}

impl UiState {
    pub fn new(url: &str) -> Self {
        Self {
            show_histogram: true,
            show_projections: true,
            url_input: url.to_string(),
            status_text: "Ready".to_string(),
        }
    }
}
