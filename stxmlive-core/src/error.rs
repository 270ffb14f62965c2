//! Error types for stxmlive-core.

use thiserror::Error;

/// Result type alias for stxmlive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stxmlive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream payload that could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Cell index outside the configured grid.
    #[error("cell index {index} out of bounds for grid of {len} cells")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Snapshot buffer does not match the grid size.
    #[error("snapshot for '{threshold}' has {got} values, expected {expected}")]
    SnapshotLength {
        threshold: String,
        expected: usize,
        got: usize,
    },

    /// Invalid grid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A locally validated edit was rejected before reaching any state.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
