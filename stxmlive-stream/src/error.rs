//! Error types for stxmlive-stream.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport errors.
#[derive(Error, Debug)]
pub enum Error {
    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// Socket or thread setup failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message encoding failure.
    #[error(transparent)]
    Core(#[from] stxmlive_core::Error),

    /// No connection is open.
    #[error("not connected")]
    NotConnected,

    /// The owning client went away.
    #[error("event channel closed")]
    ChannelClosed,
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(e))
    }
}
