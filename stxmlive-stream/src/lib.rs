//! stxmlive-stream: WebSocket transport for the live map stream.
//!
//! [`StreamClient`] runs one connection at a time on a background thread and
//! turns its traffic into [`stxmlive_core::StreamEvent`]s. The protocol
//! decisions stay in [`stxmlive_core::StreamProtocolHandler`]; this crate only
//! executes the commands it returns.

pub mod connection;
pub mod error;
pub mod timer;

pub use connection::{StreamClient, TransportEvent, POLL_INTERVAL};
pub use error::{Error, Result};
pub use timer::ReconnectTimer;
