//! stxmlive-core: headless engine for live scanning-microscopy map viewing.
//!
//! This crate holds the per-threshold grid model and its incremental
//! statistics, color mapping, contrast selection, rendering to a raster
//! surface, projections, histogram, viewport control, the stream protocol
//! state machine, and snapshot export. It performs no network I/O.
//!

pub mod colormap;
pub mod config;
pub mod contrast;
pub mod error;
pub mod export;
pub mod grid;
pub mod histogram;
pub mod projection;
pub mod protocol;
pub mod redraw;
pub mod render;
pub mod session;
pub mod stream;
pub mod surface;
pub mod util;
pub mod viewport;

pub use colormap::{color_for, gradient_for, ColorScheme, Gradient};
pub use config::{ClientConfig, ConnectionInfo, GlobalConfig};
pub use contrast::ContrastModel;
pub use error::{Error, Result};
pub use export::{compose_image, write_export, ExportMetadata, ExportPaths};
pub use grid::{CellWindow, GridGeometry, GridState, GridSummary};
pub use histogram::{Histogram, HistogramInteraction, PointerEvent, HISTOGRAM_BINS};
pub use projection::{Profile, ProfileAxis, ProjectionEngine};
pub use protocol::{ClientMessage, ConfigMessage, ServerMessage, SnapshotMessage, UpdateMessage};
pub use redraw::{RedrawKind, RedrawProfile, RedrawScheduler, RedrawSet};
pub use render::Renderer;
pub use session::{Session, SessionSummary};
pub use stream::{ConnectionState, StreamCommand, StreamEvent, StreamProtocolHandler, StreamTarget};
pub use surface::{PixelBuffer, RasterSurface};
pub use viewport::{ViewportController, ViewportEvent};
