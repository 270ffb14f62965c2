//! Client settings and the active grid layout.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::colormap::ColorScheme;
use crate::error::{Error, Result};
use crate::grid::DEFAULT_BASE_PIXEL_SIZE;
use crate::protocol::ConfigMessage;
use crate::redraw::RedrawProfile;

/// Default stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "ws://localhost:8888/ws";

/// Default delay before a reconnect attempt, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

/// Largest accepted grid edge.
pub const MAX_GRID_EDGE: usize = 4096;

/// Grid layout announced by the last config message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalConfig {
    pub width: usize,
    pub height: usize,
    pub thresholds: Vec<String>,
}

impl GlobalConfig {
    /// Validate a config message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero or oversized dimensions and
    /// for duplicate threshold names.
    pub fn from_message(message: &ConfigMessage) -> Result<Self> {
        let (width, height) = (message.grid_x, message.grid_y);
        if !(1..=MAX_GRID_EDGE).contains(&width) || !(1..=MAX_GRID_EDGE).contains(&height) {
            return Err(Error::InvalidConfig(format!(
                "grid {width}x{height} outside 1..={MAX_GRID_EDGE}"
            )));
        }
        let mut seen = BTreeSet::new();
        for name in &message.thresholds {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate threshold '{name}'")));
            }
        }
        Ok(Self {
            width,
            height,
            thresholds: message.thresholds.clone(),
        })
    }

    /// Number of cells in each grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Read-only detector connection details carried by a config message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub detector_ip: Option<String>,
    pub zmq_port: Option<u16>,
    pub api_port: Option<u16>,
    pub endpoint: Option<String>,
    pub simplon_base_url: Option<String>,
}

impl ConnectionInfo {
    #[must_use]
    pub fn from_message(message: &ConfigMessage) -> Self {
        Self {
            detector_ip: message.detector_ip.clone(),
            zmq_port: message.zmq_port,
            api_port: message.api_port,
            endpoint: message.endpoint.clone(),
            simplon_base_url: message.simplon_base_url.clone(),
        }
    }

    /// True if the server sent none of the optional fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Client-side settings, loaded from JSON and overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the stream.
    pub url: String,
    /// Delay before reconnecting after a drop, in milliseconds.
    pub reconnect_delay_ms: u64,
    pub redraw_profile: RedrawProfile,
    /// Device pixels per cell at zoom 1.
    pub base_pixel_size: f64,
    pub scheme: ColorScheme,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            redraw_profile: RedrawProfile::default(),
            base_pixel_size: DEFAULT_BASE_PIXEL_SIZE,
            scheme: ColorScheme::default(),
        }
    }
}

impl ClientConfig {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error if the file cannot be read or parsed, and
    /// [`Error::InvalidConfig`] if the values fail [`ClientConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a URL that is not plain `ws://`,
    /// a zero reconnect delay, or a non-positive base pixel size.
    pub fn validate(&self) -> Result<()> {
        validate_stream_url(&self.url)?;
        if self.reconnect_delay_ms == 0 {
            return Err(Error::InvalidConfig("reconnect delay must be positive".into()));
        }
        if !(self.base_pixel_size.is_finite() && self.base_pixel_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "base pixel size must be positive, got {}",
                self.base_pixel_size
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Check that `url` is something the stream client can open.
///
/// The transport is built without TLS, so `wss://` is refused here rather
/// than failing every handshake.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for any scheme other than `ws://`.
pub fn validate_stream_url(url: &str) -> Result<()> {
    if url.starts_with("wss://") {
        return Err(Error::InvalidConfig(format!(
            "secure websocket urls are not supported, got '{url}'"
        )));
    }
    if !url.starts_with("ws://") {
        return Err(Error::InvalidConfig(format!(
            "stream url must start with ws://, got '{url}'"
        )));
    }
    Ok(())
}
