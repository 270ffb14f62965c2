//! STXM Live viewer entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod state;
mod ui;
mod util;
mod viewer;

use std::path::PathBuf;

use anyhow::Context;
use app::StxmLiveApp;
use clap::Parser;
use eframe::egui;
use stxmlive_core::{ClientConfig, ColorScheme, RedrawProfile};

/// Live false-color viewer for scanning-microscopy detector maps.
#[derive(Parser, Debug)]
#[command(name = "stxmlive-gui")]
#[command(version, about)]
struct Args {
    /// WebSocket URL of the map stream
    #[arg(long)]
    url: Option<String>,

    /// Redraw at most every 100 ms (slow displays, remote sessions)
    #[arg(long)]
    constrained: bool,

    /// Initial color scheme: linear, grayscale, heat, viridis or hdr
    #[arg(long, value_parser = parse_scheme)]
    scheme: Option<ColorScheme>,

    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_scheme(key: &str) -> Result<ColorScheme, String> {
    ColorScheme::from_key(key).ok_or_else(|| format!("unknown color scheme '{key}'"))
}

fn client_config(args: Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = args.url {
        config.url = url;
    }
    if args.constrained {
        config.redraw_profile = RedrawProfile::Constrained;
    }
    if let Some(scheme) = args.scheme {
        config.scheme = scheme;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = client_config(Args::parse())?;

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };
    eframe::run_native(
        "STXM Live",
        opts,
        Box::new(move |cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            let mut app = StxmLiveApp::new(&config);
            app.connect();
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "stxmlive-gui",
            "--url",
            "ws://beamline:9000/ws",
            "--constrained",
            "--scheme",
            "viridis",
        ]);
        let config = client_config(args).unwrap();
        assert_eq!(config.url, "ws://beamline:9000/ws");
        assert_eq!(config.redraw_profile, RedrawProfile::Constrained);
        assert_eq!(config.scheme, ColorScheme::Viridis);
    }

    #[test]
    fn test_rejects_unknown_scheme_and_bad_url() {
        assert!(Args::try_parse_from(["stxmlive-gui", "--scheme", "rainbow"]).is_err());
        let args = Args::parse_from(["stxmlive-gui", "--url", "http://x"]);
        assert!(client_config(args).is_err());
    }
}
