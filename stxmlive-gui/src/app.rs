//! Main application state and logic.
//!
//! `StxmLiveApp` owns the session, the stream protocol handler and the
//! transport. Stream traffic is drained once per frame; derived drawing work
//! (textures, profiles, histogram) is rebuilt only when the session's redraw
//! scheduler releases it.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use eframe::egui;
use stxmlive_core::config::validate_stream_url;
use stxmlive_core::{
    write_export, ClientConfig, ExportPaths, Histogram, Profile, Renderer, Session, StreamEvent,
    StreamProtocolHandler,
};
use stxmlive_stream::StreamClient;

use crate::state::{CursorInfo, UiState};
use crate::viewer::ColorImageSurface;

/// Main application state.
pub struct StxmLiveApp {
    /// Grids, contrast, viewport and redraw state.
    pub(crate) session: Session,
    /// Connection state machine.
    pub(crate) handler: StreamProtocolHandler,
    /// Background WebSocket connection.
    pub(crate) client: StreamClient,
    /// UI display state.
    pub(crate) ui_state: UiState,

    /// One texture per grid, one texel per cell.
    pub(crate) textures: Vec<Option<egui::TextureHandle>>,
    /// Cached histogram of the active grid.
    pub(crate) histogram: Option<Histogram>,
    /// Cached `(columns, rows)` profiles per grid.
    pub(crate) profiles: Vec<Option<(Profile, Profile)>>,
    /// Current cursor info.
    pub(crate) cursor_info: Option<CursorInfo>,
}

impl StxmLiveApp {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            session: Session::new(config),
            handler: StreamProtocolHandler::new(config.reconnect_delay()),
            client: StreamClient::new(config.url.clone()),
            ui_state: UiState::new(&config.url),
            textures: Vec::new(),
            histogram: None,
            profiles: Vec::new(),
            cursor_info: None,
        }
    }

    /// Start connecting if no connection is open or pending.
    pub fn connect(&mut self) {
        self.dispatch(StreamEvent::ConnectRequested);
    }

    /// Drop the current connection and connect to the URL in the URL field.
    pub fn reconnect_to_input(&mut self) {
        let url = self.ui_state.url_input.trim().to_string();
        if let Err(e) = validate_stream_url(&url) {
            self.ui_state.status_text = e.to_string();
            return;
        }
        self.client.set_url(url.clone());
        self.client.close();
        self.ui_state.status_text = format!("Connecting to {url}");
        // The close surfaces as a Closed event; the handler then reconnects
        // after its delay. Connect at once if nothing was open.
        self.connect();
    }

    fn dispatch(&mut self, event: StreamEvent) {
        let commands = self.handler.handle(event, &mut self.session);
        self.client.execute(commands, Instant::now());
    }

    /// Handle pending events from the connection thread and reconnect timer.
    pub fn handle_messages(&mut self) {
        for event in self.client.poll(Instant::now()) {
            if let StreamEvent::Closed(reason) = &event {
                self.ui_state.status_text = format!("Disconnected: {reason}");
            }
            self.dispatch(event);
        }
    }

    /// Rebuild whatever the redraw scheduler releases this frame.
    fn refresh_derived(&mut self, ctx: &egui::Context) {
        let grid_count = self.session.grids().len();
        if self.textures.len() != grid_count {
            self.textures = vec![None; grid_count];
            self.profiles = vec![None; grid_count];
            self.cursor_info = None;
            self.session.redraw_mut().request_all();
        }

        let pending = self.session.redraw_mut().poll(Instant::now());
        if pending.is_empty() {
            return;
        }
        if pending.grids {
            self.refresh_textures(ctx);
        }
        if pending.projections {
            self.profiles = (0..grid_count).map(|i| self.session.profiles(i)).collect();
        }
        if pending.histogram {
            self.histogram = self.session.histogram();
        }
    }

    fn refresh_textures(&mut self, ctx: &egui::Context) {
        let dirty: Vec<usize> = self
            .session
            .grids_mut()
            .iter_mut()
            .enumerate()
            .filter_map(|(i, grid)| grid.take_dirty().then_some(i))
            .collect();

        for index in dirty {
            let (Some(grid), Some(range)) = (
                self.session.grids().get(index),
                self.session.active_range_at(index),
            ) else {
                continue;
            };
            let mut surface = ColorImageSurface::new(grid.width(), grid.height());
            Renderer::render(grid, range, self.session.scheme(), &mut surface);
            let image = surface.into_image();

            match self.textures.get_mut(index) {
                Some(Some(texture)) => texture.set(image, egui::TextureOptions::NEAREST),
                Some(slot) => {
                    *slot = Some(ctx.load_texture(
                        format!("grid-{}", grid.name()),
                        image,
                        egui::TextureOptions::NEAREST,
                    ));
                }
                None => {}
            }
        }
    }

    /// Write the composite image and its metadata into `dir`.
    pub fn export(&self, dir: &Path) -> anyhow::Result<ExportPaths> {
        write_export(&self.session, dir)
            .with_context(|| format!("failed to export into {}", dir.display()))
    }

    /// How soon the next frame is needed even without input.
    fn repaint_delay(&self) -> Duration {
        let now = Instant::now();
        let mut delay = self.session.redraw().interval();
        for deadline in [
            self.client.next_wakeup(),
            self.session.redraw().next_deadline(now),
        ]
        .into_iter()
        .flatten()
        {
            delay = delay.min(deadline.saturating_duration_since(now));
        }
        delay
    }
}

impl eframe::App for StxmLiveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        crate::ui::theme::apply_system_theme(ctx);
        self.handle_messages();
        self.refresh_derived(ctx);

        self.render_status_bar(ctx);
        self.render_side_panel(ctx);
        self.render_central_panel(ctx);
        self.render_histogram_window(ctx);

        // Stream frames arrive off the UI thread; poll at the redraw cadence.
        ctx.request_repaint_after(self.repaint_delay());
    }
}
