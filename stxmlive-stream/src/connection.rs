//! Background WebSocket connection and the client that owns it.
//!
//! Each connection runs on its own thread and reports [`TransportEvent`]s over
//! an `mpsc` channel, in the same way the viewer's loader threads report
//! progress. Events carry a generation number so that a late report from a
//! connection that was already replaced is ignored.

use std::net::TcpStream;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use stxmlive_core::{ClientMessage, StreamCommand, StreamEvent};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::{Error, Result};
use crate::timer::ReconnectTimer;

/// How long a socket read blocks before outgoing frames are serviced.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Report from a connection thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened { generation: u64 },
    Message { generation: u64, text: String },
    Closed { generation: u64, reason: String },
}

impl TransportEvent {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            TransportEvent::Opened { generation }
            | TransportEvent::Message { generation, .. }
            | TransportEvent::Closed { generation, .. } => *generation,
        }
    }

    /// Protocol-level event for the state machine.
    #[must_use]
    pub fn into_stream_event(self) -> StreamEvent {
        match self {
            TransportEvent::Opened { .. } => StreamEvent::Opened,
            TransportEvent::Message { text, .. } => StreamEvent::MessageReceived(text),
            TransportEvent::Closed { reason, .. } => StreamEvent::Closed(reason),
        }
    }
}

enum Outgoing {
    Text(String),
    Close,
}

/// Owns the current connection thread and the reconnect timer.
pub struct StreamClient {
    url: String,
    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
    outgoing: Option<Sender<Outgoing>>,
    generation: u64,
    timer: ReconnectTimer,
}

impl StreamClient {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            url: url.into(),
            events_tx,
            events_rx,
            outgoing: None,
            generation: 0,
            timer: ReconnectTimer::default(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Point future connections at a different URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Start a new connection thread, closing any current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the thread cannot be spawned.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        self.generation += 1;
        let generation = self.generation;
        let (outgoing_tx, outgoing_rx) = channel();
        let events = self.events_tx.clone();
        let url = self.url.clone();
        log::info!("connecting to {url}");
        thread::Builder::new()
            .name(format!("stxmlive-stream-{generation}"))
            .spawn(move || run_connection(&url, generation, &events, &outgoing_rx))?;
        self.outgoing = Some(outgoing_tx);
        Ok(())
    }

    /// Ask the current connection thread to close.
    pub fn close(&mut self) {
        if let Some(outgoing) = self.outgoing.take() {
            // The thread may already have exited.
            let _ = outgoing.send(Outgoing::Close);
        }
    }

    /// Queue a message on the current connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no connection thread is running.
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        let text = message.to_json()?;
        let outgoing = self.outgoing.as_ref().ok_or(Error::NotConnected)?;
        outgoing
            .send(Outgoing::Text(text))
            .map_err(|_| Error::NotConnected)
    }

    /// Carry out commands from the protocol handler.
    pub fn execute(&mut self, commands: Vec<StreamCommand>, now: Instant) {
        for command in commands {
            match command {
                StreamCommand::OpenConnection => {
                    if let Err(e) = self.open() {
                        log::warn!("failed to start connection: {e}");
                        // Report as a closed connection so a retry gets scheduled.
                        let _ = self.events_tx.send(TransportEvent::Closed {
                            generation: self.generation,
                            reason: e.to_string(),
                        });
                    }
                }
                StreamCommand::Send(message) => {
                    if let Err(e) = self.send(&message) {
                        log::warn!("could not send {message:?}: {e}");
                    }
                }
                StreamCommand::ScheduleReconnect { after, token } => {
                    self.timer.schedule(now + after, token);
                }
                StreamCommand::CancelReconnect { token } => self.timer.cancel(token),
            }
        }
    }

    /// Drain events from the current connection and the reconnect timer.
    pub fn poll(&mut self, now: Instant) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if event.generation() != self.generation {
                log::debug!("ignoring event from replaced connection {}", event.generation());
                continue;
            }
            if matches!(event, TransportEvent::Closed { .. }) {
                self.outgoing = None;
            }
            events.push(event.into_stream_event());
        }
        if let Some(token) = self.timer.due(now) {
            events.push(StreamEvent::ReconnectTimerFired(token));
        }
        events
    }

    /// When the owner should poll again at the latest.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Whether a connection thread is believed to be running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.outgoing.is_some()
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_connection(
    url: &str,
    generation: u64,
    events: &Sender<TransportEvent>,
    outgoing: &Receiver<Outgoing>,
) {
    let reason = match pump(url, generation, events, outgoing) {
        Ok(reason) => reason,
        Err(e) => e.to_string(),
    };
    log::debug!("connection {generation} finished: {reason}");
    // The client may be gone; nobody is left to tell.
    let _ = events.send(TransportEvent::Closed { generation, reason });
}

fn pump(
    url: &str,
    generation: u64,
    events: &Sender<TransportEvent>,
    outgoing: &Receiver<Outgoing>,
) -> Result<String> {
    let (mut socket, _response) = tungstenite::connect(url)?;
    set_read_timeout(&mut socket)?;
    events
        .send(TransportEvent::Opened { generation })
        .map_err(|_| Error::ChannelClosed)?;

    loop {
        loop {
            match outgoing.try_recv() {
                Ok(Outgoing::Text(text)) => socket.send(Message::text(text))?,
                Ok(Outgoing::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return Ok("closed by client".to_string());
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => events
                .send(TransportEvent::Message { generation, text })
                .map_err(|_| Error::ChannelClosed)?,
            Ok(Message::Close(frame)) => {
                let _ = socket.flush();
                return Ok(frame.map_or_else(
                    || "closed by server".to_string(),
                    |f| format!("closed by server: {}", f.reason),
                ));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

fn set_read_timeout(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) -> Result<()> {
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
    }
    Ok(())
}
