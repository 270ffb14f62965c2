//! Connection lifecycle and message dispatch for the live stream.
//!
//! [`StreamProtocolHandler`] is a pure state machine: it consumes
//! [`StreamEvent`]s, mutates a [`StreamTarget`], and returns the
//! [`StreamCommand`]s the transport must carry out. It never touches a socket
//! or a clock, so the whole lifecycle can be driven from tests.
//!
//! ```text
//! Disconnected --ConnectRequested--> Connecting --Opened--> Connected
//!      ^                                  |                     |
//!      +------------Closed----------------+---------------------+
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::config::DEFAULT_RECONNECT_DELAY_MS;
use crate::error::Result;
use crate::protocol::{ClientMessage, ConfigMessage, ServerMessage, SnapshotMessage, UpdateMessage};

/// Delay before a reconnect attempt after the connection drops.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS);

/// Transport connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Receiver of decoded stream messages.
pub trait StreamTarget {
    /// Replace every grid for a new layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is rejected; the previous grids stay.
    fn apply_config(&mut self, config: ConfigMessage) -> Result<()>;

    fn apply_update(&mut self, update: UpdateMessage);

    fn apply_snapshot(&mut self, snapshot: SnapshotMessage);

    /// The connection dropped.
    fn on_disconnect(&mut self);

    /// Connection state changed.
    fn on_connection_state(&mut self, _state: ConnectionState) {}
}

/// Input to the handler.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// User or startup asked for a connection.
    ConnectRequested,
    /// Transport finished the handshake.
    Opened,
    /// One text frame arrived.
    MessageReceived(String),
    /// Transport closed or failed, with a reason for the log.
    Closed(String),
    /// A previously scheduled reconnect timer expired.
    ReconnectTimerFired(u64),
}

/// Work the transport must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamCommand {
    OpenConnection,
    Send(ClientMessage),
    ScheduleReconnect { after: Duration, token: u64 },
    CancelReconnect { token: u64 },
}

/// Drives the connection state machine and dispatches messages.
#[derive(Debug, Clone)]
pub struct StreamProtocolHandler {
    state: ConnectionState,
    reconnect_delay: Duration,
    pending_timer: Option<u64>,
    next_token: u64,
    dropped: u64,
}

impl Default for StreamProtocolHandler {
    fn default() -> Self {
        Self::new(RECONNECT_DELAY)
    }
}

impl StreamProtocolHandler {
    #[must_use]
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            pending_timer: None,
            next_token: 0,
            dropped: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Token of the reconnect timer currently armed, if any.
    #[must_use]
    pub fn pending_reconnect(&self) -> Option<u64> {
        self.pending_timer
    }

    /// Number of frames dropped as malformed.
    #[must_use]
    pub fn dropped_messages(&self) -> u64 {
        self.dropped
    }

    /// Process one event.
    pub fn handle<T: StreamTarget>(&mut self, event: StreamEvent, target: &mut T) -> Vec<StreamCommand> {
        let mut commands = Vec::new();
        match event {
            StreamEvent::ConnectRequested => {
                if self.state == ConnectionState::Disconnected {
                    self.cancel_timer(&mut commands);
                    self.start_connecting(target, &mut commands);
                }
            }
            StreamEvent::Opened => {
                self.cancel_timer(&mut commands);
                self.set_state(ConnectionState::Connected, target);
                log::info!("stream connected, requesting snapshot");
                commands.push(StreamCommand::Send(ClientMessage::SnapshotRequest));
            }
            StreamEvent::MessageReceived(text) => self.dispatch(&text, target, &mut commands),
            StreamEvent::Closed(reason) => {
                log::info!("stream closed: {reason}");
                self.set_state(ConnectionState::Disconnected, target);
                target.on_disconnect();
                self.cancel_timer(&mut commands);
                let token = self.next_token;
                self.next_token += 1;
                self.pending_timer = Some(token);
                log::info!("reconnecting in {:?}", self.reconnect_delay);
                commands.push(StreamCommand::ScheduleReconnect {
                    after: self.reconnect_delay,
                    token,
                });
            }
            StreamEvent::ReconnectTimerFired(token) => {
                if self.pending_timer != Some(token) {
                    log::debug!("ignoring stale reconnect timer {token}");
                } else {
                    self.pending_timer = None;
                    if self.state == ConnectionState::Disconnected {
                        self.start_connecting(target, &mut commands);
                    }
                }
            }
        }
        commands
    }

    fn dispatch<T: StreamTarget>(&mut self, text: &str, target: &mut T, commands: &mut Vec<StreamCommand>) {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                self.dropped += 1;
                log::debug!("dropping stream message: {e}");
                return;
            }
        };
        match message {
            ServerMessage::Config(config) => match target.apply_config(config) {
                Ok(()) => commands.push(StreamCommand::Send(ClientMessage::SnapshotRequest)),
                Err(e) => {
                    self.dropped += 1;
                    log::warn!("rejecting config: {e}");
                }
            },
            ServerMessage::Update(update) => target.apply_update(update),
            ServerMessage::Snapshot(snapshot) => target.apply_snapshot(snapshot),
        }
    }

    fn start_connecting<T: StreamTarget>(&mut self, target: &mut T, commands: &mut Vec<StreamCommand>) {
        self.set_state(ConnectionState::Connecting, target);
        commands.push(StreamCommand::OpenConnection);
    }

    fn cancel_timer(&mut self, commands: &mut Vec<StreamCommand>) {
        if let Some(token) = self.pending_timer.take() {
            commands.push(StreamCommand::CancelReconnect { token });
        }
    }

    fn set_state<T: StreamTarget>(&mut self, state: ConnectionState, target: &mut T) {
        if self.state != state {
            self.state = state;
            target.on_connection_state(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        configs: Vec<ConfigMessage>,
        updates: Vec<UpdateMessage>,
        snapshots: usize,
        disconnects: usize,
        states: Vec<ConnectionState>,
        reject_config: bool,
    }

    impl StreamTarget for Recorder {
        fn apply_config(&mut self, config: ConfigMessage) -> Result<()> {
            if self.reject_config {
                return Err(Error::InvalidConfig("rejected".into()));
            }
            self.configs.push(config);
            Ok(())
        }

        fn apply_update(&mut self, update: UpdateMessage) {
            self.updates.push(update);
        }

        fn apply_snapshot(&mut self, _snapshot: SnapshotMessage) {
            self.snapshots += 1;
        }

        fn on_disconnect(&mut self) {
            self.disconnects += 1;
        }

        fn on_connection_state(&mut self, state: ConnectionState) {
            self.states.push(state);
        }
    }

    const SNAPSHOT: StreamCommand = StreamCommand::Send(ClientMessage::SnapshotRequest);

    #[test]
    fn test_connect_requests_snapshot() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();

        let cmds = handler.handle(StreamEvent::ConnectRequested, &mut target);
        assert_eq!(cmds, vec![StreamCommand::OpenConnection]);
        assert_eq!(handler.state(), ConnectionState::Connecting);

        let cmds = handler.handle(StreamEvent::Opened, &mut target);
        assert_eq!(cmds, vec![SNAPSHOT]);
        assert_eq!(handler.state(), ConnectionState::Connected);
        assert_eq!(
            target.states,
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );

        // Already connecting or connected: no second socket.
        assert!(handler.handle(StreamEvent::ConnectRequested, &mut target).is_empty());
    }

    #[test]
    fn test_config_rerequests_snapshot() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();
        let cmds = handler.handle(
            StreamEvent::MessageReceived(
                r#"{"type":"config","grid_x":2,"grid_y":2,"thresholds":["t1"]}"#.into(),
            ),
            &mut target,
        );
        assert_eq!(cmds, vec![SNAPSHOT]);
        assert_eq!(target.configs.len(), 1);
    }

    #[test]
    fn test_rejected_config_sends_nothing() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder {
            reject_config: true,
            ..Recorder::default()
        };
        let cmds = handler.handle(
            StreamEvent::MessageReceived(
                r#"{"type":"config","grid_x":0,"grid_y":2,"thresholds":[]}"#.into(),
            ),
            &mut target,
        );
        assert!(cmds.is_empty());
        assert_eq!(handler.dropped_messages(), 1);
    }

    #[test]
    fn test_updates_and_snapshots_dispatch_in_order() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();
        for text in [
            r#"{"image_id":0,"data":{"t1":5}}"#,
            r#"{"type":"snapshot","data":{}}"#,
            r#"{"image_id":3,"data":{"t1":1}}"#,
        ] {
            assert!(handler
                .handle(StreamEvent::MessageReceived(text.into()), &mut target)
                .is_empty());
        }
        let ids: Vec<i64> = target.updates.iter().map(|u| u.image_id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert_eq!(target.snapshots, 1);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();
        for text in ["{", r#"{"type":"config"}"#, r#"{"type":"mystery"}"#] {
            let cmds = handler.handle(StreamEvent::MessageReceived(text.into()), &mut target);
            assert!(cmds.is_empty());
        }
        assert_eq!(handler.dropped_messages(), 3);
        assert!(target.configs.is_empty());
        assert!(target.updates.is_empty());
    }

    #[test]
    fn test_disconnect_schedules_single_reconnect() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();
        handler.handle(StreamEvent::ConnectRequested, &mut target);
        handler.handle(StreamEvent::Opened, &mut target);

        let cmds = handler.handle(StreamEvent::Closed("reset".into()), &mut target);
        assert_eq!(
            cmds,
            vec![StreamCommand::ScheduleReconnect {
                after: Duration::from_secs(2),
                token: 0
            }]
        );
        assert_eq!(target.disconnects, 1);
        assert_eq!(handler.state(), ConnectionState::Disconnected);

        // A second close replaces the pending timer instead of stacking one.
        let cmds = handler.handle(StreamEvent::Closed("again".into()), &mut target);
        assert_eq!(
            cmds,
            vec![
                StreamCommand::CancelReconnect { token: 0 },
                StreamCommand::ScheduleReconnect {
                    after: Duration::from_secs(2),
                    token: 1
                }
            ]
        );

        // The cancelled timer firing late does nothing.
        assert!(handler
            .handle(StreamEvent::ReconnectTimerFired(0), &mut target)
            .is_empty());

        let cmds = handler.handle(StreamEvent::ReconnectTimerFired(1), &mut target);
        assert_eq!(cmds, vec![StreamCommand::OpenConnection]);
        assert_eq!(handler.pending_reconnect(), None);
    }

    #[test]
    fn test_manual_connect_cancels_pending_timer() {
        let mut handler = StreamProtocolHandler::new(Duration::from_millis(500));
        let mut target = Recorder::default();
        handler.handle(StreamEvent::Closed("refused".into()), &mut target);
        assert_eq!(handler.pending_reconnect(), Some(0));

        let cmds = handler.handle(StreamEvent::ConnectRequested, &mut target);
        assert_eq!(
            cmds,
            vec![
                StreamCommand::CancelReconnect { token: 0 },
                StreamCommand::OpenConnection
            ]
        );
        assert!(handler
            .handle(StreamEvent::ReconnectTimerFired(0), &mut target)
            .is_empty());
    }

    #[test]
    fn test_failed_connect_attempt_retries() {
        let mut handler = StreamProtocolHandler::default();
        let mut target = Recorder::default();
        handler.handle(StreamEvent::ConnectRequested, &mut target);
        let cmds = handler.handle(StreamEvent::Closed("refused".into()), &mut target);
        assert!(matches!(
            cmds.as_slice(),
            [StreamCommand::ScheduleReconnect { .. }]
        ));
        assert_eq!(handler.state(), ConnectionState::Disconnected);
    }
}
