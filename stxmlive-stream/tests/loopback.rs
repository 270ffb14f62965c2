//! Drives a real client against an in-process WebSocket server.
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use stxmlive_core::{
    ClientConfig, ConnectionState, Session, StreamCommand, StreamEvent, StreamProtocolHandler,
};
use stxmlive_stream::StreamClient;
use tungstenite::Message;

const CONFIG: &str = r#"{"type":"config","grid_x":2,"grid_y":2,"thresholds":["t1"]}"#;
const SNAPSHOT: &str =
    r#"{"type":"snapshot","data":{"t1":{"values":[10,20,30,40],"mask":[1,1,0,1]}}}"#;

/// Pump events until `done` holds or five seconds pass.
fn run_until(
    client: &mut StreamClient,
    handler: &mut StreamProtocolHandler,
    session: &mut Session,
    mut done: impl FnMut(&Session, &[StreamCommand]) -> bool,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let now = Instant::now();
        for event in client.poll(now) {
            let commands = handler.handle(event, session);
            let finished = done(session, &commands);
            client.execute(commands, now);
            if finished {
                return true;
            }
        }
        if done(session, &[]) {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_config_and_snapshot_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        ws.send(Message::text(CONFIG)).unwrap();
        let mut requests = 0;
        loop {
            match ws.read() {
                Ok(Message::Text(text)) if text.contains("snapshot_request") => {
                    requests += 1;
                    if ws.send(Message::text(SNAPSHOT)).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        requests
    });

    let mut client = StreamClient::new(format!("ws://{addr}/ws"));
    let mut handler = StreamProtocolHandler::default();
    let mut session = Session::new(&ClientConfig::default());
    let commands = handler.handle(StreamEvent::ConnectRequested, &mut session);
    assert_eq!(commands, vec![StreamCommand::OpenConnection]);
    client.execute(commands, Instant::now());

    let synced = run_until(&mut client, &mut handler, &mut session, |session, _| {
        session
            .grid("t1")
            .is_some_and(|grid| grid.max_value() == Some(40))
    });
    assert!(synced);
    assert_eq!(handler.state(), ConnectionState::Connected);
    let grid = session.grid("t1").unwrap();
    assert_eq!(grid.values(), &[10, 20, 30, 40]);
    assert_eq!(grid.col_sums(), &[10.0, 60.0]);

    client.close();
    let requests = server.join().unwrap();
    assert!(requests >= 1);
}

#[test]
fn test_server_close_schedules_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        ws.close(None).unwrap();
        while ws.read().is_ok() {}
    });

    let mut client = StreamClient::new(format!("ws://{addr}/ws"));
    let mut handler = StreamProtocolHandler::default();
    let mut session = Session::new(&ClientConfig::default());
    let commands = handler.handle(StreamEvent::ConnectRequested, &mut session);
    client.execute(commands, Instant::now());

    let rescheduled = run_until(&mut client, &mut handler, &mut session, |_, commands| {
        commands
            .iter()
            .any(|c| matches!(c, StreamCommand::ScheduleReconnect { .. }))
    });
    assert!(rescheduled);
    assert_eq!(handler.state(), ConnectionState::Disconnected);
    assert!(handler.pending_reconnect().is_some());
    assert!(client.next_wakeup().is_some());
    server.join().unwrap();
}

#[test]
fn test_refused_connection_reports_closed() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut client = StreamClient::new(format!("ws://{addr}/ws"));
    client.open().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut closed = None;
    while closed.is_none() && Instant::now() < deadline {
        closed = client
            .poll(Instant::now())
            .into_iter()
            .find(|event| matches!(event, StreamEvent::Closed(_)));
        thread::sleep(Duration::from_millis(10));
    }
    assert!(matches!(closed, Some(StreamEvent::Closed(reason)) if !reason.is_empty()));
    assert!(!client.is_open());
}
