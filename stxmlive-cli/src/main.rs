//! Headless client for the live map stream.
//!
//! `capture` connects to a running server, optionally recording every text
//! frame; `replay` and `inspect` feed a recording through the same protocol
//! handler and session the viewer uses.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use stxmlive_core::{
    write_export, ClientConfig, ColorScheme, Session, SessionSummary, StreamEvent,
    StreamProtocolHandler,
};
use stxmlive_stream::StreamClient;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] stxmlive_core::Error),

    #[error("Stream error: {0}")]
    Stream(#[from] stxmlive_stream::Error),

    #[error("{path}:{line}: invalid recording entry: {source}")]
    Record {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

/// One line of a stream recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordedFrame {
    /// Milliseconds since the capture started.
    elapsed_ms: u64,
    /// Text frame exactly as received.
    frame: String,
}

/// What a command prints on completion.
#[derive(Debug, Serialize)]
struct Report {
    frames: u64,
    dropped: u64,
    #[serde(flatten)]
    summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<PathBuf>,
}

/// Live scanning-microscopy map stream client.
#[derive(Parser)]
#[command(name = "stxmlive")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a stream and accumulate maps for a while
    Capture {
        /// WebSocket URL of the stream
        #[arg(long)]
        url: Option<String>,

        /// How long to listen, in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Stop after this many text frames
        #[arg(long)]
        max_frames: Option<u64>,

        /// Append every received frame to this JSON-lines file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Write a snapshot image and metadata into this directory
        #[arg(long)]
        export: Option<PathBuf>,

        /// Color scheme for the export
        #[arg(long, value_parser = parse_scheme)]
        scheme: Option<ColorScheme>,
    },

    /// Rebuild the maps from a recording and export them
    Replay {
        /// Recording written by `capture --record`
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Color scheme for the export
        #[arg(long, value_parser = parse_scheme)]
        scheme: Option<ColorScheme>,
    },

    /// Print per-threshold statistics of a recording as JSON
    Inspect {
        /// Recording written by `capture --record`
        input: PathBuf,
    },
}

fn parse_scheme(key: &str) -> std::result::Result<ColorScheme, String> {
    ColorScheme::from_key(key).ok_or_else(|| format!("unknown color scheme '{key}'"))
}

/// Polling interval of the capture loop.
const CAPTURE_TICK: Duration = Duration::from_millis(10);

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    Ok(match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    })
}

fn append_frame(writer: &mut impl Write, elapsed: Duration, frame: &str) -> Result<()> {
    let record = RecordedFrame {
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        frame: frame.to_string(),
    };
    serde_json::to_writer(&mut *writer, &record)?;
    writeln!(writer)?;
    Ok(())
}

/// Stream state rebuilt from a recording.
struct Replayed {
    session: Session,
    handler: StreamProtocolHandler,
    frames: u64,
}

fn replay(path: &Path, config: &ClientConfig) -> Result<Replayed> {
    let reader = BufReader::new(File::open(path)?);
    let mut session = Session::new(config);
    let mut handler = StreamProtocolHandler::new(config.reconnect_delay());
    // Commands (snapshot requests) have nowhere to go offline.
    handler.handle(StreamEvent::ConnectRequested, &mut session);
    handler.handle(StreamEvent::Opened, &mut session);

    let mut frames = 0;
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RecordedFrame =
            serde_json::from_str(&line).map_err(|source| CliError::Record {
                path: path.to_path_buf(),
                line: n + 1,
                source,
            })?;
        handler.handle(StreamEvent::MessageReceived(record.frame), &mut session);
        frames += 1;
    }
    log::info!("replayed {frames} frames from {}", path.display());
    Ok(Replayed {
        session,
        handler,
        frames,
    })
}

fn report(
    session: &Session,
    handler: &StreamProtocolHandler,
    frames: u64,
    export: Option<&Path>,
) -> Result<Report> {
    let exported = match export {
        Some(dir) => Some(write_export(session, dir)?.image),
        None => None,
    };
    Ok(Report {
        frames,
        dropped: handler.dropped_messages(),
        summary: session.summary(),
        exported,
    })
}

fn capture(
    config: &ClientConfig,
    duration: Duration,
    max_frames: Option<u64>,
    record: Option<&Path>,
    export: Option<&Path>,
) -> Result<Report> {
    let mut recorder = match record {
        Some(path) => Some(BufWriter::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let mut session = Session::new(config);
    let mut handler = StreamProtocolHandler::new(config.reconnect_delay());
    let mut client = StreamClient::new(config.url.clone());
    let start = Instant::now();
    let commands = handler.handle(StreamEvent::ConnectRequested, &mut session);
    client.execute(commands, start);

    let mut frames = 0;
    'capture: while start.elapsed() < duration {
        let now = Instant::now();
        for event in client.poll(now) {
            if let StreamEvent::MessageReceived(text) = &event {
                frames += 1;
                if let Some(writer) = recorder.as_mut() {
                    append_frame(writer, now.duration_since(start), text)?;
                }
            }
            let commands = handler.handle(event, &mut session);
            client.execute(commands, now);
            if max_frames.is_some_and(|max| frames >= max) {
                break 'capture;
            }
        }
        thread::sleep(CAPTURE_TICK);
    }
    client.close();
    if let Some(mut writer) = recorder {
        writer.flush()?;
    }
    log::info!("captured {frames} frames in {:.1}s", start.elapsed().as_secs_f64());
    report(&session, &handler, frames, export)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    let report = match cli.command {
        Commands::Capture {
            url,
            duration,
            max_frames,
            record,
            export,
            scheme,
        } => {
            if let Some(url) = url {
                config.url = url;
            }
            if let Some(scheme) = scheme {
                config.scheme = scheme;
            }
            config.validate()?;
            capture(
                &config,
                Duration::from_secs(duration),
                max_frames,
                record.as_deref(),
                export.as_deref(),
            )?
        }
        Commands::Replay {
            input,
            output,
            scheme,
        } => {
            if let Some(scheme) = scheme {
                config.scheme = scheme;
            }
            let replayed = replay(&input, &config)?;
            report(
                &replayed.session,
                &replayed.handler,
                replayed.frames,
                Some(&output),
            )?
        }
        Commands::Inspect { input } => {
            let replayed = replay(&input, &config)?;
            report(&replayed.session, &replayed.handler, replayed.frames, None)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_recording(path: &Path, frames: &[&str]) {
        let mut file = File::create(path).unwrap();
        for (i, frame) in frames.iter().enumerate() {
            append_frame(&mut file, Duration::from_millis(i as u64 * 10), frame).unwrap();
        }
    }

    const FRAMES: [&str; 4] = [
        r#"{"type":"config","grid_x":2,"grid_y":2,"thresholds":["t1"]}"#,
        r#"{"image_id":0,"data":{"t1":5}}"#,
        "not json",
        r#"{"image_id":3,"data":{"t1":1}}"#,
    ];

    #[test]
    fn test_replay_rebuilds_grids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        write_recording(&path, &FRAMES);

        let replayed = replay(&path, &ClientConfig::default()).unwrap();
        assert_eq!(replayed.frames, 4);
        assert_eq!(replayed.handler.dropped_messages(), 1);
        let grid = replayed.session.grid("t1").unwrap();
        assert_eq!(grid.values(), &[5, 0, 0, 1]);
        assert_eq!(grid.min_value(), Some(1));
    }

    #[test]
    fn test_replay_reports_bad_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        write_recording(&path, &FRAMES[..1]);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"frame\": 3}}").unwrap();

        match replay(&path, &ClientConfig::default()) {
            Err(CliError::Record { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected record error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_report_exports_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        write_recording(&path, &FRAMES);
        let replayed = replay(&path, &ClientConfig::default()).unwrap();

        let out = dir.path().join("out");
        let report = report(&replayed.session, &replayed.handler, replayed.frames, Some(&out)).unwrap();
        let image = report.exported.clone().unwrap();
        assert!(image.exists());
        assert!(image.with_extension("json").exists());
        assert_eq!(report.summary.thresholds[0].stats.max, Some(5));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["width"], 2);
        assert_eq!(json["thresholds"][0]["name"], "t1");
    }

    #[test]
    fn test_cli_parses_capture_flags() {
        let cli = Cli::parse_from([
            "stxmlive",
            "capture",
            "--url",
            "ws://localhost:8888/ws",
            "--duration",
            "3",
            "--record",
            "run.jsonl",
        ]);
        match cli.command {
            Commands::Capture {
                duration, record, ..
            } => {
                assert_eq!(duration, 3);
                assert_eq!(record, Some(PathBuf::from("run.jsonl")));
            }
            _ => panic!("expected capture"),
        }
    }
}
