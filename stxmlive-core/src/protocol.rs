//! JSON messages exchanged over the live stream.
//!
//! Server messages are distinguished by their `type` field; incremental
//! updates carry no `type` and are recognized by `image_id`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Grid layout announcement. Replaces every grid on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMessage {
    pub grid_x: usize,
    pub grid_y: usize,
    /// Absent or `null` when the server has no thresholds configured.
    #[serde(default, deserialize_with = "deserialize_thresholds")]
    pub thresholds: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zmq_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplon_base_url: Option<String>,
}

impl ConfigMessage {
    /// Plain config with no connection extras.
    #[must_use]
    pub fn new(grid_x: usize, grid_y: usize, thresholds: Vec<String>) -> Self {
        Self {
            grid_x,
            grid_y,
            thresholds,
            detector_ip: None,
            zmq_port: None,
            api_port: None,
            endpoint: None,
            simplon_base_url: None,
        }
    }
}

/// One-cell update for one or more thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// Row-major cell index; may be out of range on a misbehaving server.
    pub image_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    pub data: BTreeMap<String, u32>,
}

/// Full buffer of one threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub values: Vec<u32>,
    /// Per-cell validity. Empty means every cell is valid.
    #[serde(default, deserialize_with = "deserialize_mask")]
    pub mask: Vec<bool>,
}

/// Full-grid resynchronization for one or more thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub data: BTreeMap<String, ThresholdSnapshot>,
}

/// Any message the server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Config(ConfigMessage),
    Update(UpdateMessage),
    Snapshot(SnapshotMessage),
}

impl ServerMessage {
    /// Parse one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the frame is not JSON, has an unknown
    /// `type`, or lacks required fields.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Protocol(format!("not JSON: {e}")))?;
        let kind = match value.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(Error::Protocol(format!("non-string type field: {other}")));
            }
        };

        match kind.as_deref() {
            Some("config") => decode(value, "config").map(Self::Config),
            Some("snapshot") => decode(value, "snapshot").map(Self::Snapshot),
            None if value.get("image_id").is_some() => decode(value, "update").map(Self::Update),
            None => Err(Error::Protocol("message has neither type nor image_id".into())),
            Some(other) => Err(Error::Protocol(format!("unknown message type '{other}'"))),
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Update(_) => "update",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value, kind: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Protocol(format!("malformed {kind}: {e}")))
}

/// Messages sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a full snapshot of every threshold.
    SnapshotRequest,
}

impl ClientMessage {
    /// Encode as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaskEntry {
    Flag(bool),
    Number(i64),
}

impl From<MaskEntry> for bool {
    fn from(entry: MaskEntry) -> Self {
        match entry {
            MaskEntry::Flag(flag) => flag,
            MaskEntry::Number(n) => n != 0,
        }
    }
}

/// Accepts `[true, false]`, `[1, 0]`, or `null`.
fn deserialize_mask<'de, D>(deserializer: D) -> std::result::Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<MaskEntry>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(bool::from)
        .collect())
}

fn deserialize_thresholds<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let msg = ServerMessage::parse(
            r#"{"type":"config","grid_x":2,"grid_y":3,"thresholds":["t1","t2"]}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Config(ConfigMessage::new(2, 3, vec!["t1".into(), "t2".into()]))
        );
    }

    #[test]
    fn test_parse_config_with_extras() {
        let text = r#"{"type":"config","grid_x":4,"grid_y":4,"thresholds":["a"],
            "detector_ip":"10.0.0.5","zmq_port":31001,"api_port":80,
            "endpoint":"tcp://10.0.0.5:31001","simplon_base_url":"http://10.0.0.5",
            "something_new":true}"#;
        let ServerMessage::Config(config) = ServerMessage::parse(text).unwrap() else {
            panic!("expected config");
        };
        assert_eq!(config.detector_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.zmq_port, Some(31001));
        assert_eq!(config.endpoint.as_deref(), Some("tcp://10.0.0.5:31001"));
    }

    #[test]
    fn test_parse_config_without_thresholds() {
        for text in [
            r#"{"type":"config","grid_x":4,"grid_y":4,"thresholds":null}"#,
            r#"{"type":"config","grid_x":4,"grid_y":4}"#,
        ] {
            assert_eq!(
                ServerMessage::parse(text).unwrap(),
                ServerMessage::Config(ConfigMessage::new(4, 4, vec![])),
                "{text}"
            );
        }
    }

    #[test]
    fn test_parse_update_without_type() {
        let msg =
            ServerMessage::parse(r#"{"image_id":3,"start_time":1.5,"data":{"t1":1}}"#).unwrap();
        let ServerMessage::Update(update) = msg else {
            panic!("expected update");
        };
        assert_eq!(update.image_id, 3);
        assert_eq!(update.start_time, Some(1.5));
        assert_eq!(update.data.get("t1"), Some(&1));
    }

    #[test]
    fn test_parse_snapshot_mask_encodings() {
        let ints = r#"{"type":"snapshot","data":{"t1":{"values":[1,2],"mask":[1,0]}}}"#;
        let bools = r#"{"type":"snapshot","data":{"t1":{"values":[1,2],"mask":[true,false]}}}"#;
        let missing = r#"{"type":"snapshot","data":{"t1":{"values":[1,2]}}}"#;
        let null = r#"{"type":"snapshot","data":{"t1":{"values":[1,2],"mask":null}}}"#;

        for (text, expected) in [
            (ints, vec![true, false]),
            (bools, vec![true, false]),
            (missing, vec![]),
            (null, vec![]),
        ] {
            let ServerMessage::Snapshot(snapshot) = ServerMessage::parse(text).unwrap() else {
                panic!("expected snapshot");
            };
            assert_eq!(snapshot.data["t1"].mask, expected);
        }
    }

    #[test]
    fn test_malformed_messages_are_protocol_errors() {
        for text in [
            "not json",
            "[]",
            r#"{"type":"bogus"}"#,
            r#"{"type":"config","grid_x":2}"#,
            r#"{"image_id":"x","data":{}}"#,
            r#"{"data":{"t1":5}}"#,
            r#"{"type":7}"#,
            r#"{"image_id":0,"data":{"t1":-5}}"#,
        ] {
            assert!(
                matches!(ServerMessage::parse(text), Err(Error::Protocol(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_snapshot_request_encoding() {
        assert_eq!(
            ClientMessage::SnapshotRequest.to_json().unwrap(),
            r#"{"type":"snapshot_request"}"#
        );
    }
}
