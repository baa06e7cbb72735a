//! Envelope codec for the newline-delimited JSON wire format.
//!
//! Every frame is a single JSON object carrying an `op` discriminator.
//! One transport message may pack several frames separated by `\n`; each
//! segment is parsed independently so a malformed segment never poisons
//! its neighbors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

// ── Frame payloads ───────────────────────────────────────────────────

/// A topic-routed telemetry or state frame (`op = "data"`).
///
/// Payload fields sit at the top level of the JSON object next to the
/// routing fields; everything not recognized here lands in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    pub topic: String,

    /// Correlation token echoed back by the bridge on self-originated
    /// writes. Absent on ordinary telemetry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// All remaining fields of the frame.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl DataFrame {
    pub fn new(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            topic: topic.into(),
            iterator: None,
            timestamp: None,
            payload,
        }
    }

    /// Deserialize the payload into a typed shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ProtoError> {
        serde_json::from_value(Value::Object(self.payload.clone()))
            .map_err(|e| ProtoError::PayloadShape(e.to_string()))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Reply to `get_nodes` (`op = "get_nodes_callback"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub states: HashMap<String, u8>,
    #[serde(default)]
    pub configs: Map<String, Value>,
    pub system: SystemReport,
}

/// Raw system tuple as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemReport {
    pub state: u8,
    pub mode: u8,
    pub mobility: bool,
}

/// Reply to `get_presets` (`op = "get_presets_callback"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetReport {
    pub presets: Vec<String>,
    pub active_preset: String,
}

/// Configuration traffic (`op = "configuration"`): a request for a
/// device's config (`opcode` set) or a push of an edited blob (`json`
/// set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFrame {
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcode: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator: Option<u64>,
}

/// Register bus instruction (`op = "conbus"`). The first data byte is
/// the register address; the rest is the value payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConbusFrame {
    pub id: u16,
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator: Option<u64>,
}

// ── Envelope ─────────────────────────────────────────────────────────

/// One wire frame, discriminated by `op`.
///
/// The set is closed: an inbound frame whose `op` is not listed here
/// decodes to [`ProtoError::UnknownOp`], which callers treat as
/// ignorable for forward compatibility.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Data(DataFrame),
    Broadcast,
    GetNodes,
    GetNodesCallback(NodeReport),
    GetPresets,
    GetPresetsCallback(PresetReport),
    SetActivePreset { preset: String },
    SavePresetMode,
    SavePresetAs { preset: String },
    DeletePreset { preset: String },
    SetSystemState(SystemReport),
    Configuration(ConfigFrame),
    Conbus(ConbusFrame),
}

impl Envelope {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Broadcast => "broadcast",
            Self::GetNodes => "get_nodes",
            Self::GetNodesCallback(_) => "get_nodes_callback",
            Self::GetPresets => "get_presets",
            Self::GetPresetsCallback(_) => "get_presets_callback",
            Self::SetActivePreset { .. } => "set_active_preset",
            Self::SavePresetMode => "save_preset_mode",
            Self::SavePresetAs { .. } => "save_preset_as",
            Self::DeletePreset { .. } => "delete_preset",
            Self::SetSystemState(_) => "set_system_state",
            Self::Configuration(_) => "configuration",
            Self::Conbus(_) => "conbus",
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Encode one envelope as a single JSON text line.
///
/// JSON string escaping guarantees the output carries no raw newline,
/// so the result is always exactly one frame.
pub fn encode(envelope: &Envelope) -> Result<String, ProtoError> {
    let mut object = match envelope {
        Envelope::Broadcast
        | Envelope::GetNodes
        | Envelope::GetPresets
        | Envelope::SavePresetMode => Map::new(),

        Envelope::Data(frame) => to_object(frame)?,
        Envelope::GetNodesCallback(report) => to_object(report)?,
        Envelope::GetPresetsCallback(report) => to_object(report)?,
        Envelope::SetSystemState(report) => to_object(report)?,
        Envelope::Configuration(frame) => to_object(frame)?,
        Envelope::Conbus(frame) => to_object(frame)?,

        Envelope::SetActivePreset { preset }
        | Envelope::SavePresetAs { preset }
        | Envelope::DeletePreset { preset } => {
            let mut map = Map::new();
            map.insert("preset".into(), Value::String(preset.clone()));
            map
        }
    };

    object.insert("op".into(), Value::String(envelope.op().into()));
    serde_json::to_string(&Value::Object(object)).map_err(|e| ProtoError::Encode(e.to_string()))
}

fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>, ProtoError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProtoError::Encode(format!(
            "frame payload serialized to non-object JSON: {other}"
        ))),
        Err(e) => Err(ProtoError::Encode(e.to_string())),
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Split a raw transport message on `\n` and decode each segment
/// independently. Empty segments (trailing newlines) are skipped.
pub fn decode_frames(raw: &str) -> impl Iterator<Item = Result<Envelope, ProtoError>> + '_ {
    raw.split('\n')
        .filter(|segment| !segment.trim().is_empty())
        .map(decode_frame)
}

/// Decode a single frame segment.
pub fn decode_frame(segment: &str) -> Result<Envelope, ProtoError> {
    let value: Value = serde_json::from_str(segment).map_err(|e| malformed(segment, &e))?;

    let Value::Object(mut object) = value else {
        return Err(ProtoError::MalformedFrame {
            segment: segment.to_owned(),
            reason: "frame is not a JSON object".into(),
        });
    };

    let op = match object.remove("op") {
        Some(Value::String(op)) => op,
        _ => {
            return Err(ProtoError::MalformedFrame {
                segment: segment.to_owned(),
                reason: "missing or non-string 'op' field".into(),
            });
        }
    };

    let body = Value::Object(object);
    match op.as_str() {
        "data" => from_body(segment, body).map(Envelope::Data),
        "broadcast" => Ok(Envelope::Broadcast),
        "get_nodes" => Ok(Envelope::GetNodes),
        "get_nodes_callback" => from_body(segment, body).map(Envelope::GetNodesCallback),
        "get_presets" => Ok(Envelope::GetPresets),
        "get_presets_callback" => from_body(segment, body).map(Envelope::GetPresetsCallback),
        "set_active_preset" => {
            from_body::<PresetField>(segment, body).map(|p| Envelope::SetActivePreset {
                preset: p.preset,
            })
        }
        "save_preset_mode" => Ok(Envelope::SavePresetMode),
        "save_preset_as" => from_body::<PresetField>(segment, body)
            .map(|p| Envelope::SavePresetAs { preset: p.preset }),
        "delete_preset" => from_body::<PresetField>(segment, body)
            .map(|p| Envelope::DeletePreset { preset: p.preset }),
        "set_system_state" => from_body(segment, body).map(Envelope::SetSystemState),
        "configuration" => from_body(segment, body).map(Envelope::Configuration),
        "conbus" => from_body(segment, body).map(Envelope::Conbus),
        _ => Err(ProtoError::UnknownOp { op }),
    }
}

#[derive(Deserialize)]
struct PresetField {
    preset: String,
}

fn from_body<T: DeserializeOwned>(segment: &str, body: Value) -> Result<T, ProtoError> {
    serde_json::from_value(body).map_err(|e| malformed(segment, &e))
}

fn malformed(segment: &str, reason: &dyn std::fmt::Display) -> ProtoError {
    ProtoError::MalformedFrame {
        segment: segment.to_owned(),
        reason: reason.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::topics;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[test]
    fn data_frame_round_trip() {
        let mut frame = DataFrame::new(
            topics::GPS,
            payload(json!({
                "latitude": 35.21,
                "longitude": -97.44,
                "gps_fix": 3,
                "is_locked": true,
                "satellites": 11
            })),
        );
        frame.iterator = Some(7);

        let line = encode(&Envelope::Data(frame.clone())).unwrap();
        assert!(!line.contains('\n'));

        let decoded = decode_frame(&line).unwrap();
        assert_eq!(decoded, Envelope::Data(frame));
    }

    #[test]
    fn unit_ops_round_trip() {
        for envelope in [
            Envelope::Broadcast,
            Envelope::GetNodes,
            Envelope::GetPresets,
            Envelope::SavePresetMode,
        ] {
            let line = encode(&envelope).unwrap();
            assert_eq!(decode_frame(&line).unwrap(), envelope);
        }
    }

    #[test]
    fn preset_ops_round_trip() {
        for envelope in [
            Envelope::SetActivePreset { preset: "comp".into() },
            Envelope::SavePresetAs { preset: "practice-2".into() },
            Envelope::DeletePreset { preset: "old".into() },
        ] {
            let line = encode(&envelope).unwrap();
            assert_eq!(decode_frame(&line).unwrap(), envelope);
        }
    }

    #[test]
    fn configuration_round_trip() {
        let request = Envelope::Configuration(ConfigFrame {
            device: "autonav_vision_transformer".into(),
            opcode: Some(4),
            json: None,
            iterator: Some(12),
        });
        let push = Envelope::Configuration(ConfigFrame {
            device: "autonav_vision_transformer".into(),
            opcode: None,
            json: Some(json!({"lower_hue": 0, "upper_hue": 255})),
            iterator: Some(13),
        });

        for envelope in [request, push] {
            let line = encode(&envelope).unwrap();
            assert_eq!(decode_frame(&line).unwrap(), envelope);
        }
    }

    #[test]
    fn conbus_round_trip() {
        let envelope = Envelope::Conbus(ConbusFrame {
            id: 1024,
            data: vec![0xFF],
            iterator: Some(3),
        });
        let line = encode(&envelope).unwrap();
        assert_eq!(decode_frame(&line).unwrap(), envelope);
    }

    #[test]
    fn callbacks_decode() {
        let raw = json!({
            "op": "get_presets_callback",
            "presets": ["default", "comp"],
            "active_preset": "default"
        })
        .to_string();

        let Envelope::GetPresetsCallback(report) = decode_frame(&raw).unwrap() else {
            panic!("expected presets callback");
        };
        assert_eq!(report.presets, vec!["default", "comp"]);
        assert_eq!(report.active_preset, "default");

        let raw = json!({
            "op": "get_nodes_callback",
            "nodes": ["autonav_serial_can", "autonav_nav_astar"],
            "states": {"autonav_serial_can": 3},
            "configs": {"autonav_nav_astar": {"waypoint_delay": 12.5}},
            "system": {"state": 1, "mode": 0, "mobility": true}
        })
        .to_string();

        let Envelope::GetNodesCallback(report) = decode_frame(&raw).unwrap() else {
            panic!("expected nodes callback");
        };
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.states["autonav_serial_can"], 3);
        assert_eq!(report.system.mode, 0);
    }

    #[test]
    fn multi_frame_isolates_malformed_segment() {
        let raw = format!(
            "{}\n{}\n{}",
            json!({"op": "data", "topic": "/autonav/gps", "latitude": 1.0}),
            "{not json",
            json!({"op": "get_presets"}),
        );

        let results: Vec<_> = decode_frames(&raw).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ProtoError::MalformedFrame { .. })
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn empty_segments_are_skipped() {
        let raw = format!("{}\n\n", json!({"op": "broadcast"}));
        let results: Vec<_> = decode_frames(&raw).collect();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn unknown_op_is_its_own_error_class() {
        let raw = json!({"op": "future_feature", "x": 1}).to_string();
        assert!(matches!(
            decode_frame(&raw),
            Err(ProtoError::UnknownOp { .. })
        ));
    }

    #[test]
    fn missing_op_is_malformed() {
        let raw = json!({"topic": "/autonav/gps"}).to_string();
        assert!(matches!(
            decode_frame(&raw),
            Err(ProtoError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn newline_in_string_payload_stays_escaped() {
        let frame = DataFrame::new(
            topics::LOGGING,
            payload(json!({"node": "autonav_nav_astar", "data": "line one\nline two"})),
        );
        let line = encode(&Envelope::Data(frame)).unwrap();
        assert!(!line.contains('\n'));
        assert!(decode_frame(&line).is_ok());
    }

    #[test]
    fn typed_payload_extraction() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Gps {
            latitude: f64,
            longitude: f64,
        }

        let frame = DataFrame::new(
            topics::GPS,
            payload(json!({"latitude": 35.0, "longitude": -97.0, "satellites": 9})),
        );
        let gps: Gps = frame.parse().unwrap();
        assert_eq!(
            gps,
            Gps {
                latitude: 35.0,
                longitude: -97.0
            }
        );
    }
}
