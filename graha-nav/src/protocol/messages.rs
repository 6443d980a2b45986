//! Mothership wire messages
//!
//! Every message is a JSON envelope:
//!
//! ```json
//! {"from": "server", "type": "path", "payload": {"startX": 0, ...}}
//! ```
//!
//! Payload keys are camelCase. Directions travel as compass degrees and path
//! weights as signed integers (see [`graha_map::weight`]).

use graha_map::{Direction, Node, Position, Weight};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;

/// Originator of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Server,
    Client,
    Debug,
}

/// Outcome of driving a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    Free,
    Blocked,
}

/// Raw message envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: Sender,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(
        from: Sender,
        kind: impl Into<String>,
        payload: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            from,
            kind: kind.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(bytes).map_err(MessageError::Envelope)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize the payload into a typed struct.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        T::deserialize(&self.payload).map_err(|source| MessageError::Payload {
            kind: self.kind.clone(),
            source,
        })
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetPayload {
    pub planet_name: String,
    pub start_x: i32,
    pub start_y: i32,
    pub start_orientation: Direction,
}

impl PlanetPayload {
    pub fn start(&self) -> Position {
        Position::at(self.start_x, self.start_y, self.start_orientation)
    }
}

/// Payload of `path` and `pathUnveiled`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPayload {
    pub start_x: i32,
    pub start_y: i32,
    pub start_direction: Direction,
    pub end_x: i32,
    pub end_y: i32,
    pub end_direction: Direction,
    pub path_status: PathStatus,
    /// Only sent by the mothership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_weight: Option<i64>,
}

impl PathPayload {
    pub fn new(start: Position, end: Position, status: PathStatus) -> Self {
        Self {
            start_x: start.node.x,
            start_y: start.node.y,
            start_direction: start.direction,
            end_x: end.node.x,
            end_y: end.node.y,
            end_direction: end.direction,
            path_status: status,
            path_weight: None,
        }
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.path_weight = Some(weight.to_wire());
        self
    }

    pub fn start(&self) -> Position {
        Position::at(self.start_x, self.start_y, self.start_direction)
    }

    pub fn end(&self) -> Position {
        Position::at(self.end_x, self.end_y, self.end_direction)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSelectPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<i32>,
    pub start_direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPayload {
    pub target_x: i32,
    pub target_y: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlanetPayload {
    pub planet_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Inbound
// ============================================================================

/// A confirmed or revealed path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathUpdate {
    pub start: Position,
    pub end: Position,
    pub status: PathStatus,
    pub weight: Weight,
}

impl PathUpdate {
    fn from_envelope(envelope: &Envelope) -> Result<Self, MessageError> {
        let payload: PathPayload = envelope.payload()?;
        let weight = match (payload.path_weight, payload.path_status) {
            (Some(wire), _) => Weight::from_wire(wire).ok_or(MessageError::InvalidWeight(wire))?,
            (None, PathStatus::Blocked) => Weight::Blocked,
            (None, PathStatus::Free) => return Err(MessageError::MissingWeight(envelope.kind.clone())),
        };
        let consistent = match payload.path_status {
            PathStatus::Free => matches!(weight, Weight::Free(_)),
            PathStatus::Blocked => weight == Weight::Blocked,
        };
        if !consistent {
            return Err(MessageError::StatusMismatch {
                status: payload.path_status,
                weight: weight.to_wire(),
            });
        }
        Ok(Self {
            start: payload.start(),
            end: payload.end(),
            status: payload.path_status,
            weight,
        })
    }
}

/// A validated inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Planet assignment: name and the robot's start pose.
    Planet { name: String, start: Position },
    /// Confirmation of the path just driven.
    Path(PathUpdate),
    /// Server-chosen direction overriding ours.
    PathSelect(Direction),
    Target(Node),
    /// Path revealed without being driven.
    PathUnveiled(PathUpdate),
    /// `done`, `targetReached` or `explorationCompleted` from the server.
    Done(String),
    /// `debug/error`: the last request was rejected.
    Error(String),
    /// Any other debug message.
    Notice { kind: String, message: String },
    /// One of our own messages echoed back on a subscribed topic.
    Echo(String),
}

impl Inbound {
    /// Decode and validate a raw message.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let envelope = Envelope::from_bytes(bytes)?;
        match envelope.from {
            Sender::Client => Ok(Inbound::Echo(envelope.kind)),
            Sender::Debug => {
                let message = envelope
                    .payload::<MessagePayload>()
                    .map(|p| p.message)
                    .unwrap_or_default();
                if envelope.kind == "error" {
                    Ok(Inbound::Error(message))
                } else {
                    Ok(Inbound::Notice {
                        kind: envelope.kind,
                        message,
                    })
                }
            }
            Sender::Server => Self::decode_server(envelope),
        }
    }

    fn decode_server(envelope: Envelope) -> Result<Self, MessageError> {
        match envelope.kind.as_str() {
            "planet" => {
                let payload: PlanetPayload = envelope.payload()?;
                Ok(Inbound::Planet {
                    start: payload.start(),
                    name: payload.planet_name,
                })
            }
            "path" => Ok(Inbound::Path(PathUpdate::from_envelope(&envelope)?)),
            "pathUnveiled" => Ok(Inbound::PathUnveiled(PathUpdate::from_envelope(&envelope)?)),
            "pathSelect" => {
                let payload: PathSelectPayload = envelope.payload()?;
                Ok(Inbound::PathSelect(payload.start_direction))
            }
            "target" => {
                let payload: TargetPayload = envelope.payload()?;
                Ok(Inbound::Target(Node::new(payload.target_x, payload.target_y)))
            }
            "done" | "targetReached" | "explorationCompleted" => {
                let payload: MessagePayload = envelope.payload().unwrap_or_default();
                Ok(Inbound::Done(payload.message))
            }
            _ => Err(MessageError::UnknownKind(envelope.kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Planet { .. } => "planet",
            Inbound::Path(_) => "path",
            Inbound::PathSelect(_) => "pathSelect",
            Inbound::Target(_) => "target",
            Inbound::PathUnveiled(_) => "pathUnveiled",
            Inbound::Done(_) => "done",
            Inbound::Error(_) => "error",
            Inbound::Notice { .. } => "notice",
            Inbound::Echo(_) => "echo",
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Acknowledgement a request waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    Planet,
    Path,
    /// Only sent when the server overrides the chosen direction.
    PathSelect,
    Done,
}

/// A message the robot sends.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Ready,
    TestPlanet(String),
    Path {
        start: Position,
        end: Position,
        status: PathStatus,
    },
    PathSelect(Position),
    TargetReached(String),
    ExplorationCompleted(String),
}

impl Outbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::Ready => "ready",
            Outbound::TestPlanet(_) => "testPlanet",
            Outbound::Path { .. } => "path",
            Outbound::PathSelect(_) => "pathSelect",
            Outbound::TargetReached(_) => "targetReached",
            Outbound::ExplorationCompleted(_) => "explorationCompleted",
        }
    }

    /// The acknowledgement this message waits for, if any.
    pub fn expected_ack(&self) -> Option<AckKind> {
        match self {
            Outbound::Ready => Some(AckKind::Planet),
            Outbound::TestPlanet(_) => None,
            Outbound::Path { .. } => Some(AckKind::Path),
            Outbound::PathSelect(_) => Some(AckKind::PathSelect),
            Outbound::TargetReached(_) | Outbound::ExplorationCompleted(_) => Some(AckKind::Done),
        }
    }

    /// Whether the message goes to the planet topic rather than the
    /// explorer topic.
    pub fn on_planet_topic(&self) -> bool {
        matches!(self, Outbound::Path { .. } | Outbound::PathSelect(_))
    }

    pub fn to_envelope(&self) -> Result<Envelope, serde_json::Error> {
        let kind = self.kind();
        match self {
            Outbound::Ready => Envelope::new(Sender::Client, kind, serde_json::Map::new()),
            Outbound::TestPlanet(name) => Envelope::new(
                Sender::Client,
                kind,
                TestPlanetPayload {
                    planet_name: name.clone(),
                },
            ),
            Outbound::Path { start, end, status } => {
                Envelope::new(Sender::Client, kind, PathPayload::new(*start, *end, *status))
            }
            Outbound::PathSelect(start) => Envelope::new(
                Sender::Client,
                kind,
                PathSelectPayload {
                    start_x: Some(start.node.x),
                    start_y: Some(start.node.y),
                    start_direction: start.direction,
                },
            ),
            Outbound::TargetReached(message) | Outbound::ExplorationCompleted(message) => {
                Envelope::new(
                    Sender::Client,
                    kind,
                    MessagePayload {
                        message: message.clone(),
                    },
                )
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.to_envelope()?.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_decode_planet() {
        let msg = Inbound::decode(&bytes(json!({
            "from": "server",
            "type": "planet",
            "payload": {"planetName": "Hawkeye", "startX": 3, "startY": -1, "startOrientation": 90}
        })))
        .unwrap();

        assert_eq!(
            msg,
            Inbound::Planet {
                name: "Hawkeye".into(),
                start: Position::at(3, -1, Direction::East),
            }
        );
    }

    #[test]
    fn test_decode_path_weights() {
        let path = |status: &str, weight: i64| {
            bytes(json!({
                "from": "server",
                "type": "path",
                "payload": {
                    "startX": 0, "startY": 0, "startDirection": 0,
                    "endX": 0, "endY": 1, "endDirection": 180,
                    "pathStatus": status, "pathWeight": weight
                }
            }))
        };

        let Inbound::Path(update) = Inbound::decode(&path("free", 4)).unwrap() else {
            panic!("expected path");
        };
        assert_eq!(update.start, Position::at(0, 0, Direction::North));
        assert_eq!(update.end, Position::at(0, 1, Direction::South));
        assert_eq!(update.weight, Weight::free(4));

        let Inbound::Path(update) = Inbound::decode(&path("blocked", -1)).unwrap() else {
            panic!("expected path");
        };
        assert_eq!(update.status, PathStatus::Blocked);
        assert_eq!(update.weight, Weight::Blocked);

        assert!(matches!(
            Inbound::decode(&path("free", -2)),
            Err(MessageError::InvalidWeight(-2))
        ));
    }

    #[test]
    fn test_status_must_agree_with_weight() {
        let path = |status: &str, weight: i64| {
            bytes(json!({
                "from": "server",
                "type": "path",
                "payload": {
                    "startX": 0, "startY": 0, "startDirection": 0,
                    "endX": 0, "endY": 1, "endDirection": 180,
                    "pathStatus": status, "pathWeight": weight
                }
            }))
        };

        for (status, weight) in [("free", -1), ("free", -3), ("free", 0), ("blocked", 5), ("blocked", -3)] {
            let result = Inbound::decode(&path(status, weight));
            assert!(
                matches!(result, Err(MessageError::StatusMismatch { weight: w, .. }) if w == weight),
                "{status} with weight {weight} decoded as {result:?}"
            );
        }
    }

    #[test]
    fn test_missing_keys_are_rejected() {
        let result = Inbound::decode(&bytes(json!({
            "from": "server",
            "type": "path",
            "payload": {"startX": 0, "startY": 0, "startDirection": 0}
        })));
        assert!(matches!(result, Err(MessageError::Payload { .. })));

        let result = Inbound::decode(&bytes(json!({
            "from": "server",
            "type": "target",
            "payload": {"targetX": 1}
        })));
        assert!(matches!(result, Err(MessageError::Payload { .. })));
    }

    #[test]
    fn test_invalid_direction_is_rejected() {
        let result = Inbound::decode(&bytes(json!({
            "from": "server",
            "type": "pathSelect",
            "payload": {"startDirection": 45}
        })));
        assert!(matches!(result, Err(MessageError::Payload { .. })));
    }

    #[test]
    fn test_garbage_and_unknown_kinds() {
        assert!(matches!(
            Inbound::decode(b"not json"),
            Err(MessageError::Envelope(_))
        ));
        assert!(matches!(
            Inbound::decode(&bytes(json!({"from": "robot", "type": "ready"}))),
            Err(MessageError::Envelope(_))
        ));
        assert!(matches!(
            Inbound::decode(&bytes(json!({"from": "server", "type": "teleport", "payload": {}}))),
            Err(MessageError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_done_aliases_and_debug() {
        for kind in ["done", "targetReached", "explorationCompleted"] {
            let msg = Inbound::decode(&bytes(json!({
                "from": "server", "type": kind, "payload": {"message": "ok"}
            })))
            .unwrap();
            assert_eq!(msg, Inbound::Done("ok".into()));
        }

        let msg = Inbound::decode(&bytes(json!({
            "from": "debug", "type": "error", "payload": {"message": "bad path"}
        })))
        .unwrap();
        assert_eq!(msg, Inbound::Error("bad path".into()));

        let msg = Inbound::decode(&bytes(json!({"from": "client", "type": "path"}))).unwrap();
        assert_eq!(msg, Inbound::Echo("path".into()));
    }

    #[test]
    fn test_encode_path_uses_camel_case_without_weight() {
        let outbound = Outbound::Path {
            start: Position::at(1, 2, Direction::West),
            end: Position::at(0, 2, Direction::East),
            status: PathStatus::Free,
        };
        let value: Value = serde_json::from_slice(&outbound.encode().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "from": "client",
                "type": "path",
                "payload": {
                    "startX": 1, "startY": 2, "startDirection": 270,
                    "endX": 0, "endY": 2, "endDirection": 90,
                    "pathStatus": "free"
                }
            })
        );
    }

    #[test]
    fn test_outbound_routing() {
        assert_eq!(Outbound::Ready.expected_ack(), Some(AckKind::Planet));
        assert_eq!(Outbound::TestPlanet("X".into()).expected_ack(), None);
        assert!(!Outbound::Ready.on_planet_topic());
        assert!(Outbound::PathSelect(Position::default()).on_planet_topic());

        let value: Value = serde_json::from_slice(&Outbound::Ready.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"from": "client", "type": "ready", "payload": {}}));
    }
}
