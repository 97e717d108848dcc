use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Status, Unit},
    error::ProtocolError,
};

pub const UNIT_UPDATED_EVENT: &str = "unitUpdated";

/// Engine.IO v4 handshake path appended to the push base address.
pub const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Body of a partial-update request. Exactly one field is set per intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Option<Status>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_index: Option<usize>,
}

impl UnitPatch {
    /// `None` clears the status (sent as JSON `null`).
    pub fn status(status: Option<Status>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            comment: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn toggle_comment(comment_index: usize) -> Self {
        Self {
            comment_index: Some(comment_index),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHandshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One text frame of the push channel (Socket.IO v5 over Engine.IO v4).
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    EngineOpen(EngineHandshake),
    EngineClose,
    Ping,
    Pong,
    Noop,
    Connect,
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(Value),
}

impl PushFrame {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let engine = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let rest = chars.as_str();
        match engine {
            '0' => serde_json::from_str(rest)
                .map(PushFrame::EngineOpen)
                .map_err(|err| ProtocolError::malformed("engine open", err)),
            '1' => Ok(PushFrame::EngineClose),
            '2' => Ok(PushFrame::Ping),
            '3' => Ok(PushFrame::Pong),
            '6' => Ok(PushFrame::Noop),
            '4' => decode_socket_packet(rest),
            other => Err(ProtocolError::UnknownEnginePacket(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            PushFrame::EngineOpen(handshake) => {
                let body = serde_json::json!({
                    "sid": handshake.sid,
                    "upgrades": [],
                    "pingInterval": handshake.ping_interval,
                    "pingTimeout": handshake.ping_timeout,
                });
                format!("0{body}")
            }
            PushFrame::EngineClose => "1".to_string(),
            PushFrame::Ping => "2".to_string(),
            PushFrame::Pong => "3".to_string(),
            PushFrame::Noop => "6".to_string(),
            PushFrame::Connect => "40".to_string(),
            PushFrame::Disconnect => "41".to_string(),
            PushFrame::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("42{}", Value::Array(items))
            }
            PushFrame::ConnectError(payload) => format!("44{payload}"),
        }
    }
}

fn decode_socket_packet(rest: &str) -> Result<PushFrame, ProtocolError> {
    let mut chars = rest.chars();
    let kind = chars.next().ok_or(ProtocolError::EmptyFrame)?;
    let body = strip_namespace_and_ack(chars.as_str());
    match kind {
        '0' => Ok(PushFrame::Connect),
        '1' => Ok(PushFrame::Disconnect),
        '2' => decode_event(body),
        '4' if body.is_empty() => Ok(PushFrame::ConnectError(Value::Null)),
        '4' => serde_json::from_str(body)
            .map(PushFrame::ConnectError)
            .map_err(|err| ProtocolError::malformed("connect error", err)),
        other => Err(ProtocolError::UnsupportedSocketPacket(other)),
    }
}

fn strip_namespace_and_ack(body: &str) -> &str {
    let body = if body.starts_with('/') {
        body.split_once(',').map(|(_, tail)| tail).unwrap_or("")
    } else {
        body
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<PushFrame, ProtocolError> {
    let mut items: Vec<Value> =
        serde_json::from_str(body).map_err(|err| ProtocolError::malformed("event", err))?;
    if items.is_empty() {
        return Err(ProtocolError::MissingEventName);
    }
    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::MissingEventName);
    };
    Ok(PushFrame::Event { name, args: items })
}

/// Application-level meaning of a push `Event` frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    UnitUpdated(Unit),
    Unhandled { name: String },
}

impl PushEvent {
    pub fn from_event(name: String, args: Vec<Value>) -> Result<Self, ProtocolError> {
        if name != UNIT_UPDATED_EVENT {
            return Ok(PushEvent::Unhandled { name });
        }
        let payload = args
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::MissingEventPayload { event: name })?;
        serde_json::from_value(payload)
            .map(PushEvent::UnitUpdated)
            .map_err(|err| ProtocolError::malformed("unit snapshot", err))
    }

    pub fn unit_updated_frame(unit: &Unit) -> Result<PushFrame, ProtocolError> {
        let payload = serde_json::to_value(unit)
            .map_err(|err| ProtocolError::malformed("unit snapshot", err))?;
        Ok(PushFrame::Event {
            name: UNIT_UPDATED_EVENT.to_string(),
            args: vec![payload],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Comment;

    #[test]
    fn decodes_engine_handshake() {
        let frame = PushFrame::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .expect("frame");
        assert_eq!(
            frame,
            PushFrame::EngineOpen(EngineHandshake {
                sid: "lv_VI97HAXpY6yYWAAAC".to_string(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn decodes_control_packets() {
        assert_eq!(PushFrame::decode("2").expect("ping"), PushFrame::Ping);
        assert_eq!(PushFrame::decode("3").expect("pong"), PushFrame::Pong);
        assert_eq!(PushFrame::decode("1").expect("close"), PushFrame::EngineClose);
        assert_eq!(
            PushFrame::decode(r#"40{"sid":"abc"}"#).expect("connect"),
            PushFrame::Connect
        );
        assert_eq!(PushFrame::decode("41").expect("disconnect"), PushFrame::Disconnect);
    }

    #[test]
    fn decodes_unit_updated_event() {
        let frame = PushFrame::decode(
            r#"42["unitUpdated",{"unitNumber":"101","level":"Level 1","status":"Issue","comments":[]}]"#,
        )
        .expect("frame");
        let PushFrame::Event { name, args } = frame else {
            panic!("expected event frame");
        };
        let event = PushEvent::from_event(name, args).expect("event");
        assert_eq!(
            event,
            PushEvent::UnitUpdated(
                Unit::new("101", "Level 1").with_status(Some(Status::Issue))
            )
        );
    }

    #[test]
    fn strips_namespace_and_ack_id() {
        let frame = PushFrame::decode(r#"42/site,17["ping-site",1]"#).expect("frame");
        assert_eq!(
            frame,
            PushFrame::Event {
                name: "ping-site".to_string(),
                args: vec![Value::from(1)],
            }
        );
    }

    #[test]
    fn other_events_are_unhandled() {
        let event = PushEvent::from_event("levelRenamed".to_string(), Vec::new()).expect("event");
        assert_eq!(
            event,
            PushEvent::Unhandled {
                name: "levelRenamed".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(PushFrame::decode(""), Err(ProtocolError::EmptyFrame)));
        assert!(matches!(
            PushFrame::decode("9"),
            Err(ProtocolError::UnknownEnginePacket('9'))
        ));
        assert!(matches!(
            PushFrame::decode("43[]"),
            Err(ProtocolError::UnsupportedSocketPacket('3'))
        ));
        assert!(matches!(
            PushFrame::decode("42[]"),
            Err(ProtocolError::MissingEventName)
        ));
        assert!(matches!(
            PushFrame::decode("42{not json"),
            Err(ProtocolError::MalformedPayload { .. })
        ));
        assert!(matches!(
            PushEvent::from_event(UNIT_UPDATED_EVENT.to_string(), Vec::new()),
            Err(ProtocolError::MissingEventPayload { .. })
        ));
    }

    #[test]
    fn encoded_unit_event_decodes_back() {
        let unit = Unit::new("204", "Level 2").with_comments(vec![Comment {
            text: "outlet missing".to_string(),
            timestamp: Some("6/2/2024".to_string()),
            resolved: false,
        }]);
        let text = PushEvent::unit_updated_frame(&unit).expect("frame").encode();
        assert!(text.starts_with(r#"42["unitUpdated","#));
        let PushFrame::Event { name, args } = PushFrame::decode(&text).expect("decode") else {
            panic!("expected event frame");
        };
        assert_eq!(
            PushEvent::from_event(name, args).expect("event"),
            PushEvent::UnitUpdated(unit)
        );
    }

    #[test]
    fn patch_bodies_carry_only_the_intent_field() {
        let cleared = serde_json::to_value(UnitPatch::status(None)).expect("json");
        assert_eq!(cleared, serde_json::json!({ "status": null }));

        let approved = serde_json::to_value(UnitPatch::status(Some(Status::Approved))).expect("json");
        assert_eq!(approved, serde_json::json!({ "status": "Approved" }));

        let comment = serde_json::to_value(UnitPatch::comment("check seal")).expect("json");
        assert_eq!(comment, serde_json::json!({ "comment": "check seal" }));

        let toggle = serde_json::to_value(UnitPatch::toggle_comment(2)).expect("json");
        assert_eq!(toggle, serde_json::json!({ "commentIndex": 2 }));
    }
}
