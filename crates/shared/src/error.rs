use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty push frame")]
    EmptyFrame,
    #[error("unknown engine packet type {0:?}")]
    UnknownEnginePacket(char),
    #[error("unsupported socket packet type {0:?}")]
    UnsupportedSocketPacket(char),
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("event frame carries no event name")]
    MissingEventName,
    #[error("{event} event is missing its payload")]
    MissingEventPayload { event: String },
}

impl ProtocolError {
    pub fn malformed(kind: &'static str, source: serde_json::Error) -> Self {
        Self::MalformedPayload { kind, source }
    }
}
