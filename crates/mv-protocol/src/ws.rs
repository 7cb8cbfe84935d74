//! Event-channel frame types.
//!
//! Every frame on the WebSocket — in either direction — is a JSON object
//! with a `type` tag, a type-dependent `data` payload, and optionally the
//! channel it was published on and a server timestamp.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Closed set of frame type tags spoken by the server.
///
/// Frames with a tag outside this set fail to parse and are dropped by the
/// receiving side; the wire protocol is tolerant by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Connected,
    Disconnected,
    Error,
    Ping,
    Pong,
    TaskStarted,
    TaskProgress,
    TaskCompleted,
    TaskFailed,
    TaskCancelled,
    RagChunk,
    RagComplete,
    RagError,
    Notification,
    Subscribe,
    Unsubscribe,
    Subscribed,
    Unsubscribed,
}

/// One frame exchanged over the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Type-dependent payload; consumers narrow it by convention on `kind`.
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl WsMessage {
    pub fn new(kind: MessageType, data: Map<String, Value>) -> Self {
        Self {
            kind,
            data,
            channel: None,
            timestamp: None,
        }
    }

    /// Outbound `subscribe` frame for a channel.
    pub fn subscribe(channel: &str) -> Self {
        let mut data = Map::new();
        data.insert("channel".to_string(), json!(channel));
        Self::new(MessageType::Subscribe, data)
    }

    /// Outbound `unsubscribe` frame for a channel.
    pub fn unsubscribe(channel: &str) -> Self {
        let mut data = Map::new();
        data.insert("channel".to_string(), json!(channel));
        Self::new(MessageType::Unsubscribe, data)
    }

    /// Outbound keep-alive frame.
    pub fn ping() -> Self {
        Self::new(MessageType::Ping, Map::new())
    }

    /// The channel named in the payload, if any (`subscribe`/`unsubscribe`
    /// frames carry it in `data`, server events in the top-level field).
    pub fn payload_channel(&self) -> Option<&str> {
        self.data.get("channel").and_then(Value::as_str)
    }
}

/// Canonical channel name for a processing task's lifecycle events.
pub fn task_channel(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// Canonical channel name for a RAG chat session's events.
pub fn rag_channel(session_id: &str) -> String {
    format!("rag:{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_with_type_tag() {
        let frame = WsMessage::subscribe("task:abc");
        let text = serde_json::to_string(&frame).unwrap();
        assert!(text.contains(r#""type":"subscribe""#));
        let back: WsMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind, MessageType::Subscribe);
        assert_eq!(back.payload_channel(), Some("task:abc"));
    }

    #[test]
    fn inbound_frame_with_missing_data_defaults_to_empty() {
        let back: WsMessage = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(back.kind, MessageType::Pong);
        assert!(back.data.is_empty());
        assert!(back.channel.is_none());
    }

    #[test]
    fn unknown_type_tag_fails_to_parse() {
        let result = serde_json::from_str::<WsMessage>(r#"{"type":"mystery","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn channel_names_are_canonical() {
        assert_eq!(task_channel("T1"), "task:T1");
        assert_eq!(rag_channel("S1"), "rag:S1");
    }
}
