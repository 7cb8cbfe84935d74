//! Chat streaming wire format.
//!
//! The streaming chat endpoint answers with `text/event-stream`-style
//! framing: newline-delimited records, of which only lines prefixed with
//! `data: ` are significant. The payload after the prefix is a JSON object
//! discriminated on its `event` field.

use serde::Deserialize;

/// Prefix marking a significant record in the chat response stream.
pub const SSE_DATA_PREFIX: &str = "data: ";

/// One parsed record from the chat response stream.
///
/// Records with an unrecognized `event` discriminator fail to parse and
/// are skipped by the consumer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental fragment of the generated answer.
    Chunk { data: ChunkPayload },
    /// Server-reported failure; terminates the stream.
    Error { data: ErrorPayload },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkPayload {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    #[serde(default = "default_stream_error")]
    pub error: String,
}

fn default_stream_error() -> String {
    "stream error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_event_parses() {
        let ev: StreamEvent =
            serde_json::from_str(r#"{"event":"chunk","data":{"content":"Hel"}}"#).unwrap();
        match ev {
            StreamEvent::Chunk { data } => assert_eq!(data.content, "Hel"),
            StreamEvent::Error { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn error_event_defaults_message_when_absent() {
        let ev: StreamEvent = serde_json::from_str(r#"{"event":"error","data":{}}"#).unwrap();
        match ev {
            StreamEvent::Error { data } => assert_eq!(data.error, "stream error"),
            StreamEvent::Chunk { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"event":"done","data":{}}"#).is_err());
    }
}
