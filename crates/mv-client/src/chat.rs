//! Streaming chat consumer.
//!
//! The chat endpoint streams `data: `-prefixed records over a chunked HTTP
//! body. Chunk boundaries are arbitrary — a record (or a multi-byte UTF-8
//! character) may be split across reads — so decoding buffers raw bytes and
//! only cuts at newline boundaries. Dropping the stream drops the HTTP
//! response body, which aborts the request.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::Stream;

use mv_common::{ClientError, ClientResult};
use mv_protocol::chat::{StreamEvent, SSE_DATA_PREFIX};
use mv_protocol::rest::{ChatResponse, Source};

// ─── Line decoding ───────────────────────────────────────────

/// Incremental decoder for the chat response stream.
///
/// Bytes accumulate until a newline; each complete line is then either a
/// `data: ` record (parsed) or noise (dropped). Trailing bytes without a
/// newline stay buffered for the next feed.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one transport chunk, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            let Ok(text) = std::str::from_utf8(line) else {
                tracing::warn!("chat stream: dropping non-UTF-8 line");
                continue;
            };
            let Some(payload) = text.strip_prefix(SSE_DATA_PREFIX) else {
                continue;
            };
            match serde_json::from_str::<StreamEvent>(payload) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(error = %e, "chat stream: dropping unparsable record");
                }
            }
        }
        events
    }
}

// ─── Delta stream ────────────────────────────────────────────

/// Answer fragments decoded from a streaming chat response.
///
/// Yields `Ok(text)` per non-empty chunk. A server error record or a
/// transport error yields one `Err` and ends the stream.
pub struct ChatStream<S> {
    source: S,
    decoder: SseLineDecoder,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

/// The concrete stream returned by the chat API.
pub type ChatDeltaStream = ChatStream<BoxStream<'static, ClientResult<Bytes>>>;

impl<S> ChatStream<S>
where
    S: Stream<Item = ClientResult<Bytes>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: SseLineDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

impl<S> Stream for ChatStream<S>
where
    S: Stream<Item = ClientResult<Bytes>> + Unpin,
{
    type Item = ClientResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            while let Some(event) = this.pending.pop_front() {
                match event {
                    StreamEvent::Chunk { data } => {
                        if data.content.is_empty() {
                            continue;
                        }
                        return Poll::Ready(Some(Ok(data.content)));
                    }
                    StreamEvent::Error { data } => {
                        this.done = true;
                        this.pending.clear();
                        return Poll::Ready(Some(Err(ClientError::Stream(data.error))));
                    }
                }
            }
            if this.done {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.source).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.pending.extend(this.decoder.feed(&chunk));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // An unterminated trailing record is incomplete; drop it.
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ─── Transcript entries ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a chat transcript.
///
/// Assistant entries are born as placeholders, grow by streamed deltas, and
/// are finalized exactly once from the authoritative response.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub sources: Vec<Source>,
    pub model_used: Option<String>,
    pub error: Option<String>,
    finalized: bool,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            model_used: None,
            error: None,
            finalized: false,
        }
    }

    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            sources: Vec::new(),
            model_used: None,
            error: None,
            finalized: false,
        }
    }

    /// Append one streamed fragment. Ignored after finalization.
    pub fn append_delta(&mut self, delta: &str) {
        if !self.finalized {
            self.content.push_str(delta);
        }
    }

    /// Fill in the authoritative response. Streamed text wins when any
    /// arrived; otherwise the response's full answer is used. Sources and
    /// model attribution always come from the response. Idempotent: only
    /// the first call takes effect.
    pub fn finalize(&mut self, response: &ChatResponse) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if self.content.is_empty() {
            self.content = response.answer.clone();
        }
        self.sources = response.sources.clone();
        self.model_used = Some(format!(
            "{}/{}",
            response.provider_used, response.model_used
        ));
    }

    /// Mark the entry failed; the error message replaces any placeholder.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.error = Some(message.into());
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}
