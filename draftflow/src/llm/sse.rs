//! Server-sent-event decoding for OpenAI-compatible streams.

use serde_json::Value;

/// One decoded `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty content increment.
    Token(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Buffers raw chunks and yields complete lines.
///
/// Chunks may split a line, or a multi-byte character, at any byte; nothing
/// is decoded until the terminating newline has arrived.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw chunk.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Pops the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Pops every complete line and decodes the events they carry.
    pub fn drain_events(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while let Some(line) = self.next_line() {
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes whatever is left after the stream ended without a newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        decode_line(String::from_utf8_lossy(&rest).trim())
    }
}

/// Decodes one SSE line. Non-`data:` lines, malformed JSON and empty
/// increments yield nothing.
#[must_use]
pub fn decode_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    let value: Value = serde_json::from_str(payload).ok()?;
    token_of(&value).map(SseEvent::Token)
}

/// Content increment of a streamed chunk: `choices[0].delta.content`, else
/// `choices[0].message.content`.
#[must_use]
pub fn token_of(value: &Value) -> Option<String> {
    let choice = value.get("choices")?.get(0)?;
    ["delta", "message"]
        .iter()
        .find_map(|key| choice.get(key)?.get("content")?.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
