//! Decoding of incremental backend output into text updates.
//!
//! Both decoders are pure: the Messages API decoder works on the `data:`
//! payload of one SSE event (framing is handled by `eventsource-stream`), and
//! [`NdjsonDecoder`] reassembles Ollama's newline-delimited JSON from arbitrary
//! byte chunks.

use super::anthropic_types::{Delta, StreamEvent};
use super::ollama_types::OllamaChatResponse;

/// What a single unit of backend output means for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Text(String),
    Done,
    Failed(String),
}

/// Decode the `data:` payload of one Messages API stream event.
///
/// Returns `None` for events that carry no text (`ping`, `message_start`, ...)
/// and for payloads that are not JSON.
pub fn decode_anthropic_event(data: &str) -> Option<StreamUpdate> {
    let event: StreamEvent = serde_json::from_str(data).ok()?;
    match event {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
            ..
        } if !text.is_empty() => Some(StreamUpdate::Text(text)),
        StreamEvent::MessageStop => Some(StreamUpdate::Done),
        StreamEvent::Error { error } => Some(StreamUpdate::Failed(error.message)),
        _ => None,
    }
}

/// Decode one Ollama NDJSON record. A record may carry a final fragment and
/// the done flag together, so this can yield two updates.
pub fn decode_ollama_line(line: &str) -> Vec<StreamUpdate> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    let record: OllamaChatResponse = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparseable line");
            return Vec::new();
        }
    };

    if let Some(err) = record.error {
        return vec![StreamUpdate::Failed(err)];
    }

    let mut updates = Vec::new();
    let content = record.content();
    if !content.is_empty() {
        updates.push(StreamUpdate::Text(content.to_string()));
    }
    if record.done {
        updates.push(StreamUpdate::Done);
    }
    updates
}

/// Longest NDJSON record accepted before the stream is failed.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines and decodes each complete one.
///
/// Bytes are buffered until a newline arrives, so records and multi-byte
/// characters split across chunks decode correctly. A partial line longer
/// than the limit is dropped and reported as a failure.
#[derive(Debug)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    max_line: usize,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
        }
    }

    /// Feed one chunk, returning the updates for every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamUpdate> {
        self.buffer.extend_from_slice(chunk);

        let mut updates = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            updates.extend(decode_ollama_line(&String::from_utf8_lossy(&line)));
        }

        if self.buffer.len() > self.max_line {
            tracing::warn!(buffered = self.buffer.len(), "NDJSON line exceeds limit");
            self.buffer.clear();
            updates.push(StreamUpdate::Failed(format!(
                "Backend sent more than {} bytes without a line break",
                self.max_line
            )));
        }
        updates
    }

    /// Decode whatever is left once the connection has closed.
    pub fn finish(&mut self) -> Vec<StreamUpdate> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        decode_ollama_line(&String::from_utf8_lossy(&rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_text_delta() {
        let update = decode_anthropic_event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"FMCW"}}"#,
        );
        assert_eq!(update, Some(StreamUpdate::Text("FMCW".to_string())));
    }

    #[test]
    fn test_anthropic_ignores_bookkeeping_events() {
        for data in [
            r#"{"type":"ping"}"#,
            r#"{"type":"message_start","message":{"id":"msg_1","content":[]}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":3}}"#,
            r#"{"type":"some_future_event"}"#,
            "not json",
        ] {
            assert_eq!(decode_anthropic_event(data), None, "{data}");
        }
    }

    #[test]
    fn test_anthropic_stop_and_error() {
        assert_eq!(
            decode_anthropic_event(r#"{"type":"message_stop"}"#),
            Some(StreamUpdate::Done)
        );
        assert_eq!(
            decode_anthropic_event(
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
            ),
            Some(StreamUpdate::Failed("Overloaded".to_string()))
        );
    }

    #[test]
    fn test_ndjson_lines_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();

        let first = decoder.push(br#"{"message":{"role":"assistant","content":"Dop"#);
        assert!(first.is_empty());

        let second = decoder.push(
            b"pler\"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\" shift\"},\"done\":false}\n",
        );
        assert_eq!(
            second,
            vec![
                StreamUpdate::Text("Doppler".to_string()),
                StreamUpdate::Text(" shift".to_string()),
            ]
        );
    }

    #[test]
    fn test_ndjson_multibyte_split() {
        let line = "{\"message\":{\"role\":\"assistant\",\"content\":\"range–doppler\"},\"done\":false}\n";
        let bytes = line.as_bytes();
        // split inside the three-byte en dash
        let cut = line.find('–').unwrap() + 1;

        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(&bytes[..cut]).is_empty());
        assert_eq!(
            decoder.push(&bytes[cut..]),
            vec![StreamUpdate::Text("range–doppler".to_string())]
        );
    }

    #[test]
    fn test_ndjson_skips_blank_and_garbage_lines() {
        let mut decoder = NdjsonDecoder::new();
        let updates = decoder.push(
            b"\n   \nnot json at all\n{\"message\":{\"role\":\"assistant\",\"content\":\"ok\"},\"done\":false}\n",
        );
        assert_eq!(updates, vec![StreamUpdate::Text("ok".to_string())]);
    }

    #[test]
    fn test_ndjson_done_and_error_records() {
        assert_eq!(
            decode_ollama_line(r#"{"message":{"role":"assistant","content":""},"done":true,"eval_count":12}"#),
            vec![StreamUpdate::Done]
        );
        assert_eq!(
            decode_ollama_line(r#"{"message":{"role":"assistant","content":"."},"done":true}"#),
            vec![StreamUpdate::Text(".".to_string()), StreamUpdate::Done]
        );
        assert_eq!(
            decode_ollama_line(r#"{"error":"out of memory"}"#),
            vec![StreamUpdate::Failed("out of memory".to_string())]
        );
    }

    #[test]
    fn test_ndjson_unterminated_line_is_capped() {
        let mut decoder = NdjsonDecoder::with_max_line(32);
        let record = b"{\"message\":{\"role\":\"assistant\",\"content\":\"ok\"},\"done\":false}\n";
        assert!(record.len() > 32);

        // a complete record longer than the cap is still fine
        assert_eq!(decoder.push(record), vec![StreamUpdate::Text("ok".to_string())]);

        assert!(decoder.push(&[b'x'; 20]).is_empty());
        let updates = decoder.push(&[b'x'; 20]);
        assert_eq!(updates.len(), 1);
        assert!(matches!(&updates[0], StreamUpdate::Failed(m) if m.contains("32 bytes")));
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_ndjson_trailing_line_without_newline() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(br#"{"done":true}"#).is_empty());
        assert_eq!(decoder.finish(), vec![StreamUpdate::Done]);
        assert!(decoder.finish().is_empty());
    }
}
