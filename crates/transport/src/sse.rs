//! SSE (`text/event-stream`) decoder — C3.
//!
//! Parses `data: ` lines into chunks with mandatory cross-chunk buffering:
//! a `data:` payload that straddles two TCP reads must not be emitted
//! truncated. This is the behavior the source's line-oriented, non-buffering
//! scanner got wrong (see spec §9's redesign flag); every partial line is
//! held in `buffer` until its terminating `\n` arrives.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::TransportError;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded event from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload, prefix stripped.
    Data(String),
    /// The `[DONE]` sentinel: terminates the sequence without being
    /// emitted as a chunk.
    Done,
}

/// Incremental SSE frame parser. Feed it bytes as they arrive; it buffers
/// any trailing partial line across calls.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, returning every complete event found.
    /// Non-UTF8 bytes are replaced per `String::from_utf8_lossy` — SSE
    /// payloads are text by definition.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(idx) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=idx).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = Self::parse_line(line) {
                let is_done = matches!(event, SseEvent::Done);
                events.push(event);
                if is_done {
                    break;
                }
            }
        }
        events
    }

    /// Lines other than `data: ` (blank, `:` comments, `event:`, `id:`,
    /// `retry:`) are ignored for this system's purposes, per §4.3.
    fn parse_line(line: &str) -> Option<SseEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        if payload.trim() == DONE_SENTINEL {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(payload.to_string()))
        }
    }
}

/// Drive a raw byte stream through an [`SseDecoder`], forwarding each
/// decoded chunk to `sink`. Terminates on `[DONE]`, end-of-body, a closed
/// `sink` (receiver dropped — "channel inactive" per §4.3), or an upstream
/// error.
pub async fn decode_stream<S>(
    mut body: S,
    sink: tokio::sync::mpsc::Sender<String>,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    let mut decoder = SseDecoder::new();
    while let Some(next) = body.next().await {
        let bytes = next?;
        for event in decoder.feed(&bytes) {
            match event {
                SseEvent::Data(text) => {
                    if sink.send(text).await.is_err() {
                        return Ok(());
                    }
                }
                SseEvent::Done => return Ok(()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenated_chunks_equal_concatenated_payloads() {
        let mut decoder = SseDecoder::new();
        let mut out = String::new();
        for line in ["data: Hel\n", "data: lo \n", "data: wor\n", "data: ld!\n", "data: [DONE]\n"] {
            for event in decoder.feed(line.as_bytes()) {
                if let SseEvent::Data(text) = event {
                    out.push_str(&text);
                }
            }
        }
        assert_eq!(out, "Hello world!");
    }

    #[test]
    fn test_partial_line_buffers_across_feed_calls() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: hel").is_empty());
        let events = decoder.feed(b"lo\n");
        assert_eq!(events, vec![SseEvent::Data("hello".to_string())]);
    }

    #[test]
    fn test_partial_prefix_buffers_across_feed_calls() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: h").is_empty());
        let events = decoder.feed(b"i\n");
        assert_eq!(events, vec![SseEvent::Data("hi".to_string())]);
    }

    #[test]
    fn test_done_sentinel_is_not_emitted_as_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: [DONE]\n");
        assert_eq!(events, vec![SseEvent::Done]);
    }

    #[test]
    fn test_done_with_surrounding_whitespace_still_terminates() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data:  [DONE]  \n");
        assert_eq!(events, vec![SseEvent::Done]);
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": comment\nevent: message\nid: 1\nretry: 3000\n\ndata: hi\n");
        assert_eq!(events, vec![SseEvent::Data("hi".to_string())]);
    }

    #[tokio::test]
    async fn test_decode_stream_forwards_chunks_until_done() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"data: Hel\ndata: lo\n")),
            Ok(Bytes::from_static(b"data: [DONE]\ndata: unreachable\n")),
        ];
        let body = futures::stream::iter(chunks);
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);

        decode_stream(body, tx).await.unwrap();

        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.push(chunk);
        }
        assert_eq!(received, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_decode_stream_stops_when_sink_is_dropped() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Ok(Bytes::from_static(b"data: two\n")),
        ];
        let body = futures::stream::iter(chunks);
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);

        // Should return Ok(()) promptly instead of hanging on a dead sink.
        decode_stream(body, tx).await.unwrap();
    }
}
