use memchr::memchr;
use tracing::{debug, trace};

use crate::api::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Splits a chunked response body into complete lines.
///
/// Bytes are buffered undecoded until a newline arrives. A `\n` byte never
/// occurs inside a multi-byte UTF-8 sequence, so a character split across two
/// reads is always reassembled before its line is decoded.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, without the
    /// trailing newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[start..]) {
            let end = start + offset;
            lines.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream: an unterminated fragment is never a line.
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            trace!(bytes = self.buffer.len(), "Discarding unterminated stream fragment");
        }
    }
}

/// Why a decoded line produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a `data:` line (blank separators, comments, other fields).
    NotData,
    /// `data:` with nothing after it.
    EmptyPayload,
    /// The `[DONE]` control line.
    DoneSentinel,
    /// The payload was not a recognizable event.
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Event(StreamEvent),
    Skip(SkipReason),
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.trim().strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Turn one decoded line into an event. Malformed payloads are reported as
/// [`SkipReason::Malformed`] rather than an error so that protocol noise
/// never interrupts a live stream.
pub fn parse_line(line: &str) -> ParsedLine {
    let Some(payload) = extract_data_payload(line) else {
        return ParsedLine::Skip(SkipReason::NotData);
    };

    if payload.is_empty() {
        return ParsedLine::Skip(SkipReason::EmptyPayload);
    }
    if payload == DONE_SENTINEL {
        return ParsedLine::Skip(SkipReason::DoneSentinel);
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => ParsedLine::Event(event),
        Err(err) => {
            debug!(error = %err, payload_len = payload.len(), "Skipping malformed stream payload");
            ParsedLine::Skip(SkipReason::Malformed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StreamEventKind;

    const BODY: &str = "data: {\"type\":\"token\",\"content\":\"Grüße \"}\r\n\r\n\
        : keep-alive\n\
        data:{\"type\":\"token\",\"content\":\"日本\"}\n\n\
        data: [DONE]\n";

    fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.push(chunk));
        }
        decoder.finish();
        lines
    }

    #[test]
    fn line_splitting_is_independent_of_chunk_boundaries() {
        let bytes = BODY.as_bytes();
        let whole = decode_all(&[bytes]);
        assert_eq!(whole.len(), 6);

        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            assert_eq!(decode_all(&[head, tail]), whole, "split at {split}");
        }

        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&single_bytes), whole);
    }

    #[test]
    fn multibyte_character_split_across_reads_is_reassembled() {
        let bytes = "data: é\n".as_bytes();
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..7]).is_empty());
        assert_eq!(decoder.pending(), 7);
        assert_eq!(decoder.push(&bytes[7..]), vec!["data: é".to_string()]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn trailing_fragment_is_not_a_line() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"data: one\ndata: two");
        assert_eq!(lines, vec!["data: one".to_string()]);
        assert_eq!(decoder.pending(), "data: two".len());
        decoder.finish();
    }

    #[test]
    fn parse_line_handles_spacing_variants() {
        for line in [
            r#"data: {"type":"token","content":"Hi"}"#,
            r#"data:{"type":"token","content":"Hi"}"#,
            r#"   data:   {"type":"token","content":"Hi"}   "#,
        ] {
            assert_eq!(parse_line(line), ParsedLine::Event(StreamEvent::token("Hi")));
        }
    }

    #[test]
    fn parse_line_skips_control_and_foreign_lines() {
        assert_eq!(parse_line(""), ParsedLine::Skip(SkipReason::NotData));
        assert_eq!(parse_line("event: message"), ParsedLine::Skip(SkipReason::NotData));
        assert_eq!(parse_line("data:"), ParsedLine::Skip(SkipReason::EmptyPayload));
        assert_eq!(parse_line("data:    "), ParsedLine::Skip(SkipReason::EmptyPayload));
        assert_eq!(parse_line("data: [DONE]"), ParsedLine::Skip(SkipReason::DoneSentinel));
    }

    #[test]
    fn parse_line_reports_malformed_payloads_as_skips() {
        assert_eq!(parse_line("data: {not json"), ParsedLine::Skip(SkipReason::Malformed));
        assert_eq!(
            parse_line(r#"data: {"type":"heartbeat"}"#),
            ParsedLine::Skip(SkipReason::Malformed)
        );
        assert_eq!(parse_line("data: 42"), ParsedLine::Skip(SkipReason::Malformed));
    }

    #[test]
    fn parse_line_decodes_sources_payload() {
        let line = r#"data: {"type":"sources","sources":[{"type":"wiki","title":"Knights","url":"https://example.com/k"}]}"#;
        match parse_line(line) {
            ParsedLine::Event(event) => {
                assert_eq!(event.kind, StreamEventKind::Sources);
                let sources = event.sources.expect("sources");
                assert_eq!(sources[0].title, "Knights");
                assert_eq!(sources[0].url.as_deref(), Some("https://example.com/k"));
            }
            other => panic!("expected sources event, got {other:?}"),
        }
    }
}
