//! # SSE Line Reassembly
//!
//! Upstream data arrives as newline-delimited `data: <payload>` lines that
//! may be split across transport chunks. [`LineBuffer`] retains any trailing
//! partial line for concatenation with the next arrival, so only complete
//! lines are ever parsed.

/// Terminal sentinel: no further chunks will arrive after this payload.
pub const DONE_MARKER: &str = "[DONE]";

/// Buffers raw bytes and yields complete lines. The split happens on bytes,
/// not strings, so a UTF-8 sequence broken across chunks reassembles intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes. The tail
    /// after the last newline stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buf, rest);
            line.pop(); // trailing \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

/// Extract the payload of a `data: ` line; other SSE directives (`id:`,
/// `event:`, `retry:`) and blank lines yield `None`.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(str::trim)
}

/// Parse an upstream chunk payload and pull out `choices[0].delta.content`.
/// Malformed JSON and empty deltas yield `None` and are dropped silently;
/// losing one fragment is preferable to aborting the whole stream.
pub fn delta_content(payload: &str) -> Option<String> {
    let parsed = serde_json::from_str::<serde_json::Value>(payload).ok()?;
    let content = parsed
        .get("choices")?
        .as_array()?
        .first()?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_drain() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: one\ndata: two\n");
        assert_eq!(lines, vec!["data: one", "data: two"]);
    }

    #[test]
    fn test_partial_line_retained_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"choi").is_empty());
        let lines = buffer.push(b"ces\":[]}\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"choices\":[]}"]);
        let lines = buffer.push(b"NE]\n");
        assert_eq!(lines, vec!["data: [DONE]"]);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: x\r\n\r\n");
        assert_eq!(lines, vec!["data: x", ""]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        let text = "data: héllo\n".as_bytes();
        assert!(buffer.push(&text[..8]).is_empty()); // splits the é
        let lines = buffer.push(&text[8..]);
        assert_eq!(lines, vec!["data: héllo"]);
    }

    #[test]
    fn test_data_payload_extraction() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data: [DONE]"), Some(DONE_MARKER));
        assert_eq!(data_payload("event: ping"), None);
        assert_eq!(data_payload(""), None);
    }

    #[test]
    fn test_delta_content_extraction() {
        let payload = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(delta_content(payload), Some("Hi".to_string()));
    }

    #[test]
    fn test_malformed_payload_dropped() {
        assert_eq!(delta_content("not json at all"), None);
        assert_eq!(delta_content("{\"choices\": 5}"), None);
    }

    #[test]
    fn test_empty_delta_dropped() {
        let payload = r#"{"choices":[{"delta":{"content":""}}]}"#;
        assert_eq!(delta_content(payload), None);
        let no_content = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(delta_content(no_content), None);
    }
}
