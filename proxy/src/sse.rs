/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser for upstream byte streams that split events at
/// arbitrary points, including inside a multi-byte UTF-8 character.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event they completed. Lines are only
    /// decoded once their terminating newline has arrived.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(ev) = self.take() {
                    events.push(ev);
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data
                    .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = Some(rest.trim().to_string());
            }
        }

        events
    }

    /// Emit whatever is left once the stream ends without a trailing blank line.
    pub fn flush(&mut self) -> Option<SseEvent> {
        let raw = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&raw);
        let rest = rest.trim_end_matches('\r');
        if let Some(data) = rest.strip_prefix("data:") {
            self.data
                .push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        self.take()
    }

    fn take(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseEvent { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|e| e.data.as_str()).collect()
    }

    #[test]
    fn split_chunks_reassemble() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: content_block_delta\nda").is_empty());
        let events = parser.feed(b"ta: {\"x\":1}\n\n");
        assert_eq!(data(&events), vec!["{\"x\":1}"]);
        assert_eq!(events[0].event.as_deref(), Some("content_block_delta"));
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let body = "data: café\n\n".as_bytes();
        let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut parser = SseParser::new();
        assert!(parser.feed(&body[..cut]).is_empty());
        let events = parser.feed(&body[cut..]);
        assert_eq!(data(&events), vec!["café"]);
    }

    #[test]
    fn multibyte_char_split_before_flush() {
        let body = "data: naïve".as_bytes();
        let mut parser = SseParser::new();
        for byte in body {
            assert!(parser.feed(std::slice::from_ref(byte)).is_empty());
        }
        assert_eq!(parser.flush().unwrap().data, "naïve");
    }

    #[test]
    fn multiline_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: line1\ndata: line2\n\ndata: next\n\n");
        assert_eq!(data(&events), vec!["line1\nline2", "next"]);
        assert!(events[0].event.is_none());
    }

    #[test]
    fn comments_and_crlf() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keepalive\r\nevent: ping\r\ndata: pong\r\n\r\n");
        assert_eq!(data(&events), vec!["pong"]);
    }

    #[test]
    fn flush_emits_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: [DONE]").is_empty());
        assert_eq!(parser.flush().unwrap().data, "[DONE]");
        assert!(parser.flush().is_none());
    }
}
