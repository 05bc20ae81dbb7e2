/// Incremental splitter for `text/event-stream` bodies.
///
/// Bytes are buffered until a blank line closes a frame, so multi-byte UTF-8
/// sequences split across network reads are decoded intact.
/// Line endings are normalized to `\n` on the way in: `\r\n` and a lone `\r`
/// both end a line, including a `\r\n` pair split across two reads.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    after_cr: bool,
}

impl SseParser {
    /// Feed arbitrary bytes into the parser and drain the data payloads of
    /// every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        for &byte in bytes {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.after_cr = false;
                }
            }
        }
        let mut payloads = Vec::new();

        while let Some(split) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            if let Some(payload) = extract_data_payload(&frame[..split]) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// Flush a final frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let frame = std::mem::take(&mut self.buffer);
        self.after_cr = false;
        extract_data_payload(&frame)
    }

    /// Parse a complete event-stream body in one shot.
    pub fn parse_all(input: &str) -> Vec<String> {
        let mut parser = Self::default();
        let mut payloads = parser.feed(input.as_bytes());
        payloads.extend(parser.finish());
        payloads
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn extract_data_payload(frame: &[u8]) -> Option<String> {
    let frame = String::from_utf8_lossy(frame);
    let data_lines: Vec<&str> = frame
        .lines()
        .filter(|line| !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    let payload = data_lines.join("\n");
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        None
    } else {
        Some(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::SseParser;

    #[test]
    fn frames_are_emitted_once_complete() {
        let mut parser = SseParser::default();

        assert!(parser.feed(b"data: {\"a\":").is_empty());
        let payloads = parser.feed(b"1}\n\ndata: {\"b\":2}\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);

        assert_eq!(parser.feed(b"\n"), vec!["{\"b\":2}"]);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn crlf_separators_are_accepted() {
        let payloads = SseParser::parse_all("data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn lone_cr_line_endings_are_accepted() {
        let payloads = SseParser::parse_all("data: one\r\rdata: two\rdata: more\r\r");
        assert_eq!(payloads, vec!["one", "two\nmore"]);
    }

    #[test]
    fn crlf_split_across_reads_is_one_line_ending() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"data: one\r").is_empty());
        assert_eq!(parser.feed(b"\n\r"), vec!["one"]);
        assert_eq!(parser.feed(b"\ndata: two\r\n\r\n"), vec!["two"]);
        assert!(parser.is_empty_buffer());
    }

    #[test]
    fn split_utf8_sequence_survives() {
        let body = "data: {\"text\":\"नमस्ते 😊\"}\n\n".as_bytes();
        let mut parser = SseParser::default();
        let mut payloads = Vec::new();
        for chunk in body.chunks(3) {
            payloads.extend(parser.feed(chunk));
        }

        assert_eq!(payloads, vec!["{\"text\":\"नमस्ते 😊\"}"]);
    }

    #[test]
    fn comments_done_and_empty_frames_are_skipped() {
        let payloads =
            SseParser::parse_all(": keep-alive\n\ndata:\n\ndata: [DONE]\n\nevent: x\ndata: real\n\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let payloads = SseParser::parse_all("data: {\"a\":\ndata: 1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":\n1}"]);
    }

    #[test]
    fn trailing_frame_without_blank_line_is_flushed() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"data: last").is_empty());
        assert_eq!(parser.finish().as_deref(), Some("last"));
        assert_eq!(parser.finish(), None);
    }
}
