//! Line buffering for server-sent event bodies
//!
//! Network chunks do not line up with SSE lines, and may even split a
//! multi-byte UTF-8 character. Bytes are held until a full line is available.

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// # Example
/// ```
/// use tether::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
///
/// // First chunk contains partial line
/// let lines1 = buffer.feed(b"data: {\"content\":\"hel");
/// assert!(lines1.is_empty());
///
/// // Second chunk completes the line
/// let lines2 = buffer.feed(b"lo\"}\n");
/// assert_eq!(lines2, vec!["data: {\"content\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Bytes after the last newline seen so far
    incomplete: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// Lines are returned without their `\n` or `\r\n` terminator. Blank
    /// lines (event separators) are dropped. Invalid UTF-8 inside a complete
    /// line is replaced with U+FFFD.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.incomplete[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = decode_line(&self.incomplete[start..end]);
            start = end + 1;

            if !line.is_empty() {
                complete_lines.push(line);
            }
        }

        self.incomplete.drain(..start);
        complete_lines
    }

    /// Check if there's any incomplete data remaining in the buffer
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Take whatever trailing data never got a newline.
    ///
    /// Call at end of stream; some servers omit the final terminator.
    pub fn take_remaining(&mut self) -> Option<String> {
        let line = decode_line(&self.incomplete);
        self.incomplete.clear();
        (!line.is_empty()).then_some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
