//! SSE (Server-Sent Events) streaming
//!
//! Turns a streamed response body into a pull-driven sequence of text
//! [`Fragment`]s.

pub mod fragments;
pub mod line_buffer;

pub use fragments::{
    collect_choices, collect_text, fragment_stream, ByteStream, Fragment, FragmentStream,
    IntoFragments,
};
pub use line_buffer::SseLineBuffer;

/// A single meaningful SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// JSON payload of a `data:` line
    Data(String),
    /// The `data: [DONE]` terminator
    Done,
}

/// Parse one complete SSE line.
///
/// Comments (`: keep-alive`) and fields other than `data` yield `None`.
pub fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();

    if data == "[DONE]" {
        Some(SseEvent::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}
