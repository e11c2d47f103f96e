//! Incremental text fragments decoded from a streamed response

use std::collections::BTreeMap;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_sse_line, SseEvent, SseLineBuffer};
use crate::error::{Error, Result};
use crate::types::{ChatCompletionChunk, CompletionChunk, Usage};

/// Raw response body as delivered by reqwest
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Lazily decoded sequence of fragments; dropping it closes the connection
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// One piece of incrementally delivered output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Choice this fragment belongs to
    pub index: u32,
    /// Answer text delta (may be empty)
    pub text: String,
    /// Reasoning text delta, when the server separates it
    pub reasoning: Option<String>,
    /// Set on the last fragment of a choice
    pub finish_reason: Option<String>,
    /// Usage counters, on the trailing chunk when requested
    pub usage: Option<Usage>,
}

impl Fragment {
    fn carries_nothing(&self) -> bool {
        self.text.is_empty()
            && self.reasoning.is_none()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}

/// Streaming chunk shapes that can be flattened into fragments
pub trait IntoFragments {
    fn into_fragments(self) -> Vec<Fragment>;
}

impl IntoFragments for ChatCompletionChunk {
    fn into_fragments(self) -> Vec<Fragment> {
        let mut fragments: Vec<Fragment> = self
            .choices
            .into_iter()
            .map(|choice| Fragment {
                index: choice.index,
                text: choice.delta.content.unwrap_or_default(),
                reasoning: choice.delta.reasoning_content.filter(|r| !r.is_empty()),
                finish_reason: choice.finish_reason,
                usage: None,
            })
            .collect();
        attach_usage(&mut fragments, self.usage);
        fragments.retain(|fragment| !fragment.carries_nothing());
        fragments
    }
}

impl IntoFragments for CompletionChunk {
    fn into_fragments(self) -> Vec<Fragment> {
        let mut fragments: Vec<Fragment> = self
            .choices
            .into_iter()
            .map(|choice| Fragment {
                index: choice.index,
                text: choice.text,
                reasoning: None,
                finish_reason: choice.finish_reason,
                usage: None,
            })
            .collect();
        attach_usage(&mut fragments, self.usage);
        fragments.retain(|fragment| !fragment.carries_nothing());
        fragments
    }
}

/// Usage arrives on its own chunk (usually with no choices)
fn attach_usage(fragments: &mut Vec<Fragment>, usage: Option<Usage>) {
    if let Some(usage) = usage {
        match fragments.last_mut() {
            Some(last) => last.usage = Some(usage),
            None => fragments.push(Fragment {
                usage: Some(usage),
                ..Default::default()
            }),
        }
    }
}

enum Decoded {
    Fragments(Vec<Fragment>),
    Done,
    Skip,
}

fn decode_line<C>(line: &str) -> Result<Decoded>
where
    C: DeserializeOwned + IntoFragments,
{
    match parse_sse_line(line) {
        None => Ok(Decoded::Skip),
        Some(SseEvent::Done) => Ok(Decoded::Done),
        Some(SseEvent::Data(data)) => {
            let value: Value = serde_json::from_str(&data)?;
            // Servers report mid-stream failures as an `error` object
            if let Some(error) = value.get("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(Error::Stream(message));
            }
            let chunk: C = serde_json::from_value(value)?;
            Ok(Decoded::Fragments(chunk.into_fragments()))
        }
    }
}

/// Decode an SSE body into fragments of chunk type `C`.
///
/// The stream ends at `data: [DONE]` or when the body ends. The first error
/// (transport, malformed JSON, or a server error event) is yielded and ends
/// the stream.
pub fn fragment_stream<C>(bytes: ByteStream) -> FragmentStream
where
    C: DeserializeOwned + IntoFragments + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut bytes = bytes;
        let mut buffer = SseLineBuffer::new();
        let mut body_ended = false;

        while !body_ended {
            let lines = match bytes.next().await {
                Some(Ok(chunk)) => buffer.feed(&chunk),
                Some(Err(e)) => {
                    warn!(error = %e, "Stream transport error");
                    yield Err(Error::Http(e));
                    return;
                }
                None => {
                    body_ended = true;
                    if buffer.has_incomplete() {
                        debug!("Stream body ended mid-line");
                    }
                    buffer.take_remaining().into_iter().collect()
                }
            };

            for line in lines {
                match decode_line::<C>(&line) {
                    Ok(Decoded::Fragments(fragments)) => {
                        for fragment in fragments {
                            yield Ok(fragment);
                        }
                    }
                    Ok(Decoded::Done) => return,
                    Ok(Decoded::Skip) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to decode stream event");
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        debug!("Stream body ended without [DONE] marker");
    };

    Box::pin(stream)
}

/// Drain a fragment stream and return the text of the first choice.
///
/// Fragments of other choices are skipped; use [`collect_choices`] when the
/// request asked for more than one.
pub async fn collect_text(mut stream: FragmentStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.index == 0 {
            text.push_str(&fragment.text);
        }
    }
    Ok(text)
}

/// Drain a fragment stream and return each choice's text, ordered by index
pub async fn collect_choices(mut stream: FragmentStream) -> Result<Vec<String>> {
    let mut texts: BTreeMap<u32, String> = BTreeMap::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        texts.entry(fragment.index).or_default().push_str(&fragment.text);
    }
    Ok(texts.into_values().collect())
}
