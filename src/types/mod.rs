//! Wire types for the OpenAI-compatible API
//!
//! Request and response bodies for chat completions, text completions and
//! the model listing, plus the sampling options both request shapes share.

pub mod chat;
pub mod completion;
pub mod models;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use chat::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ChoiceMessage,
    ChunkChoice, Delta, Message, Role,
};
pub use completion::{CompletionChoice, CompletionChunk, CompletionRequest, CompletionResponse};
pub use models::{ModelCard, ModelList};

/// Stop sequences: a single string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Stop {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for Stop {
    fn from(stop: &str) -> Self {
        Stop::Single(stop.to_string())
    }
}

impl From<Vec<String>> for Stop {
    fn from(stops: Vec<String>) -> Self {
        Stop::Multiple(stops)
    }
}

/// Sampling parameters passed to the server untouched.
///
/// Nothing here is validated locally; the server owns their semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Number of choices to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Streaming options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamOptions {
    /// Ask for a final chunk carrying usage counters
    pub include_usage: bool,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Builder-style setters shared by both request shapes.
///
/// Implementors only expose their sampling block and extension map; every
/// setter consumes and returns the request.
pub trait RequestOptions: Sized {
    fn sampling_mut(&mut self) -> &mut SamplingParams;

    fn extra_mut(&mut self) -> &mut Map<String, Value>;

    fn temperature(mut self, temperature: f64) -> Self {
        self.sampling_mut().temperature = Some(temperature);
        self
    }

    fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling_mut().max_tokens = Some(max_tokens);
        self
    }

    fn top_p(mut self, top_p: f64) -> Self {
        self.sampling_mut().top_p = Some(top_p);
        self
    }

    fn presence_penalty(mut self, penalty: f64) -> Self {
        self.sampling_mut().presence_penalty = Some(penalty);
        self
    }

    fn frequency_penalty(mut self, penalty: f64) -> Self {
        self.sampling_mut().frequency_penalty = Some(penalty);
        self
    }

    fn n(mut self, n: u32) -> Self {
        self.sampling_mut().n = Some(n);
        self
    }

    fn stop(mut self, stop: impl Into<Stop>) -> Self {
        self.sampling_mut().stop = Some(stop.into());
        self
    }

    fn seed(mut self, seed: u64) -> Self {
        self.sampling_mut().seed = Some(seed);
        self
    }

    /// Set an arbitrary top-level field on the request body
    fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_mut().insert(key.into(), value.into());
        self
    }

    /// Set one entry of `chat_template_kwargs` (e.g. `enable_thinking`)
    fn chat_template_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let entry = self
            .extra_mut()
            .entry("chat_template_kwargs")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(kwargs) = entry {
            kwargs.insert(key.into(), value.into());
        }
        self
    }

    /// Ask the server to return reasoning text apart from the answer
    fn separate_reasoning(self, enabled: bool) -> Self {
        self.extra("separate_reasoning", enabled)
    }
}
