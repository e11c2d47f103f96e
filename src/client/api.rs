//! Inference API abstraction
//!
//! The request operations an OpenAI-compatible server exposes, so callers can
//! hold any backend behind `Arc<dyn InferenceApi>`.

use async_trait::async_trait;

use crate::error::Result;
use crate::streaming::FragmentStream;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
    ModelList,
};

/// Operations against an OpenAI-compatible inference server
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Chat completion, aggregated into one response
    async fn chat_completions(&self, request: &ChatCompletionRequest)
        -> Result<ChatCompletionResponse>;

    /// Chat completion delivered as incremental fragments
    async fn chat_completions_stream(&self, request: &ChatCompletionRequest)
        -> Result<FragmentStream>;

    /// Text completion, aggregated into one response
    async fn completions(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Text completion delivered as incremental fragments
    async fn completions_stream(&self, request: &CompletionRequest) -> Result<FragmentStream>;

    /// Models currently loaded by the server
    async fn list_models(&self) -> Result<ModelList>;
}
