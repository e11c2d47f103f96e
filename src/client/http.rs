//! HTTP client for an OpenAI-compatible inference server
//!
//! Forwards chat and text completion requests to the server, either as a
//! single JSON response or as a streamed SSE body.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::client::headers::{build_default_headers, build_stream_headers};
use crate::client::InferenceApi;
use crate::config::DEFAULT_API_KEY;
use crate::error::{Error, Result};
use crate::streaming::{fragment_stream, ByteStream, FragmentStream};
use crate::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, CompletionChunk,
    CompletionRequest, CompletionResponse, ModelList,
};

/// Client for a local inference server
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl InferenceClient {
    /// Create a client for the server at `base_url` (without the `/v1` suffix)
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a client that sends the placeholder credential
    pub fn with_placeholder_key(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self::new(client, base_url, DEFAULT_API_KEY)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// Make a POST request (non-streaming)
    async fn post<R: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<R> {
        let url = self.url(path);
        debug!(url = %url, "Sending request to inference server");

        let response = self
            .client
            .post(&url)
            .headers(build_default_headers(&self.api_key)?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send request to inference server");
                e
            })?;

        Self::decode(&url, response).await
    }

    /// Make a POST request with streaming response
    async fn post_stream(&self, path: &str, body: &Value) -> Result<ByteStream> {
        let url = self.url(path);
        debug!(url = %url, "Opening stream to inference server");

        let response = self
            .client
            .post(&url)
            .headers(build_stream_headers(&self.api_key)?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, body = %text, "Inference server rejected stream request");
            return Err(Error::upstream(status.as_u16(), &text));
        }

        Ok(Box::pin(response.bytes_stream()))
    }

    /// Make a GET request
    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .headers(build_default_headers(&self.api_key)?)
            .send()
            .await?;

        Self::decode(&url, response).await
    }

    async fn decode<R: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = Error::upstream(status.as_u16(), &body);
            if err.is_client_error() {
                warn!(url = %url, status = %status, error = %err, "Inference server rejected request");
            } else {
                error!(url = %url, status = %status, body = %body, "Inference server request failed");
            }
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(url = %url, error = %e, "Failed to parse inference server response");
            Error::Json(e)
        })
    }
}

/// Serialize a request with its `stream` flag forced to `stream`
fn body_with_stream<T: Serialize>(request: &T, stream: bool) -> Result<Value> {
    let mut body = serde_json::to_value(request)?;
    if let Value::Object(fields) = &mut body {
        fields.insert("stream".to_string(), Value::Bool(stream));
        if !stream {
            fields.remove("stream_options");
        }
    }
    Ok(body)
}

#[async_trait]
impl InferenceApi for InferenceClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let body = body_with_stream(request, false)?;
        let response: ChatCompletionResponse = self.post("/chat/completions", &body).await?;

        info!(
            choices = response.choices.len(),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
            "Chat completion finished"
        );
        Ok(response)
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn chat_completions_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FragmentStream> {
        let body = body_with_stream(request, true)?;
        let bytes = self.post_stream("/chat/completions", &body).await?;
        info!("Chat completion stream opened");
        Ok(fragment_stream::<ChatCompletionChunk>(bytes))
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn completions(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = body_with_stream(request, false)?;
        let response: CompletionResponse = self.post("/completions", &body).await?;

        info!(
            choices = response.choices.len(),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
            "Completion finished"
        );
        Ok(response)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn completions_stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        let body = body_with_stream(request, true)?;
        let bytes = self.post_stream("/completions", &body).await?;
        info!("Completion stream opened");
        Ok(fragment_stream::<CompletionChunk>(bytes))
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<ModelList> {
        self.get("/models").await
    }
}
