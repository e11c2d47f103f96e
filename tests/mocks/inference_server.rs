//! Mock inference server for testing
//!
//! Provides wiremock-based mocks for the OpenAI-compatible endpoints a local
//! inference server exposes:
//! - GET /v1/models - Model listing (also the readiness probe)
//! - POST /v1/chat/completions - Chat completions (streaming and non-streaming)
//! - POST /v1/completions - Text completions (streaming and non-streaming)
//!
//! Streaming and non-streaming mocks on the same path are told apart by the
//! request's `stream` flag, so a test can mount both and compare them.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Counter for generating unique IDs
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, ID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Mock inference server wrapper
pub struct MockInferenceServer {
    server: MockServer,
}

impl MockInferenceServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    // =========================================================================
    // GET /v1/models
    // =========================================================================

    /// Answer the model listing with the given ids
    pub async fn mock_models(&self, ids: &[&str]) {
        self.models_mock(ids).mount(&self.server).await;
    }

    /// Unmounted model listing mock, for tests that mount it later
    pub fn models_mock(&self, ids: &[&str]) -> Mock {
        let data: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "object": "model", "created": 1, "owned_by": "sglang"}))
            .collect();

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("Authorization", "Bearer None"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": data
            })))
    }

    // =========================================================================
    // POST /v1/chat/completions
    // =========================================================================

    /// Non-streaming chat completion; `expected` must be contained in the request body
    pub async fn mock_chat(&self, expected: Value, response: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(json!({"stream": false})))
            .and(body_partial_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Streaming chat completion answered with the given chunks as SSE
    pub async fn mock_chat_stream(&self, expected: Value, chunks: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .and(body_partial_json(expected))
            .respond_with(sse_response(&chunks))
            .mount(&self.server)
            .await;
    }

    /// Error status with an OpenAI-style error body
    pub async fn mock_chat_error(&self, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "object": "error",
                "error": {
                    "message": message,
                    "type": "BadRequestError",
                    "code": status
                }
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /v1/completions
    // =========================================================================

    pub async fn mock_completion(&self, expected: Value, response: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .and(body_partial_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_completion_stream(&self, expected: Value, chunks: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .and(body_partial_json(expected))
            .respond_with(sse_response(&chunks))
            .mount(&self.server)
            .await;
    }
}

/// Format chunks into an SSE body terminated by `[DONE]`
fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");

    ResponseTemplate::new(200)
        .set_body_raw(body, "text/event-stream")
        .insert_header("Cache-Control", "no-cache")
}

// =============================================================================
// Test Data Factories
// =============================================================================

/// Factory for server responses
pub struct InferenceTestData;

impl InferenceTestData {
    /// Chat response with one choice per entry of `contents`
    pub fn chat_response(model: &str, contents: &[&str]) -> Value {
        let choices: Vec<Value> = contents
            .iter()
            .enumerate()
            .map(|(index, content)| {
                json!({
                    "index": index,
                    "message": {"role": "assistant", "content": content, "reasoning_content": null},
                    "finish_reason": "stop"
                })
            })
            .collect();

        json!({
            "id": generate_id("chatcmpl"),
            "object": "chat.completion",
            "created": 1_700_000_000u64,
            "model": model,
            "choices": choices,
            "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
        })
    }

    /// Chat response whose single choice carries separated reasoning
    pub fn chat_response_with_reasoning(model: &str, reasoning: &str, answer: &str) -> Value {
        json!({
            "id": generate_id("chatcmpl"),
            "object": "chat.completion",
            "created": 1_700_000_000u64,
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": answer, "reasoning_content": reasoning},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 40, "total_tokens": 52}
        })
    }

    /// Chat stream: a role chunk, one chunk per piece, a finish chunk
    pub fn chat_chunks(model: &str, pieces: &[&str]) -> Vec<Value> {
        let id = generate_id("chatcmpl");
        let chunk = |delta: Value, finish: Value| {
            json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": 1_700_000_000u64,
                "model": model,
                "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]
            })
        };

        let mut chunks = vec![chunk(json!({"role": "assistant", "content": ""}), Value::Null)];
        for piece in pieces {
            chunks.push(chunk(json!({"content": piece}), Value::Null));
        }
        chunks.push(chunk(json!({}), json!("stop")));
        chunks
    }

    /// Text completion response
    pub fn completion_response(model: &str, text: &str) -> Value {
        json!({
            "id": generate_id("cmpl"),
            "object": "text_completion",
            "created": 1_700_000_000u64,
            "model": model,
            "choices": [{"index": 0, "text": text, "logprobs": null, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 6, "completion_tokens": 8, "total_tokens": 14}
        })
    }

    /// Text completion stream chunks, the last one carrying usage
    pub fn completion_chunks(model: &str, pieces: &[&str]) -> Vec<Value> {
        let id = generate_id("cmpl");
        let mut chunks: Vec<Value> = pieces
            .iter()
            .map(|piece| {
                json!({
                    "id": id,
                    "object": "text_completion",
                    "created": 1_700_000_000u64,
                    "model": model,
                    "choices": [{"index": 0, "text": piece, "logprobs": null, "finish_reason": null}]
                })
            })
            .collect();
        chunks.push(json!({
            "id": id,
            "object": "text_completion",
            "created": 1_700_000_000u64,
            "model": model,
            "choices": [],
            "usage": {"prompt_tokens": 6, "completion_tokens": 8, "total_tokens": 14}
        }));
        chunks
    }
}
