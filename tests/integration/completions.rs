//! Text completion and model listing integration tests

use pretty_assertions::assert_eq;
use serde_json::json;
use tether::{CompletionRequest, Error, InferenceApi, InferenceClient, RequestOptions};

use crate::mocks::{InferenceTestData, MockInferenceServer};

fn client_for(server: &MockInferenceServer) -> InferenceClient {
    InferenceClient::with_placeholder_key(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn test_completion_returns_continuation() {
    let server = MockInferenceServer::start().await;
    server
        .mock_completion(
            json!({
                "model": "m",
                "prompt": "The capital of France is",
                "max_tokens": 8,
                "stop": "\n"
            }),
            InferenceTestData::completion_response("m", " Paris, a city on the Seine."),
        )
        .await;

    let request = CompletionRequest::new("m", "The capital of France is")
        .max_tokens(8)
        .stop("\n");
    let response = client_for(&server).completions(&request).await.unwrap();

    assert_eq!(response.text(), Some(" Paris, a city on the Seine."));
    assert_eq!(response.choices[0].finish_reason.as_deref(), Some("length"));
    assert_eq!(response.usage.unwrap().completion_tokens, 8);
}

#[tokio::test]
async fn test_non_streaming_body_omits_stream_options() {
    let server = MockInferenceServer::start().await;
    server
        .mock_completion(json!({}), InferenceTestData::completion_response("m", "ok"))
        .await;

    let request = CompletionRequest::new("m", "Say ok").include_usage();
    client_for(&server).completions(&request).await.unwrap();

    let received = server.server().received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["stream"], json!(false));
    assert!(body.get("stream_options").is_none());
}

#[tokio::test]
async fn test_completion_server_error_is_upstream() {
    let server = MockInferenceServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/v1/completions"))
        .respond_with(wiremock::ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(server.server())
        .await;

    let request = CompletionRequest::new("m", "Hi");
    let err = client_for(&server).completions(&request).await.unwrap_err();

    match err {
        Error::Upstream { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_models_sends_placeholder_key() {
    let server = MockInferenceServer::start().await;
    server.mock_models(&["qwen/qwen2.5-0.5b-instruct"]).await;

    let models = client_for(&server).list_models().await.unwrap();
    assert_eq!(models.ids(), vec!["qwen/qwen2.5-0.5b-instruct"]);
}

#[tokio::test]
async fn test_wrong_key_is_not_matched() {
    let server = MockInferenceServer::start().await;
    server.mock_models(&["m"]).await;

    let client = InferenceClient::new(reqwest::Client::new(), server.uri(), "sk-other");
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 404, .. }));
}
