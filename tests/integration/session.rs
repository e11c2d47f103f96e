//! Session integration tests

use std::time::Duration;

use pretty_assertions::assert_eq;
use tether::{config::DEFAULT_API_KEY, Config, Error, InferenceApi, Session};

use crate::mocks::MockInferenceServer;

fn test_config() -> Config {
    Config {
        launch_program: "python3 -m sglang.launch_server".to_string(),
        model_path: "m".to_string(),
        host: "127.0.0.1".to_string(),
        port: None,
        mem_fraction_static: 0.8,
        chat_template: None,
        reasoning_parser: None,
        base_url: None,
        api_key: DEFAULT_API_KEY.to_string(),
        ready_timeout_seconds: 5,
        poll_interval_ms: 50,
        request_timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_attach_to_running_server() {
    let mock = MockInferenceServer::start().await;
    mock.mock_models(&["m"]).await;

    let config = Config {
        base_url: Some(mock.uri()),
        ..test_config()
    };
    let session = Session::start(&config).await.unwrap();

    assert!(session.server().is_none());
    assert_eq!(session.client().base_url(), mock.uri());
    assert_eq!(session.client().list_models().await.unwrap().ids(), vec!["m"]);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_attach_times_out_without_server() {
    let port = tether::server::find_free_port().unwrap();
    let config = Config {
        base_url: Some(format!("http://127.0.0.1:{}", port)),
        ready_timeout_seconds: 1,
        ..test_config()
    };

    let result = tokio::time::timeout(Duration::from_secs(10), Session::start(&config))
        .await
        .unwrap();
    assert!(matches!(result, Err(Error::ReadyTimeout { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn test_launch_failure_is_reported() {
    // Every server flag lands in the script's positional arguments
    let config = Config {
        launch_program: "sh -c 'exit 7' x".to_string(),
        ..test_config()
    };

    let result = Session::start(&config).await;
    match result {
        Err(Error::ServerExited { status }) => assert_eq!(status.code(), Some(7)),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("session started against a dead server"),
    }
}
