//! Readiness polling integration tests

use std::time::{Duration, Instant};

use tether::{server::find_free_port, wait_for_server, Error, ReadinessPolicy};

use crate::mocks::MockInferenceServer;

fn fast_policy(timeout: Duration) -> ReadinessPolicy {
    ReadinessPolicy {
        interval: Duration::from_millis(50),
        timeout,
    }
}

#[tokio::test]
async fn test_ready_immediately_when_models_answer() {
    let server = MockInferenceServer::start().await;
    server.mock_models(&["m"]).await;

    let client = reqwest::Client::new();
    wait_for_server(&client, &server.uri(), "None", &fast_policy(Duration::from_secs(5)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ready_once_models_appear() {
    let server = MockInferenceServer::start().await;
    let client = reqwest::Client::new();
    let policy = fast_policy(Duration::from_secs(5));

    let uri = server.uri();
    let start = Instant::now();
    let late_mount = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        server.models_mock(&["m"]).mount(server.server()).await;
    };
    let (result, ()) = tokio::join!(
        wait_for_server(&client, &uri, "None", &policy),
        late_mount
    );

    result.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(server.server().received_requests().await.unwrap().len() > 1);
}

#[tokio::test]
async fn test_timeout_when_nothing_listens() {
    let port = find_free_port().unwrap();
    let client = reqwest::Client::new();
    let policy = fast_policy(Duration::from_millis(400));

    let start = Instant::now();
    let err = wait_for_server(&client, &format!("http://127.0.0.1:{}", port), "None", &policy)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReadyTimeout { .. }));
    assert!(start.elapsed() >= Duration::from_millis(400));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_error_status_is_not_ready() {
    let server = MockInferenceServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/v1/models"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(server.server())
        .await;

    let client = reqwest::Client::new();
    let err = wait_for_server(&client, &server.uri(), "None", &fast_policy(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReadyTimeout { .. }));
}
