//! Integration tests for the HTTP health endpoint.
//!
//! Validates that `GET /health` returns `200 OK` with body `"ok"` and does
//! not open a session.

use super::test_helpers::{test_app_state, FakeBackend, TestServer};

#[tokio::test]
async fn health_returns_ok() {
    let server = TestServer::start(test_app_state(FakeBackend::new())).await;

    let response = server
        .http
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");
    assert!(server.state.registry.is_empty());
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let server = TestServer::start(test_app_state(FakeBackend::new())).await;

    let response = server
        .http
        .get(format!("{}/nope", server.base_url))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
