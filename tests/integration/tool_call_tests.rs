//! Integration tests for `tools/call` over a live session.

use serde_json::json;

use super::test_helpers::{call_tool, test_app_state, tool_text, FakeBackend, TestServer};

#[tokio::test]
async fn echo_round_trip() {
    let server = TestServer::start(test_app_state(FakeBackend::new())).await;
    let mut client = server.connect().await;

    server
        .post(&client, &call_tool(1, "echo", json!({ "message": "hello" })))
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["id"], 1);
    assert_eq!(tool_text(&reply), "Tool echo: hello hello");
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_handler() {
    let backend = FakeBackend::new();
    let server = TestServer::start(test_app_state(backend.clone())).await;
    let mut client = server.connect().await;

    server
        .post(&client, &call_tool(2, "document-get-content", json!({ "uuid": 42 })))
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["id"], 2);
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["data"]["errors"][0]["field"], "uuid");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_a_protocol_error() {
    let server = TestServer::start(test_app_state(FakeBackend::new())).await;
    let mut client = server.connect().await;

    server
        .post(&client, &call_tool(3, "delete-everything", json!({})))
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["data"]["tool"], "delete-everything");
}

#[tokio::test]
async fn find_paginated_proxies_query_to_backend() {
    let backend = FakeBackend::new();
    backend.respond(
        "search/findPaginated",
        r#"{"total":1,"queryResults":[{"node":{"uuid":"u-1"}}]}"#,
    );
    let server = TestServer::start(test_app_state(backend.clone())).await;
    let mut client = server.connect().await;

    server
        .post(
            &client,
            &call_tool(
                4,
                "find-paginated",
                json!({ "limit": 10, "keyword": ["invoice"] }),
            ),
        )
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["id"], 4);
    assert_eq!(
        tool_text(&reply),
        r#"{"total":1,"queryResults":[{"node":{"uuid":"u-1"}}]}"#
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].path(),
        "/OpenKM/services/rest/search/findPaginated"
    );
    assert_eq!(requests[0].query(), Some("limit=10&keyword=invoice"));
}

#[tokio::test]
async fn document_get_content_resolves_path_then_converts() {
    let backend = FakeBackend::new();
    backend.respond("repository/getNodePath", r#""/okm:root/Reports/Q1.PDF""#);
    backend.set_content(b"quarterly numbers\n");
    let server = TestServer::start(test_app_state(backend.clone())).await;
    let mut client = server.connect().await;

    server
        .post(
            &client,
            &call_tool(5, "document-get-content", json!({ "uuid": "doc-1" })),
        )
        .await;

    let reply = client.next_message().await;
    assert_eq!(tool_text(&reply), "[pdf] quarterly numbers");

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].path().ends_with("/repository/getNodePath"));
    assert_eq!(requests[0].query(), Some("uuid=doc-1"));
    assert!(requests[1].path().ends_with("/document/getContent"));
    assert_eq!(requests[1].query(), Some("docId=doc-1"));
    assert_eq!(backend.conversions(), vec!["pdf".to_owned()]);
}

#[tokio::test]
async fn empty_conversion_is_an_internal_error() {
    let backend = FakeBackend::new();
    backend.respond("repository/getNodePath", "/okm:root/blank.docx");
    backend.set_content(b"   ");
    let server = TestServer::start(test_app_state(backend)).await;
    let mut client = server.connect().await;

    server
        .post(
            &client,
            &call_tool(6, "document-get-content", json!({ "uuid": "doc-2" })),
        )
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["error"]["code"], -32603);
    let message = reply["error"]["message"].as_str().unwrap();
    assert!(message.contains("conversion failed"), "got {message}");
}

#[tokio::test]
async fn backend_failure_is_an_internal_error() {
    let server = TestServer::start(test_app_state(FakeBackend::new())).await;
    let mut client = server.connect().await;

    server
        .post(&client, &call_tool(7, "find-paginated", json!({})))
        .await;

    let reply = client.next_message().await;
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["error"]["code"], -32603);
    let message = reply["error"]["message"].as_str().unwrap();
    assert!(message.contains("backend unavailable"), "got {message}");
}
