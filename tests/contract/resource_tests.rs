//! Contract tests for resource listing and reads that fail upstream.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use openkm_mcp::mcp::engine::ProtocolEngine;
use openkm_mcp::mcp::handler::build_engine;

use super::support::NullBackend;

fn engine() -> ProtocolEngine {
    build_engine(Arc::new(NullBackend::new()), Duration::from_secs(5)).expect("engine builds")
}

async fn call(engine: &ProtocolEngine, request: &Value) -> Value {
    let frame = engine
        .handle_raw(&request.to_string())
        .await
        .expect("request replies");
    serde_json::from_str(&frame).expect("json")
}

#[tokio::test]
async fn resources_advertise_name_description_and_json_mime() {
    let engine = engine();
    let reply = call(
        &engine,
        &json!({ "jsonrpc": "2.0", "id": 1, "method": "resources/list" }),
    )
    .await;

    let resources = reply["result"]["resources"].as_array().expect("resources");
    assert_eq!(resources.len(), 3);
    for resource in resources {
        assert!(resource["name"].is_string());
        assert!(resource["description"].is_string());
        assert_eq!(resource["mimeType"], "application/json");
    }
}

#[tokio::test]
async fn resource_templates_list_is_empty() {
    let engine = engine();
    let reply = call(
        &engine,
        &json!({ "jsonrpc": "2.0", "id": 2, "method": "resources/templates/list" }),
    )
    .await;
    assert_eq!(reply["result"]["resourceTemplates"], json!([]));
}

#[tokio::test]
async fn read_with_unreachable_backend_is_internal_error() {
    let engine = engine();
    let reply = call(
        &engine,
        &json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "resources/read",
            "params": { "uri": "search://getKeywordMap" }
        }),
    )
    .await;

    assert_eq!(reply["id"], 3);
    assert_eq!(reply["error"]["code"], -32603);
}

#[tokio::test]
async fn read_without_uri_is_invalid_params() {
    let engine = engine();
    let reply = call(
        &engine,
        &json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/read", "params": {} }),
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);
}
