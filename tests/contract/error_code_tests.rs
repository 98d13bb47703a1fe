//! Contract tests for the mapping of application errors to JSON-RPC codes.

use serde_json::json;

use openkm_mcp::mcp::engine::{error_data, error_frame, InboundMessage};
use openkm_mcp::mcp::schema::{FieldKind, InputSchema};
use openkm_mcp::AppError;

#[test]
fn unknown_tool_maps_to_invalid_params_with_tool_name() {
    let data = error_data(&AppError::UnknownTool("nope".into()));
    assert_eq!(data.code.0, -32602);
    assert_eq!(data.data, Some(json!({ "tool": "nope" })));
}

#[test]
fn invalid_input_carries_field_errors() {
    let errors = InputSchema::object()
        .required("message", FieldKind::String, "")
        .validate(&serde_json::Map::new())
        .unwrap_err();

    let data = error_data(&AppError::InvalidInput(errors));
    assert_eq!(data.code.0, -32602);
    let detail = data.data.expect("error data");
    assert_eq!(detail["errors"][0]["field"], "message");
    assert!(detail["errors"][0]["message"].is_string());
}

#[test]
fn unknown_resource_maps_to_resource_not_found() {
    let data = error_data(&AppError::UnknownResource("x://y".into()));
    assert_eq!(data.code.0, -32002);
    assert_eq!(data.data, Some(json!({ "uri": "x://y" })));
}

#[test]
fn handler_failures_map_to_internal_error() {
    for err in [
        AppError::BackendUnavailable("down".into()),
        AppError::ConversionFailed("empty".into()),
        AppError::Mcp("handler timed out after 60s".into()),
    ] {
        let message = err.to_string();
        let data = error_data(&err);
        assert_eq!(data.code.0, -32603);
        assert_eq!(data.message, message);
    }
}

#[test]
fn error_frame_is_a_jsonrpc_envelope() {
    let data = error_data(&AppError::UnknownTool("nope".into()));
    let frame: serde_json::Value =
        serde_json::from_str(&error_frame(&json!(7), &data)).unwrap();
    assert_eq!(frame["jsonrpc"], "2.0");
    assert_eq!(frame["id"], 7);
    assert_eq!(frame["error"]["code"], -32602);
    assert!(frame.get("result").is_none());
}

#[test]
fn request_without_method_is_invalid_request() {
    match InboundMessage::decode(r#"{"jsonrpc":"2.0","id":1}"#) {
        InboundMessage::Invalid { id, error } => {
            assert_eq!(id, json!(1));
            assert_eq!(error.code.0, -32600);
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}
