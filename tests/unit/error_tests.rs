//! Unit tests for `AppError` display format and conversions.

use openkm_mcp::mcp::schema::{FieldKind, InputSchema};
use openkm_mcp::AppError;

#[test]
fn every_variant_has_a_distinct_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Mcp("x".into()), "mcp: x"),
        (AppError::UnknownSession("x".into()), "unknown session: x"),
        (AppError::UnknownTool("x".into()), "unknown tool: x"),
        (AppError::UnknownResource("x".into()), "unknown resource: x"),
        (
            AppError::BackendUnavailable("x".into()),
            "backend unavailable: x",
        ),
        (AppError::ConversionFailed("x".into()), "conversion failed: x"),
        (AppError::ChannelClosed("x".into()), "channel closed: x"),
        (AppError::Io("x".into()), "io: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn error_messages_have_no_trailing_period() {
    let err = AppError::BackendUnavailable("search/findPaginated returned 500".into());
    assert!(!err.to_string().ends_with('.'));
}

#[test]
fn validation_errors_convert_to_invalid_input() {
    let schema = InputSchema::object().required("uuid", FieldKind::String, "");
    let errors = schema
        .validate(&serde_json::Map::new())
        .expect_err("uuid is required");

    let err = AppError::from(errors);
    match &err {
        AppError::InvalidInput(errors) => assert!(errors.has_field("uuid")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    assert!(err.to_string().starts_with("invalid input: "));
}

#[test]
fn io_error_converts_to_io_variant() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Io(ref msg) if msg == "gone"));
}

#[test]
fn toml_error_converts_to_config_variant() {
    let parse = toml::from_str::<toml::Value>("= broken").unwrap_err();
    let err = AppError::from(parse);
    assert!(err.to_string().starts_with("config: invalid config"));
}

#[test]
fn app_error_implements_std_error_trait() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    let err = AppError::ChannelClosed("s-1".into());
    assert_error(&err);
    assert!(!format!("{err:?}").is_empty());
}
