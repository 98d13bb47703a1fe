//! Unit tests for configuration parsing and validation.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use openkm_mcp::config::GlobalConfig;
use openkm_mcp::AppError;

const MINIMAL: &str = r#"
[backend]
base_url = "http://okm.local:8080/OpenKM/services/rest"
"#;

#[test]
fn minimal_config_applies_defaults() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("config parses");

    assert_eq!(config.http_port, 3001);
    assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.backend.username, None);
    assert!(config.backend.password.is_empty());
    assert_eq!(config.backend_timeout(), Duration::from_secs(30));
    assert_eq!(config.handler_timeout(), Duration::from_secs(60));
    assert_eq!(config.converter.program, "pdftotext");
    assert_eq!(config.converter.args, vec!["-layout", "{input}", "-"]);
    assert_eq!(config.converter.timeout_seconds, 120);
    assert!(config.converter.temp_dir.is_none());
}

#[test]
fn full_config_round_trips_every_section() {
    let toml = r#"
http_port = 4000
bind_address = "0.0.0.0"

[backend]
base_url = "https://docs.example.com/OpenKM/services/rest"
username = "okmAdmin"
timeout_seconds = 5

[converter]
program = "soffice"
args = ["--headless", "--convert-to", "txt", "--outdir", "{output}", "{input}"]
timeout_seconds = 30
temp_dir = "/var/tmp/openkm"

[timeouts]
handler_seconds = 10
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("config parses");

    assert_eq!(config.bind_addr().to_string(), "0.0.0.0:4000");
    assert_eq!(config.backend.username.as_deref(), Some("okmAdmin"));
    assert_eq!(config.backend_timeout(), Duration::from_secs(5));
    assert_eq!(config.converter.program, "soffice");
    assert_eq!(config.converter.args.len(), 6);
    assert_eq!(
        config.converter.temp_dir.as_deref(),
        Some(std::path::Path::new("/var/tmp/openkm"))
    );
    assert_eq!(config.handler_timeout(), Duration::from_secs(10));
    assert_eq!(
        config.backend_url().expect("url").as_str(),
        "https://docs.example.com/OpenKM/services/rest"
    );
}

#[test]
fn password_is_never_read_from_file() {
    let toml = r#"
[backend]
base_url = "http://okm.local/rest"
password = "from-file"
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("config parses");
    assert!(config.backend.password.is_empty());
}

#[test]
fn missing_backend_section_is_rejected() {
    let err = GlobalConfig::from_toml_str("http_port = 3001").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn non_http_scheme_is_rejected() {
    let toml = r#"
[backend]
base_url = "ftp://okm.local/rest"
"#;
    let err = GlobalConfig::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains("http or https"), "got {err}");
}

#[test]
fn unparsable_base_url_is_rejected() {
    let toml = r#"
[backend]
base_url = "not a url"
"#;
    let err = GlobalConfig::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains("backend.base_url"), "got {err}");
}

#[test]
fn zero_timeouts_are_rejected() {
    for (section, key) in [
        ("backend", "timeout_seconds"),
        ("converter", "timeout_seconds"),
        ("timeouts", "handler_seconds"),
    ] {
        let toml = if section == "backend" {
            format!("[backend]\nbase_url = \"http://okm.local/rest\"\n{key} = 0\n")
        } else {
            format!("[backend]\nbase_url = \"http://okm.local/rest\"\n\n[{section}]\n{key} = 0\n")
        };
        let err = GlobalConfig::from_toml_str(&toml).unwrap_err();
        assert!(
            err.to_string().contains(&format!("{section}.{key}")),
            "{section}.{key}: got {err}"
        );
    }
}

#[test]
fn blank_converter_program_is_rejected() {
    let toml = r#"
[backend]
base_url = "http://okm.local/rest"

[converter]
program = "   "
"#;
    let err = GlobalConfig::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains("converter.program"), "got {err}");
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, MINIMAL).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.http_port, 3001);
}

#[test]
fn load_from_missing_path_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = GlobalConfig::load_from_path(temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}
