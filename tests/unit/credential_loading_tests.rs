//! Unit tests for backend credential loading.
//!
//! These tests mutate process-global env vars and run serially. The
//! keychain service `openkm-mcp` is assumed absent in test environments,
//! so lookups fall back to `OKM_USERNAME` / `OKM_PASSWORD`.

use openkm_mcp::config::GlobalConfig;
use openkm_mcp::AppError;

fn make_config(username: Option<&str>) -> GlobalConfig {
    let user_line = username.map_or_else(String::new, |u| format!("username = \"{u}\"\n"));
    let toml = format!("[backend]\nbase_url = \"http://okm.local/rest\"\n{user_line}");
    GlobalConfig::from_toml_str(&toml).expect("config parses")
}

fn clear_env() {
    std::env::remove_var("OKM_USERNAME");
    std::env::remove_var("OKM_PASSWORD");
}

#[tokio::test]
#[serial_test::serial]
async fn env_vars_supply_both_credentials() {
    clear_env();
    std::env::set_var("OKM_USERNAME", "okmAdmin");
    std::env::set_var("OKM_PASSWORD", "admin");

    let mut config = make_config(None);
    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.backend.username.as_deref(), Some("okmAdmin"));
    assert_eq!(config.backend.password, "admin");
    clear_env();
}

#[tokio::test]
#[serial_test::serial]
async fn file_username_takes_precedence_over_env() {
    clear_env();
    std::env::set_var("OKM_USERNAME", "from-env");
    std::env::set_var("OKM_PASSWORD", "secret");

    let mut config = make_config(Some("from-file"));
    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.backend.username.as_deref(), Some("from-file"));
    assert_eq!(config.backend.password, "secret");
    clear_env();
}

#[tokio::test]
#[serial_test::serial]
async fn missing_password_names_the_env_var() {
    clear_env();

    let mut config = make_config(Some("okmAdmin"));
    let err = config.load_credentials().await.unwrap_err();

    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
    assert!(err.to_string().contains("OKM_PASSWORD"), "got {err}");
}

#[tokio::test]
#[serial_test::serial]
async fn empty_env_var_counts_as_missing() {
    clear_env();
    std::env::set_var("OKM_USERNAME", "");
    std::env::set_var("OKM_PASSWORD", "secret");

    let mut config = make_config(None);
    let err = config.load_credentials().await.unwrap_err();

    assert!(err.to_string().contains("OKM_USERNAME"), "got {err}");
    clear_env();
}
