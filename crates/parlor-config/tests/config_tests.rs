// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Parlor configuration system.

use parlor_config::diagnostic::{suggest_key, ConfigError};
use parlor_config::model::ParlorConfig;
use parlor_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_parlor_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9090
log_level = "debug"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[relay]
session_ttl_secs = 3600
cursor_ttl_secs = 7200
read_limit = 50
load_limit = 500
stream_block_ms = 1000
stream_max_iterations = 5
stream_error_pause_ms = 250
sweep_interval_secs = 600

[push]
provider_url = "https://push.example.test/send"
token_ttl_secs = 86400
timeout_secs = 5

[ai]
api_key = "test-key"
model = "gemini-2.0-flash"
max_output_tokens = 2048
temperature = 1.2
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.relay.session_ttl_secs, 3600);
    assert_eq!(config.relay.cursor_ttl_secs, 7200);
    assert_eq!(config.relay.read_limit, 50);
    assert_eq!(config.relay.load_limit, 500);
    assert_eq!(config.relay.stream_block_ms, 1000);
    assert_eq!(config.relay.stream_max_iterations, 5);
    assert_eq!(config.push.provider_url, "https://push.example.test/send");
    assert_eq!(config.push.token_ttl_secs, 86_400);
    assert_eq!(config.ai.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.ai.max_output_tokens, 2048);
    assert_eq!(config.ai.temperature, 1.2);
}

/// Unknown field in [relay] section produces an UnknownField error.
#[test]
fn unknown_field_in_relay_produces_error() {
    let toml = r#"
[relay]
read_limt = 50
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    // Figment wraps serde's deny_unknown_fields error
    assert!(
        err_str.contains("unknown field") || err_str.contains("read_limt"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = "";
    let config = load_config_from_str(toml).expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8787);
    assert_eq!(config.server.log_level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.relay.session_ttl_secs, 86_400);
    assert_eq!(config.relay.read_limit, 100);
    assert_eq!(config.relay.stream_max_iterations, 3);
    assert!(config.ai.api_key.is_none());
    assert_eq!(config.ai.model, "gemini-2.0-flash");
}

/// Env-style dot-notation overrides win over TOML values.
#[test]
fn override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[server]
port = 1111
"#;

    // Simulates a PARLOR_SERVER_PORT env override without touching the process env.
    let config: ParlorConfig = Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("server.port", 2222))
        .extract()
        .expect("should merge override");

    assert_eq!(config.server.port, 2222);
}

/// Dot-notation maps onto underscore-containing keys without splitting them.
#[test]
fn underscore_keys_survive_dot_mapping() {
    use figment::{providers::Serialized, Figment};

    let config: ParlorConfig = Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(("relay.read_limit", 42))
        .extract()
        .expect("should set read_limit via dot notation");

    assert_eq!(config.relay.read_limit, 42);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: ParlorConfig = Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file("/nonexistent/path/parlor.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.server.host, "127.0.0.1");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[metrics]
enabled = true
"#;

    let err =
        load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("metrics"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown key "read_limt" produces suggestion "did you mean `read_limit`?"
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[relay]
read_limt = 50
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty(), "should have at least one error");

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "read_limt"
                && suggestion.as_deref() == Some("read_limit")
                && valid_keys.contains("read_limit")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'read_limt' with suggestion 'read_limit', got: {errors:?}"
    );
}

/// Error output includes the list of valid keys for the section.
#[test]
fn diagnostic_error_includes_valid_keys() {
    let toml = r#"
[server]
prot = 9000
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_valid_keys = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { valid_keys, .. } if {
            valid_keys.contains("host")
                && valid_keys.contains("port")
                && valid_keys.contains("log_level")
        })
    });
    assert!(
        has_valid_keys,
        "error should list valid keys for [server] section"
    );
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[relay]
read_limit = "lots"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("read_limit"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError implements miette::Diagnostic (can be rendered).
#[test]
fn config_error_implements_diagnostic() {
    use miette::Diagnostic;

    let error = ConfigError::UnknownKey {
        key: "read_limt".to_string(),
        suggestion: Some("read_limit".to_string()),
        valid_keys: "read_limit, load_limit".to_string(),
        span: None,
        src: None,
    };

    let code = error.code();
    assert!(code.is_some(), "should have diagnostic code");

    let help = error.help();
    assert!(help.is_some(), "should have help text");
    let help_str = help.unwrap().to_string();
    assert!(
        help_str.contains("did you mean `read_limit`"),
        "help should contain suggestion, got: {help_str}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "read_limt".to_string(),
        suggestion: Some("read_limit".to_string()),
        valid_keys: "read_limit, load_limit".to_string(),
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(!buf.is_empty(), "rendered report should not be empty");
    assert!(buf.contains("read_limt"), "rendered report should mention the key");
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[server]
port = 9000
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.server.port, 9000);
}

/// Validation catches a stream budget of zero iterations.
#[test]
fn validation_catches_zero_stream_budget() {
    let toml = r#"
[relay]
stream_max_iterations = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero iteration budget should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("stream_max_iterations"))
    });
    assert!(
        has_validation_error,
        "should have validation error for the stream budget"
    );
}

/// Validation catches an out-of-range AI temperature.
#[test]
fn validation_catches_bad_temperature() {
    let toml = r#"
[ai]
temperature = 9.0
"#;

    let errors = load_and_validate_str(toml).expect_err("temperature 9.0 should fail");
    let has_validation_error = errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("temperature")));
    assert!(has_validation_error, "should have validation error for temperature");
}

/// suggest_key works for the relay section's vocabulary.
#[test]
fn diagnostic_suggests_session_ttl() {
    let valid_keys = &["session_ttl_secs", "cursor_ttl_secs", "read_limit"];
    assert_eq!(
        suggest_key("session_ttl_sec", valid_keys),
        Some("session_ttl_secs".to_string())
    );
}
