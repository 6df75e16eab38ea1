// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tutorlane configuration system.

use figment::Jail;
use tutorlane_config::diagnostic::ConfigError;
use tutorlane_config::model::TutorlaneConfig;
use tutorlane_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9090
log_level = "debug"
webhook_base_url = "https://book.example.com"

[auth]
token_secret = "s3cret"

[storage]
database_path = "/tmp/ledger.db"
wal_mode = false

[commerce]
commission_rate = 0.15
referral_reward = 2.5
gateway_timeout_secs = 20

[mpesa]
api_key = "k"
api_secret = "s"
account_number = "TL"
route_code = "207"
org_short_code = "174379"
org_pass_key = "pk"

[paypal]
client_id = "id"
client_secret = "secret"

[exchange]
api_key = "fx"
cache_ttl_secs = 60

[email]
api_key = "brevo"
sender_email = "hello@example.com"

[sweep]
enabled = false
window_start_mins = 30
window_end_mins = 10

[outbox]
poll_interval_ms = 250
retry_backoff_ms = 5000
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.webhook_base_url, "https://book.example.com");
    assert_eq!(config.auth.token_secret.as_deref(), Some("s3cret"));
    assert!(!config.storage.wal_mode);
    assert_eq!(config.commerce.commission_rate, 0.15);
    assert!(config.mpesa.is_enabled());
    assert_eq!(config.mpesa.account_number, "TL");
    assert!(config.paypal.is_enabled());
    assert_eq!(config.exchange.cache_ttl_secs, 60);
    assert_eq!(config.email.sender_email, "hello@example.com");
    assert!(!config.sweep.enabled);
    assert_eq!(config.outbox.poll_interval_ms, 250);
    assert_eq!(config.outbox.retry_backoff_ms, 5000);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.commerce.commission_rate, 0.20);
    assert_eq!(config.commerce.referral_reward, 5.00);
    assert_eq!(config.commerce.gateway_timeout_secs, 10);
    assert_eq!(config.exchange.cache_ttl_secs, 21_600);
    assert_eq!(config.sweep.window_start_mins, 15);
    assert_eq!(config.sweep.window_end_mins, 5);
    assert!(!config.mpesa.is_enabled());
    assert!(!config.paypal.is_enabled());
    assert!(config.auth.token_secret.is_none());
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[commerce]
comission_rate = 0.1
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, span, .. } if {
            key == "commerce.comission_rate"
                && suggestion.as_deref() == Some("commission_rate")
                && valid_keys.contains("referral_reward")
                && span.is_none()
        })
    });
    assert!(found, "expected an UnknownKey diagnostic, got: {errors:?}");
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let toml = r#"
[stripe]
key = "x"
"#;
    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = err.to_string();
    assert!(
        err_str.contains("unknown field") || err_str.contains("stripe"),
        "got: {err_str}"
    );
}

#[test]
fn wrong_type_is_reported_with_key() {
    let toml = r#"
[server]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key == "server.port")),
        "got: {errors:?}"
    );
}

#[test]
fn validation_errors_surface_through_load() {
    let toml = r#"
[commerce]
commission_rate = 1.5

[sweep]
window_start_mins = 1
window_end_mins = 5
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn diagnostics_render_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "server.prot".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port, log_level, webhook_base_url".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `port`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("server.prot"));
}

#[test]
fn file_errors_name_the_section() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "tutorlane.toml",
            r#"
[server]
port = 8081

[email]
sender_nmae = "Bob"
"#,
        )?;
        let config = tutorlane_config::load_and_validate();
        let errors = config.expect_err("typo should be rejected");
        let found = errors.iter().any(|e| {
            matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
                if key == "email.sender_nmae" && suggestion.as_deref() == Some("sender_name"))
        });
        assert!(found, "got: {errors:?}");
        Ok(())
    });
}

#[test]
fn env_vars_override_files() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[server]
port = 7000

[mpesa]
org_short_code = "111"
"#,
        )?;
        jail.set_env("TUTORLANE_SERVER_PORT", "7001");
        jail.set_env("TUTORLANE_MPESA_ORG_PASS_KEY", "from-env");
        jail.set_env("TUTORLANE_COMMERCE_COMMISSION_RATE", "0.1");

        let config = load_config_from_path(std::path::Path::new("custom.toml"))?;
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.mpesa.org_short_code, "111");
        assert_eq!(config.mpesa.org_pass_key, "from-env");
        assert_eq!(config.commerce.commission_rate, 0.1);
        Ok(())
    });
}

#[test]
fn missing_file_is_skipped() {
    Jail::expect_with(|_jail| {
        let config = load_config_from_path(std::path::Path::new("nope.toml"))?;
        assert_eq!(config.server.port, 8080);
        Ok(())
    });
}

#[test]
fn redacted_output_hides_credentials() {
    let mut config = TutorlaneConfig::default();
    config.auth.token_secret = Some("jwt-secret".to_string());
    config.paypal.client_secret = Some("pp-secret".to_string());
    config.mpesa.org_pass_key = "pass".to_string();

    let rendered = tutorlane_config::render_redacted(&config).expect("should render");
    assert!(!rendered.contains("jwt-secret"));
    assert!(!rendered.contains("pp-secret"));
    assert!(!rendered.contains("pass\""));
    assert!(rendered.contains("[redacted]"));
    assert!(rendered.contains("[commerce]"));
}
