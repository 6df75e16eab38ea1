// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-empty paths, rate ranges, ordered sweep windows.

use crate::diagnostic::ConfigError;
use crate::model::TutorlaneConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TutorlaneConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if !matches!(
        config.server.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        fail(format!(
            "server.log_level must be one of trace, debug, info, warn, error; got `{}`",
            config.server.log_level
        ));
    }

    if !config.server.webhook_base_url.starts_with("http://")
        && !config.server.webhook_base_url.starts_with("https://")
    {
        fail("server.webhook_base_url must be an http(s) URL".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let rate = config.commerce.commission_rate;
    if !(0.0..1.0).contains(&rate) {
        fail(format!(
            "commerce.commission_rate must be in [0, 1), got {rate}"
        ));
    }

    if config.commerce.referral_reward < 0.0 {
        fail(format!(
            "commerce.referral_reward must be non-negative, got {}",
            config.commerce.referral_reward
        ));
    }

    if config.commerce.gateway_timeout_secs == 0 {
        fail("commerce.gateway_timeout_secs must be greater than 0".to_string());
    }

    if config.mpesa.is_enabled() {
        for (name, value) in [
            ("mpesa.route_code", &config.mpesa.route_code),
            ("mpesa.org_short_code", &config.mpesa.org_short_code),
            ("mpesa.org_pass_key", &config.mpesa.org_pass_key),
        ] {
            if value.trim().is_empty() {
                fail(format!("{name} is required when M-Pesa credentials are set"));
            }
        }
    }

    if config.exchange.cache_ttl_secs == 0 {
        fail("exchange.cache_ttl_secs must be greater than 0".to_string());
    }

    if config.sweep.interval_secs == 0 {
        fail("sweep.interval_secs must be greater than 0".to_string());
    }
    if config.sweep.window_start_mins <= config.sweep.window_end_mins {
        fail(format!(
            "sweep.window_start_mins ({}) must be greater than sweep.window_end_mins ({})",
            config.sweep.window_start_mins, config.sweep.window_end_mins
        ));
    }

    if config.outbox.poll_interval_ms == 0 {
        fail("outbox.poll_interval_ms must be greater than 0".to_string());
    }
    if config.outbox.retry_backoff_ms == 0 {
        fail("outbox.retry_backoff_ms must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
