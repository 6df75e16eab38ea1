// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tutorlane service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tutorlane configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TutorlaneConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bearer-token verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Ledger database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Commission, rewards and gateway timeouts.
    #[serde(default)]
    pub commerce: CommerceConfig,

    /// Mobile-money push provider.
    #[serde(default)]
    pub mpesa: MpesaConfig,

    /// Redirect-order provider.
    #[serde(default)]
    pub paypal: PaypalConfig,

    /// Exchange-rate source.
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Transactional email.
    #[serde(default)]
    pub email: EmailConfig,

    /// Missed-class sweep.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Domain-event dispatcher.
    #[serde(default)]
    pub outbox: OutboxConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Public base URL providers call back into.
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            webhook_base_url: default_webhook_base_url(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_webhook_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Bearer-token verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 secret the issuing service signs access tokens with.
    /// Without it every authenticated route refuses requests.
    #[serde(default)]
    pub token_secret: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("tutorlane").join("tutorlane.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tutorlane.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Marketplace economics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommerceConfig {
    /// Share of each completed booking kept by the platform, in `[0, 1)`.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,

    /// Credit granted to a referrer when the referred user first pays.
    #[serde(default = "default_referral_reward")]
    pub referral_reward: f64,

    /// Hard timeout for every provider HTTP call, in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            commission_rate: default_commission_rate(),
            referral_reward: default_referral_reward(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

fn default_commission_rate() -> f64 {
    0.20
}

fn default_referral_reward() -> f64 {
    5.00
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

/// Mobile-money push provider configuration.
///
/// The provider is enabled when both `api_key` and `api_secret` are set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MpesaConfig {
    #[serde(default = "default_mpesa_base_url")]
    pub base_url: String,

    #[serde(default = "default_mpesa_token_url")]
    pub token_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_secret: Option<String>,

    /// Prefix of the invoice reference echoed back in callbacks.
    #[serde(default = "default_account_number")]
    pub account_number: String,

    #[serde(default)]
    pub route_code: String,

    #[serde(default)]
    pub org_short_code: String,

    #[serde(default)]
    pub org_pass_key: String,

    #[serde(default = "default_transaction_desc")]
    pub transaction_desc: String,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            base_url: default_mpesa_base_url(),
            token_url: default_mpesa_token_url(),
            api_key: None,
            api_secret: None,
            account_number: default_account_number(),
            route_code: String::new(),
            org_short_code: String::new(),
            org_pass_key: String::new(),
            transaction_desc: default_transaction_desc(),
        }
    }
}

impl MpesaConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

fn default_mpesa_base_url() -> String {
    "https://api.buni.kcbgroup.com/mm/api/request/1.0.0".to_string()
}

fn default_mpesa_token_url() -> String {
    "https://api.buni.kcbgroup.com/token?grant_type=client_credentials".to_string()
}

fn default_account_number() -> String {
    "ACCOUNT".to_string()
}

fn default_transaction_desc() -> String {
    "Tutoring session".to_string()
}

/// Redirect-order provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaypalConfig {
    #[serde(default = "default_paypal_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_paypal_api_base_url(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl PaypalConfig {
    pub fn is_enabled(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

fn default_paypal_api_base_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

/// Exchange-rate source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// How long a fetched rate table is reused, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_base_url(),
            api_key: None,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_exchange_base_url() -> String {
    "https://v6.exchangerate-api.com/v6".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    6 * 60 * 60
}

/// Transactional email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    /// Without a key, notifications are logged instead of sent.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            base_url: default_email_base_url(),
            api_key: None,
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

fn default_email_base_url() -> String {
    "https://api.brevo.com/v3".to_string()
}

fn default_sender_email() -> String {
    "no-reply@tutorlane.local".to_string()
}

fn default_sender_name() -> String {
    "Tutorlane".to_string()
}

/// Missed-class sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Run the sweep on an interval inside `serve`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Oldest slot end considered, in minutes before now.
    #[serde(default = "default_window_start_mins")]
    pub window_start_mins: u64,

    /// Grace period after slot end before a class counts as missed, in minutes.
    #[serde(default = "default_window_end_mins")]
    pub window_end_mins: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sweep_interval_secs(),
            window_start_mins: default_window_start_mins(),
            window_end_mins: default_window_end_mins(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_window_start_mins() -> u64 {
    15
}

fn default_window_end_mins() -> u64 {
    5
}

/// Domain-event dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboxConfig {
    /// Idle delay between polls of an empty outbox, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before a failed entry is retried, multiplied by its attempt
    /// count, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_retry_backoff_ms() -> u64 {
    30_000
}

impl TutorlaneConfig {
    /// A copy with every credential replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        fn mask(value: &Option<String>) -> Option<String> {
            value.as_ref().map(|_| "[redacted]".to_string())
        }
        let mut copy = self.clone();
        copy.auth.token_secret = mask(&self.auth.token_secret);
        copy.mpesa.api_key = mask(&self.mpesa.api_key);
        copy.mpesa.api_secret = mask(&self.mpesa.api_secret);
        if !copy.mpesa.org_pass_key.is_empty() {
            copy.mpesa.org_pass_key = "[redacted]".to_string();
        }
        copy.paypal.client_secret = mask(&self.paypal.client_secret);
        copy.exchange.api_key = mask(&self.exchange.api_key);
        copy.email.api_key = mask(&self.email.api_key);
        copy
    }
}
