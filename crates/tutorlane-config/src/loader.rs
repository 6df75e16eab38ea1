// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tutorlane.toml` > `~/.config/tutorlane/tutorlane.toml`
//! > `/etc/tutorlane/tutorlane.toml` with environment variable overrides via the
//! `TUTORLANE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TutorlaneConfig;

/// Section names recognised in environment variable keys.
const SECTIONS: &[&str] = &[
    "server", "auth", "storage", "commerce", "mpesa", "paypal", "exchange", "email", "sweep",
    "outbox",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tutorlane/tutorlane.toml` (system-wide)
/// 3. `~/.config/tutorlane/tutorlane.toml` (user XDG config)
/// 4. `./tutorlane.toml` (local directory)
/// 5. `TUTORLANE_*` environment variables
pub fn load_config() -> Result<TutorlaneConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TutorlaneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TutorlaneConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TutorlaneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TutorlaneConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TutorlaneConfig::default()))
        .merge(Toml::file("/etc/tutorlane/tutorlane.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tutorlane/tutorlane.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tutorlane.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `TUTORLANE_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys contain underscores,
/// so `TUTORLANE_MPESA_ORG_PASS_KEY` must become `mpesa.org_pass_key`.
fn env_provider() -> Env {
    Env::prefixed("TUTORLANE_").map(|key| map_env_key(key.as_str()).into())
}

/// Replace the first underscore after a known section name with a dot.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("server_port"), "server.port");
        assert_eq!(map_env_key("mpesa_org_pass_key"), "mpesa.org_pass_key");
        assert_eq!(map_env_key("commerce_commission_rate"), "commerce.commission_rate");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
