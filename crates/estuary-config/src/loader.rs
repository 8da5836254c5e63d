// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./estuary.toml` > `~/.config/estuary/estuary.toml`
//! > `/etc/estuary/estuary.toml`, with environment variable overrides via
//! the `ESTUARY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EstuaryConfig;

/// Load configuration from the standard XDG hierarchy with env overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/estuary/estuary.toml` (system-wide)
/// 3. `~/.config/estuary/estuary.toml` (user XDG config)
/// 4. `./estuary.toml` (local directory)
/// 5. `ESTUARY_*` environment variables
pub fn load_config() -> Result<EstuaryConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (testing / explicit config).
pub fn load_config_from_str(toml_content: &str) -> Result<EstuaryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EstuaryConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<EstuaryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EstuaryConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for config loading, exposed for diagnostic use.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EstuaryConfig::default()))
        .merge(Toml::file("/etc/estuary/estuary.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("estuary/estuary.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("estuary.toml"))
        .merge(env_provider())
}

/// Environment variable provider using an explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ESTUARY_TELEGRAM_BOT_TOKEN` must map
/// to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("ESTUARY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped,
        // e.g. ESTUARY_RELAY_DESTINATION_CHAT_ID -> "relay_destination_chat_id".
        let mapped = key
            .as_str()
            .replacen("service_", "service.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("relay_", "relay.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn str_loader_applies_defaults_for_missing_sections() {
        let config = load_config_from_str("[relay]\ndestination_chat_id = -100\n").unwrap();
        assert_eq!(config.relay.destination_chat_id, -100);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.storage.database_path, "estuary.db");
    }

    #[test]
    fn str_loader_rejects_unknown_keys() {
        let result = load_config_from_str("[relay]\ndestination_chat = -100\n");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn env_override_maps_into_nested_keys() {
        // SAFETY: test is serialized; no other thread reads the environment.
        unsafe {
            std::env::set_var("ESTUARY_TELEGRAM_BOT_TOKEN", "123:abc");
            std::env::set_var("ESTUARY_RELAY_DESTINATION_CHAT_ID", "-1009");
        }
        let config: EstuaryConfig = Figment::new()
            .merge(Serialized::defaults(EstuaryConfig::default()))
            .merge(env_provider())
            .extract()
            .unwrap();
        unsafe {
            std::env::remove_var("ESTUARY_TELEGRAM_BOT_TOKEN");
            std::env::remove_var("ESTUARY_RELAY_DESTINATION_CHAT_ID");
        }
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.relay.destination_chat_id, -1009);
    }
}
