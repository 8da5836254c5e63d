// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde cannot express: chat id signs,
//! non-empty paths, a non-zero media ceiling, and allow-list coherence.

use crate::diagnostic::ConfigError;
use crate::model::EstuaryConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all violations rather than failing fast. A zero
/// `destination_chat_id` (unset) is accepted here; `serve` enforces its
/// presence at startup so the admin CLI can run without one.
pub fn validate_config(config: &EstuaryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.relay.destination_chat_id > 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "relay.destination_chat_id must be a supergroup id (negative), got {}",
                config.relay.destination_chat_id
            ),
        });
    }

    if config.relay.max_media_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.max_media_bytes must be greater than zero".to_string(),
        });
    }

    if config.relay.only_allowlist && config.relay.allowed_sources.is_empty() {
        errors.push(ConfigError::Validation {
            message: "relay.only_allowlist is enabled but relay.allowed_sources is empty; \
                      no source would ever be relayed"
                .to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.mapping_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.mapping_path must not be empty".to_string(),
        });
    }

    if let Some(token) = config.telegram.bot_token.as_deref()
        && !token.is_empty()
        && !token
            .split_once(':')
            .is_some_and(|(id, rest)| id.parse::<i64>().is_ok() && !rest.is_empty())
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token does not look like a bot token (expected `<id>:<secret>`)"
                .to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelayConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&EstuaryConfig::default()).is_ok());
    }

    #[test]
    fn positive_destination_is_rejected() {
        let config = EstuaryConfig {
            relay: RelayConfig {
                destination_chat_id: 12345,
                ..Default::default()
            },
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("supergroup")));
    }

    #[test]
    fn enforced_empty_allowlist_is_rejected() {
        let config = EstuaryConfig {
            relay: RelayConfig {
                only_allowlist: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn malformed_bot_token_is_rejected() {
        let mut config = EstuaryConfig::default();
        config.telegram.bot_token = Some("not-a-token".to_string());
        assert!(validate_config(&config).is_err());

        config.telegram.bot_token = Some("123456:ABC-DEF".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_media_ceiling_is_rejected() {
        let config = EstuaryConfig {
            relay: RelayConfig {
                max_media_bytes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
