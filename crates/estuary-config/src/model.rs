// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Estuary relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys
//! are rejected at startup with an actionable diagnostic.

use serde::{Deserialize, Serialize};

/// Top-level Estuary configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections default to sensible values; the
/// relay refuses to start (not to load) without a destination and token.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EstuaryConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Relay policy: destination forum, admission, media ceiling.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Persistence paths.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between correlation retention purges.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_purge_interval_secs() -> u64 {
    3600
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required to run `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Relay policy configuration, consumed (not owned) by the relay core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Destination forum supergroup id. `0` means unset; supergroup ids
    /// are negative.
    #[serde(default)]
    pub destination_chat_id: i64,

    /// Additional sender ids excluded from relay, on top of the built-in
    /// set (the bot itself, the destination chat, the platform service
    /// account).
    #[serde(default)]
    pub excluded_senders: Vec<i64>,

    /// Source chat ids admitted when `only_allowlist` is on.
    #[serde(default)]
    pub allowed_sources: Vec<i64>,

    /// When true, only chats in `allowed_sources` are relayed.
    #[serde(default)]
    pub only_allowlist: bool,

    /// Media above this many bytes is not transmitted; a warning note is
    /// posted into the topic instead.
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            destination_chat_id: 0,
            excluded_senders: Vec::new(),
            allowed_sources: Vec::new(),
            only_allowlist: false,
            max_media_bytes: default_max_media_bytes(),
        }
    }
}

fn default_max_media_bytes() -> u64 {
    50 * 1024 * 1024
}

/// Persistence paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database for the Correlation Store.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// JSON file for the Mapping Store.
    #[serde(default = "default_mapping_path")]
    pub mapping_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            mapping_path: default_mapping_path(),
        }
    }
}

fn default_database_path() -> String {
    "estuary.db".to_string()
}

fn default_mapping_path() -> String {
    "mappings.json".to_string()
}
