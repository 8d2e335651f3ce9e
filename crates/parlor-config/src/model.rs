// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parlor chat relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parlor configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlorConfig {
    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log retention, batch sizes, and stream budget.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Push notification provider settings.
    #[serde(default)]
    pub push: PushConfig,

    /// AI collaborator settings.
    #[serde(default)]
    pub ai: AiConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP listener to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
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
        .map(|p| p.join("parlor").join("parlor.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "parlor.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Retention, batch-size, and live-stream budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Lifetime of sessions, conversation logs, and read-status rows, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Lifetime of device cursor rows, in seconds.
    #[serde(default = "default_cursor_ttl_secs")]
    pub cursor_ttl_secs: u64,

    /// Maximum entries per incremental read batch.
    #[serde(default = "default_read_limit")]
    pub read_limit: usize,

    /// Maximum entries on a first-load read of the full log.
    #[serde(default = "default_load_limit")]
    pub load_limit: usize,

    /// How long one stream iteration blocks waiting for new entries, in
    /// milliseconds.
    #[serde(default = "default_stream_block_ms")]
    pub stream_block_ms: u64,

    /// Blocking iterations per stream connection before the relay asks the
    /// client to reconnect.
    #[serde(default = "default_stream_max_iterations")]
    pub stream_max_iterations: u32,

    /// Pause after a stream-side storage error before retrying, in milliseconds.
    #[serde(default = "default_stream_error_pause_ms")]
    pub stream_error_pause_ms: u64,

    /// Interval between expired-row sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            cursor_ttl_secs: default_cursor_ttl_secs(),
            read_limit: default_read_limit(),
            load_limit: default_load_limit(),
            stream_block_ms: default_stream_block_ms(),
            stream_max_iterations: default_stream_max_iterations(),
            stream_error_pause_ms: default_stream_error_pause_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cursor_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_read_limit() -> usize {
    100
}

fn default_load_limit() -> usize {
    1000
}

fn default_stream_block_ms() -> u64 {
    2500
}

fn default_stream_max_iterations() -> u32 {
    3
}

fn default_stream_error_pause_ms() -> u64 {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

/// Push notification provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Push provider endpoint.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Lifetime of a registered push token, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Request timeout for push delivery, in seconds.
    #[serde(default = "default_push_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            token_ttl_secs: default_token_ttl_secs(),
            timeout_secs: default_push_timeout_secs(),
        }
    }
}

fn default_provider_url() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_token_ttl_secs() -> u64 {
    365 * 24 * 60 * 60
}

fn default_push_timeout_secs() -> u64 {
    10
}

/// AI collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// Provider API key. `None` disables the AI lane.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for AI responses.
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature, 0.0 to 2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file containing the system prompt.
    /// Takes precedence over `system_prompt` if both are set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_ai_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}
