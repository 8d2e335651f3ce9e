// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and a sane
//! stream budget.

use crate::diagnostic::ConfigError;
use crate::model::ParlorConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParlorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.relay.read_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.read_limit must be at least 1".to_string(),
        });
    }

    if config.relay.load_limit < config.relay.read_limit {
        errors.push(ConfigError::Validation {
            message: format!(
                "relay.load_limit ({}) must be at least relay.read_limit ({})",
                config.relay.load_limit, config.relay.read_limit
            ),
        });
    }

    if config.relay.stream_max_iterations == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.stream_max_iterations must be at least 1".to_string(),
        });
    }

    if config.relay.stream_block_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.stream_block_ms must be at least 1".to_string(),
        });
    }

    if config.push.provider_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "push.provider_url must not be empty".to_string(),
        });
    }

    if !(0.0..=2.0).contains(&config.ai.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "ai.temperature must be between 0.0 and 2.0, got {}",
                config.ai.temperature
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ParlorConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ParlorConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_read_limit_fails_validation() {
        let mut config = ParlorConfig::default();
        config.relay.read_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("read_limit"))));
    }

    #[test]
    fn load_limit_below_read_limit_fails_validation() {
        let mut config = ParlorConfig::default();
        config.relay.read_limit = 100;
        config.relay.load_limit = 50;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("load_limit"))));
    }

    #[test]
    fn zero_stream_budget_fails_validation() {
        let mut config = ParlorConfig::default();
        config.relay.stream_max_iterations = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("stream_max_iterations"))));
    }

    #[test]
    fn out_of_range_temperature_fails_validation() {
        let mut config = ParlorConfig::default();
        config.ai.temperature = 3.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("temperature"))));
    }

    #[test]
    fn multiple_errors_are_collected() {
        let mut config = ParlorConfig::default();
        config.server.host = "".to_string();
        config.relay.read_limit = 0;
        config.ai.temperature = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = ParlorConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.ai.temperature = 1.0;
        assert!(validate_config(&config).is_ok());
    }
}
