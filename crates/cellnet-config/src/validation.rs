// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that attempt budgets are usable and that logging settings name
//! levels and formats the logging layer understands.

use crate::{CellnetConfig, ConfigError, ConfigResult};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &CellnetConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_generation(config, &mut errors);
    validate_storage(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }
    Ok(())
}

fn validate_generation(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.generation.default_number_attempts == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "generation.default_number_attempts".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.generation.volume_attempts == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "generation.volume_attempts".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

fn validate_storage(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.storage.connections_file.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "storage.connections_file".to_string(),
        });
    }
}

fn validate_logging(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: "must be 'text' or 'json'".to_string(),
        });
    }
}
