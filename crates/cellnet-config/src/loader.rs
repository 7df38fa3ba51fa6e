// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{CellnetConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "cellnet_configuration.toml";

/// Find the cellnet configuration file
///
/// Search order:
/// 1. `CELLNET_CONFIG_PATH` environment variable
/// 2. Current working directory: `./cellnet_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("CELLNET_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by CELLNET_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "cellnet configuration file '{}' not found in any of these locations:\n{}\n\nSet CELLNET_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<CellnetConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let content = fs::read_to_string(&config_file)?;
    let mut config: CellnetConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CELLNET_SEED` -> `generation.seed`
/// - `CELLNET_DEFAULT_NUMBER_ATTEMPTS` -> `generation.default_number_attempts`
/// - `CELLNET_VOLUME_ATTEMPTS` -> `generation.volume_attempts`
/// - `CELLNET_CONNECTIONS_FILE` -> `storage.connections_file`
/// - `CELLNET_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut CellnetConfig) {
    if let Ok(value) = env::var("CELLNET_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            config.generation.seed = seed;
        }
    }
    if let Ok(value) = env::var("CELLNET_DEFAULT_NUMBER_ATTEMPTS") {
        if let Ok(attempts) = value.parse::<u32>() {
            config.generation.default_number_attempts = attempts;
        }
    }
    if let Ok(value) = env::var("CELLNET_VOLUME_ATTEMPTS") {
        if let Ok(attempts) = value.parse::<u32>() {
            config.generation.volume_attempts = attempts;
        }
    }
    if let Ok(value) = env::var("CELLNET_CONNECTIONS_FILE") {
        config.storage.connections_file = PathBuf::from(value);
    }
    if let Ok(value) = env::var("CELLNET_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"seed": "7", "connections_file": "out.txt"}`)
pub fn apply_cli_overrides(config: &mut CellnetConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("seed") {
        if let Ok(seed) = value.parse::<u64>() {
            config.generation.seed = seed;
        }
    }
    if let Some(value) = cli_args.get("default_number_attempts") {
        if let Ok(attempts) = value.parse::<u32>() {
            config.generation.default_number_attempts = attempts;
        }
    }
    if let Some(value) = cli_args.get("volume_attempts") {
        if let Ok(attempts) = value.parse::<u32>() {
            config.generation.volume_attempts = attempts;
        }
    }
    if let Some(value) = cli_args.get("nearest_bounding_sphere") {
        config.generation.nearest_bounding_sphere =
            value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = cli_args.get("connections_file") {
        config.storage.connections_file = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
}
