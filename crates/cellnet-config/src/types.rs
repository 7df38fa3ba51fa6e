// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `cellnet_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CellnetConfig {
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Connection generation tunables
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Seed of the run random source
    pub seed: u64,
    /// Distance failures tolerated per connection when a spec sets none
    pub default_number_attempts: u32,
    /// Candidate points tried per connection by volume-based generation
    pub volume_attempts: u32,
    /// Skip cells by bounding sphere in nearest-cell search
    pub nearest_bounding_sphere: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            default_number_attempts: 100,
            volume_attempts: 300,
            nearest_bounding_sphere: true,
        }
    }
}

/// Where generated connections are saved and loaded
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub connections_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connections_file: PathBuf::from("generated_connections.txt"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// "text" or "json"
    pub format: String,
    /// Directory for per-run log folders; empty logs to the console only
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            log_dir: PathBuf::new(),
            retention_days: 7,
            retention_runs: 20,
        }
    }
}
