// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # cellnet-observability
//!
//! Logging infrastructure shared by the cellnet crates.
//!
//! Every crate logs through `tracing` with its crate name as target, so
//! per-crate debug flags (`--debug-cellnet-connectivity`, `CELLNET_DEBUG`)
//! map directly onto `EnvFilter` directives.
//!
//! ## Features
//! - `file-logging`: per-run log folders with JSON log files and retention cleanup

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known cellnet crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "cellnet",
    "cellnet-connectivity",
    "cellnet-config",
    "cellnet-observability",
];
