// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for cellnet
//!
//! Console logging is always available. With the `file-logging` feature,
//! [`init_logging`] also writes one JSON log file per known crate plus a
//! combined file into a timestamped run folder, pruning old run folders by
//! age and count.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn env_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let filter = debug_flags.to_filter_string_with_default(&config.level);
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Install a global console subscriber
///
/// # Errors
///
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(debug_flags, config)?;
    let layer = match config.format {
        LogFormat::Text => fmt::layer().with_target(true).with_filter(filter).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };
    Registry::default()
        .with(layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;
    Ok(())
}

/// Run folders under `base_log_dir` that the retention policy removes, oldest first
///
/// Folders older than `retention_days` go first; of the rest, all but the
/// `retention_runs` most recent go too. Entries that are not `run_<timestamp>`
/// folders are never selected.
pub fn expired_run_folders(
    base_log_dir: &Path,
    now: DateTime<Utc>,
    retention_days: u64,
    retention_runs: usize,
) -> Result<Vec<PathBuf>> {
    if !base_log_dir.exists() {
        return Ok(Vec::new());
    }
    let cutoff = now - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to list log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(naive) = stamp {
            runs.push((path, Utc.from_utc_datetime(&naive)));
        }
    }
    runs.sort_by_key(|(_, dt)| *dt);

    let (old, recent): (Vec<_>, Vec<_>) = runs.into_iter().partition(|(_, dt)| *dt < cutoff);
    let excess = recent.len().saturating_sub(retention_runs);
    Ok(old
        .into_iter()
        .chain(recent.into_iter().take(excess))
        .map(|(path, _)| path)
        .collect())
}

#[cfg(feature = "file-logging")]
pub use file::{init_logging, LoggingGuard};

#[cfg(feature = "file-logging")]
mod file {
    use super::*;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_appender::rolling;

    /// Keeps file writers alive; logs are flushed when dropped
    pub struct LoggingGuard {
        _file_guards: Vec<WorkerGuard>,
        log_dir: PathBuf,
    }

    impl LoggingGuard {
        /// The run folder of this process
        pub fn log_dir(&self) -> &Path {
            &self.log_dir
        }
    }

    /// Initialize console logging plus per-run log files
    ///
    /// Creates a timestamped folder structure:
    /// ```text
    /// ./logs/
    ///   └── run_20250101_120000/
    ///       ├── cellnet-connectivity.log
    ///       ├── cellnet-config.log
    ///       └── cellnet.log (combined)
    /// ```
    ///
    /// # Arguments
    /// * `debug_flags` - Per-crate debug flags for filtering
    /// * `config` - Default level and console format
    /// * `log_dir` - Base directory for logs (default: `./logs`)
    /// * `retention_days` - Keep logs for N days (default: 30)
    /// * `retention_runs` - Keep N most recent runs (default: 10)
    pub fn init_logging(
        debug_flags: &CrateDebugFlags,
        config: &LoggingConfig,
        log_dir: Option<PathBuf>,
        retention_days: Option<u64>,
        retention_runs: Option<usize>,
    ) -> Result<LoggingGuard> {
        let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
        let now = Utc::now();
        let run_folder =
            base_log_dir.join(format!("{}{}", RUN_PREFIX, now.format(RUN_TIMESTAMP_FORMAT)));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        // The folder just created counts towards the kept runs
        let expired = expired_run_folders(
            &base_log_dir,
            now,
            retention_days.unwrap_or(30),
            retention_runs.unwrap_or(10),
        )?;
        for path in expired {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                );
            }
        }

        let mut layers = Vec::new();
        let mut file_guards = Vec::new();

        let console_filter = env_filter(debug_flags, config)?;
        let console_layer = match config.format {
            LogFormat::Text => fmt::layer()
                .with_target(false)
                .with_filter(console_filter)
                .boxed(),
            LogFormat::Json => fmt::layer().json().with_filter(console_filter).boxed(),
        };
        layers.push(console_layer);

        for crate_name in crate::KNOWN_CRATES {
            let appender = rolling::never(&run_folder, format!("{}.log", crate_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guards.push(guard);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::new(format!("{}=debug,off", crate_name)))
                .boxed();
            layers.push(file_layer);
        }

        let combined = rolling::never(&run_folder, "cellnet.log");
        let (combined_writer, combined_guard) = tracing_appender::non_blocking(combined);
        file_guards.push(combined_guard);
        layers.push(
            fmt::layer()
                .with_writer(combined_writer)
                .with_target(true)
                .json()
                .with_filter(env_filter(debug_flags, config)?)
                .boxed(),
        );

        Registry::default()
            .with(layers)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        Ok(LoggingGuard {
            _file_guards: file_guards,
            log_dir: run_folder,
        })
    }
}
