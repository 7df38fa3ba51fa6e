// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Summarize a saved connections file.
//!
//! Prints per-name connection counts, kind breakdown and degree statistics.
//! The file comes from the command line or, failing that, from
//! `storage.connections_file` of the loaded configuration.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use cellnet::config::{find_config_file, load_config, validate_config, CellnetConfig};
use cellnet::observability::{debug_flags_help, init_console_logging, parse_debug_flags};
use cellnet::{ConnKind, ConnectionStats, ConnectionStore};
use serde_json::json;
use tracing::{info, warn};

struct Args {
    connections_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    name: Option<String>,
    json: bool,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: conn_report [<connections-file>] [--config <path>] [--name <connection>] [--json]\n\
         \x20                  [--log-level <level>] [--log-format <text|json>]\n\n\
         Defaults:\n\
         - connections-file: storage.connections_file from cellnet_configuration.toml\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        connections_file: None,
        config_file: None,
        name: None,
        json: false,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config_file = Some(PathBuf::from(v));
            }
            "--name" => {
                parsed.name = Some(args.next().unwrap_or_else(|| usage_and_exit()));
            }
            "--json" => parsed.json = true,
            "--log-level" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.overrides.insert("log_level".to_string(), v);
            }
            "--log-format" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.overrides.insert("log_format".to_string(), v);
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
            other => {
                if parsed.connections_file.is_some() {
                    eprintln!("Only one connections file may be given");
                    usage_and_exit();
                }
                parsed.connections_file = Some(PathBuf::from(other));
            }
        }
    }
    parsed
}

/// Configuration from an explicit path, a discovered file, or defaults
fn resolve_config(args: &Args) -> Result<CellnetConfig> {
    let path = match &args.config_file {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    let mut config = match path {
        Some(path) => load_config(Some(&path), Some(&args.overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let mut config = CellnetConfig::default();
            cellnet::config::apply_environment_overrides(&mut config);
            cellnet::config::apply_cli_overrides(&mut config, &args.overrides);
            config
        }
    };
    if let Some(file) = &args.connections_file {
        config.storage.connections_file = file.clone();
    }
    validate_config(&config)?;
    Ok(config)
}

/// Populations are unknown here, so cell counts are the highest stored index plus one
fn stats_for(store: &ConnectionStore, name: &str) -> ConnectionStats {
    let connections = store.connections_for(name);
    let n_source = connections
        .iter()
        .map(|c| c.source.cell_index + 1)
        .max()
        .unwrap_or(0);
    let n_target = connections
        .iter()
        .map(|c| c.target.cell_index + 1)
        .max()
        .unwrap_or(0);
    store.report(name, n_source, n_target)
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = resolve_config(&args)?;

    let logging = cellnet::logging_config(&config.logging)?;
    init_console_logging(&parse_debug_flags(), &logging)?;

    let path = &config.storage.connections_file;
    let mut store = ConnectionStore::new();
    store
        .load_from_path(path)
        .with_context(|| format!("Failed to load connections from {}", path.display()))?;

    let names: Vec<String> = match &args.name {
        Some(name) => {
            if store.count_for(name) == 0 {
                warn!(target: "cellnet", "No connections named {} in {}", name, path.display());
            }
            vec![name.clone()]
        }
        None => store.names_with_connections().map(str::to_string).collect(),
    };
    let stats: Vec<ConnectionStats> = names.iter().map(|n| stats_for(&store, n)).collect();

    if args.json {
        let kinds = [ConnKind::MorphologyBased, ConnKind::VolumeBased, ConnKind::Legacy]
            .iter()
            .map(|&kind| (format!("{:?}", kind), store.count_by_kind(kind)))
            .collect::<HashMap<_, _>>();
        let summary = json!({
            "file": path.display().to_string(),
            "total_connections": store.total_count(),
            "by_kind": kinds,
            "connections": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{}: {} connections ({} morphology, {} volume, {} legacy)",
            path.display(),
            store.total_count(),
            store.count_by_kind(ConnKind::MorphologyBased),
            store.count_by_kind(ConnKind::VolumeBased),
            store.count_by_kind(ConnKind::Legacy)
        );
        for entry in &stats {
            print!("{}", entry);
        }
    }

    info!(target: "cellnet", "Reported {} connection names", stats.len());
    Ok(())
}
