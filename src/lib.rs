// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # cellnet
//!
//! Connection generation for positioned cell populations. This crate bundles
//! the generation engine with its configuration loader and logging setup.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! cellnet = "0.3"  # Default: engine + config + observability
//! ```
//!
//! ## Feature Flags
//!
//! - **`config`** (default): `cellnet_configuration.toml` loading with env and CLI overrides
//! - **`observability`** (default): tracing subscriber setup and per-crate debug flags
//! - **`file-logging`**: per-run log folders with retention cleanup
//!
//! ## Usage
//!
//! ```rust
//! use cellnet::prelude::*;
//!
//! let mut populations = PopulationTable::new();
//! populations.insert("pre", grid_positions(Point3::ORIGIN, (3, 3, 1), 10.0));
//! populations.insert("post", grid_positions(Point3::new(0.0, 0.0, 25.0), (3, 3, 1), 10.0));
//! let oracle = PointCellOracle::new();
//!
//! let spec = ConnectivitySpec::morphology("pre_post", "pre", "post")
//!     .with_synapse(SynapseSpec::new("GABA"))
//!     .with_count(NumberGenerator::fixed(1.0));
//!
//! let pipeline = GenerationPipeline::new(NetworkGeometry::new(&oracle, &populations));
//! let mut run = GenerationRun::new(GenerationSettings::default());
//! let mut store = ConnectionStore::new();
//! let report = pipeline.run(&mut run, &mut store, &[spec], &mut NullSink)?;
//! assert_eq!(report.state, GenerationState::Completed);
//! assert_eq!(store.count_for("pre_post"), 9);
//! # Ok::<(), cellnet::ConnError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: cellnet-config                             │
//! │  (TOML file, environment and CLI overrides)             │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: cellnet-observability                  │
//! │  (subscriber setup, debug flags, run log folders)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: cellnet-connectivity                       │
//! │  (search strategies, generators, connection store)      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use cellnet_connectivity as connectivity;
pub use cellnet_connectivity::*;

#[cfg(feature = "config")]
pub use cellnet_config as config;

#[cfg(feature = "observability")]
pub use cellnet_observability as observability;

/// Engine settings from the `[generation]` section of a configuration file
#[cfg(feature = "config")]
pub fn generation_settings(config: &cellnet_config::GenerationConfig) -> GenerationSettings {
    GenerationSettings {
        seed: config.seed,
        default_number_attempts: config.default_number_attempts,
        volume_attempts: config.volume_attempts,
        nearest_bounding_sphere: config.nearest_bounding_sphere,
    }
}

/// Logging setup from the `[logging]` section of a configuration file
#[cfg(all(feature = "config", feature = "observability"))]
pub fn logging_config(
    config: &cellnet_config::LoggingConfig,
) -> Result<cellnet_observability::LoggingConfig, cellnet_observability::ParseLogFormatError> {
    cellnet_observability::LoggingConfig::from_settings(&config.level, &config.format)
}

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use cellnet_connectivity::{
        grid_positions, AttachmentPoint, AxonalArbour, CellSegment, CellTemplate, ConnError,
        ConnKind, ConnResult, ConnectionGenerator, ConnectionStore, ConnectivityConditions,
        ConnectivitySpec, DistanceAxis, DistanceBounds, GenerationDirection, GenerationPipeline,
        GenerationReport, GenerationRun, GenerationSettings, GenerationState, GeometryOracle,
        LoggingSink, NetworkGeometry, NullSink, NumberGenerator, Point3, PointCellOracle,
        PopulationTable, Region, ReportSink, SearchPattern, SynapseSpec, WeightGenerator,
    };

    #[cfg(feature = "config")]
    pub use cellnet_config::{load_config, validate_config, CellnetConfig};

    #[cfg(feature = "observability")]
    pub use cellnet_observability::{init_console_logging, parse_debug_flags, CrateDebugFlags};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let settings = GenerationSettings::default();
        assert_eq!(settings.default_number_attempts, 100);
        assert!(!crate::connectivity::VERSION.is_empty());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_settings_follow_config_defaults() {
        let config = cellnet_config::GenerationConfig::default();
        assert_eq!(
            super::generation_settings(&config),
            crate::GenerationSettings::default()
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_settings_carry_overrides() {
        let config = cellnet_config::GenerationConfig {
            seed: 42,
            volume_attempts: 12,
            nearest_bounding_sphere: false,
            ..Default::default()
        };
        let settings = super::generation_settings(&config);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.volume_attempts, 12);
        assert!(!settings.nearest_bounding_sphere);
    }

    #[cfg(all(feature = "config", feature = "observability"))]
    #[test]
    fn test_logging_config_conversion() {
        let mut config = cellnet_config::LoggingConfig::default();
        config.format = "json".to_string();
        let logging = super::logging_config(&config).expect("json is a known format");
        assert_eq!(logging.format, cellnet_observability::LogFormat::Json);

        config.format = "xml".to_string();
        assert!(super::logging_config(&config).is_err());
    }
}
