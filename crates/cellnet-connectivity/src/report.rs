// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Progress and outcome notifications from a generation run.

use tracing::{debug, error, info, warn};

use crate::run::{GenerationReport, SpecOutcome};
use crate::spec::ConnectivitySpec;

/// Receiver of generation progress. Every method defaults to doing nothing.
pub trait ReportSink {
    fn spec_started(&mut self, _spec: &ConnectivitySpec) {}

    /// `done` of `total` start cells processed for the named spec
    fn progress(&mut self, _spec: &str, _done: usize, _total: usize) {}

    fn spec_finished(&mut self, _outcome: &SpecOutcome) {}

    fn generation_interrupted(&mut self) {}

    fn generation_aborted(&mut self, _reason: &str) {}

    fn generation_complete(&mut self, _report: &GenerationReport) {}
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {}

/// Forwards notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl ReportSink for LoggingSink {
    fn spec_started(&mut self, spec: &ConnectivitySpec) {
        info!(
            target: "cellnet-connectivity",
            "Generating {} ({} -> {}, {})",
            spec.name,
            spec.source_group,
            spec.target_group,
            spec.search_pattern
        );
    }

    fn progress(&mut self, spec: &str, done: usize, total: usize) {
        debug!(target: "cellnet-connectivity", "{}: {}/{} start cells", spec, done, total);
    }

    fn spec_finished(&mut self, outcome: &SpecOutcome) {
        if outcome.deficit() > 0 {
            warn!(
                target: "cellnet-connectivity",
                "{} ({} short of request)",
                outcome,
                outcome.deficit()
            );
        } else {
            info!(target: "cellnet-connectivity", "{}", outcome);
        }
    }

    fn generation_interrupted(&mut self) {
        warn!(target: "cellnet-connectivity", "Generation interrupted");
    }

    fn generation_aborted(&mut self, reason: &str) {
        error!(target: "cellnet-connectivity", "Generation aborted: {}", reason);
    }

    fn generation_complete(&mut self, report: &GenerationReport) {
        info!(
            target: "cellnet-connectivity",
            "Generation {} in {} ms: {} connections",
            report.state,
            report.duration_ms,
            report.total_connections
        );
    }
}
