// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Generation pipeline.

Runs a whole set of connectivity specs against one network geometry:

1. **Validation**: every spec is checked before anything is generated; a
   single bad spec aborts the run with an empty store
2. **Morphology stage**: morphology-based specs in the order given
3. **Volume stage**: volume-based specs in the order given

The store is cleared when the run starts. Connections already appended stay
in the store when the run is interrupted or aborted part way through.
*/

use std::time::Instant;

use ahash::AHashSet;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::engine::{generator_for, GenerationContext};
use crate::geometry::NetworkGeometry;
use crate::report::ReportSink;
use crate::run::{GenerationReport, GenerationRun, GenerationState, SpecOutcome};
use crate::spec::ConnectivitySpec;
use crate::store::{ConnKind, ConnectionStore};
use crate::types::{ConnError, ConnResult};

/// Order in which spec kinds are generated
const STAGES: [ConnKind; 2] = [ConnKind::MorphologyBased, ConnKind::VolumeBased];

/// Drives generation of a spec set into a [`ConnectionStore`]
pub struct GenerationPipeline<'a> {
    geometry: NetworkGeometry<'a>,
}

impl<'a> GenerationPipeline<'a> {
    pub fn new(geometry: NetworkGeometry<'a>) -> Self {
        Self { geometry }
    }

    /// Check every spec and reject duplicate names
    pub fn validate(&self, specs: &[ConnectivitySpec]) -> ConnResult<()> {
        let mut seen = AHashSet::new();
        for spec in specs {
            spec.validate(self.geometry.populations, self.geometry.oracle)?;
            if !seen.insert(spec.name.as_str()) {
                return Err(ConnError::InvalidSpec(format!(
                    "duplicate connection name {}",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Generate all `specs` into `store`.
    ///
    /// Returns `Err` only when `run` was already used. Invalid specs and
    /// failures during generation end the run in [`GenerationState::Aborted`]
    /// and are described by the returned report.
    pub fn run(
        &self,
        run: &mut GenerationRun,
        store: &mut ConnectionStore,
        specs: &[ConnectivitySpec],
        sink: &mut dyn ReportSink,
    ) -> ConnResult<GenerationReport> {
        run.begin()?;
        let started_at = Utc::now();
        let timer = Instant::now();
        store.reset();
        info!(
            target: "cellnet-connectivity",
            "Starting generation of {} connectivity specs (seed {})",
            specs.len(),
            run.settings().seed
        );

        let mut outcomes = Vec::with_capacity(specs.len());
        let (state, abort_reason) = match self.validate(specs) {
            Err(e) => (GenerationState::Aborted, Some(e.to_string())),
            Ok(()) => match self.generate_all(run, store, specs, sink, &mut outcomes) {
                Ok(true) => (GenerationState::Completed, None),
                Ok(false) => (GenerationState::Interrupted, None),
                Err(e) => (GenerationState::Aborted, Some(e.to_string())),
            },
        };

        run.finish(state);
        match (&state, &abort_reason) {
            (GenerationState::Aborted, Some(reason)) => {
                error!(target: "cellnet-connectivity", "Generation aborted: {}", reason);
                sink.generation_aborted(reason);
            }
            (GenerationState::Interrupted, _) => {
                warn!(
                    target: "cellnet-connectivity",
                    "Generation interrupted after {} connections",
                    store.total_count()
                );
                sink.generation_interrupted();
            }
            _ => {}
        }

        let report = GenerationReport {
            state,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            outcomes,
            abort_reason,
            total_connections: store.total_count(),
        };
        sink.generation_complete(&report);
        Ok(report)
    }

    /// Returns `Ok(false)` when the run was interrupted
    fn generate_all(
        &self,
        run: &mut GenerationRun,
        store: &mut ConnectionStore,
        specs: &[ConnectivitySpec],
        sink: &mut dyn ReportSink,
        outcomes: &mut Vec<SpecOutcome>,
    ) -> ConnResult<bool> {
        for stage in STAGES {
            let stage_specs: Vec<&ConnectivitySpec> =
                specs.iter().filter(|s| s.kind() == stage).collect();
            if stage_specs.is_empty() {
                continue;
            }
            debug!(
                target: "cellnet-connectivity",
                "{:?} stage: {} specs",
                stage,
                stage_specs.len()
            );

            for spec in stage_specs {
                if run.is_cancelled() {
                    return Ok(false);
                }
                sink.spec_started(spec);
                let generator = generator_for(spec);
                let mut ctx = GenerationContext {
                    geometry: self.geometry,
                    store: &mut *store,
                    run: &mut *run,
                    sink: &mut *sink,
                };
                let mut outcome = SpecOutcome::new(&spec.name, generator.kind());
                let result = generator.generate_into(spec, &mut ctx, &mut outcome);
                if result.is_ok() {
                    sink.spec_finished(&outcome);
                }
                let interrupted = outcome.interrupted;
                // The failing spec's tally stays in the aborted report
                outcomes.push(outcome);
                result?;
                if interrupted {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
