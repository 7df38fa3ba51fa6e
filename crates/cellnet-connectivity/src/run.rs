// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Generation run context.

A [`GenerationRun`] owns everything that would otherwise be ambient during
generation: the seeded random source, the cancellation token and the run
state. Every stochastic draw of a run comes from its own RNG, so a fixed
seed reproduces the same connections for the same specs and populations.
*/

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::store::ConnKind;
use crate::types::{ConnError, ConnResult};

/// Tunables applied to every spec of a run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub seed: u64,
    /// Distance failures tolerated per connection when a spec sets none
    pub default_number_attempts: u32,
    /// Candidate points tried per connection by volume-based generation
    pub volume_attempts: u32,
    /// Skip finish cells by their enclosing sphere in nearest-cell search
    pub nearest_bounding_sphere: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            default_number_attempts: 100,
            volume_attempts: 300,
            nearest_bounding_sphere: true,
        }
    }
}

/// Cooperative stop request shared between a run and whoever may stop it
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationState {
    /// Created, not started
    Idle,
    Running,
    /// Every spec processed
    Completed,
    /// Stopped on request; connections made so far are kept
    Interrupted,
    /// Stopped by a configuration or expression error
    Aborted,
}

impl GenerationState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            GenerationState::Completed | GenerationState::Interrupted | GenerationState::Aborted
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GenerationState::Idle => "idle",
            GenerationState::Running => "running",
            GenerationState::Completed => "completed",
            GenerationState::Interrupted => "interrupted",
            GenerationState::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

/// Random source seeded for a reproducible run
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Single-use context for one generation run
pub struct GenerationRun {
    rng: StdRng,
    cancel: CancellationToken,
    state: GenerationState,
    settings: GenerationSettings,
}

impl GenerationRun {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            rng: seeded_rng(settings.seed),
            cancel: CancellationToken::new(),
            state: GenerationState::Idle,
            settings,
        }
    }

    /// Use an externally held token so another thread can stop the run
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Idle -> Running; a run context can only be started once
    pub(crate) fn begin(&mut self) -> ConnResult<()> {
        if self.state != GenerationState::Idle {
            return Err(ConnError::InvalidState(format!(
                "generation run already {}",
                self.state
            )));
        }
        self.state = GenerationState::Running;
        Ok(())
    }

    pub(crate) fn finish(&mut self, state: GenerationState) {
        self.state = state;
    }
}

/// Requested versus achieved connections for one spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecOutcome {
    pub name: String,
    pub kind: ConnKind,
    /// Expected count: mean connections per start cell times start cells
    pub expected: f32,
    /// Sum of the counts drawn for each start cell
    pub requested: usize,
    pub achieved: usize,
    pub interrupted: bool,
}

impl SpecOutcome {
    /// Empty tally for a spec about to be generated
    pub fn new(name: &str, kind: ConnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            expected: 0.0,
            requested: 0,
            achieved: 0,
            interrupted: false,
        }
    }

    pub fn deficit(&self) -> usize {
        self.requested.saturating_sub(self.achieved)
    }
}

impl fmt::Display for SpecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} of {} requested (expected {:.1})",
            self.name, self.achieved, self.requested, self.expected
        )?;
        if self.interrupted {
            write!(f, " [interrupted]")?;
        }
        Ok(())
    }
}

/// Result of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub state: GenerationState,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcomes: Vec<SpecOutcome>,
    pub abort_reason: Option<String>,
    pub total_connections: usize,
}

impl GenerationReport {
    pub fn outcome(&self, name: &str) -> Option<&SpecOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Generation {} at {} after {} ms: {} connections",
            self.state,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.duration_ms,
            self.total_connections
        )?;
        for outcome in &self.outcomes {
            writeln!(f, "  {}", outcome)?;
        }
        if let Some(reason) = &self.abort_reason {
            writeln!(f, "  aborted: {}", reason)?;
        }
        Ok(())
    }
}
