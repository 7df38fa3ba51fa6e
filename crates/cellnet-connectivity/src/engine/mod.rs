// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection generators.

Both generators walk the start population in index order, draw a connection
count per start cell and try to make that many connections, appending each
accepted one to the store immediately. Degree and uniqueness checks read the
store, so iteration is strictly sequential.

- [`MorphologyGenerator`] finds finish points with the spec's search strategy
- [`VolumeGenerator`] accepts finish points inside the start cell's axonal
  arbour regions, weighted by a probability expression
*/

mod morphology;
mod volume;

use rand::rngs::StdRng;
use rand::Rng;

use crate::generators::NumberGenerator;
use crate::geometry::{AttachmentPoint, NetworkGeometry};
use crate::report::ReportSink;
use crate::run::{GenerationRun, SpecOutcome};
use crate::search::FinishFilter;
use crate::spec::{ConnectivitySpec, GenerationDirection};
use crate::store::{ConnKind, ConnSpecificProps, ConnectionStore, Endpoint, SingleConnection};
use crate::types::{CellIndex, ConnResult};

pub use morphology::MorphologyGenerator;
pub use volume::VolumeGenerator;

/// Everything a generator reads or writes while processing one spec
pub struct GenerationContext<'a> {
    pub geometry: NetworkGeometry<'a>,
    pub store: &'a mut ConnectionStore,
    pub run: &'a mut GenerationRun,
    pub sink: &'a mut dyn ReportSink,
}

pub trait ConnectionGenerator {
    fn kind(&self) -> ConnKind;

    /// Generate every connection of `spec` into the store, tallying into `outcome`.
    ///
    /// An `Err` is fatal to the whole run, but `outcome` still counts what was
    /// made before it. Exhausted searches are not errors; they only show up as
    /// a deficit in the outcome.
    fn generate_into(
        &self,
        spec: &ConnectivitySpec,
        ctx: &mut GenerationContext<'_>,
        outcome: &mut SpecOutcome,
    ) -> ConnResult<()>;

    fn generate(
        &self,
        spec: &ConnectivitySpec,
        ctx: &mut GenerationContext<'_>,
    ) -> ConnResult<SpecOutcome> {
        let mut outcome = SpecOutcome::new(&spec.name, self.kind());
        self.generate_into(spec, ctx, &mut outcome)?;
        Ok(outcome)
    }
}

pub fn generator_for(spec: &ConnectivitySpec) -> Box<dyn ConnectionGenerator> {
    match spec.kind() {
        ConnKind::VolumeBased => Box::new(VolumeGenerator),
        _ => Box::new(MorphologyGenerator),
    }
}

/// Draw a connection count, promoting the fractional part to one more
/// connection with probability equal to that fraction. Saturates at `usize::MAX`.
pub(crate) fn stochastic_count<R: Rng + ?Sized>(count: &NumberGenerator, rng: &mut R) -> usize {
    let value = count.next_number(rng);
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let whole = value.floor();
    let fraction = value - whole;
    let mut connections = whole as usize;
    if fraction > 0.0 && rng.gen::<f32>() < fraction {
        connections = connections.saturating_add(1);
    }
    connections
}

pub(crate) fn expected_total(spec: &ConnectivitySpec, start_cells: usize) -> f32 {
    spec.conditions.count.expected().max(0.0) * start_cells as f32
}

pub(crate) fn finish_filter(spec: &ConnectivitySpec) -> FinishFilter {
    let conditions = &spec.conditions;
    FinishFilter {
        only_unique: conditions.only_unique_finish_cells,
        max_incoming: conditions.max_incoming_per_finish_cell,
        forbid_autapses: spec.forbids_autapses(),
        no_recurrent: conditions.no_recurrent,
        start_is_source: conditions.direction == GenerationDirection::SourceToTarget,
    }
}

/// Per-connection delay and weight for every synapse whose generators are not fixed.
///
/// `radial` is the distance between the two attachment points and `soma` the
/// distance between the two somas; weight functions use one or the other.
pub(crate) fn sample_props(
    spec: &ConnectivitySpec,
    rng: &mut StdRng,
    radial: f32,
    soma: f32,
) -> ConnResult<Option<Vec<ConnSpecificProps>>> {
    let mut props = Vec::new();
    for synapse in spec.synapses.iter().filter(|s| s.needs_per_connection_props()) {
        let internal_delay = synapse.delay.next_number(rng);
        let weight = synapse.weight.next_weight(rng, radial, soma)?;
        props.push(ConnSpecificProps {
            synapse_type: synapse.synapse_type.clone(),
            internal_delay,
            weight,
        });
    }
    Ok(if props.is_empty() { None } else { Some(props) })
}

/// Start and finish sides of an accepted connection
pub(crate) struct AcceptedPair {
    pub start_cell: CellIndex,
    pub start_point: AttachmentPoint,
    pub finish_cell: CellIndex,
    pub finish_point: AttachmentPoint,
}

impl AcceptedPair {
    /// Connection with the start/finish relabelling undone
    pub fn into_connection(
        self,
        kind: ConnKind,
        start_is_source: bool,
        ap_propagation_delay: f32,
        props: Option<Vec<ConnSpecificProps>>,
    ) -> SingleConnection {
        let start = Endpoint::new(self.start_cell, self.start_point);
        let finish = Endpoint::new(self.finish_cell, self.finish_point);
        let (source, target) = if start_is_source {
            (start, finish)
        } else {
            (finish, start)
        };
        SingleConnection {
            kind,
            source,
            target,
            ap_propagation_delay,
            props,
        }
    }
}
