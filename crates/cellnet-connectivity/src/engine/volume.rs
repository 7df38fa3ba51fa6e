// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace, warn};

use super::{
    expected_total, finish_filter, sample_props, stochastic_count, AcceptedPair,
    ConnectionGenerator, GenerationContext,
};
use crate::expression::{Expression, Variables};
use crate::geometry::{CellSite, Region, SynapticRole};
use crate::run::SpecOutcome;
use crate::search::{SearchContext, SearchRequest};
use crate::spec::{ConnectivitySpec, DistanceBounds};
use crate::store::ConnKind;
use crate::types::{ConnError, ConnResult};

/// Connections whose finish points fall inside the start cell's axonal arbours.
///
/// A presynaptic start point is on the soma; a postsynaptic one (target to
/// source generation) may be any postsynaptic terminal. A candidate finish
/// point inside one of the selected arbour regions is kept with the
/// probability given by the spec's expression of the displacement between
/// the two cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeGenerator;

impl ConnectionGenerator for VolumeGenerator {
    fn kind(&self) -> ConnKind {
        ConnKind::VolumeBased
    }

    fn generate_into(
        &self,
        spec: &ConnectivitySpec,
        ctx: &mut GenerationContext<'_>,
        outcome: &mut SpecOutcome,
    ) -> ConnResult<()> {
        let volume = spec.volume.as_ref().ok_or_else(|| {
            ConnError::InvalidSpec(format!("{} is not a volume-based connection", spec.name))
        })?;
        let probability = Expression::parse(&volume.probability)?;

        let roles = spec.generation_roles();
        let geometry = ctx.geometry;
        let oracle = geometry.oracle;
        let start_size = geometry.populations.size(roles.start_group)?;
        let finish_size = geometry.populations.size(roles.finish_group)?;
        let synapse_types = spec.synapse_types();
        let attempts = ctx.run.settings().volume_attempts;
        let filter = finish_filter(spec);

        let arbours: Vec<&Region> = oracle
            .arbours(roles.start_group)
            .iter()
            .filter(|a| volume.source_regions.is_empty() || volume.source_regions.contains(&a.name))
            .map(|a| &a.region)
            .collect();
        if arbours.is_empty() {
            warn!(
                target: "cellnet-connectivity",
                "{}: cell type of {} has no axonal arbours, nothing can connect",
                spec.name,
                roles.start_group
            );
        }
        debug!(
            target: "cellnet-connectivity",
            "{}: {} start cells, {} arbour regions, p = {}",
            spec.name,
            start_size,
            arbours.len(),
            probability
        );

        outcome.expected = expected_total(spec, start_size);

        'cells: for start_cell in 0..start_size {
            let count = stochastic_count(&spec.conditions.count, ctx.run.rng());
            outcome.requested = outcome.requested.saturating_add(count);
            let start_cell_position = geometry.populations.position(roles.start_group, start_cell)?;
            let mut maxed_out = AHashSet::new();

            for _ in 0..count {
                if ctx.run.is_cancelled() {
                    outcome.interrupted = true;
                    break 'cells;
                }
                let start_point = match roles.start_role {
                    SynapticRole::Pre => oracle.soma_terminal(
                        roles.start_group,
                        start_cell,
                        roles.start_role,
                        &synapse_types,
                    ),
                    SynapticRole::Post => oracle.terminal(
                        roles.start_group,
                        start_cell,
                        roles.start_role,
                        &synapse_types,
                        ctx.run.rng(),
                    ),
                };
                let start_point = start_point.ok_or_else(|| ConnError::NoAttachmentPoint {
                    cell_group: roles.start_group.to_string(),
                    cell_index: start_cell,
                    role: roles.start_role,
                    synapse_types: synapse_types.clone(),
                })?;
                let start_site = CellSite {
                    group: roles.start_group,
                    cell: start_cell,
                    point: start_point,
                };
                let start_position = geometry.absolute_position(start_site)?;
                let regions: Vec<Region> = arbours
                    .iter()
                    .map(|region| region.translated(start_position))
                    .collect();

                let request = SearchRequest {
                    connection_name: &spec.name,
                    start_group: roles.start_group,
                    start_cell,
                    start_point,
                    start_position,
                    finish_group: roles.finish_group,
                    finish_role: roles.finish_role,
                    finish_size,
                    synapse_types: &synapse_types,
                    bounds: DistanceBounds::default(),
                    attempts,
                    filter,
                };

                let mut accepted = None;
                let mut failures = 0;
                while failures < attempts {
                    let finish_cell = {
                        let mut search = SearchContext {
                            geometry,
                            store: &*ctx.store,
                            rng: ctx.run.rng(),
                            maxed_out: &mut maxed_out,
                        };
                        search.draw_eligible_finish(&request)
                    };
                    let Some(finish_cell) = finish_cell else {
                        break;
                    };
                    let finish_point = oracle
                        .terminal(
                            roles.finish_group,
                            finish_cell,
                            roles.finish_role,
                            &synapse_types,
                            ctx.run.rng(),
                        )
                        .ok_or_else(|| request.no_attachment_point(finish_cell))?;
                    let finish_position =
                        geometry.absolute_position(request.finish_site(finish_cell, finish_point))?;

                    let inside = regions
                        .iter()
                        .any(|region| oracle.point_in_region(region, finish_position));
                    if inside {
                        let displacement = geometry
                            .populations
                            .position(roles.finish_group, finish_cell)?
                            - start_cell_position;
                        let variables = Variables::displacement(displacement);
                        if accept_with_probability(&probability, &variables, ctx.run.rng()) {
                            accepted = Some((
                                finish_cell,
                                finish_point,
                                start_position.distance_to(finish_position),
                            ));
                            break;
                        }
                    }
                    trace!(
                        target: "cellnet-connectivity",
                        "{}: rejected finish cell {} (inside arbour: {})",
                        spec.name,
                        finish_cell,
                        inside
                    );
                    failures += 1;
                }

                let Some((finish_cell, finish_point, distance)) = accepted else {
                    continue;
                };
                let soma = geometry.soma_distance(
                    roles.start_group,
                    start_cell,
                    roles.finish_group,
                    finish_cell,
                )?;
                let props = sample_props(spec, ctx.run.rng(), distance, soma)?;
                let connection = AcceptedPair {
                    start_cell,
                    start_point,
                    finish_cell,
                    finish_point,
                }
                .into_connection(
                    self.kind(),
                    filter.start_is_source,
                    spec.propagation_delay(distance),
                    props,
                );
                ctx.store.append(&spec.name, connection);
                outcome.achieved += 1;
            }
            ctx.sink.progress(&spec.name, start_cell + 1, start_size);
        }

        Ok(())
    }
}

/// Probability at or below 0 rejects, at or above 1 accepts, anything between
/// is compared against a uniform draw. Infinities fall on those sides; NaN rejects.
fn accept_with_probability(
    probability: &Expression,
    variables: &Variables,
    rng: &mut StdRng,
) -> bool {
    if probability.is_constant_one() {
        return true;
    }
    let p = probability.evaluate_unchecked(variables, &mut *rng);
    if p.is_nan() {
        trace!(
            target: "cellnet-connectivity",
            "Probability {} is NaN at {}, rejecting",
            probability,
            variables
        );
        false
    } else if p <= 0.0 {
        false
    } else if p >= 1.0 {
        true
    } else {
        rng.gen::<f64>() <= p
    }
}
