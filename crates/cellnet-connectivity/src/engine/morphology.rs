// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ahash::AHashSet;
use tracing::{debug, trace};

use super::{
    expected_total, finish_filter, sample_props, stochastic_count, AcceptedPair,
    ConnectionGenerator, GenerationContext,
};
use crate::geometry::{CellSite, DistanceAxis};
use crate::run::SpecOutcome;
use crate::search::{select_strategy, SearchContext, SearchRequest};
use crate::spec::ConnectivitySpec;
use crate::store::ConnKind;
use crate::types::{ConnError, ConnResult};

/// Connections between terminals found by the spec's search strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct MorphologyGenerator;

impl ConnectionGenerator for MorphologyGenerator {
    fn kind(&self) -> ConnKind {
        ConnKind::MorphologyBased
    }

    fn generate_into(
        &self,
        spec: &ConnectivitySpec,
        ctx: &mut GenerationContext<'_>,
        outcome: &mut SpecOutcome,
    ) -> ConnResult<()> {
        let roles = spec.generation_roles();
        let geometry = ctx.geometry;
        let oracle = geometry.oracle;
        let start_size = geometry.populations.size(roles.start_group)?;
        let finish_size = geometry.populations.size(roles.finish_group)?;
        let synapse_types = spec.synapse_types();

        let settings = ctx.run.settings().clone();
        let strategy = select_strategy(spec.search_pattern, &settings);
        let attempts = spec
            .distance_bounds
            .number_attempts
            .unwrap_or(settings.default_number_attempts);
        let filter = finish_filter(spec);
        debug!(
            target: "cellnet-connectivity",
            "{}: {} start cells in {}, {} finish cells in {}, {} search",
            spec.name,
            start_size,
            roles.start_group,
            finish_size,
            roles.finish_group,
            strategy.name()
        );

        outcome.expected = expected_total(spec, start_size);
        // Finish cells at the degree cap never drop below it within a run
        let mut maxed_out = AHashSet::new();

        'cells: for start_cell in 0..start_size {
            let count = stochastic_count(&spec.conditions.count, ctx.run.rng());
            outcome.requested = outcome.requested.saturating_add(count);
            trace!(
                target: "cellnet-connectivity",
                "{}: start cell {} wants {} connections",
                spec.name,
                start_cell,
                count
            );

            for _ in 0..count {
                if ctx.run.is_cancelled() {
                    outcome.interrupted = true;
                    break 'cells;
                }
                let start_point = oracle
                    .terminal(
                        roles.start_group,
                        start_cell,
                        roles.start_role,
                        &synapse_types,
                        ctx.run.rng(),
                    )
                    .ok_or_else(|| ConnError::NoAttachmentPoint {
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

                let request = SearchRequest {
                    connection_name: &spec.name,
                    start_group: roles.start_group,
                    start_cell,
                    start_point,
                    start_position: geometry.absolute_position(start_site)?,
                    finish_group: roles.finish_group,
                    finish_role: roles.finish_role,
                    finish_size,
                    synapse_types: &synapse_types,
                    bounds: spec.distance_bounds,
                    attempts,
                    filter,
                };
                let found = {
                    let mut search = SearchContext {
                        geometry,
                        store: &*ctx.store,
                        rng: ctx.run.rng(),
                        maxed_out: &mut maxed_out,
                    };
                    strategy.find_finish(&request, &mut search)?
                };
                let Some(finish) = found else {
                    trace!(
                        target: "cellnet-connectivity",
                        "{}: no finish point for start cell {}",
                        spec.name,
                        start_cell
                    );
                    continue;
                };

                let finish_site = request.finish_site(finish.cell_index, finish.point);
                let radial = if spec.distance_bounds.axis == DistanceAxis::Radial {
                    finish.distance
                } else {
                    geometry.distance_between(start_site, finish_site, DistanceAxis::Radial)?
                };
                let soma = geometry.soma_distance(
                    roles.start_group,
                    start_cell,
                    roles.finish_group,
                    finish.cell_index,
                )?;
                let props = sample_props(spec, ctx.run.rng(), radial, soma)?;

                let connection = AcceptedPair {
                    start_cell,
                    start_point,
                    finish_cell: finish.cell_index,
                    finish_point: finish.point,
                }
                .into_connection(
                    self.kind(),
                    filter.start_is_source,
                    spec.propagation_delay(finish.distance),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::NumberGenerator;
    use crate::geometry::{CellTemplate, NetworkGeometry, Point3, PointCellOracle};
    use crate::population::{grid_positions, PopulationTable};
    use crate::report::NullSink;
    use crate::run::{GenerationRun, GenerationSettings};
    use crate::spec::{
        ConnectivityConditions, DistanceBounds, GenerationDirection, SearchPattern, SynapseSpec,
    };
    use crate::store::ConnectionStore;

    fn populations() -> PopulationTable {
        let mut table = PopulationTable::new();
        table.insert("a", grid_positions(Point3::ORIGIN, (5, 1, 1), 10.0));
        table.insert("b", grid_positions(Point3::new(0.0, 20.0, 0.0), (5, 1, 1), 10.0));
        table
    }

    fn generate(
        spec: &ConnectivitySpec,
        oracle: &PointCellOracle,
        table: &PopulationTable,
        store: &mut ConnectionStore,
    ) -> ConnResult<SpecOutcome> {
        let mut run = GenerationRun::new(GenerationSettings::default());
        let mut sink = NullSink;
        let mut ctx = GenerationContext {
            geometry: NetworkGeometry::new(oracle, table),
            store,
            run: &mut run,
            sink: &mut sink,
        };
        MorphologyGenerator.generate(spec, &mut ctx)
    }

    #[test]
    fn test_fixed_count_unique_targets() {
        let spec = ConnectivitySpec::morphology("ab", "a", "b")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_conditions(ConnectivityConditions {
                count: NumberGenerator::fixed(2.0),
                only_unique_finish_cells: true,
                max_incoming_per_finish_cell: 5,
                ..ConnectivityConditions::default()
            });
        let mut store = ConnectionStore::new();
        let outcome = generate(&spec, &PointCellOracle::new(), &populations(), &mut store)
            .expect("generate");

        assert_eq!(outcome.requested, 10);
        assert_eq!(outcome.achieved, 10);
        for source in 0..5 {
            let targets = store.target_cell_indices("ab", source, false);
            assert_eq!(targets.len(), 2);
            assert_ne!(targets[0], targets[1]);
        }
    }

    #[test]
    fn test_degree_cap_limits_total() {
        let spec = ConnectivitySpec::morphology("ab", "a", "b")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_conditions(ConnectivityConditions {
                count: NumberGenerator::fixed(3.0),
                max_incoming_per_finish_cell: 1,
                ..ConnectivityConditions::default()
            });
        let mut store = ConnectionStore::new();
        let outcome = generate(&spec, &PointCellOracle::new(), &populations(), &mut store)
            .expect("generate");
        assert_eq!(outcome.requested, 15);
        assert_eq!(outcome.achieved, 5);
        assert_eq!(outcome.deficit(), 10);
        for target in 0..5 {
            assert_eq!(store.incoming_count("ab", target), 1);
        }
    }

    #[test]
    fn test_reverse_direction_keeps_true_roles() {
        let spec = ConnectivitySpec::morphology("ab", "a", "b")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_search_pattern(SearchPattern::Nearest)
            .with_conditions(ConnectivityConditions {
                direction: GenerationDirection::TargetToSource,
                ..ConnectivityConditions::default()
            })
            .with_ap_speed(4.0);
        let mut store = ConnectionStore::new();
        generate(&spec, &PointCellOracle::new(), &populations(), &mut store).expect("generate");

        let conns = store.connections_for("ab");
        assert_eq!(conns.len(), 5);
        for conn in conns {
            // Each b cell sits 20 units above the a cell with the same index
            assert_eq!(conn.source.cell_index, conn.target.cell_index);
            assert_eq!(conn.ap_propagation_delay, 5.0);
        }
    }

    #[test]
    fn test_distance_bounds_hold() {
        let spec = ConnectivitySpec::morphology("ab", "a", "b")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_search_pattern(SearchPattern::RandomSubset(3))
            .with_distance_bounds(DistanceBounds::new(0.0, 25.0))
            .with_count(NumberGenerator::fixed(2.0));
        let oracle = PointCellOracle::new();
        let table = populations();
        let geometry = NetworkGeometry::new(&oracle, &table);
        let mut store = ConnectionStore::new();
        generate(&spec, &oracle, &table, &mut store).expect("generate");

        assert!(store.total_count() > 0);
        for conn in store.connections_for("ab") {
            let d = geometry
                .soma_distance("a", conn.source.cell_index, "b", conn.target.cell_index)
                .expect("distance");
            assert!(d <= 25.0);
        }
    }

    #[test]
    fn test_missing_start_terminal_aborts() {
        let oracle = PointCellOracle::new()
            .with_template("a", CellTemplate::soma_only().with_synapse_types(["GABA"]));
        let spec = ConnectivitySpec::morphology("ab", "a", "b").with_synapse(SynapseSpec::new("AMPA"));
        let mut store = ConnectionStore::new();
        let err = generate(&spec, &oracle, &populations(), &mut store).expect_err("should abort");
        assert!(matches!(err, ConnError::NoAttachmentPoint { cell_index: 0, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancelled_run_stops_at_first_attempt() {
        let spec = ConnectivitySpec::morphology("ab", "a", "b").with_synapse(SynapseSpec::new("AMPA"));
        let oracle = PointCellOracle::new();
        let table = populations();
        let mut run = GenerationRun::new(GenerationSettings::default());
        run.cancellation_token().cancel();
        let mut store = ConnectionStore::new();
        let mut sink = NullSink;
        let mut ctx = GenerationContext {
            geometry: NetworkGeometry::new(&oracle, &table),
            store: &mut store,
            run: &mut run,
            sink: &mut sink,
        };
        let outcome = MorphologyGenerator.generate(&spec, &mut ctx).expect("generate");
        assert!(outcome.interrupted);
        assert_eq!(outcome.achieved, 0);
        assert!(store.is_empty());
    }
}
