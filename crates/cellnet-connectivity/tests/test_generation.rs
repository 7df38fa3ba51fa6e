// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Generation Integration Tests

Runs whole spec sets through the pipeline, covering:
- Fixed-count random connectivity with uniqueness and degree caps
- Exact-distance bounds on a regular grid
- Volume-based connectivity at probability 0 and 1
- Cancellation part way through a run
- Save, reset and reload of a store holding every connection kind
*/

use cellnet_connectivity::{
    grid_positions, AttachmentPoint, AxonalArbour, CancellationToken, CellSegment, CellTemplate,
    ConnKind, ConnSpecificProps, ConnectionStore, ConnectivityConditions, ConnectivitySpec,
    DistanceBounds, Endpoint, GenerationPipeline, GenerationReport, GenerationRun,
    GenerationSettings, GenerationState, NetworkGeometry, NullSink, NumberGenerator, Point3,
    PointCellOracle, PopulationTable, Region, ReportSink, SearchPattern, SingleConnection,
    SynapseSpec, WeightGenerator,
};

fn line_populations(n: usize) -> PopulationTable {
    let mut table = PopulationTable::new();
    table.insert("A", grid_positions(Point3::ORIGIN, (n, 1, 1), 10.0));
    table.insert("B", grid_positions(Point3::ORIGIN, (n, 1, 1), 10.0));
    table
}

fn run_specs(
    oracle: &PointCellOracle,
    table: &PopulationTable,
    specs: &[ConnectivitySpec],
    seed: u64,
) -> (GenerationReport, ConnectionStore) {
    let pipeline = GenerationPipeline::new(NetworkGeometry::new(oracle, table));
    let mut run = GenerationRun::new(GenerationSettings {
        seed,
        ..GenerationSettings::default()
    });
    let mut store = ConnectionStore::new();
    let report = pipeline
        .run(&mut run, &mut store, specs, &mut NullSink)
        .expect("Run context should be fresh");
    (report, store)
}

#[test]
fn test_fixed_two_unique_targets_per_cell() {
    let spec = ConnectivitySpec::morphology("A_B", "A", "B")
        .with_synapse(SynapseSpec::new("AMPA"))
        .with_search_pattern(SearchPattern::RandomAll)
        .with_distance_bounds(DistanceBounds::new(0.0, 1e9))
        .with_conditions(ConnectivityConditions {
            count: NumberGenerator::fixed(2.0),
            only_unique_finish_cells: true,
            max_incoming_per_finish_cell: 5,
            ..ConnectivityConditions::default()
        });
    let (report, store) = run_specs(&PointCellOracle::new(), &line_populations(5), &[spec], 11);

    assert_eq!(report.state, GenerationState::Completed);
    assert_eq!(store.count_for("A_B"), 10);
    for source in 0..5 {
        let all = store.target_cell_indices("A_B", source, false);
        let unique = store.target_cell_indices("A_B", source, true);
        assert_eq!(all.len(), 2, "cell {} should be a source twice", source);
        assert_eq!(unique.len(), 2, "cell {} repeated a target", source);
    }
    let outcome = report.outcome("A_B").expect("outcome for A_B");
    assert_eq!(outcome.requested, 10);
    assert_eq!(outcome.deficit(), 0);
}

#[test]
fn test_equal_bounds_accept_only_exact_distance() {
    let spec = ConnectivitySpec::morphology("A_B", "A", "B")
        .with_synapse(SynapseSpec::new("AMPA"))
        .with_distance_bounds(DistanceBounds::new(10.0, 10.0).with_attempts(200))
        .with_count(NumberGenerator::fixed(1.0));
    let (report, store) = run_specs(&PointCellOracle::new(), &line_populations(6), &[spec], 3);

    assert_eq!(report.state, GenerationState::Completed);
    assert_eq!(store.count_for("A_B"), 6);
    for conn in store.connections_for("A_B") {
        let gap = conn.source.cell_index.abs_diff(conn.target.cell_index);
        assert_eq!(gap, 1, "only neighbours are exactly 10 apart");
    }
}

#[test]
fn test_bounds_nothing_can_meet_leave_deficit() {
    let spec = ConnectivitySpec::morphology("A_B", "A", "B")
        .with_synapse(SynapseSpec::new("AMPA"))
        .with_distance_bounds(DistanceBounds::new(1000.0, 2000.0).with_attempts(5))
        .with_count(NumberGenerator::fixed(2.0));
    let (report, store) = run_specs(&PointCellOracle::new(), &line_populations(4), &[spec], 5);

    assert_eq!(report.state, GenerationState::Completed);
    assert!(store.is_empty());
    let outcome = report.outcome("A_B").expect("outcome for A_B");
    assert_eq!(outcome.requested, 8);
    assert_eq!(outcome.deficit(), 8);
}

#[test]
fn test_same_seed_reproduces_connections() {
    let spec = ConnectivitySpec::morphology("A_B", "A", "B")
        .with_synapse(
            SynapseSpec::new("AMPA")
                .with_delay(NumberGenerator::uniform(0.5, 2.0))
                .with_weight(NumberGenerator::gaussian(1.0, 0.2, 0.0, 2.0)),
        )
        .with_search_pattern(SearchPattern::RandomSubset(3))
        .with_count(NumberGenerator::uniform(0.0, 4.0));
    let oracle = PointCellOracle::new();
    let table = line_populations(8);
    let (_, first) = run_specs(&oracle, &table, &[spec.clone()], 99);
    let (_, second) = run_specs(&oracle, &table, &[spec], 99);
    assert_eq!(first.connections_for("A_B"), second.connections_for("A_B"));
}

#[test]
fn test_volume_probability_zero_and_one() {
    let mut table = PopulationTable::new();
    table.insert("pre", grid_positions(Point3::ORIGIN, (20, 20, 1), 5.0));
    table.insert("post", grid_positions(Point3::new(0.0, 0.0, 15.0), (10, 10, 1), 10.0));
    let oracle = PointCellOracle::new().with_template(
        "pre",
        CellTemplate::soma_only().with_arbour(AxonalArbour::new(
            "everywhere",
            Region::Rectangular {
                corner: Point3::new(-1e4, -1e4, -1e4),
                size: Point3::new(2e4, 2e4, 2e4),
            },
        )),
    );
    let volume = |name: &str, p: &str| {
        ConnectivitySpec::volume(name, "pre", "post")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_count(NumberGenerator::fixed(1.5))
            .with_probability(p)
    };

    let (report, store) = run_specs(
        &oracle,
        &table,
        &[volume("never", "0"), volume("always", "1")],
        21,
    );
    assert_eq!(report.state, GenerationState::Completed);
    assert_eq!(store.count_for("never"), 0);

    // 400 start cells at 1.5 each
    let made = store.count_for("always") as i64;
    assert!((made - 600).abs() < 60, "made {}", made);
    assert_eq!(store.count_by_kind(ConnKind::VolumeBased), made as usize);
}

/// Cancels the run once the first start cell is done
struct CancelAfterFirstCell {
    token: CancellationToken,
}

impl ReportSink for CancelAfterFirstCell {
    fn progress(&mut self, _spec: &str, done: usize, _total: usize) {
        if done == 1 {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancel_keeps_completed_connections() {
    let table = line_populations(5);
    let oracle = PointCellOracle::new();
    let specs = [
        ConnectivitySpec::morphology("first", "A", "B")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_count(NumberGenerator::fixed(2.0)),
        ConnectivitySpec::morphology("second", "A", "B")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_count(NumberGenerator::fixed(2.0)),
    ];
    let token = CancellationToken::new();
    let mut run =
        GenerationRun::new(GenerationSettings::default()).with_cancellation(token.clone());
    let mut sink = CancelAfterFirstCell { token };
    let mut store = ConnectionStore::new();
    let report = GenerationPipeline::new(NetworkGeometry::new(&oracle, &table))
        .run(&mut run, &mut store, &specs, &mut sink)
        .expect("run");

    assert_eq!(report.state, GenerationState::Interrupted);
    assert_eq!(run.state(), GenerationState::Interrupted);
    assert_eq!(store.count_for("first"), 2);
    assert_eq!(store.count_for("second"), 0);
    assert!(report.outcome("first").is_some_and(|o| o.interrupted));
    assert!(report.outcome("second").is_none());
}

#[test]
fn test_save_reset_load_restores_every_kind() {
    let mut table = PopulationTable::new();
    table.insert("pre", grid_positions(Point3::ORIGIN, (4, 4, 1), 10.0));
    table.insert("post", grid_positions(Point3::new(0.0, 0.0, 20.0), (4, 4, 1), 10.0));
    let template = CellTemplate::soma_only()
        .with_segment(CellSegment::axon(1, Point3::ORIGIN, Point3::new(0.0, 0.0, 15.0)))
        .with_segment(CellSegment::dendrite(2, Point3::ORIGIN, Point3::new(0.0, 0.0, -15.0)))
        .with_arbour(AxonalArbour::new(
            "column",
            Region::Spherical {
                centre: Point3::ORIGIN,
                radius: 40.0,
            },
        ));
    let oracle = PointCellOracle::new().with_default_template(template);
    let specs = [
        ConnectivitySpec::morphology("morph", "pre", "post")
            .with_synapse(
                SynapseSpec::new("AMPA")
                    .with_weight(WeightGenerator::function("r / 10", false).expect("weight")),
            )
            .with_synapse(SynapseSpec::new("NMDA"))
            .with_ap_speed(2.0)
            .with_count(NumberGenerator::fixed(2.0)),
        ConnectivitySpec::volume("vol", "pre", "post")
            .with_synapse(SynapseSpec::new("GABA").with_delay(NumberGenerator::uniform(1.0, 3.0)))
            .with_probability("exp(-r / 50)")
            .with_count(NumberGenerator::fixed(1.0)),
    ];
    let (_, mut store) = run_specs(&oracle, &table, &specs, 8);
    store.append(
        "legacy",
        SingleConnection {
            kind: ConnKind::Legacy,
            source: Endpoint::new(3, AttachmentPoint::new(1, 0.25)),
            target: Endpoint::new(7, AttachmentPoint::new(2, 0.75)),
            ap_propagation_delay: 0.0,
            props: Some(vec![ConnSpecificProps {
                synapse_type: "AMPA".to_string(),
                internal_delay: 0.5,
                weight: -1.25,
            }]),
        },
    );
    assert!(store.count_for("morph") > 0);
    assert!(store.count_for("vol") > 0);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("network.conns");
    store.save_to_path(&path).expect("save");

    let mut reloaded = store.clone();
    reloaded.reset();
    reloaded.reset();
    assert!(reloaded.is_empty());
    reloaded.load_from_path(&path).expect("load");

    for name in ["morph", "vol", "legacy"] {
        let mut original: Vec<String> = store
            .connections_for(name)
            .iter()
            .map(|c| format!("{:?}", c))
            .collect();
        let mut restored: Vec<String> = reloaded
            .connections_for(name)
            .iter()
            .map(|c| format!("{:?}", c))
            .collect();
        original.sort();
        restored.sort();
        assert_eq!(original, restored, "connections of {} differ", name);
    }
    assert_eq!(reloaded.total_count(), store.total_count());
}
