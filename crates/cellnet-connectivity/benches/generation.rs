// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Generation Microbenchmarks
//!
//! Purpose:
//! - Compare the three search strategies on the same network
//! - Track volume-based generation and store persistence cost
//!
//! Notes:
//! - Fixed seeds and grid placement, no file I/O

use std::time::Duration;

use cellnet_connectivity::{
    grid_positions, AxonalArbour, CellSegment, CellTemplate, ConnectionStore, ConnectivitySpec,
    GenerationPipeline, GenerationRun, GenerationSettings, NetworkGeometry, NullSink,
    NumberGenerator, Point3, PointCellOracle, PopulationTable, Region, SearchPattern, SynapseSpec,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn build_network(side: usize) -> (PointCellOracle, PopulationTable) {
    let template = CellTemplate::soma_only()
        .with_segment(CellSegment::axon(1, Point3::ORIGIN, Point3::new(0.0, 0.0, 40.0)))
        .with_segment(CellSegment::dendrite(2, Point3::ORIGIN, Point3::new(0.0, 0.0, -40.0)))
        .with_arbour(AxonalArbour::new(
            "local",
            Region::Spherical {
                centre: Point3::ORIGIN,
                radius: 60.0,
            },
        ));
    let oracle = PointCellOracle::new().with_default_template(template);
    let mut table = PopulationTable::new();
    table.insert("pre", grid_positions(Point3::ORIGIN, (side, side, 1), 10.0));
    table.insert(
        "post",
        grid_positions(Point3::new(0.0, 0.0, 50.0), (side, side, 1), 10.0),
    );
    (oracle, table)
}

fn generate(
    oracle: &PointCellOracle,
    table: &PopulationTable,
    spec: &ConnectivitySpec,
) -> ConnectionStore {
    let pipeline = GenerationPipeline::new(NetworkGeometry::new(oracle, table));
    let mut run = GenerationRun::new(GenerationSettings {
        seed: 1,
        ..GenerationSettings::default()
    });
    let mut store = ConnectionStore::new();
    let _ = pipeline.run(&mut run, &mut store, std::slice::from_ref(spec), &mut NullSink);
    store
}

fn bench_search_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_strategies");
    group.sample_size(20);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    for side in [10usize, 20] {
        let (oracle, table) = build_network(side);
        let cells = side * side;
        group.throughput(Throughput::Elements((cells * 4) as u64));

        for (label, pattern) in [
            ("random_all", SearchPattern::RandomAll),
            ("random_subset_5", SearchPattern::RandomSubset(5)),
            ("nearest", SearchPattern::Nearest),
        ] {
            let spec = ConnectivitySpec::morphology("pre_post", "pre", "post")
                .with_synapse(SynapseSpec::new("AMPA"))
                .with_search_pattern(pattern)
                .with_count(NumberGenerator::fixed(4.0));
            group.bench_with_input(BenchmarkId::new(label, cells), &spec, |b, spec| {
                b.iter(|| generate(black_box(&oracle), black_box(&table), spec))
            });
        }
    }
    group.finish();
}

fn bench_volume(c: &mut Criterion) {
    let mut group = c.benchmark_group("volume");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(2));

    let (oracle, table) = build_network(15);
    for expression in ["1", "exp(-r / 40)"] {
        let spec = ConnectivitySpec::volume("pre_post", "pre", "post")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_probability(expression)
            .with_count(NumberGenerator::fixed(3.0));
        group.bench_with_input(BenchmarkId::new("probability", expression), &spec, |b, spec| {
            b.iter(|| generate(black_box(&oracle), black_box(&table), spec))
        });
    }
    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    let (oracle, table) = build_network(20);
    let spec = ConnectivitySpec::morphology("pre_post", "pre", "post")
        .with_synapse(SynapseSpec::new("AMPA").with_delay(NumberGenerator::uniform(0.5, 1.5)))
        .with_count(NumberGenerator::fixed(5.0));
    let store = generate(&oracle, &table, &spec);
    let mut text = Vec::new();
    let _ = store.write_to(&mut text);
    group.throughput(Throughput::Elements(store.total_count() as u64));

    group.bench_function("write", |b| {
        b.iter(|| {
            let mut buffer = Vec::with_capacity(text.len());
            let _ = black_box(&store).write_to(&mut buffer);
            buffer
        })
    });
    group.bench_function("read", |b| {
        b.iter(|| ConnectionStore::read_from(black_box(text.as_slice())))
    });
    group.finish();
}

criterion_group!(benches, bench_search_strategies, bench_volume, bench_persistence);
criterion_main!(benches);
