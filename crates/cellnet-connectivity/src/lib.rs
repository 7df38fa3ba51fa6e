// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Cellnet Connectivity

Generates synaptic connections between positioned cell populations and keeps
them in a queryable, persistable connection store.

- Morphology-based connectivity: per start cell, a stochastic number of
  connections whose finish points are found by random, random-subset or
  nearest-cell search, subject to distance, degree, uniqueness and autapse
  constraints
- Volume-based connectivity: finish points must lie inside the start cell's
  axonal arbour regions and pass a distance-dependent probability expression
- Per-connection delay and weight sampling, including weight as a function
  of connection length
- Connection store with adjacency queries, degree statistics and a
  line-oriented save/load format

## Architecture

```text
ConnectivitySpec[] ──► GenerationPipeline ──► MorphologyGenerator ─┐
                              │               VolumeGenerator ─────┤
                              │                     │ SearchStrategy
                              ▼                     ▼              ▼
                        GenerationRun        NetworkGeometry   ConnectionStore
                     (seed, cancel, state)  (oracle + populations)
```

Cell morphology is reached only through the [`GeometryOracle`] trait.
[`PointCellOracle`] is a small segment-based implementation suitable for
tests and simple networks.

## Example

```rust
use cellnet_connectivity::{
    grid_positions, ConnectionStore, ConnectivitySpec, GenerationPipeline, GenerationRun,
    GenerationSettings, NetworkGeometry, NullSink, NumberGenerator, Point3, PointCellOracle,
    PopulationTable, SynapseSpec,
};

let mut populations = PopulationTable::new();
populations.insert("pre", grid_positions(Point3::ORIGIN, (5, 5, 1), 10.0));
populations.insert("post", grid_positions(Point3::new(0.0, 0.0, 30.0), (5, 5, 1), 10.0));
let oracle = PointCellOracle::new();

let spec = ConnectivitySpec::morphology("pre_post", "pre", "post")
    .with_synapse(SynapseSpec::new("AMPA"))
    .with_count(NumberGenerator::fixed(2.0));

let pipeline = GenerationPipeline::new(NetworkGeometry::new(&oracle, &populations));
let mut run = GenerationRun::new(GenerationSettings { seed: 1, ..Default::default() });
let mut store = ConnectionStore::new();
let report = pipeline.run(&mut run, &mut store, &[spec], &mut NullSink).unwrap();
assert_eq!(report.total_connections, 50);
```

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod engine;
pub mod expression;
pub mod generators;
pub mod geometry;
pub mod pipeline;
pub mod population;
pub mod report;
pub mod run;
pub mod search;
pub mod spec;
pub mod store;
pub mod types;

// Core types
pub use types::{CellIndex, ConnError, ConnResult};

// Geometry
pub use geometry::{
    AttachmentPoint, AxonalArbour, BoundingSphere, CellSegment, CellSite, CellTemplate,
    DistanceAxis, GeometryOracle, NetworkGeometry, Point3, PointCellOracle, Region, SynapticRole,
};
pub use population::{grid_positions, PopulationTable};

// Spec model
pub use expression::{Expression, ExpressionError, Variables};
pub use generators::{Distribution, NumberGenerator, WeightGenerator};
pub use spec::{
    ConnectivityConditions, ConnectivitySpec, DistanceBounds, GenerationDirection, SearchPattern,
    SynapseSpec, VolumeSettings,
};

// Store
pub use store::{
    ConnKind, ConnSpecificProps, ConnectionStats, ConnectionStore, DegreeStats, Endpoint,
    SingleConnection,
};

// Generation
pub use engine::{ConnectionGenerator, MorphologyGenerator, VolumeGenerator};
pub use pipeline::GenerationPipeline;
pub use report::{LoggingSink, NullSink, ReportSink};
pub use run::{
    CancellationToken, GenerationReport, GenerationRun, GenerationSettings, GenerationState,
    SpecOutcome,
};
pub use search::SearchStrategy;
