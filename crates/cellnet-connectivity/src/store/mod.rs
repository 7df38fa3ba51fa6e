// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection store - registry of generated connections keyed by connection name.

## Architecture

Connections are append-only within a generation run and cleared in bulk by
[`ConnectionStore::reset`]. Alongside the ordered connection lists the store
keeps per-cell adjacency indices (source -> targets, target -> sources) that
are updated on every append. Uniqueness and degree checks during generation
read these indices, so their cost is proportional to the connections already
made from or to one cell rather than to the whole store.
*/

mod persistence;
mod stats;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::AttachmentPoint;
use crate::types::CellIndex;

pub use stats::{ConnectionStats, DegreeStats};

/// How a stored connection was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnKind {
    MorphologyBased,
    /// Produced by the retired complex-connection path; only ever loaded from files
    Legacy,
    VolumeBased,
}

impl ConnKind {
    /// Integer code used by the text file format
    pub fn code(self) -> u8 {
        match self {
            ConnKind::MorphologyBased => 0,
            ConnKind::Legacy => 1,
            ConnKind::VolumeBased => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ConnKind::MorphologyBased),
            1 => Some(ConnKind::Legacy),
            2 => Some(ConnKind::VolumeBased),
            _ => None,
        }
    }
}

/// One end of a connection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub cell_index: CellIndex,
    pub segment_id: u32,
    pub fraction_along: f32,
}

impl Endpoint {
    pub fn new(cell_index: CellIndex, point: AttachmentPoint) -> Self {
        Self {
            cell_index,
            segment_id: point.segment_id,
            fraction_along: point.fraction_along,
        }
    }

    pub fn attachment(&self) -> AttachmentPoint {
        AttachmentPoint::new(self.segment_id, self.fraction_along)
    }
}

/// Sampled per-connection values for one synapse type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnSpecificProps {
    pub synapse_type: String,
    pub internal_delay: f32,
    pub weight: f32,
}

impl ConnSpecificProps {
    pub fn new(synapse_type: impl Into<String>) -> Self {
        Self {
            synapse_type: synapse_type.into(),
            internal_delay: 0.0,
            weight: 1.0,
        }
    }
}

/// A generated connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleConnection {
    pub kind: ConnKind,
    pub source: Endpoint,
    pub target: Endpoint,
    pub ap_propagation_delay: f32,
    /// Present only when some synapse has a non-fixed delay or weight
    pub props: Option<Vec<ConnSpecificProps>>,
}

impl SingleConnection {
    pub fn new(kind: ConnKind, source: Endpoint, target: Endpoint) -> Self {
        Self {
            kind,
            source,
            target,
            ap_propagation_delay: 0.0,
            props: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Adjacency {
    targets_by_source: AHashMap<CellIndex, Vec<CellIndex>>,
    sources_by_target: AHashMap<CellIndex, Vec<CellIndex>>,
}

impl Adjacency {
    fn record(&mut self, source: CellIndex, target: CellIndex) {
        self.targets_by_source.entry(source).or_default().push(target);
        self.sources_by_target.entry(target).or_default().push(source);
    }
}

/// Connection name -> ordered generated connections
#[derive(Debug, Clone, Default)]
pub struct ConnectionStore {
    /// Names in first-append order
    order: Vec<String>,
    connections: AHashMap<String, Vec<SingleConnection>>,
    adjacency: AHashMap<String, Adjacency>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every connection
    pub fn reset(&mut self) {
        self.order.clear();
        self.connections.clear();
        self.adjacency.clear();
    }

    pub fn append(&mut self, name: &str, connection: SingleConnection) {
        if !self.connections.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.adjacency
            .entry(name.to_string())
            .or_default()
            .record(connection.source.cell_index, connection.target.cell_index);
        self.connections
            .entry(name.to_string())
            .or_default()
            .push(connection);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.values().all(Vec::is_empty)
    }

    /// Names that have at least one connection, in first-append order
    pub fn names_with_connections(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.count_for(name) > 0)
            .map(String::as_str)
    }

    pub fn connections_for(&self, name: &str) -> &[SingleConnection] {
        self.connections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_for(&self, name: &str) -> usize {
        self.connections_for(name).len()
    }

    pub fn total_count(&self) -> usize {
        self.connections.values().map(Vec::len).sum()
    }

    pub fn count_by_kind(&self, kind: ConnKind) -> usize {
        self.connections
            .values()
            .flatten()
            .filter(|c| c.kind == kind)
            .count()
    }

    /// Targets connected from `source`, in connection order; `unique_only` drops repeats
    pub fn target_cell_indices(
        &self,
        name: &str,
        source: CellIndex,
        unique_only: bool,
    ) -> Vec<CellIndex> {
        let cells = self
            .adjacency
            .get(name)
            .and_then(|a| a.targets_by_source.get(&source))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        collect_indices(cells, unique_only)
    }

    /// Sources connected to `target`, in connection order; `unique_only` drops repeats
    pub fn source_cell_indices(
        &self,
        name: &str,
        target: CellIndex,
        unique_only: bool,
    ) -> Vec<CellIndex> {
        let cells = self
            .adjacency
            .get(name)
            .and_then(|a| a.sources_by_target.get(&target))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        collect_indices(cells, unique_only)
    }

    /// Number of connections leaving `source`
    pub fn outgoing_count(&self, name: &str, source: CellIndex) -> usize {
        self.adjacency
            .get(name)
            .and_then(|a| a.targets_by_source.get(&source))
            .map_or(0, Vec::len)
    }

    /// Number of connections arriving at `target`
    pub fn incoming_count(&self, name: &str, target: CellIndex) -> usize {
        self.adjacency
            .get(name)
            .and_then(|a| a.sources_by_target.get(&target))
            .map_or(0, Vec::len)
    }

    pub fn are_connected(&self, name: &str, source: CellIndex, target: CellIndex) -> bool {
        self.adjacency
            .get(name)
            .and_then(|a| a.targets_by_source.get(&source))
            .map_or(false, |targets| targets.contains(&target))
    }

    pub fn connections_from_source(&self, name: &str, source: CellIndex) -> Vec<&SingleConnection> {
        self.connections_for(name)
            .iter()
            .filter(|c| c.source.cell_index == source)
            .collect()
    }

    pub fn connections_to_target(&self, name: &str, target: CellIndex) -> Vec<&SingleConnection> {
        self.connections_for(name)
            .iter()
            .filter(|c| c.target.cell_index == target)
            .collect()
    }
}

fn collect_indices(cells: &[CellIndex], unique_only: bool) -> Vec<CellIndex> {
    if !unique_only {
        return cells.to_vec();
    }
    let mut unique = Vec::with_capacity(cells.len());
    for cell in cells {
        if !unique.contains(cell) {
            unique.push(*cell);
        }
    }
    unique
}
