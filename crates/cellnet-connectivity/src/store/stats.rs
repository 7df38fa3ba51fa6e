// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Degree statistics and adjacency matrices over stored connections.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::ConnectionStore;

/// Summary of a per-cell degree distribution
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DegreeStats {
    pub mean: f32,
    pub std_dev: f32,
    pub min: usize,
    pub max: usize,
}

impl DegreeStats {
    /// Population statistics; an empty slice gives all zeros
    pub fn from_counts(counts: &[usize]) -> Self {
        if counts.is_empty() {
            return Self::default();
        }
        let n = counts.len() as f64;
        let mean = counts.iter().sum::<usize>() as f64 / n;
        let variance = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self {
            mean: mean as f32,
            std_dev: variance.sqrt() as f32,
            min: counts.iter().copied().min().unwrap_or(0),
            max: counts.iter().copied().max().unwrap_or(0),
        }
    }
}

/// Statistics for one named connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub name: String,
    pub connections: usize,
    /// Connections leaving each source cell
    pub out_degree: DegreeStats,
    /// Connections arriving at each target cell
    pub in_degree: DegreeStats,
    pub zero_weight_props: usize,
    pub negative_weight_props: usize,
}

impl fmt::Display for ConnectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} connections", self.name, self.connections)?;
        writeln!(
            f,
            "  out-degree: avg {:.3} std {:.3} min {} max {}",
            self.out_degree.mean, self.out_degree.std_dev, self.out_degree.min, self.out_degree.max
        )?;
        writeln!(
            f,
            "  in-degree:  avg {:.3} std {:.3} min {} max {}",
            self.in_degree.mean, self.in_degree.std_dev, self.in_degree.min, self.in_degree.max
        )?;
        if self.zero_weight_props > 0 || self.negative_weight_props > 0 {
            writeln!(
                f,
                "  weights: {} zero, {} negative",
                self.zero_weight_props, self.negative_weight_props
            )?;
        }
        Ok(())
    }
}

impl ConnectionStore {
    /// `matrix[[source, target]]` counts the connections between the pair.
    /// Connections referring to cells outside the given sizes are left out.
    pub fn connection_matrix(&self, name: &str, n_source: usize, n_target: usize) -> Array2<u32> {
        let mut matrix = Array2::<u32>::zeros((n_source, n_target));
        for conn in self.connections_for(name) {
            if let Some(cell) = matrix.get_mut((conn.source.cell_index, conn.target.cell_index)) {
                *cell += 1;
            }
        }
        matrix
    }

    /// Degree statistics over all `n_source` source and `n_target` target cells,
    /// counting cells with no connections as degree zero
    pub fn report(&self, name: &str, n_source: usize, n_target: usize) -> ConnectionStats {
        let connections = self.connections_for(name);
        let mut out_counts = vec![0usize; n_source];
        let mut in_counts = vec![0usize; n_target];
        let mut zero_weight_props = 0;
        let mut negative_weight_props = 0;

        for conn in connections {
            if let Some(count) = out_counts.get_mut(conn.source.cell_index) {
                *count += 1;
            }
            if let Some(count) = in_counts.get_mut(conn.target.cell_index) {
                *count += 1;
            }
            for props in conn.props.iter().flatten() {
                if props.weight == 0.0 {
                    zero_weight_props += 1;
                } else if props.weight < 0.0 {
                    negative_weight_props += 1;
                }
            }
        }

        ConnectionStats {
            name: name.to_string(),
            connections: connections.len(),
            out_degree: DegreeStats::from_counts(&out_counts),
            in_degree: DegreeStats::from_counts(&in_counts),
            zero_weight_props,
            negative_weight_props,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AttachmentPoint;
    use crate::store::{ConnKind, ConnSpecificProps, Endpoint, SingleConnection};

    fn conn(source: usize, target: usize, weight: Option<f32>) -> SingleConnection {
        let mut conn = SingleConnection::new(
            ConnKind::MorphologyBased,
            Endpoint::new(source, AttachmentPoint::new(0, 0.5)),
            Endpoint::new(target, AttachmentPoint::new(0, 0.5)),
        );
        conn.props = weight.map(|w| {
            vec![ConnSpecificProps {
                weight: w,
                ..ConnSpecificProps::new("AMPA")
            }]
        });
        conn
    }

    #[test]
    fn test_degree_stats() {
        let stats = DegreeStats::from_counts(&[2, 0, 4]);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 4);
        assert!((stats.std_dev - (8.0f32 / 3.0).sqrt()).abs() < 1e-6);
        assert_eq!(DegreeStats::from_counts(&[]), DegreeStats::default());
    }

    #[test]
    fn test_matrix_and_report() {
        let mut store = ConnectionStore::new();
        store.append("ab", conn(0, 1, Some(0.0)));
        store.append("ab", conn(0, 1, Some(-1.0)));
        store.append("ab", conn(2, 0, None));
        store.append("ab", conn(9, 9, None));

        let matrix = store.connection_matrix("ab", 3, 2);
        assert_eq!(matrix[[0, 1]], 2);
        assert_eq!(matrix[[2, 0]], 1);
        assert_eq!(matrix.sum(), 3);

        let stats = store.report("ab", 3, 2);
        assert_eq!(stats.connections, 4);
        assert_eq!(stats.out_degree.max, 2);
        assert_eq!(stats.out_degree.min, 0);
        assert_eq!(stats.in_degree.max, 2);
        assert_eq!(stats.zero_weight_props, 1);
        assert_eq!(stats.negative_weight_props, 1);
        assert!(stats.to_string().starts_with("ab: 4 connections"));
    }
}
