// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Positioned cell populations.

Placement happens upstream; the engine only consumes the resulting table of
cell positions, keyed by population name.
*/

use ahash::AHashMap;

use crate::geometry::Point3;
use crate::types::{CellIndex, ConnError, ConnResult};

/// Population name -> ordered cell positions
#[derive(Debug, Clone, Default)]
pub struct PopulationTable {
    groups: AHashMap<String, Vec<Point3>>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a population
    pub fn insert(&mut self, name: impl Into<String>, positions: Vec<Point3>) {
        self.groups.insert(name.into(), positions);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn size(&self, name: &str) -> ConnResult<usize> {
        Ok(self.positions(name)?.len())
    }

    pub fn positions(&self, name: &str) -> ConnResult<&[Point3]> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConnError::UnknownPopulation(name.to_string()))
    }

    pub fn position(&self, name: &str, cell: CellIndex) -> ConnResult<Point3> {
        let positions = self.positions(name)?;
        positions
            .get(cell)
            .copied()
            .ok_or_else(|| ConnError::CellIndexOutOfRange {
                group: name.to_string(),
                index: cell,
                size: positions.len(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

/// Regular grid of `nx * ny * nz` positions starting at `origin`, x fastest
pub fn grid_positions(
    origin: Point3,
    (nx, ny, nz): (usize, usize, usize),
    spacing: f32,
) -> Vec<Point3> {
    let mut positions = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                positions.push(
                    origin + Point3::new(i as f32 * spacing, j as f32 * spacing, k as f32 * spacing),
                );
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_population() {
        let table = PopulationTable::new();
        assert!(matches!(
            table.size("missing"),
            Err(ConnError::UnknownPopulation(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_position_out_of_range() {
        let mut table = PopulationTable::new();
        table.insert("a", vec![Point3::ORIGIN]);
        assert!(matches!(
            table.position("a", 3),
            Err(ConnError::CellIndexOutOfRange { index: 3, size: 1, .. })
        ));
    }

    #[test]
    fn test_grid_layout() {
        let grid = grid_positions(Point3::ORIGIN, (2, 3, 1), 10.0);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[1], Point3::new(10.0, 0.0, 0.0));
        assert_eq!(grid[2], Point3::new(0.0, 10.0, 0.0));
    }
}
