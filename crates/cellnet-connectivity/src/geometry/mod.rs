// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Geometry primitives and the boundary to cell morphology.

Cell morphology is opaque to the engine. Everything it needs to know about
where synapses can attach is asked through the [`GeometryOracle`] trait, while
soma positions come from the [`PopulationTable`](crate::population::PopulationTable).
[`NetworkGeometry`] ties the two together to produce absolute positions and
distances.
*/

pub mod oracle;
pub mod point_cell;
pub mod region;

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::population::PopulationTable;
use crate::types::{CellIndex, ConnResult};

pub use oracle::GeometryOracle;
pub use point_cell::{CellSegment, CellTemplate, PointCellOracle};
pub use region::{AxonalArbour, BoundingSphere, Region};

/// 3D point or displacement in micrometres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Point3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance_to(self, other: Point3) -> f32 {
        (self - other).norm()
    }

    pub fn scale(self, factor: f32) -> Point3 {
        Point3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Point at `fraction` of the way from `self` to `end`
    pub fn lerp(self, end: Point3, fraction: f32) -> Point3 {
        self + (end - self).scale(fraction)
    }

    pub fn component_min(self, other: Point3) -> Point3 {
        Point3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn component_max(self, other: Point3) -> Point3 {
        Point3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Where on a cell a synapse attaches: a segment and a fractional position along it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttachmentPoint {
    pub segment_id: u32,
    pub fraction_along: f32,
}

impl AttachmentPoint {
    pub const fn new(segment_id: u32, fraction_along: f32) -> Self {
        Self {
            segment_id,
            fraction_along,
        }
    }
}

/// Pre- or post-synaptic side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynapticRole {
    Pre,
    Post,
}

impl fmt::Display for SynapticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynapticRole::Pre => write!(f, "pre-synaptic"),
            SynapticRole::Post => write!(f, "post-synaptic"),
        }
    }
}

/// Dimension along which connection length is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceAxis {
    X,
    Y,
    Z,
    /// Euclidean distance between the two attachment points
    #[default]
    Radial,
    /// Euclidean distance between the two somas, ignoring attachment points
    SomaToSoma,
}

impl DistanceAxis {
    /// Distance between two absolute points along this axis.
    ///
    /// `SomaToSoma` is measured as radial here; callers pass soma centres.
    pub fn measure(self, a: Point3, b: Point3) -> f32 {
        match self {
            DistanceAxis::X => (a.x - b.x).abs(),
            DistanceAxis::Y => (a.y - b.y).abs(),
            DistanceAxis::Z => (a.z - b.z).abs(),
            DistanceAxis::Radial | DistanceAxis::SomaToSoma => a.distance_to(b),
        }
    }
}

/// A cell in a population together with an attachment point on it
#[derive(Debug, Clone, Copy)]
pub struct CellSite<'a> {
    pub group: &'a str,
    pub cell: CellIndex,
    pub point: AttachmentPoint,
}

/// Combined view of cell morphology and cell placement for one network
#[derive(Clone, Copy)]
pub struct NetworkGeometry<'a> {
    pub oracle: &'a dyn GeometryOracle,
    pub populations: &'a PopulationTable,
}

impl<'a> NetworkGeometry<'a> {
    pub fn new(oracle: &'a dyn GeometryOracle, populations: &'a PopulationTable) -> Self {
        Self {
            oracle,
            populations,
        }
    }

    /// Absolute position of the cell's soma centre
    pub fn soma_position(&self, group: &str, cell: CellIndex) -> ConnResult<Point3> {
        Ok(self.populations.position(group, cell)? + self.oracle.soma_offset(group))
    }

    /// Absolute position of an attachment point
    pub fn absolute_position(&self, site: CellSite<'_>) -> ConnResult<Point3> {
        let cell_position = self.populations.position(site.group, site.cell)?;
        Ok(cell_position + self.oracle.relative_position(site.group, site.point))
    }

    /// Distance between two attachment points on two positioned cells
    pub fn distance_between(
        &self,
        a: CellSite<'_>,
        b: CellSite<'_>,
        axis: DistanceAxis,
    ) -> ConnResult<f32> {
        if axis == DistanceAxis::SomaToSoma {
            return self.soma_distance(a.group, a.cell, b.group, b.cell);
        }
        let start = self.absolute_position(a)?;
        let end = self.absolute_position(b)?;
        Ok(axis.measure(start, end))
    }

    /// Distance between the soma centres of two cells
    pub fn soma_distance(
        &self,
        group_a: &str,
        cell_a: CellIndex,
        group_b: &str,
        cell_b: CellIndex,
    ) -> ConnResult<f32> {
        let a = self.soma_position(group_a, cell_a)?;
        let b = self.soma_position(group_b, cell_b)?;
        Ok(a.distance_to(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_measure() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, -4.0, 12.0);
        assert_eq!(DistanceAxis::X.measure(a, b), 3.0);
        assert_eq!(DistanceAxis::Y.measure(a, b), 4.0);
        assert_eq!(DistanceAxis::Z.measure(a, b), 12.0);
        assert_eq!(DistanceAxis::Radial.measure(a, b), 13.0);
    }

    #[test]
    fn test_lerp() {
        let p = Point3::new(0.0, 0.0, 0.0).lerp(Point3::new(10.0, 0.0, -10.0), 0.25);
        assert_eq!(p, Point3::new(2.5, 0.0, -2.5));
    }

    #[test]
    fn test_soma_to_soma_ignores_attachment_point() {
        let mut populations = PopulationTable::new();
        populations.insert("a", vec![Point3::new(0.0, 0.0, 0.0)]);
        populations.insert("b", vec![Point3::new(0.0, 30.0, 40.0)]);
        let oracle = PointCellOracle::new().with_template(
            "a",
            CellTemplate::soma_only().with_segment(CellSegment::dendrite(
                1,
                Point3::ORIGIN,
                Point3::new(100.0, 0.0, 0.0),
            )),
        );
        let geometry = NetworkGeometry::new(&oracle, &populations);

        let a = CellSite {
            group: "a",
            cell: 0,
            point: AttachmentPoint::new(1, 1.0),
        };
        let b = CellSite {
            group: "b",
            cell: 0,
            point: AttachmentPoint::new(0, 0.5),
        };

        let soma = geometry
            .distance_between(a, b, DistanceAxis::SomaToSoma)
            .expect("soma distance");
        assert!((soma - 50.0).abs() < 1e-4);

        let radial = geometry
            .distance_between(a, b, DistanceAxis::Radial)
            .expect("radial distance");
        assert!(radial > 100.0);
    }
}
