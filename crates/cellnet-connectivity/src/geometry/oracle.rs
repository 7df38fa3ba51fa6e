// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Geometry oracle - the engine's only view of cell morphology.

Implementations answer "where on this cell may a synapse of these types
attach?" and "where is that attachment point relative to the cell position?".
Everything else (segment trees, sections, rendering) stays on the other side
of this trait.
*/

use rand::RngCore;

use super::region::{AxonalArbour, BoundingSphere, Region};
use super::{AttachmentPoint, Point3, SynapticRole};
use crate::types::CellIndex;

pub trait GeometryOracle {
    /// Position of an attachment point relative to the cell position of `group`
    fn relative_position(&self, group: &str, point: AttachmentPoint) -> Point3;

    /// A candidate attachment point for the given role, drawn from `rng`.
    ///
    /// Returns `None` when the cell type offers no location for any of
    /// `synapse_types` in this role.
    fn terminal(
        &self,
        group: &str,
        cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
        rng: &mut dyn RngCore,
    ) -> Option<AttachmentPoint>;

    /// The allowed attachment point closest to `relative_target`, which is
    /// expressed relative to this cell's position.
    fn nearest_terminal(
        &self,
        group: &str,
        cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
        relative_target: Point3,
    ) -> Option<AttachmentPoint>;

    /// An attachment point restricted to the soma
    fn soma_terminal(
        &self,
        group: &str,
        cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
    ) -> Option<AttachmentPoint>;

    /// Soma centre relative to the cell position
    fn soma_offset(&self, _group: &str) -> Point3 {
        Point3::ORIGIN
    }

    /// Sphere enclosing the whole cell, relative to the cell position
    fn enclosing_sphere(&self, _group: &str) -> Option<BoundingSphere> {
        None
    }

    /// Axonal arbour regions declared on the cell type of `group`
    fn arbours(&self, _group: &str) -> &[AxonalArbour] {
        &[]
    }

    fn point_in_region(&self, region: &Region, absolute_point: Point3) -> bool {
        region.contains(absolute_point)
    }
}
