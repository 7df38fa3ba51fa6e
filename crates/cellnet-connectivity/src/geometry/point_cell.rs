// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Built-in geometry oracle for simple cells made of straight segments.

Every cell type is a [`CellTemplate`]: a soma plus optional axon and dendrite
segments, the synapse types it accepts, and its axonal arbours. Groups without
a registered template use the oracle's default template, a single-point soma.
*/

use ahash::AHashMap;
use rand::{Rng, RngCore};

use super::oracle::GeometryOracle;
use super::region::{AxonalArbour, BoundingSphere};
use super::{AttachmentPoint, Point3, SynapticRole};
use crate::types::CellIndex;

/// Straight segment of a cell, relative to the cell position
#[derive(Debug, Clone, PartialEq)]
pub struct CellSegment {
    pub id: u32,
    pub start: Point3,
    pub end: Point3,
    pub pre_allowed: bool,
    pub post_allowed: bool,
    pub is_soma: bool,
}

impl CellSegment {
    /// Point soma at the cell position, usable by both roles
    pub fn soma() -> Self {
        Self {
            id: 0,
            start: Point3::ORIGIN,
            end: Point3::ORIGIN,
            pre_allowed: true,
            post_allowed: true,
            is_soma: true,
        }
    }

    pub fn axon(id: u32, start: Point3, end: Point3) -> Self {
        Self {
            id,
            start,
            end,
            pre_allowed: true,
            post_allowed: false,
            is_soma: false,
        }
    }

    pub fn dendrite(id: u32, start: Point3, end: Point3) -> Self {
        Self {
            id,
            start,
            end,
            pre_allowed: false,
            post_allowed: true,
            is_soma: false,
        }
    }

    fn allows(&self, role: SynapticRole) -> bool {
        match role {
            SynapticRole::Pre => self.pre_allowed,
            SynapticRole::Post => self.post_allowed,
        }
    }

    fn point_at(&self, fraction: f32) -> Point3 {
        self.start.lerp(self.end, fraction)
    }

    /// Fraction along the segment of the point closest to `target`
    fn closest_fraction(&self, target: Point3) -> f32 {
        let axis = self.end - self.start;
        let length_sq = axis.dot(axis);
        if length_sq == 0.0 {
            return 0.5;
        }
        ((target - self.start).dot(axis) / length_sq).clamp(0.0, 1.0)
    }
}

/// Morphology and synaptic properties of one cell type
#[derive(Debug, Clone, PartialEq)]
pub struct CellTemplate {
    pub segments: Vec<CellSegment>,
    /// Synapse types this cell type accepts; empty accepts any
    pub synapse_types: Vec<String>,
    pub arbours: Vec<AxonalArbour>,
}

impl Default for CellTemplate {
    fn default() -> Self {
        Self::soma_only()
    }
}

impl CellTemplate {
    pub fn soma_only() -> Self {
        Self {
            segments: vec![CellSegment::soma()],
            synapse_types: Vec::new(),
            arbours: Vec::new(),
        }
    }

    pub fn with_segment(mut self, segment: CellSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_synapse_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synapse_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_arbour(mut self, arbour: AxonalArbour) -> Self {
        self.arbours.push(arbour);
        self
    }

    fn accepts(&self, synapse_types: &[String]) -> bool {
        self.synapse_types.is_empty()
            || synapse_types
                .iter()
                .any(|wanted| self.synapse_types.contains(wanted))
    }

    fn candidates<'a>(
        &'a self,
        role: SynapticRole,
        synapse_types: &[String],
    ) -> Vec<&'a CellSegment> {
        if !self.accepts(synapse_types) {
            return Vec::new();
        }
        self.segments.iter().filter(|s| s.allows(role)).collect()
    }

    fn segment(&self, id: u32) -> Option<&CellSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    fn soma(&self) -> Option<&CellSegment> {
        self.segments.iter().find(|s| s.is_soma)
    }

    fn bounds(&self) -> BoundingSphere {
        let mut low = Point3::ORIGIN;
        let mut high = Point3::ORIGIN;
        for segment in &self.segments {
            low = low.component_min(segment.start).component_min(segment.end);
            high = high.component_max(segment.start).component_max(segment.end);
        }
        BoundingSphere::around_box(low, high)
    }
}

/// Geometry oracle over per-group [`CellTemplate`]s
#[derive(Debug, Clone, Default)]
pub struct PointCellOracle {
    default_template: CellTemplate,
    templates: AHashMap<String, CellTemplate>,
}

impl PointCellOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, group: impl Into<String>, template: CellTemplate) -> Self {
        self.templates.insert(group.into(), template);
        self
    }

    pub fn with_default_template(mut self, template: CellTemplate) -> Self {
        self.default_template = template;
        self
    }

    pub fn template(&self, group: &str) -> &CellTemplate {
        self.templates.get(group).unwrap_or(&self.default_template)
    }
}

impl GeometryOracle for PointCellOracle {
    fn relative_position(&self, group: &str, point: AttachmentPoint) -> Point3 {
        self.template(group)
            .segment(point.segment_id)
            .map(|segment| segment.point_at(point.fraction_along))
            .unwrap_or(Point3::ORIGIN)
    }

    fn terminal(
        &self,
        group: &str,
        _cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
        rng: &mut dyn RngCore,
    ) -> Option<AttachmentPoint> {
        let candidates = self.template(group).candidates(role, synapse_types);
        if candidates.is_empty() {
            return None;
        }
        let segment = candidates[rng.gen_range(0..candidates.len())];
        let fraction = if segment.start == segment.end {
            0.5
        } else {
            rng.gen::<f32>()
        };
        Some(AttachmentPoint::new(segment.id, fraction))
    }

    fn nearest_terminal(
        &self,
        group: &str,
        _cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
        relative_target: Point3,
    ) -> Option<AttachmentPoint> {
        let mut best: Option<(f32, AttachmentPoint)> = None;
        for segment in self.template(group).candidates(role, synapse_types) {
            let fraction = segment.closest_fraction(relative_target);
            let distance = segment.point_at(fraction).distance_to(relative_target);
            if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                best = Some((distance, AttachmentPoint::new(segment.id, fraction)));
            }
        }
        best.map(|(_, point)| point)
    }

    fn soma_terminal(
        &self,
        group: &str,
        _cell: CellIndex,
        role: SynapticRole,
        synapse_types: &[String],
    ) -> Option<AttachmentPoint> {
        let template = self.template(group);
        if !template.accepts(synapse_types) {
            return None;
        }
        template
            .soma()
            .filter(|soma| soma.allows(role))
            .map(|soma| AttachmentPoint::new(soma.id, 0.5))
    }

    fn soma_offset(&self, group: &str) -> Point3 {
        self.template(group)
            .soma()
            .map(|soma| soma.point_at(0.5))
            .unwrap_or(Point3::ORIGIN)
    }

    fn enclosing_sphere(&self, group: &str) -> Option<BoundingSphere> {
        Some(self.template(group).bounds())
    }

    fn arbours(&self, group: &str) -> &[AxonalArbour] {
        &self.template(group).arbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pyramidal() -> CellTemplate {
        CellTemplate::soma_only()
            .with_segment(CellSegment::axon(
                1,
                Point3::ORIGIN,
                Point3::new(0.0, -50.0, 0.0),
            ))
            .with_segment(CellSegment::dendrite(
                2,
                Point3::ORIGIN,
                Point3::new(0.0, 100.0, 0.0),
            ))
            .with_synapse_types(["AMPA"])
    }

    #[test]
    fn test_soma_only_terminal_is_centre() {
        let oracle = PointCellOracle::new();
        let mut rng = StdRng::seed_from_u64(1);
        let point = oracle
            .terminal("any", 0, SynapticRole::Pre, &[], &mut rng)
            .expect("soma terminal");
        assert_eq!(point, AttachmentPoint::new(0, 0.5));
    }

    #[test]
    fn test_role_restricts_segments() {
        let oracle = PointCellOracle::new().with_template("pyr", pyramidal());
        let mut rng = StdRng::seed_from_u64(7);
        let types = vec!["AMPA".to_string()];
        for _ in 0..50 {
            let point = oracle
                .terminal("pyr", 0, SynapticRole::Post, &types, &mut rng)
                .expect("post terminal");
            assert!(point.segment_id == 0 || point.segment_id == 2);
        }
    }

    #[test]
    fn test_unaccepted_synapse_type_has_no_terminal() {
        let oracle = PointCellOracle::new().with_template("pyr", pyramidal());
        let mut rng = StdRng::seed_from_u64(7);
        let types = vec!["GABA".to_string()];
        assert!(oracle
            .terminal("pyr", 0, SynapticRole::Pre, &types, &mut rng)
            .is_none());
        assert!(oracle
            .soma_terminal("pyr", 0, SynapticRole::Pre, &types)
            .is_none());
    }

    #[test]
    fn test_nearest_terminal_projects_onto_dendrite() {
        let oracle = PointCellOracle::new().with_template("pyr", pyramidal());
        let types = vec!["AMPA".to_string()];
        let point = oracle
            .nearest_terminal(
                "pyr",
                0,
                SynapticRole::Post,
                &types,
                Point3::new(5.0, 40.0, 0.0),
            )
            .expect("nearest terminal");
        assert_eq!(point.segment_id, 2);
        assert!((point.fraction_along - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_enclosing_sphere_covers_segments() {
        let oracle = PointCellOracle::new().with_template("pyr", pyramidal());
        let sphere = oracle.enclosing_sphere("pyr").expect("bounds");
        assert_eq!(sphere.centre, Point3::new(0.0, 25.0, 0.0));
        assert!((sphere.radius - 75.0).abs() < 1e-4);
    }
}
