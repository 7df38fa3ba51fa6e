// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connectivity specifications - immutable descriptions of named connection rules.

A [`ConnectivitySpec`] is authored before generation and only read while
connections are generated. Morphology-based specs search finish cells with a
[`SearchPattern`]; volume-based specs carry [`VolumeSettings`] instead.

## Example

```rust
use cellnet_connectivity::spec::{ConnectivitySpec, SearchPattern, SynapseSpec};
use cellnet_connectivity::generators::NumberGenerator;

let spec = ConnectivitySpec::morphology("cortex_to_thalamus", "cortex", "thalamus")
    .with_synapse(SynapseSpec::new("AMPA"))
    .with_search_pattern(SearchPattern::RandomSubset(5))
    .with_count(NumberGenerator::uniform(1.0, 3.0).as_integer());
assert_eq!(spec.synapses.len(), 1);
```
*/

use std::fmt;

use crate::expression::Expression;
use crate::generators::{NumberGenerator, WeightGenerator};
use crate::geometry::{DistanceAxis, GeometryOracle, SynapticRole};
use crate::population::PopulationTable;
use crate::store::ConnKind;
use crate::types::{ConnError, ConnResult};

/// Largest connection count a spec may ask of one start cell
pub const MAX_CONNECTIONS_PER_CELL: f32 = u32::MAX as f32;

/// How finish cells are searched for, per desired connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPattern {
    /// Random finish cells, first one within the distance bounds wins
    #[default]
    RandomAll,
    /// Best of `k` random candidates
    RandomSubset(u32),
    /// Exhaustive nearest candidate
    Nearest,
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPattern::RandomAll => write!(f, "random"),
            SearchPattern::RandomSubset(k) => write!(f, "random close ({})", k),
            SearchPattern::Nearest => write!(f, "closest"),
        }
    }
}

/// Allowed connection length and how it is measured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBounds {
    pub min: f32,
    /// `f32::INFINITY` for unbounded
    pub max: f32,
    pub axis: DistanceAxis,
    /// Distance failures tolerated per desired connection; `None` uses the run default
    pub number_attempts: Option<u32>,
}

impl Default for DistanceBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f32::INFINITY,
            axis: DistanceAxis::Radial,
            number_attempts: None,
        }
    }
}

impl DistanceBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn along(mut self, axis: DistanceAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.number_attempts = Some(attempts);
        self
    }

    /// Bounds that can never reject a candidate
    pub fn ignores_distance(&self) -> bool {
        self.min <= 0.0 && self.max == f32::INFINITY
    }

    pub fn accepts(&self, distance: f32) -> bool {
        self.ignores_distance() || (distance >= self.min && distance <= self.max)
    }
}

/// Which population the generation loop iterates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationDirection {
    #[default]
    SourceToTarget,
    TargetToSource,
}

/// Degree and uniqueness constraints of a connection rule
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityConditions {
    /// Connections initiated per start cell
    pub count: NumberGenerator,
    pub only_unique_finish_cells: bool,
    /// `u32::MAX` disables the cap
    pub max_incoming_per_finish_cell: u32,
    pub direction: GenerationDirection,
    pub allow_autapses: bool,
    /// Reject a pair that is already connected in either direction
    pub no_recurrent: bool,
}

impl Default for ConnectivityConditions {
    fn default() -> Self {
        Self {
            count: NumberGenerator::fixed(1.0),
            only_unique_finish_cells: false,
            max_incoming_per_finish_cell: u32::MAX,
            direction: GenerationDirection::SourceToTarget,
            allow_autapses: true,
            no_recurrent: false,
        }
    }
}

/// One synapse type carried by every connection of a spec
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseSpec {
    pub synapse_type: String,
    pub delay: NumberGenerator,
    pub weight: WeightGenerator,
    pub threshold: f32,
}

impl SynapseSpec {
    pub fn new(synapse_type: impl Into<String>) -> Self {
        Self {
            synapse_type: synapse_type.into(),
            delay: NumberGenerator::fixed(0.0),
            weight: WeightGenerator::default(),
            threshold: -20.0,
        }
    }

    pub fn with_delay(mut self, delay: NumberGenerator) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_weight(mut self, weight: impl Into<WeightGenerator>) -> Self {
        self.weight = weight.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Connections cache sampled values for this synapse
    pub fn needs_per_connection_props(&self) -> bool {
        !self.delay.is_fixed() || !self.weight.is_fixed()
    }
}

/// Volume-based settings: where targets may lie and how likely they connect
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSettings {
    /// Arbour names on the source cell type; empty selects all arbours
    pub source_regions: Vec<String>,
    /// Expression in x, y, z, r giving connection probability
    pub probability: String,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            source_regions: Vec::new(),
            probability: "1".to_string(),
        }
    }
}

/// A named connection rule between two populations
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivitySpec {
    pub name: String,
    pub source_group: String,
    pub target_group: String,
    pub synapses: Vec<SynapseSpec>,
    pub search_pattern: SearchPattern,
    pub distance_bounds: DistanceBounds,
    pub conditions: ConnectivityConditions,
    /// Action potential speed in micrometres per millisecond; infinite means no delay
    pub ap_propagation_speed: f32,
    /// Present for volume-based specs
    pub volume: Option<VolumeSettings>,
}

impl ConnectivitySpec {
    pub fn morphology(
        name: impl Into<String>,
        source_group: impl Into<String>,
        target_group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_group: source_group.into(),
            target_group: target_group.into(),
            synapses: Vec::new(),
            search_pattern: SearchPattern::default(),
            distance_bounds: DistanceBounds::default(),
            conditions: ConnectivityConditions::default(),
            ap_propagation_speed: f32::INFINITY,
            volume: None,
        }
    }

    pub fn volume(
        name: impl Into<String>,
        source_group: impl Into<String>,
        target_group: impl Into<String>,
    ) -> Self {
        Self {
            volume: Some(VolumeSettings::default()),
            ..Self::morphology(name, source_group, target_group)
        }
    }

    pub fn with_synapse(mut self, synapse: SynapseSpec) -> Self {
        self.synapses.push(synapse);
        self
    }

    pub fn with_search_pattern(mut self, pattern: SearchPattern) -> Self {
        self.search_pattern = pattern;
        self
    }

    pub fn with_distance_bounds(mut self, bounds: DistanceBounds) -> Self {
        self.distance_bounds = bounds;
        self
    }

    pub fn with_conditions(mut self, conditions: ConnectivityConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_count(mut self, count: NumberGenerator) -> Self {
        self.conditions.count = count;
        self
    }

    pub fn with_ap_speed(mut self, speed: f32) -> Self {
        self.ap_propagation_speed = speed;
        self
    }

    /// Selects arbour regions; turns the spec volume-based if it was not already
    pub fn with_source_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let volume = self.volume.get_or_insert_with(VolumeSettings::default);
        volume.source_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the probability expression; turns the spec volume-based if it was not already
    pub fn with_probability(mut self, expression: impl Into<String>) -> Self {
        let volume = self.volume.get_or_insert_with(VolumeSettings::default);
        volume.probability = expression.into();
        self
    }

    pub fn kind(&self) -> ConnKind {
        if self.volume.is_some() {
            ConnKind::VolumeBased
        } else {
            ConnKind::MorphologyBased
        }
    }

    pub fn synapse_types(&self) -> Vec<String> {
        self.synapses.iter().map(|s| s.synapse_type.clone()).collect()
    }

    pub fn is_recurrent_group(&self) -> bool {
        self.source_group == self.target_group
    }

    /// Autapses are only possible, and only excluded, within one population
    pub fn forbids_autapses(&self) -> bool {
        self.is_recurrent_group() && !self.conditions.allow_autapses
    }

    /// Start and finish populations with the synaptic role played on each side
    pub fn generation_roles(&self) -> GenerationRoles<'_> {
        match self.conditions.direction {
            GenerationDirection::SourceToTarget => GenerationRoles {
                start_group: &self.source_group,
                finish_group: &self.target_group,
                start_role: SynapticRole::Pre,
                finish_role: SynapticRole::Post,
            },
            GenerationDirection::TargetToSource => GenerationRoles {
                start_group: &self.target_group,
                finish_group: &self.source_group,
                start_role: SynapticRole::Post,
                finish_role: SynapticRole::Pre,
            },
        }
    }

    /// Propagation delay for a connection of the given length
    pub fn propagation_delay(&self, distance: f32) -> f32 {
        if self.ap_propagation_speed.is_infinite() || self.ap_propagation_speed <= 0.0 {
            0.0
        } else {
            distance / self.ap_propagation_speed
        }
    }

    /// Check the spec against the populations and cell types it refers to
    pub fn validate(
        &self,
        populations: &PopulationTable,
        oracle: &dyn GeometryOracle,
    ) -> ConnResult<()> {
        let invalid = |reason: String| ConnError::InvalidSpec(format!("{}: {}", self.name, reason));

        if self.name.trim().is_empty() {
            return Err(ConnError::InvalidSpec("connection name is empty".to_string()));
        }
        if self.name.contains('\n') {
            return Err(invalid("name contains a line break".to_string()));
        }
        for group in [&self.source_group, &self.target_group] {
            if !populations.contains(group) {
                return Err(ConnError::UnknownPopulation(group.clone()));
            }
        }
        if self.synapses.is_empty() {
            return Err(invalid("no synapse types".to_string()));
        }
        for synapse in &self.synapses {
            synapse.delay.validate()?;
            synapse.weight.validate()?;
        }
        let count = &self.conditions.count;
        count.validate()?;
        let largest = count.upper_bound().unwrap_or(count.expected());
        if largest > MAX_CONNECTIONS_PER_CELL {
            return Err(invalid(format!(
                "connection count {} exceeds {} per start cell",
                count, MAX_CONNECTIONS_PER_CELL
            )));
        }

        let bounds = &self.distance_bounds;
        if bounds.min.is_nan() || bounds.max.is_nan() || bounds.min < 0.0 {
            return Err(invalid(format!(
                "distance bounds [{}, {}] are not valid lengths",
                bounds.min, bounds.max
            )));
        }
        if bounds.min > bounds.max {
            return Err(invalid(format!(
                "minimum distance {} exceeds maximum {}",
                bounds.min, bounds.max
            )));
        }
        if bounds.number_attempts == Some(0) {
            return Err(invalid("number of attempts must be at least 1".to_string()));
        }
        if self.search_pattern == SearchPattern::RandomSubset(0) {
            return Err(invalid("random close search needs at least 1 candidate".to_string()));
        }

        if let Some(volume) = &self.volume {
            Expression::parse(&volume.probability)?;
            let start_group = self.generation_roles().start_group;
            let arbours = oracle.arbours(start_group);
            for wanted in &volume.source_regions {
                if !arbours.iter().any(|a| &a.name == wanted) {
                    return Err(invalid(format!(
                        "cell type of {} has no axonal arbour named {}",
                        start_group, wanted
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Start/finish populations of a spec after resolving its generation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRoles<'a> {
    pub start_group: &'a str,
    pub finish_group: &'a str,
    pub start_role: SynapticRole,
    pub finish_role: SynapticRole,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AxonalArbour, CellTemplate, Point3, PointCellOracle, Region};

    fn populations() -> PopulationTable {
        let mut table = PopulationTable::new();
        table.insert("a", vec![Point3::ORIGIN; 3]);
        table.insert("b", vec![Point3::ORIGIN; 2]);
        table
    }

    #[test]
    fn test_valid_spec() {
        let spec = ConnectivitySpec::morphology("a_b", "a", "b").with_synapse(SynapseSpec::new("AMPA"));
        assert!(spec.validate(&populations(), &PointCellOracle::new()).is_ok());
        assert_eq!(spec.kind(), ConnKind::MorphologyBased);
    }

    #[test]
    fn test_unknown_group() {
        let spec = ConnectivitySpec::morphology("a_c", "a", "c").with_synapse(SynapseSpec::new("AMPA"));
        assert!(matches!(
            spec.validate(&populations(), &PointCellOracle::new()),
            Err(ConnError::UnknownPopulation(group)) if group == "c"
        ));
    }

    #[test]
    fn test_empty_synapse_list() {
        let spec = ConnectivitySpec::morphology("a_b", "a", "b");
        assert!(matches!(
            spec.validate(&populations(), &PointCellOracle::new()),
            Err(ConnError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_oversized_count_rejected() {
        let oracle = PointCellOracle::new();
        let base = ConnectivitySpec::morphology("a_b", "a", "b").with_synapse(SynapseSpec::new("AMPA"));
        for count in [
            NumberGenerator::fixed(1e30),
            NumberGenerator::uniform(1.0, 1e12),
            NumberGenerator::gaussian(1e15, 1.0, 0.0, f32::INFINITY),
        ] {
            let spec = base.clone().with_count(count);
            assert!(matches!(
                spec.validate(&populations(), &oracle),
                Err(ConnError::InvalidSpec(_))
            ));
        }
        let spec = base.with_count(NumberGenerator::gaussian(4.0, 2.0, 0.0, f32::INFINITY));
        assert!(spec.validate(&populations(), &oracle).is_ok());
    }

    #[test]
    fn test_inverted_bounds() {
        let spec = ConnectivitySpec::morphology("a_b", "a", "b")
            .with_synapse(SynapseSpec::new("AMPA"))
            .with_distance_bounds(DistanceBounds::new(10.0, 5.0));
        assert!(spec.validate(&populations(), &PointCellOracle::new()).is_err());
    }

    #[test]
    fn test_volume_spec_checks_expression_and_regions() {
        let oracle = PointCellOracle::new().with_template(
            "a",
            CellTemplate::soma_only().with_arbour(AxonalArbour::new(
                "column",
                Region::Spherical {
                    centre: Point3::ORIGIN,
                    radius: 10.0,
                },
            )),
        );
        let base = ConnectivitySpec::volume("vol", "a", "b").with_synapse(SynapseSpec::new("AMPA"));
        assert_eq!(base.kind(), ConnKind::VolumeBased);

        let good = base.clone().with_source_regions(["column"]).with_probability("exp(-r/50)");
        assert!(good.validate(&populations(), &oracle).is_ok());

        let bad_region = base.clone().with_source_regions(["missing"]);
        assert!(bad_region.validate(&populations(), &oracle).is_err());

        let bad_expression = base.with_probability("exp(");
        assert!(matches!(
            bad_expression.validate(&populations(), &oracle),
            Err(ConnError::Expression(_))
        ));
    }

    #[test]
    fn test_roles_follow_direction() {
        let mut spec = ConnectivitySpec::morphology("a_b", "a", "b");
        spec.conditions.direction = GenerationDirection::TargetToSource;
        let roles = spec.generation_roles();
        assert_eq!(roles.start_group, "b");
        assert_eq!(roles.start_role, SynapticRole::Post);
        assert_eq!(roles.finish_role, SynapticRole::Pre);
    }

    #[test]
    fn test_bounds() {
        let exact = DistanceBounds::new(5.0, 5.0);
        assert!(exact.accepts(5.0));
        assert!(!exact.accepts(5.0001));
        assert!(DistanceBounds::default().ignores_distance());
        assert!(DistanceBounds::default().accepts(1e30));
    }

    #[test]
    fn test_propagation_delay() {
        let spec = ConnectivitySpec::morphology("a_b", "a", "b");
        assert_eq!(spec.propagation_delay(100.0), 0.0);
        assert_eq!(spec.with_ap_speed(50.0).propagation_delay(100.0), 2.0);
    }
}
