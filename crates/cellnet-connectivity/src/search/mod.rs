// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Finish-point search strategies.

Given a fixed start attachment point, a strategy picks a finish cell and an
attachment point on it that satisfy the spec's degree, uniqueness and
distance constraints. One strategy is selected per connectivity spec from
its [`SearchPattern`] and invoked once per desired connection.
*/

mod nearest;
mod random_all;
mod random_subset;

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::Rng;

use crate::geometry::{AttachmentPoint, CellSite, NetworkGeometry, Point3, SynapticRole};
use crate::run::GenerationSettings;
use crate::spec::{DistanceBounds, SearchPattern};
use crate::store::ConnectionStore;
use crate::types::{CellIndex, ConnError, ConnResult};

pub use nearest::NearestStrategy;
pub use random_all::RandomAllStrategy;
pub use random_subset::RandomSubsetStrategy;

/// Uniform draws tried before falling back to enumerating eligible finish cells
const MAX_REJECTION_DRAWS: usize = 64;

/// Accepted finish side of a connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishCandidate {
    pub cell_index: CellIndex,
    pub point: AttachmentPoint,
    /// Connection length along the spec's distance axis
    pub distance: f32,
}

/// Degree, uniqueness and autapse rules applied to every finish cell considered
#[derive(Debug, Clone, Copy)]
pub struct FinishFilter {
    pub only_unique: bool,
    /// `u32::MAX` disables the cap
    pub max_incoming: u32,
    pub forbid_autapses: bool,
    pub no_recurrent: bool,
    /// False when generation runs from target to source
    pub start_is_source: bool,
}

/// Everything fixed for one desired connection
pub struct SearchRequest<'a> {
    pub connection_name: &'a str,
    pub start_group: &'a str,
    pub start_cell: CellIndex,
    pub start_point: AttachmentPoint,
    /// Absolute position of `start_point`
    pub start_position: Point3,
    pub finish_group: &'a str,
    pub finish_role: SynapticRole,
    pub finish_size: usize,
    pub synapse_types: &'a [String],
    pub bounds: DistanceBounds,
    /// Distance failures tolerated before giving up
    pub attempts: u32,
    pub filter: FinishFilter,
}

impl<'a> SearchRequest<'a> {
    pub fn start_site(&self) -> CellSite<'a> {
        CellSite {
            group: self.start_group,
            cell: self.start_cell,
            point: self.start_point,
        }
    }

    pub fn finish_site(&self, cell: CellIndex, point: AttachmentPoint) -> CellSite<'a> {
        CellSite {
            group: self.finish_group,
            cell,
            point,
        }
    }

    /// Map a finish cell back to (source, target) cell indices
    pub fn oriented(&self, finish_cell: CellIndex) -> (CellIndex, CellIndex) {
        if self.filter.start_is_source {
            (self.start_cell, finish_cell)
        } else {
            (finish_cell, self.start_cell)
        }
    }

    pub(crate) fn no_attachment_point(&self, finish_cell: CellIndex) -> ConnError {
        ConnError::NoAttachmentPoint {
            cell_group: self.finish_group.to_string(),
            cell_index: finish_cell,
            role: self.finish_role,
            synapse_types: self.synapse_types.to_vec(),
        }
    }
}

/// Mutable state shared by the strategies of one spec
pub struct SearchContext<'a> {
    pub geometry: NetworkGeometry<'a>,
    pub store: &'a ConnectionStore,
    pub rng: &'a mut StdRng,
    /// Finish cells already at the degree cap
    pub maxed_out: &'a mut AHashSet<CellIndex>,
}

impl SearchContext<'_> {
    /// Whether `finish_cell` may receive another connection from the request's start cell.
    ///
    /// Cells found at the degree cap are added to the maxed-out set.
    pub fn is_eligible(&mut self, request: &SearchRequest<'_>, finish_cell: CellIndex) -> bool {
        if self.maxed_out.contains(&finish_cell) {
            return false;
        }
        let filter = &request.filter;
        let name = request.connection_name;

        if filter.max_incoming != u32::MAX {
            let degree = if filter.start_is_source {
                self.store.incoming_count(name, finish_cell)
            } else {
                self.store.outgoing_count(name, finish_cell)
            };
            if degree as u64 + 1 > filter.max_incoming as u64 {
                self.maxed_out.insert(finish_cell);
                return false;
            }
        }
        if filter.forbid_autapses && finish_cell == request.start_cell {
            return false;
        }

        let (source, target) = request.oriented(finish_cell);
        if (filter.only_unique || filter.no_recurrent) && self.store.are_connected(name, source, target)
        {
            return false;
        }
        if filter.no_recurrent && self.store.are_connected(name, target, source) {
            return false;
        }
        true
    }

    /// Uniformly random finish cell among the eligible ones, or `None` if there are none
    pub fn draw_eligible_finish(&mut self, request: &SearchRequest<'_>) -> Option<CellIndex> {
        if request.finish_size == 0 || self.maxed_out.len() >= request.finish_size {
            return None;
        }
        for _ in 0..MAX_REJECTION_DRAWS {
            let candidate = self.rng.gen_range(0..request.finish_size);
            if self.is_eligible(request, candidate) {
                return Some(candidate);
            }
        }
        let eligible = self.eligible_finish_cells(request);
        if eligible.is_empty() {
            None
        } else {
            Some(eligible[self.rng.gen_range(0..eligible.len())])
        }
    }

    pub fn eligible_finish_cells(&mut self, request: &SearchRequest<'_>) -> Vec<CellIndex> {
        (0..request.finish_size)
            .filter(|&cell| self.is_eligible(request, cell))
            .collect()
    }

    pub fn distance(
        &self,
        request: &SearchRequest<'_>,
        finish_cell: CellIndex,
        point: AttachmentPoint,
    ) -> ConnResult<f32> {
        self.geometry.distance_between(
            request.start_site(),
            request.finish_site(finish_cell, point),
            request.bounds.axis,
        )
    }
}

/// A finish-point search algorithm
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Find the finish side of one connection; `Ok(None)` means the search was exhausted
    fn find_finish(
        &self,
        request: &SearchRequest<'_>,
        ctx: &mut SearchContext<'_>,
    ) -> ConnResult<Option<FinishCandidate>>;
}

pub fn select_strategy(
    pattern: SearchPattern,
    settings: &GenerationSettings,
) -> Box<dyn SearchStrategy> {
    match pattern {
        SearchPattern::RandomAll => Box::new(RandomAllStrategy),
        SearchPattern::RandomSubset(k) => Box::new(RandomSubsetStrategy::new(k)),
        SearchPattern::Nearest => Box::new(NearestStrategy::new(settings.nearest_bounding_sphere)),
    }
}
