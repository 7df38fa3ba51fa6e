// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use tracing::trace;

use super::{FinishCandidate, SearchContext, SearchRequest, SearchStrategy};
use crate::geometry::DistanceAxis;
use crate::types::ConnResult;

/// Slack subtracted from sphere lower bounds to absorb rounding
const SPHERE_TOLERANCE: f32 = 1e-3;

/// Exhaustive scan for the closest eligible finish point within bounds.
///
/// For radial distances the finish cell's enclosing sphere gives a lower
/// bound on any distance to it, which skips cells that cannot beat the
/// current best or reach the minimum bound.
#[derive(Debug, Clone, Copy)]
pub struct NearestStrategy {
    bounding_sphere: bool,
}

impl NearestStrategy {
    pub fn new(bounding_sphere: bool) -> Self {
        Self { bounding_sphere }
    }
}

impl SearchStrategy for NearestStrategy {
    fn name(&self) -> &'static str {
        "closest"
    }

    fn find_finish(
        &self,
        request: &SearchRequest<'_>,
        ctx: &mut SearchContext<'_>,
    ) -> ConnResult<Option<FinishCandidate>> {
        let oracle = ctx.geometry.oracle;
        let sphere = if self.bounding_sphere && request.bounds.axis == DistanceAxis::Radial {
            oracle.enclosing_sphere(request.finish_group)
        } else {
            None
        };

        let mut best: Option<FinishCandidate> = None;
        for finish_cell in 0..request.finish_size {
            if !ctx.is_eligible(request, finish_cell) {
                continue;
            }
            let cell_position = ctx
                .geometry
                .populations
                .position(request.finish_group, finish_cell)?;

            if let Some(sphere) = sphere {
                let centre = cell_position + sphere.centre;
                let lower = request.start_position.distance_to(centre)
                    - sphere.radius
                    - SPHERE_TOLERANCE;
                let beaten = best.map_or(false, |b| lower >= b.distance);
                if beaten || lower > request.bounds.max {
                    trace!(
                        target: "cellnet-connectivity",
                        "Skipped finish cell {} by bounding sphere",
                        finish_cell
                    );
                    continue;
                }
            }

            let point = oracle
                .nearest_terminal(
                    request.finish_group,
                    finish_cell,
                    request.finish_role,
                    request.synapse_types,
                    request.start_position - cell_position,
                )
                .ok_or_else(|| request.no_attachment_point(finish_cell))?;
            let distance = ctx.distance(request, finish_cell, point)?;
            if request.bounds.accepts(distance) && best.map_or(true, |b| distance < b.distance) {
                best = Some(FinishCandidate {
                    cell_index: finish_cell,
                    point,
                    distance,
                });
            }
        }
        Ok(best)
    }
}
