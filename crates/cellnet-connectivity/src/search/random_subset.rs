// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use tracing::trace;

use super::{FinishCandidate, SearchContext, SearchRequest, SearchStrategy};
use crate::types::ConnResult;

/// Closest of `k` random candidates that lies within the distance bounds.
///
/// A round with no candidate in bounds counts as one failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RandomSubsetStrategy {
    candidates: u32,
}

impl RandomSubsetStrategy {
    pub fn new(candidates: u32) -> Self {
        Self {
            candidates: candidates.max(1),
        }
    }
}

impl SearchStrategy for RandomSubsetStrategy {
    fn name(&self) -> &'static str {
        "random close"
    }

    fn find_finish(
        &self,
        request: &SearchRequest<'_>,
        ctx: &mut SearchContext<'_>,
    ) -> ConnResult<Option<FinishCandidate>> {
        let mut draws = self.candidates as usize;
        if request.filter.only_unique {
            draws = draws.min(ctx.eligible_finish_cells(request).len());
        }
        if draws == 0 {
            return Ok(None);
        }

        for _ in 0..request.attempts {
            let mut best: Option<FinishCandidate> = None;
            for _ in 0..draws {
                let Some(finish_cell) = ctx.draw_eligible_finish(request) else {
                    return Ok(best);
                };
                let point = ctx
                    .geometry
                    .oracle
                    .terminal(
                        request.finish_group,
                        finish_cell,
                        request.finish_role,
                        request.synapse_types,
                        &mut *ctx.rng,
                    )
                    .ok_or_else(|| request.no_attachment_point(finish_cell))?;

                let distance = ctx.distance(request, finish_cell, point)?;
                if !request.bounds.accepts(distance) {
                    trace!(
                        target: "cellnet-connectivity",
                        "Rejected finish cell {} at distance {}",
                        finish_cell,
                        distance
                    );
                    continue;
                }
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(FinishCandidate {
                        cell_index: finish_cell,
                        point,
                        distance,
                    });
                }
            }
            if best.is_some() {
                return Ok(best);
            }
        }
        Ok(None)
    }
}
