// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use tracing::trace;

use super::{FinishCandidate, SearchContext, SearchRequest, SearchStrategy};
use crate::types::ConnResult;

/// Random finish cells; the first one within the distance bounds is accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAllStrategy;

impl SearchStrategy for RandomAllStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn find_finish(
        &self,
        request: &SearchRequest<'_>,
        ctx: &mut SearchContext<'_>,
    ) -> ConnResult<Option<FinishCandidate>> {
        let mut failures = 0;
        while failures < request.attempts {
            let Some(finish_cell) = ctx.draw_eligible_finish(request) else {
                return Ok(None);
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
            if request.bounds.accepts(distance) {
                return Ok(Some(FinishCandidate {
                    cell_index: finish_cell,
                    point,
                    distance,
                }));
            }
            trace!(
                target: "cellnet-connectivity",
                "Rejected finish cell {} at distance {}",
                finish_cell,
                distance
            );
            failures += 1;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{request, Fixture};
    use super::*;
    use crate::spec::DistanceBounds;

    #[test]
    fn test_accepts_only_within_bounds() {
        let mut fixture = Fixture::new(&[1.0, 5.0, 9.0, 20.0]);
        let request = request(fixture.finish_size(), DistanceBounds::new(4.0, 10.0));
        for _ in 0..50 {
            let found = fixture
                .search(&RandomAllStrategy, &request)
                .expect("search")
                .expect("a cell in range exists");
            assert!(found.cell_index == 1 || found.cell_index == 2);
            assert!(found.distance >= 4.0 && found.distance <= 10.0);
        }
    }

    #[test]
    fn test_gives_up_after_attempts() {
        let mut fixture = Fixture::new(&[1.0, 2.0]);
        let request = request(fixture.finish_size(), DistanceBounds::new(50.0, 60.0));
        assert_eq!(fixture.search(&RandomAllStrategy, &request).expect("search"), None);
    }

    #[test]
    fn test_unbounded_takes_first_draw() {
        let mut fixture = Fixture::new(&[1.0, 1000.0]);
        let request = request(fixture.finish_size(), DistanceBounds::default());
        assert!(fixture
            .search(&RandomAllStrategy, &request)
            .expect("search")
            .is_some());
    }

    #[test]
    fn test_missing_finish_terminal_is_an_error() {
        use crate::geometry::CellTemplate;
        let mut fixture = Fixture::new(&[1.0]);
        fixture.oracle = fixture
            .oracle
            .clone()
            .with_default_template(CellTemplate::soma_only().with_synapse_types(["GABA"]));
        let types = vec!["AMPA".to_string()];
        let mut request = request(fixture.finish_size(), DistanceBounds::default());
        request.synapse_types = &types;
        assert!(fixture.search(&RandomAllStrategy, &request).is_err());
    }
}
