//! Subtour cuts on intervals of the active tour.
//!
//! For a fixed start the interval grows one city at a time, so the cut value
//! `x(delta(S)) = sum_v x(delta(v)) - 2 x(E(S))` updates in the degree of the
//! new city.

use super::{CutTemplate, SepContext, Separator, SupportGraph};
use crate::cuts::CutSource;

/// Below this cut value an interval is reported.
const SEGMENT_TARGET: f64 = 2.0 - 1e-6;

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentCuts;

impl SegmentCuts {
    /// Violated intervals starting at tour position `start`.
    fn scan(
        support: &SupportGraph,
        tour: &[usize],
        perm: &[usize],
        start: usize,
    ) -> Vec<CutTemplate> {
        let n = tour.len();
        let half = n / 2;
        let mut out = Vec::new();
        let mut deg_sum = 0.0;
        let mut inside = 0.0;

        for len in 1..=half {
            // Complements of half-length intervals repeat from the other half.
            if n % 2 == 0 && len == half && start >= half {
                break;
            }
            let v = tour[(start + len - 1) % n];
            deg_sum += support.degree(v);
            for &(w, val) in support.neighbors(v) {
                let offset = (perm[w] + n - start) % n;
                if offset < len - 1 {
                    inside += val;
                }
            }
            if len >= 2 && deg_sum - 2.0 * inside < SEGMENT_TARGET {
                out.push(CutTemplate::Subtour {
                    nodes: (0..len).map(|i| tour[(start + i) % n]).collect(),
                    source: CutSource::Segment,
                });
            }
        }
        out
    }
}

impl Separator for SegmentCuts {
    fn name(&self) -> &'static str {
        "segments"
    }

    fn try_separate<'a>(
        &'a self,
        ctx: &'a SepContext<'a>,
    ) -> Box<dyn Iterator<Item = CutTemplate> + 'a> {
        let support = ctx.support();
        let tour = ctx.tour.nodes();
        let perm = ctx.tour.perm();
        Box::new((0..tour.len()).flat_map(move |start| Self::scan(&support, tour, &perm, start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Instance, Tour};

    #[test]
    fn test_finds_triangle_intervals() {
        let inst = Instance::random_euclidean(6, 2).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut x = vec![0.0; graph.edge_count()];
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            x[graph.find_edge_ind(u, v).unwrap()] = 1.0;
        }
        let tour = Tour::new((0..6).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);

        let found: Vec<CutTemplate> = SegmentCuts.try_separate(&ctx).collect();
        // {0,1,2} from start 0; {3,4,5} is its complement and is skipped.
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0],
            CutTemplate::Subtour {
                nodes: vec![0, 1, 2],
                source: CutSource::Segment
            }
        );
    }

    #[test]
    fn test_tour_point_has_no_segment_cuts() {
        let inst = Instance::random_euclidean(9, 4).unwrap();
        let graph = CoreGraph::complete(&inst);
        let tour = Tour::nearest_neighbor(&inst, 0).unwrap();
        let x = graph.tour_edge_vec(&tour).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);
        assert_eq!(SegmentCuts.try_separate(&ctx).count(), 0);
    }
}
