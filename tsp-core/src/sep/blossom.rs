//! Fast blossom heuristic.
//!
//! Handles are the components of the graph of fractional edges. Teeth are
//! the edges at one that leave the handle. A city outside the handle that
//! is hit by two teeth is pulled into the handle and both teeth dropped.

use super::{CutTemplate, SepContext, Separator, SupportGraph, ONE_EPS};

#[derive(Debug, Clone, Copy, Default)]
pub struct FastBlossoms;

fn is_fractional(val: f64) -> bool {
    val < 1.0 - ONE_EPS
}

pub(crate) fn is_one(val: f64) -> bool {
    val >= 1.0 - ONE_EPS
}

/// Blossom on `handle`, if its teeth can be made disjoint and odd.
pub(crate) fn blossom_from_handle(
    support: &SupportGraph,
    mut handle: Vec<usize>,
) -> Option<CutTemplate> {
    let n = support.node_count();
    let mut marks = vec![false; n];
    for &v in &handle {
        marks[v] = true;
    }

    loop {
        let teeth = support.boundary(&marks, is_one);
        let mut hits = vec![0usize; n];
        for e in &teeth {
            let outside = if marks[e.end0] { e.end1 } else { e.end0 };
            hits[outside] += 1;
        }
        let shared: Vec<usize> = (0..n).filter(|&v| hits[v] > 1).collect();
        if shared.is_empty() {
            if teeth.len() % 2 == 1 && handle.len() < n {
                return Some(CutTemplate::Blossom { handle, teeth });
            }
            return None;
        }
        for v in shared {
            marks[v] = true;
            handle.push(v);
        }
        if handle.len() + 1 >= n {
            return None;
        }
    }
}

/// Components of the fractional-edge graph with at least two cities.
pub(crate) fn fractional_handles(support: &SupportGraph) -> Vec<Vec<usize>> {
    support
        .components(is_fractional)
        .into_iter()
        .filter(|c| c.len() >= 2)
        .collect()
}

impl Separator for FastBlossoms {
    fn name(&self) -> &'static str {
        "fast_blossom"
    }

    fn try_separate<'a>(
        &'a self,
        ctx: &'a SepContext<'a>,
    ) -> Box<dyn Iterator<Item = CutTemplate> + 'a> {
        let support = ctx.support();
        let handles = fractional_handles(&support);
        Box::new(
            handles
                .into_iter()
                .filter_map(move |h| blossom_from_handle(&support, h)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Tour};

    /// Classic 2-matching point on 6 cities: a fractional triangle
    /// {0,1,2} at 1/2 with teeth (0,3), (1,4), (2,5) at one and a
    /// fractional triangle {3,4,5} at 1/2.
    fn two_matching_point() -> (CoreGraph, Vec<f64>) {
        let mut graph = CoreGraph::new(6);
        let mut x = Vec::new();
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            graph.add_edge(u, v, 1.0);
            x.push(0.5);
        }
        for (u, v) in [(0, 3), (1, 4), (2, 5)] {
            graph.add_edge(u, v, 1.0);
            x.push(1.0);
        }
        (graph, x)
    }

    #[test]
    fn test_separates_two_matching_point() {
        let (graph, x) = two_matching_point();
        let tour = Tour::new(vec![0, 1, 2, 5, 4, 3]).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);

        let found: Vec<CutTemplate> = FastBlossoms.try_separate(&ctx).collect();
        assert_eq!(found.len(), 2);
        for tpl in &found {
            // x(delta(H)) = 3, x(T) = 3, rhs = -2: 3 - 6 = -3 < -2
            assert!((tpl.violation(&ctx) - 1.0).abs() < 1e-9);
            assert!(tpl.tour_slack(&tour) >= 0.0);
        }
    }

    #[test]
    fn test_even_teeth_rejected() {
        let mut graph = CoreGraph::new(6);
        graph.add_edge(0, 1, 1.0);
        graph.add_edge(0, 2, 1.0);
        graph.add_edge(1, 3, 1.0);
        let x = [0.5, 1.0, 1.0];
        let support = SupportGraph::new(&graph, &x, 1e-9);
        assert!(blossom_from_handle(&support, vec![0, 1]).is_none());
    }
}
