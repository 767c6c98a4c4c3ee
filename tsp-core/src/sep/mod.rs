//! Cut separation.
//!
//! Each strategy inspects an LP point and lazily yields candidate cuts as
//! [`CutTemplate`]s over city lists. [`MetaCuts`] runs the strategies in
//! priority order, filters and ranks the candidates, and interns the
//! survivors into [`crate::cuts::ExternalCuts`].

mod blossom;
mod combs;
mod connect;
mod domino;
mod meta;
mod segments;
mod subtour;
mod support;

pub use blossom::FastBlossoms;
pub use combs::BlockCombs;
pub use connect::ConnectCuts;
pub use domino::SimpleDominos;
pub use meta::{MetaCuts, SepCut, StrategyStats};
pub use segments::SegmentCuts;
pub use subtour::ExactSubtours;
pub use support::SupportGraph;

use crate::cuts::{slack, CutId, CutShape, CutSource, DominoWitness, ExternalCuts};
use crate::error::TspResult;
use crate::lp::Sense;
use crate::model::{CoreGraph, EndPts, Tour};

/// Values below this are treated as absent from the support graph.
pub(crate) const SUPPORT_EPS: f64 = 1e-9;

/// Values above `1 - ONE_EPS` count as one.
pub(crate) const ONE_EPS: f64 = 1e-6;

/// An LP point to separate, with the tour that orders segment searches.
#[derive(Debug, Clone, Copy)]
pub struct SepContext<'a> {
    pub graph: &'a CoreGraph,
    pub x: &'a [f64],
    pub tour: &'a Tour,
}

impl<'a> SepContext<'a> {
    pub fn new(graph: &'a CoreGraph, x: &'a [f64], tour: &'a Tour) -> Self {
        Self { graph, x, tour }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn support(&self) -> SupportGraph {
        SupportGraph::new(self.graph, self.x, SUPPORT_EPS)
    }
}

/// A candidate cut before interning.
#[derive(Debug, Clone, PartialEq)]
pub enum CutTemplate {
    /// `x(delta(S)) >= 2`
    Subtour {
        nodes: Vec<usize>,
        source: CutSource,
    },

    /// `x(delta(H)) - 2 x(T) >= 1 - |T|`
    Blossom {
        handle: Vec<usize>,
        teeth: Vec<EndPts>,
    },

    /// `x(delta(H)) + sum_i x(delta(T_i)) >= 3t + 1`
    Comb {
        handle: Vec<usize>,
        teeth: Vec<Vec<usize>>,
    },

    /// Simple domino-parity.
    Domino(DominoWitness),
}

impl CutTemplate {
    pub fn source(&self) -> CutSource {
        match self {
            CutTemplate::Subtour { source, .. } => *source,
            CutTemplate::Blossom { .. } => CutSource::Blossom,
            CutTemplate::Comb { .. } => CutSource::Comb,
            CutTemplate::Domino(_) => CutSource::Domino,
        }
    }

    pub fn sense_rhs(&self) -> (Sense, f64) {
        match self {
            CutTemplate::Subtour { .. } => (Sense::Ge, 2.0),
            CutTemplate::Blossom { teeth, .. } => (Sense::Ge, 1.0 - teeth.len() as f64),
            CutTemplate::Comb { teeth, .. } => (Sense::Ge, 3.0 * teeth.len() as f64 + 1.0),
            CutTemplate::Domino(w) => (Sense::Le, w.rhs()),
        }
    }

    pub fn shape(&self, n: usize) -> CutShape {
        match self {
            CutTemplate::Subtour { nodes, .. } => CutShape::subtour(nodes, n),
            CutTemplate::Blossom { handle, teeth } => CutShape::blossom(handle, teeth, n),
            CutTemplate::Comb { handle, teeth } => CutShape::comb(handle, teeth, n),
            CutTemplate::Domino(w) => CutShape::domino(w, n),
        }
    }

    /// Violation at the context's LP point; positive means violated.
    pub fn violation(&self, ctx: &SepContext<'_>) -> f64 {
        let (sense, rhs) = self.sense_rhs();
        let act = self.shape(ctx.node_count()).activity(ctx.graph, ctx.x);
        -slack(sense, rhs, act)
    }

    /// Slack at the 0/1 point of `tour`.
    pub fn tour_slack(&self, tour: &Tour) -> f64 {
        let (sense, rhs) = self.sense_rhs();
        slack(sense, rhs, self.shape(tour.len()).tour_activity(tour))
    }

    /// Intern into the cut store, taking one reference.
    pub fn intern(&self, cuts: &mut ExternalCuts) -> TspResult<(CutId, bool)> {
        match self {
            CutTemplate::Subtour { nodes, source } => cuts.add_cut_subtour(nodes, *source),
            CutTemplate::Blossom { handle, teeth } => cuts.add_cut_blossom(handle, teeth),
            CutTemplate::Comb { handle, teeth } => cuts.add_cut_comb(handle, teeth),
            CutTemplate::Domino(w) => cuts.add_cut_domino(w),
        }
    }
}

/// A separation strategy.
pub trait Separator {
    fn name(&self) -> &'static str;

    /// Candidates for the point in `ctx`, produced on demand.
    fn try_separate<'a>(
        &'a self,
        ctx: &'a SepContext<'a>,
    ) -> Box<dyn Iterator<Item = CutTemplate> + 'a>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Instance;

    #[test]
    fn test_template_violation_two_triangles() {
        // Two disjoint triangles {0,1,2} and {3,4,5}
        let inst = Instance::random_euclidean(6, 1).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut x = vec![0.0; graph.edge_count()];
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            x[graph.find_edge_ind(u, v).unwrap()] = 1.0;
        }
        let tour = Tour::new((0..6).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);

        let tpl = CutTemplate::Subtour {
            nodes: vec![0, 1, 2],
            source: CutSource::Connect,
        };
        assert!((tpl.violation(&ctx) - 2.0).abs() < 1e-12);
        assert!(tpl.tour_slack(&tour).abs() < 1e-12);
    }
}
