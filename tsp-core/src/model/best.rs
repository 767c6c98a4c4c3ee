//! The incumbent bundle.

use super::{CoreGraph, Tour};
use crate::error::TspResult;

/// Best-known tour with the derived data separation and branching need.
#[derive(Debug, Clone)]
pub struct BestGroup {
    /// The tour itself.
    pub tour: Tour,

    /// Inverse permutation of `tour`.
    pub perm: Vec<usize>,

    /// 0/1 values of the tour over the core columns.
    pub edges: Vec<f64>,

    /// Tour length measured on core edge lengths.
    pub length: f64,
}

impl BestGroup {
    /// Bundle `tour` against `graph`; every tour edge must be a core edge.
    pub fn new(tour: Tour, graph: &CoreGraph) -> TspResult<Self> {
        let indices = graph.tour_edge_indices(&tour)?;
        let mut edges = vec![0.0; graph.edge_count()];
        let mut length = 0.0;
        for idx in indices {
            edges[idx] = 1.0;
            length += graph.edge(idx).len;
        }
        let perm = tour.perm();
        Ok(Self {
            tour,
            perm,
            edges,
            length,
        })
    }

    /// Recompute the edge vector after the core graph grew.
    pub fn refresh(&mut self, graph: &CoreGraph) -> TspResult<()> {
        *self = Self::new(self.tour.clone(), graph)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Instance;

    #[test]
    fn test_length_matches_instance() {
        let inst = Instance::random_euclidean(8, 3).unwrap();
        let graph = CoreGraph::complete(&inst);
        let tour = Tour::nearest_neighbor(&inst, 0).unwrap();
        let best = BestGroup::new(tour.clone(), &graph).unwrap();

        assert_eq!(best.length, tour.cost(&inst));
        assert_eq!(best.edges.iter().sum::<f64>(), 8.0);
        assert_eq!(best.perm[tour.nodes()[3]], 3);
    }
}
