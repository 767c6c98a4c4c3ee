//! Subtour cuts on connected components of the support graph.

use super::{CutTemplate, SepContext, Separator};
use crate::cuts::CutSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectCuts;

impl Separator for ConnectCuts {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn try_separate<'a>(
        &'a self,
        ctx: &'a SepContext<'a>,
    ) -> Box<dyn Iterator<Item = CutTemplate> + 'a> {
        let mut comps = ctx.support().components(|_| true);
        if comps.len() < 2 {
            return Box::new(std::iter::empty());
        }
        // With two components the second is the complement of the first.
        if comps.len() == 2 {
            comps.truncate(1);
        }
        Box::new(comps.into_iter().map(|nodes| CutTemplate::Subtour {
            nodes,
            source: CutSource::Connect,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Instance, Tour};

    fn triangles(k: usize) -> (CoreGraph, Vec<f64>) {
        let inst = Instance::random_euclidean(3 * k, 5).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut x = vec![0.0; graph.edge_count()];
        for t in 0..k {
            let b = 3 * t;
            for (u, v) in [(b, b + 1), (b + 1, b + 2), (b, b + 2)] {
                x[graph.find_edge_ind(u, v).unwrap()] = 1.0;
            }
        }
        (graph, x)
    }

    #[test]
    fn test_two_components_give_one_cut() {
        let (graph, x) = triangles(2);
        let tour = Tour::new((0..6).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);
        let found: Vec<_> = ConnectCuts.try_separate(&ctx).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].violation(&ctx) > 1.9);
    }

    #[test]
    fn test_three_components() {
        let (graph, x) = triangles(3);
        let tour = Tour::new((0..9).collect()).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);
        assert_eq!(ConnectCuts.try_separate(&ctx).count(), 3);
    }
}
