//! Simple domino-parity heuristic.
//!
//! Starts from the same fractional handles as the blossom heuristic, but
//! grows each tooth body along the path of edges at one that leaves the
//! handle. Bodies are kept disjoint; with an even count the longest tooth
//! is dropped to restore parity.

use super::blossom::{fractional_handles, is_one};
use super::{CutTemplate, SepContext, Separator, SupportGraph};
use crate::cuts::{DominoWitness, WitnessTooth};

/// Longest tooth body grown by default.
const DEFAULT_MAX_BODY: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SimpleDominos {
    max_body: usize,
}

impl Default for SimpleDominos {
    fn default() -> Self {
        Self {
            max_body: DEFAULT_MAX_BODY,
        }
    }
}

impl SimpleDominos {
    /// Cap tooth bodies at `max_body` cities (at least one).
    pub fn with_max_body(max_body: usize) -> Self {
        Self {
            max_body: max_body.max(1),
        }
    }

    fn witness(&self, support: &SupportGraph, handle: Vec<usize>) -> Option<DominoWitness> {
        let n = support.node_count();
        let mut used = vec![false; n];
        for &v in &handle {
            used[v] = true;
        }

        let mut teeth = Vec::new();
        for &root in &handle {
            for &(w, val) in support.neighbors(root) {
                if !is_one(val) || used[w] {
                    continue;
                }
                used[w] = true;
                let mut body = vec![w];
                let (mut prev, mut cur) = (root, w);
                while body.len() < self.max_body {
                    let next = support
                        .neighbors(cur)
                        .iter()
                        .find(|&&(u, x)| is_one(x) && u != prev && !used[u])
                        .map(|&(u, _)| u);
                    match next {
                        Some(u) => {
                            used[u] = true;
                            body.push(u);
                            prev = cur;
                            cur = u;
                        }
                        None => break,
                    }
                }
                teeth.push(WitnessTooth { root, body });
            }
        }

        if teeth.len() % 2 == 0 {
            let longest = teeth
                .iter()
                .enumerate()
                .max_by_key(|(_, t)| t.body.len())
                .map(|(i, _)| i)?;
            teeth.remove(longest);
        }
        if teeth.is_empty() || teeth.iter().any(|t| t.body.len() + 1 >= n) {
            return None;
        }

        Some(DominoWitness {
            handle,
            teeth,
            nonneg: Vec::new(),
        })
    }
}

impl Separator for SimpleDominos {
    fn name(&self) -> &'static str {
        "simple_domino"
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
                .filter_map(move |h| self.witness(&support, h))
                .map(CutTemplate::Domino),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Tour};

    /// Fractional triangle {0,1,2} with teeth paths 0-3-6, 1-4-7, 2-5-8,
    /// and a fractional triangle {6,7,8} closing the paths.
    fn comb_point() -> (CoreGraph, Vec<f64>) {
        let mut graph = CoreGraph::new(9);
        let mut x = Vec::new();
        for (u, v) in [(0, 1), (1, 2), (0, 2), (6, 7), (7, 8), (6, 8)] {
            graph.add_edge(u, v, 1.0);
            x.push(0.5);
        }
        for (u, v) in [(0, 3), (3, 6), (1, 4), (4, 7), (2, 5), (5, 8)] {
            graph.add_edge(u, v, 1.0);
            x.push(1.0);
        }
        (graph, x)
    }

    #[test]
    fn test_grows_teeth_along_paths() {
        let (graph, x) = comb_point();
        let tour = Tour::new(vec![0, 1, 2, 5, 8, 7, 4, 3, 6]).unwrap();
        let ctx = SepContext::new(&graph, &x, &tour);

        let sep = SimpleDominos::with_max_body(2);
        let found: Vec<CutTemplate> = sep.try_separate(&ctx).collect();
        assert_eq!(found.len(), 2);
        for tpl in &found {
            let CutTemplate::Domino(w) = tpl else {
                panic!("expected a domino");
            };
            assert_eq!(w.teeth.len(), 3);
            assert!(w.teeth.iter().all(|t| t.body.len() == 2));
            assert!((tpl.violation(&ctx) - 0.5).abs() < 1e-9);
            assert!(tpl.tour_slack(&tour) >= 0.0);
        }
    }

    #[test]
    fn test_even_teeth_drop_longest() {
        let mut graph = CoreGraph::new(7);
        graph.add_edge(0, 1, 1.0);
        graph.add_edge(0, 2, 1.0);
        graph.add_edge(2, 3, 1.0);
        graph.add_edge(1, 4, 1.0);
        let x = [0.5, 1.0, 1.0, 1.0];
        let support = SupportGraph::new(&graph, &x, 1e-9);
        let w = SimpleDominos::default()
            .witness(&support, vec![0, 1])
            .unwrap();
        assert_eq!(w.teeth.len(), 1);
        assert_eq!(w.teeth[0].body, vec![4]);
    }
}
