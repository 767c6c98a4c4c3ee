//! Weighted support graph of an LP point.

use crate::model::{CoreGraph, EndPts};

/// Edges with `x > eps`, as adjacency lists of `(neighbor, x)`.
#[derive(Debug, Clone)]
pub struct SupportGraph {
    adj: Vec<Vec<(usize, f64)>>,
}

impl SupportGraph {
    pub fn new(graph: &CoreGraph, x: &[f64], eps: f64) -> Self {
        let mut adj = vec![Vec::new(); graph.node_count()];
        for (e, &val) in graph.edges().iter().zip(x) {
            if val > eps {
                adj[e.ends.end0].push((e.ends.end1, val));
                adj[e.ends.end1].push((e.ends.end0, val));
            }
        }
        Self { adj }
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn neighbors(&self, v: usize) -> &[(usize, f64)] {
        &self.adj[v]
    }

    /// `x(delta(v))`
    pub fn degree(&self, v: usize) -> f64 {
        self.adj[v].iter().map(|&(_, w)| w).sum()
    }

    /// Connected components using only edges whose value passes `keep`.
    ///
    /// Cities with no kept edge form singleton components.
    pub fn components(&self, keep: impl Fn(f64) -> bool) -> Vec<Vec<usize>> {
        let n = self.adj.len();
        let mut comp = vec![usize::MAX; n];
        let mut out: Vec<Vec<usize>> = Vec::new();
        let mut stack = Vec::new();

        for s in 0..n {
            if comp[s] != usize::MAX {
                continue;
            }
            let id = out.len();
            comp[s] = id;
            stack.push(s);
            let mut members = Vec::new();
            while let Some(v) = stack.pop() {
                members.push(v);
                for &(w, val) in &self.adj[v] {
                    if keep(val) && comp[w] == usize::MAX {
                        comp[w] = id;
                        stack.push(w);
                    }
                }
            }
            out.push(members);
        }
        out
    }

    /// Kept edges with exactly one end in `marks`.
    pub fn boundary(&self, marks: &[bool], keep: impl Fn(f64) -> bool) -> Vec<EndPts> {
        let mut out = Vec::new();
        for (v, nbrs) in self.adj.iter().enumerate() {
            if !marks[v] {
                continue;
            }
            for &(w, val) in nbrs {
                if !marks[w] && keep(val) {
                    out.push(EndPts::new(v, w));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_and_boundary() {
        let mut g = CoreGraph::new(5);
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 2, 1.0);
        g.add_edge(3, 4, 1.0);
        g.add_edge(2, 3, 1.0);
        let x = [1.0, 0.5, 1.0, 0.0];
        let support = SupportGraph::new(&g, &x, 1e-9);

        let comps = support.components(|_| true);
        assert_eq!(comps.len(), 2);

        let ones = support.components(|v| v > 0.99);
        assert_eq!(ones.len(), 3);

        let marks = [true, true, false, false, false];
        assert_eq!(support.boundary(&marks, |_| true), vec![EndPts::new(1, 2)]);
        assert_eq!(support.degree(1), 1.5);
    }
}
