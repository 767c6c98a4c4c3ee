//! Validated Hamiltonian cycles.

use super::{CoreGraph, EndPts, Instance};
use crate::error::{TspError, TspResult};

/// A cyclic ordering of all cities, each exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    nodes: Vec<usize>,
}

impl Tour {
    /// Validate that `nodes` is a permutation of `0..nodes.len()`.
    pub fn new(nodes: Vec<usize>) -> TspResult<Self> {
        let n = nodes.len();
        if n < 3 {
            return Err(TspError::InvalidTour(format!(
                "a tour needs at least 3 cities, got {}",
                n
            )));
        }
        let mut seen = vec![false; n];
        for &v in &nodes {
            if v >= n {
                return Err(TspError::InvalidTour(format!(
                    "city {} out of range for {} cities",
                    v, n
                )));
            }
            if seen[v] {
                return Err(TspError::InvalidTour(format!("city {} visited twice", v)));
            }
            seen[v] = true;
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inverse permutation: `perm()[city]` is the city's position.
    pub fn perm(&self) -> Vec<usize> {
        let mut perm = vec![0; self.nodes.len()];
        for (pos, &v) in self.nodes.iter().enumerate() {
            perm[v] = pos;
        }
        perm
    }

    /// Tour edges in order, closing back to the first city.
    pub fn edges(&self) -> impl Iterator<Item = EndPts> + '_ {
        let n = self.nodes.len();
        (0..n).map(move |i| EndPts::new(self.nodes[i], self.nodes[(i + 1) % n]))
    }

    /// Tour length under `inst`.
    pub fn cost(&self, inst: &Instance) -> f64 {
        inst.tour_cost(&self.nodes)
    }

    /// Recover a tour from an integral LP edge vector.
    ///
    /// Fails with [`TspError::InvalidTour`] if some value is fractional,
    /// a city does not have degree two, or the support is not one cycle.
    pub fn from_edge_values(graph: &CoreGraph, x: &[f64], tol: f64) -> TspResult<Self> {
        let n = graph.node_count();
        let mut nbrs: Vec<Vec<usize>> = vec![Vec::with_capacity(2); n];

        for (idx, &val) in x.iter().enumerate() {
            if val > tol && val < 1.0 - tol {
                return Err(TspError::InvalidTour(format!(
                    "edge {} has fractional value {}",
                    idx, val
                )));
            }
            if val >= 1.0 - tol {
                let ends = graph.edge(idx).ends;
                nbrs[ends.end0].push(ends.end1);
                nbrs[ends.end1].push(ends.end0);
            }
        }

        if let Some(v) = (0..n).find(|&v| nbrs[v].len() != 2) {
            return Err(TspError::InvalidTour(format!(
                "city {} has degree {}",
                v,
                nbrs[v].len()
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        let mut prev = usize::MAX;
        let mut cur = 0;
        loop {
            nodes.push(cur);
            let next = if nbrs[cur][0] != prev {
                nbrs[cur][0]
            } else {
                nbrs[cur][1]
            };
            prev = cur;
            cur = next;
            if cur == 0 || nodes.len() > n {
                break;
            }
        }

        if nodes.len() != n {
            return Err(TspError::InvalidTour(format!(
                "support splits into subtours (first has {} of {} cities)",
                nodes.len(),
                n
            )));
        }
        Self::new(nodes)
    }

    /// Greedy nearest-neighbor tour starting at `start`.
    pub fn nearest_neighbor(inst: &Instance, start: usize) -> TspResult<Self> {
        let n = inst.num_nodes();
        if start >= n {
            return Err(TspError::InvalidTour(format!(
                "start city {} out of range",
                start
            )));
        }
        let mut visited = vec![false; n];
        let mut nodes = Vec::with_capacity(n);
        let mut cur = start;
        visited[cur] = true;
        nodes.push(cur);

        while nodes.len() < n {
            let next = (0..n)
                .filter(|&j| !visited[j])
                .min_by(|&a, &b| inst.cost(cur, a).total_cmp(&inst.cost(cur, b)))
                .ok_or_else(|| TspError::InconsistentState("no unvisited city left".into()))?;
            visited[next] = true;
            nodes.push(next);
            cur = next;
        }
        Self::new(nodes)
    }
}
