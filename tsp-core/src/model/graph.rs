//! Working edge set of the core LP.
//!
//! The position of an edge in [`CoreGraph::edges`] is its LP column index.

use std::collections::HashMap;

use super::{Instance, Tour};
use crate::error::{TspError, TspResult};

/// Unordered pair of cities, stored with `end0 < end1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndPts {
    /// Smaller endpoint.
    pub end0: usize,

    /// Larger endpoint.
    pub end1: usize,
}

impl EndPts {
    /// Normalize an unordered pair.
    pub fn new(u: usize, v: usize) -> Self {
        if u < v {
            Self { end0: u, end1: v }
        } else {
            Self { end0: v, end1: u }
        }
    }

    /// The endpoint that is not `v`.
    pub fn other(&self, v: usize) -> usize {
        if self.end0 == v {
            self.end1
        } else {
            self.end0
        }
    }

    /// True if `v` is one of the endpoints.
    pub fn touches(&self, v: usize) -> bool {
        self.end0 == v || self.end1 == v
    }
}

/// A core edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Endpoints.
    pub ends: EndPts,

    /// Edge length (LP objective coefficient).
    pub len: f64,
}

/// Adjacency entry: neighbor city and the edge index that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjEntry {
    pub other_end: usize,
    pub edge_index: usize,
}

/// Sparse graph of core edges with endpoint lookup.
#[derive(Debug, Clone)]
pub struct CoreGraph {
    node_count: usize,
    edges: Vec<Edge>,
    index: HashMap<EndPts, usize>,
    adj: Vec<Vec<AdjEntry>>,
}

impl CoreGraph {
    /// Empty graph on `node_count` cities.
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: Vec::new(),
            index: HashMap::new(),
            adj: vec![Vec::new(); node_count],
        }
    }

    /// All city pairs of `inst`.
    pub fn complete(inst: &Instance) -> Self {
        let n = inst.num_nodes();
        let mut graph = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                graph.push_edge(EndPts::new(i, j), inst.cost(i, j));
            }
        }
        graph
    }

    /// Union of every city's `k` cheapest neighbors.
    pub fn nearest(inst: &Instance, k: usize) -> Self {
        let n = inst.num_nodes();
        let mut graph = Self::new(n);
        for i in 0..n {
            let mut nbrs: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            nbrs.sort_by(|&a, &b| inst.cost(i, a).total_cmp(&inst.cost(i, b)));
            for &j in nbrs.iter().take(k) {
                graph.add_edge(i, j, inst.cost(i, j));
            }
        }
        graph
    }

    /// Add `{u, v}` unless present; returns its index either way.
    pub fn add_edge(&mut self, u: usize, v: usize, len: f64) -> usize {
        let ends = EndPts::new(u, v);
        match self.index.get(&ends) {
            Some(&idx) => idx,
            None => self.push_edge(ends, len),
        }
    }

    fn push_edge(&mut self, ends: EndPts, len: f64) -> usize {
        let idx = self.edges.len();
        self.edges.push(Edge { ends, len });
        self.index.insert(ends, idx);
        self.adj[ends.end0].push(AdjEntry {
            other_end: ends.end1,
            edge_index: idx,
        });
        self.adj[ends.end1].push(AdjEntry {
            other_end: ends.end0,
            edge_index: idx,
        });
        idx
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    /// Column index of `{u, v}`, if it is a core edge.
    pub fn find_edge_ind(&self, u: usize, v: usize) -> Option<usize> {
        self.index.get(&EndPts::new(u, v)).copied()
    }

    /// True once every city pair is a core edge.
    pub fn is_complete(&self) -> bool {
        let n = self.node_count;
        self.edges.len() == n * n.saturating_sub(1) / 2
    }

    /// City pairs that are not core edges.
    pub fn missing_edges(&self) -> Vec<EndPts> {
        let n = self.node_count;
        (0..n)
            .flat_map(|u| ((u + 1)..n).map(move |v| EndPts::new(u, v)))
            .filter(|e| !self.index.contains_key(e))
            .collect()
    }

    /// Neighbors of `v`.
    pub fn adjacency(&self, v: usize) -> &[AdjEntry] {
        &self.adj[v]
    }

    /// Column indices of the tour's edges, in tour order.
    pub fn tour_edge_indices(&self, tour: &Tour) -> TspResult<Vec<usize>> {
        tour.edges()
            .map(|e| {
                self.index.get(&e).copied().ok_or_else(|| {
                    TspError::InconsistentState(format!(
                        "tour edge ({}, {}) is not in the core graph",
                        e.end0, e.end1
                    ))
                })
            })
            .collect()
    }

    /// 0/1 edge vector of `tour` over the core columns.
    pub fn tour_edge_vec(&self, tour: &Tour) -> TspResult<Vec<f64>> {
        let mut x = vec![0.0; self.edges.len()];
        for idx in self.tour_edge_indices(tour)? {
            x[idx] = 1.0;
        }
        Ok(x)
    }
}
