//! Column-independent cut representation.
//!
//! A [`HyperGraph`] names its support through clique and tooth ids, so the
//! coefficient of any edge follows from the edge's endpoints alone. That is
//! what lets one stored cut be materialized against different column sets.

use std::collections::{HashMap, HashSet};

use super::clique::CliqueId;
use super::tooth::ToothId;
use crate::error::TspResult;
use crate::lp::{Sense, SparseRow};
use crate::model::{CoreGraph, EndPts, Tour};

/// Which separator produced a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutSource {
    /// Subtour on an interval of the active tour.
    Segment,
    /// Subtour on a connected component of the support graph.
    Connect,
    /// Subtour from a global minimum cut.
    ExactSubtour,
    /// Two-matching blossom.
    Blossom,
    /// Comb with a block of the fractional support graph as handle.
    Comb,
    /// Simple domino-parity.
    Domino,
    /// Supplied from outside the engine.
    External,
}

/// Support of a cut.
#[derive(Debug, Clone, PartialEq)]
pub enum CutBody {
    /// `sum_i c_i x(delta(C_i)) + sum_e d_e x_e`
    Standard {
        cliques: Vec<(CliqueId, f64)>,
        edges: Vec<(EndPts, f64)>,
    },

    /// Handle, simple teeth and non-negativity edges, rounded by
    /// Chvatal-Gomory after halving.
    Domino {
        handle: CliqueId,
        teeth: Vec<ToothId>,
        nonneg: Vec<EndPts>,
    },
}

/// A stored cut.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperGraph {
    pub sense: Sense,
    pub rhs: f64,
    pub body: CutBody,
    pub source: CutSource,
}

/// Dedup key: the cut with coefficients as bit patterns and terms sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CutKey {
    sense: Sense,
    rhs: u64,
    body: KeyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyBody {
    Standard(Vec<(CliqueId, u64)>, Vec<(EndPts, u64)>),
    Domino(CliqueId, Vec<ToothId>, Vec<EndPts>),
}

impl HyperGraph {
    pub(crate) fn key(&self) -> CutKey {
        let body = match &self.body {
            CutBody::Standard { cliques, edges } => {
                let mut c: Vec<(CliqueId, u64)> =
                    cliques.iter().map(|&(id, a)| (id, a.to_bits())).collect();
                let mut e: Vec<(EndPts, u64)> =
                    edges.iter().map(|&(ends, a)| (ends, a.to_bits())).collect();
                c.sort_unstable();
                e.sort_unstable();
                KeyBody::Standard(c, e)
            }
            CutBody::Domino {
                handle,
                teeth,
                nonneg,
            } => {
                let mut t = teeth.clone();
                let mut z = nonneg.clone();
                t.sort_unstable();
                z.sort_unstable();
                KeyBody::Domino(*handle, t, z)
            }
        };
        CutKey {
            sense: self.sense,
            rhs: self.rhs.to_bits(),
            body,
        }
    }
}

/// One tooth of a domino witness, by city lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessTooth {
    pub root: usize,
    pub body: Vec<usize>,
}

/// Handle, teeth and non-negativity edges of a simple domino-parity cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominoWitness {
    pub handle: Vec<usize>,
    pub teeth: Vec<WitnessTooth>,
    pub nonneg: Vec<EndPts>,
}

impl DominoWitness {
    /// Right-hand side after halving and rounding down.
    pub fn rhs(&self) -> f64 {
        domino_rhs(
            self.handle.len(),
            self.teeth.iter().map(|t| t.body.len()),
        )
    }
}

/// `floor((2|H| + sum_j (2|B_j| - 1)) / 2)`
pub(crate) fn domino_rhs(handle_size: usize, body_sizes: impl Iterator<Item = usize>) -> f64 {
    let raw: i64 = 2 * handle_size as i64 + body_sizes.map(|b| 2 * b as i64 - 1).sum::<i64>();
    raw.div_euclid(2) as f64
}

/// Membership-resolved coefficient rule shared by stored cuts and
/// separation candidates.
#[derive(Debug, Clone)]
pub enum CutShape {
    Standard {
        sets: Vec<(Vec<bool>, f64)>,
        edges: HashMap<EndPts, f64>,
    },
    Domino {
        handle: Vec<bool>,
        teeth: Vec<(usize, Vec<bool>)>,
        nonneg: HashSet<EndPts>,
    },
}

impl CutShape {
    /// Subtour shape `x(delta(S))`.
    pub fn subtour(nodes: &[usize], n: usize) -> Self {
        CutShape::Standard {
            sets: vec![(marks(nodes, n), 1.0)],
            edges: HashMap::new(),
        }
    }

    /// Blossom shape `x(delta(H)) - 2 x(T)`.
    pub fn blossom(handle: &[usize], teeth: &[EndPts], n: usize) -> Self {
        CutShape::Standard {
            sets: vec![(marks(handle, n), 1.0)],
            edges: teeth.iter().map(|&e| (e, -2.0)).collect(),
        }
    }

    /// Comb shape `x(delta(H)) + sum_i x(delta(T_i))`.
    pub fn comb(handle: &[usize], teeth: &[Vec<usize>], n: usize) -> Self {
        let mut sets = Vec::with_capacity(teeth.len() + 1);
        sets.push((marks(handle, n), 1.0));
        sets.extend(teeth.iter().map(|t| (marks(t, n), 1.0)));
        CutShape::Standard {
            sets,
            edges: HashMap::new(),
        }
    }

    /// Domino shape from city lists.
    pub fn domino(witness: &DominoWitness, n: usize) -> Self {
        CutShape::Domino {
            handle: marks(&witness.handle, n),
            teeth: witness
                .teeth
                .iter()
                .map(|t| (t.root, marks(&t.body, n)))
                .collect(),
            nonneg: witness.nonneg.iter().copied().collect(),
        }
    }

    /// Coefficient of the edge `ends`.
    pub fn coef(&self, ends: EndPts) -> f64 {
        let (u, v) = (ends.end0, ends.end1);
        match self {
            CutShape::Standard { sets, edges } => {
                let crossing: f64 = sets
                    .iter()
                    .filter(|(m, _)| m[u] != m[v])
                    .map(|&(_, c)| c)
                    .sum();
                crossing + edges.get(&ends).copied().unwrap_or(0.0)
            }
            CutShape::Domino {
                handle,
                teeth,
                nonneg,
            } => {
                let mut a = handle[u] as i64 + handle[v] as i64;
                for (root, body) in teeth {
                    if body[u] && body[v] {
                        a += 2;
                    } else if (*root == u && body[v]) || (*root == v && body[u]) {
                        a += 1;
                    }
                }
                if nonneg.contains(&ends) {
                    a -= 1;
                }
                a.div_euclid(2) as f64
            }
        }
    }

    /// `a^T x` over the core columns.
    pub fn activity(&self, graph: &CoreGraph, x: &[f64]) -> f64 {
        graph
            .edges()
            .iter()
            .zip(x)
            .filter(|(_, &val)| val != 0.0)
            .map(|(e, &val)| self.coef(e.ends) * val)
            .sum()
    }

    /// `a^T x` at the 0/1 point of a tour.
    pub fn tour_activity(&self, tour: &Tour) -> f64 {
        tour.edges().map(|e| self.coef(e)).sum()
    }

    /// Materialize against the columns of `graph`.
    pub fn row(&self, graph: &CoreGraph, sense: Sense, rhs: f64) -> TspResult<SparseRow> {
        SparseRow::new(
            graph.edge_count(),
            sense,
            rhs,
            graph
                .edges()
                .iter()
                .enumerate()
                .map(|(idx, e)| (idx, self.coef(e.ends))),
        )
    }
}

fn marks(nodes: &[usize], n: usize) -> Vec<bool> {
    let mut m = vec![false; n];
    for &v in nodes {
        m[v] = true;
    }
    m
}

/// Slack of `activity` against `(sense, rhs)`: nonnegative when satisfied.
pub fn slack(sense: Sense, rhs: f64, activity: f64) -> f64 {
    match sense {
        Sense::Le => rhs - activity,
        Sense::Ge => activity - rhs,
        Sense::Eq => -(activity - rhs).abs(),
    }
}
