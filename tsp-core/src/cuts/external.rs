//! Store of hypergraph cuts shared across the search tree.
//!
//! Every live cut holds one reference to each clique and tooth it names.
//! Callers hold references to cuts; when the last one goes, the cut's
//! clique and tooth references are released with it.

use super::arena::InternArena;
use super::clique::{CliqueBank, CliqueId, ExternalClique};
use super::hypergraph::{
    domino_rhs, slack, CutBody, CutKey, CutShape, CutSource, DominoWitness, HyperGraph,
};
use super::tooth::{ToothBank, ToothId};
use crate::error::{TspError, TspResult};
use crate::lp::{Sense, SparseRow};
use crate::model::{CoreGraph, EndPts, Tour};

/// Stable handle to a stored cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CutId(usize);

impl CutId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A cut in the external library format: clique multipliers over segments
/// of the tour that was current when it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCut {
    pub sense: Sense,
    pub rhs: f64,
    pub cliques: Vec<(ExternalClique, f64)>,
}

/// Banks plus the cut store.
#[derive(Debug, Clone)]
pub struct ExternalCuts {
    cliques: CliqueBank,
    teeth: ToothBank,
    keys: InternArena<CutKey>,
    cuts: Vec<Option<HyperGraph>>,
}

impl ExternalCuts {
    /// Empty store whose banks are keyed on `reference`.
    pub fn new(reference: &Tour) -> Self {
        Self {
            cliques: CliqueBank::new(reference),
            teeth: ToothBank::new(reference),
            keys: InternArena::default(),
            cuts: Vec::new(),
        }
    }

    pub fn cliques(&self) -> &CliqueBank {
        &self.cliques
    }

    pub fn teeth(&self) -> &ToothBank {
        &self.teeth
    }

    pub fn node_count(&self) -> usize {
        self.cliques.saved_tour().len()
    }

    /// Store a cut whose clique and tooth references are already held on
    /// its behalf. Ownership of those references moves into the store.
    ///
    /// Returns the id and whether the cut was new. A duplicate gives back
    /// the extra references and bumps the existing cut's count instead.
    pub fn add_cut_hypergraph(&mut self, cut: HyperGraph) -> TspResult<(CutId, bool)> {
        self.check_live(&cut)?;
        let (idx, is_new) = self.keys.intern(cut.key());
        if is_new {
            if self.cuts.len() <= idx {
                self.cuts.resize(idx + 1, None);
            }
            self.cuts[idx] = Some(cut);
        } else {
            self.release_parts(&cut.body)?;
        }
        Ok((CutId(idx), is_new))
    }

    /// Subtour cut `x(delta(S)) >= 2`.
    pub fn add_cut_subtour(
        &mut self,
        nodes: &[usize],
        source: CutSource,
    ) -> TspResult<(CutId, bool)> {
        let clique = self.cliques.add_clique_nodes(nodes)?;
        self.add_cut_hypergraph(HyperGraph {
            sense: Sense::Ge,
            rhs: 2.0,
            body: CutBody::Standard {
                cliques: vec![(clique, 1.0)],
                edges: Vec::new(),
            },
            source,
        })
    }

    /// Blossom `x(delta(H)) - 2 x(T) >= 1 - |T|`.
    ///
    /// Teeth must be an odd number of pairwise disjoint edges, each with
    /// exactly one end in the handle.
    pub fn add_cut_blossom(
        &mut self,
        handle: &[usize],
        teeth: &[EndPts],
    ) -> TspResult<(CutId, bool)> {
        let n = self.node_count();
        if teeth.len() % 2 == 0 {
            return Err(TspError::InvalidRow(format!(
                "blossom with {} teeth",
                teeth.len()
            )));
        }
        let mut in_handle = vec![false; n];
        for &v in handle {
            if v < n {
                in_handle[v] = true;
            }
        }
        let mut used = vec![false; n];
        for e in teeth {
            if e.end1 >= n || in_handle[e.end0] == in_handle[e.end1] {
                return Err(TspError::InvalidRow(format!(
                    "tooth ({}, {}) does not cross the handle",
                    e.end0, e.end1
                )));
            }
            if used[e.end0] || used[e.end1] {
                return Err(TspError::InvalidRow(format!(
                    "tooth ({}, {}) overlaps another tooth",
                    e.end0, e.end1
                )));
            }
            used[e.end0] = true;
            used[e.end1] = true;
        }

        let clique = self.cliques.add_clique_nodes(handle)?;
        self.add_cut_hypergraph(HyperGraph {
            sense: Sense::Ge,
            rhs: 1.0 - teeth.len() as f64,
            body: CutBody::Standard {
                cliques: vec![(clique, 1.0)],
                edges: teeth.iter().map(|&e| (e, -2.0)).collect(),
            },
            source: CutSource::Blossom,
        })
    }

    /// Comb `x(delta(H)) + sum_i x(delta(T_i)) >= 3t + 1`.
    ///
    /// Teeth must be an odd number, at least three, of pairwise disjoint
    /// sets, each meeting the handle and its complement.
    pub fn add_cut_comb(
        &mut self,
        handle: &[usize],
        teeth: &[Vec<usize>],
    ) -> TspResult<(CutId, bool)> {
        let n = self.node_count();
        if teeth.len() < 3 || teeth.len() % 2 == 0 {
            return Err(TspError::InvalidRow(format!("comb with {} teeth", teeth.len())));
        }
        let mut in_handle = vec![false; n];
        for &v in handle {
            if v >= n {
                return Err(TspError::InvalidRow(format!("city {} out of range", v)));
            }
            in_handle[v] = true;
        }
        let mut used = vec![false; n];
        for tooth in teeth {
            let (mut inside, mut outside) = (false, false);
            for &v in tooth {
                if v >= n || used[v] {
                    return Err(TspError::InvalidRow(format!(
                        "city {} is out of range or in two teeth",
                        v
                    )));
                }
                used[v] = true;
                if in_handle[v] {
                    inside = true;
                } else {
                    outside = true;
                }
            }
            if !(inside && outside) {
                return Err(TspError::InvalidRow(
                    "comb tooth does not cross the handle".into(),
                ));
            }
        }

        let mut taken: Vec<CliqueId> = Vec::with_capacity(teeth.len() + 1);
        for nodes in std::iter::once(handle).chain(teeth.iter().map(Vec::as_slice)) {
            match self.cliques.add_clique_nodes(nodes) {
                Ok(id) => taken.push(id),
                Err(err) => {
                    self.unwind(&taken, &[])?;
                    return Err(err);
                }
            }
        }
        self.add_cut_hypergraph(HyperGraph {
            sense: Sense::Ge,
            rhs: 3.0 * teeth.len() as f64 + 1.0,
            body: CutBody::Standard {
                cliques: taken.into_iter().map(|id| (id, 1.0)).collect(),
                edges: Vec::new(),
            },
            source: CutSource::Comb,
        })
    }

    /// Simple domino-parity cut from a witness.
    pub fn add_cut_domino(&mut self, witness: &DominoWitness) -> TspResult<(CutId, bool)> {
        if witness.teeth.len() % 2 == 0 {
            return Err(TspError::InvalidRow(format!(
                "domino with {} teeth",
                witness.teeth.len()
            )));
        }
        let handle = self.cliques.add_clique_nodes(&witness.handle)?;

        let mut teeth = Vec::with_capacity(witness.teeth.len());
        for t in &witness.teeth {
            match self.teeth.add_tooth(t.root, &t.body) {
                Ok(id) => teeth.push(id),
                Err(err) => {
                    self.unwind(&[handle], &teeth)?;
                    return Err(err);
                }
            }
        }

        let sizes: Vec<usize> = teeth
            .iter()
            .map(|&id| self.teeth.body_size(id))
            .collect::<TspResult<_>>()?;
        let rhs = domino_rhs(witness.handle.len(), sizes.into_iter());

        let mut nonneg = witness.nonneg.clone();
        nonneg.sort_unstable();
        nonneg.dedup();

        self.add_cut_hypergraph(HyperGraph {
            sense: Sense::Le,
            rhs,
            body: CutBody::Domino {
                handle,
                teeth,
                nonneg,
            },
            source: CutSource::Domino,
        })
    }

    /// Import a cut whose cliques are segments of `current_tour`.
    pub fn add_cut_external(
        &mut self,
        cut: &ExternalCut,
        current_tour: &[usize],
    ) -> TspResult<(CutId, bool)> {
        if cut.cliques.is_empty() {
            return Err(TspError::InvalidRow("external cut without cliques".into()));
        }
        if !cut.rhs.is_finite() || cut.cliques.iter().any(|(_, m)| !m.is_finite()) {
            return Err(TspError::InvalidRow("non-finite external cut".into()));
        }
        let mut taken: Vec<(CliqueId, f64)> = Vec::with_capacity(cut.cliques.len());
        for (ext, mult) in &cut.cliques {
            match self.cliques.add_clique_external(ext, current_tour) {
                Ok(id) => taken.push((id, *mult)),
                Err(err) => {
                    let ids: Vec<CliqueId> = taken.iter().map(|&(id, _)| id).collect();
                    self.unwind(&ids, &[])?;
                    return Err(err);
                }
            }
        }
        self.add_cut_hypergraph(HyperGraph {
            sense: cut.sense,
            rhs: cut.rhs,
            body: CutBody::Standard {
                cliques: taken,
                edges: Vec::new(),
            },
            source: CutSource::External,
        })
    }

    pub fn retain(&mut self, id: CutId) -> TspResult<()> {
        if self.keys.retain(id.0) {
            Ok(())
        } else {
            Err(TspError::UnknownCut(id.0))
        }
    }

    /// Drop one reference. At zero the cut is removed and its clique and
    /// tooth references released.
    pub fn release(&mut self, id: CutId) -> TspResult<()> {
        match self.keys.release(id.0) {
            None => Err(TspError::UnknownCut(id.0)),
            Some(false) => Ok(()),
            Some(true) => {
                let cut = self
                    .cuts
                    .get_mut(id.0)
                    .and_then(Option::take)
                    .ok_or(TspError::UnknownCut(id.0))?;
                self.release_parts(&cut.body)
            }
        }
    }

    pub fn get(&self, id: CutId) -> Option<&HyperGraph> {
        self.cuts.get(id.0)?.as_ref()
    }

    pub fn refcount(&self, id: CutId) -> usize {
        self.keys.refcount(id.0)
    }

    /// Number of live cuts.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.len() == 0
    }

    /// Resolve a stored cut to membership flags.
    pub fn shape(&self, id: CutId) -> TspResult<CutShape> {
        let cut = self.get(id).ok_or(TspError::UnknownCut(id.0))?;
        match &cut.body {
            CutBody::Standard { cliques, edges } => {
                let sets = cliques
                    .iter()
                    .map(|&(c, mult)| Ok((self.cliques.membership(c)?, mult)))
                    .collect::<TspResult<Vec<_>>>()?;
                let mut edge_map = std::collections::HashMap::new();
                for &(e, d) in edges {
                    *edge_map.entry(e).or_insert(0.0) += d;
                }
                Ok(CutShape::Standard {
                    sets,
                    edges: edge_map,
                })
            }
            CutBody::Domino {
                handle,
                teeth,
                nonneg,
            } => Ok(CutShape::Domino {
                handle: self.cliques.membership(*handle)?,
                teeth: teeth
                    .iter()
                    .map(|&t| self.teeth.membership(t))
                    .collect::<TspResult<_>>()?,
                nonneg: nonneg.iter().copied().collect(),
            }),
        }
    }

    /// Row of a stored cut over the columns of `graph`.
    ///
    /// The coefficient of each column depends only on its endpoints, so
    /// the same cut materializes consistently against any column set.
    pub fn materialize(&self, id: CutId, graph: &CoreGraph) -> TspResult<SparseRow> {
        let cut = self.get(id).ok_or(TspError::UnknownCut(id.0))?;
        self.shape(id)?.row(graph, cut.sense, cut.rhs)
    }

    /// Slack of a stored cut at the 0/1 point of `tour`.
    pub fn tour_slack(&self, id: CutId, tour: &Tour) -> TspResult<f64> {
        let cut = self.get(id).ok_or(TspError::UnknownCut(id.0))?;
        let act = self.shape(id)?.tour_activity(tour);
        Ok(slack(cut.sense, cut.rhs, act))
    }

    /// Left-hand side of a stored cut at an LP point over the columns of `graph`.
    pub fn lp_activity(&self, id: CutId, graph: &CoreGraph, x: &[f64]) -> TspResult<f64> {
        if x.len() != graph.edge_count() {
            return Err(TspError::InconsistentState(format!(
                "point has {} entries for {} columns",
                x.len(),
                graph.edge_count()
            )));
        }
        Ok(self.shape(id)?.activity(graph, x))
    }

    fn check_live(&self, cut: &HyperGraph) -> TspResult<()> {
        let dead = match &cut.body {
            CutBody::Standard { cliques, .. } => {
                cliques.iter().any(|&(c, _)| self.cliques.get(c).is_none())
            }
            CutBody::Domino { handle, teeth, .. } => {
                self.cliques.get(*handle).is_none()
                    || teeth.iter().any(|&t| self.teeth.get(t).is_none())
            }
        };
        if dead {
            return Err(TspError::InconsistentState(
                "cut names a dead clique or tooth".into(),
            ));
        }
        if !cut.rhs.is_finite() {
            return Err(TspError::InvalidRow(format!("non-finite rhs {}", cut.rhs)));
        }
        Ok(())
    }

    fn release_parts(&mut self, body: &CutBody) -> TspResult<()> {
        match body {
            CutBody::Standard { cliques, .. } => {
                for &(c, _) in cliques {
                    self.cliques.release(c)?;
                }
            }
            CutBody::Domino { handle, teeth, .. } => {
                self.cliques.release(*handle)?;
                for &t in teeth {
                    self.teeth.release(t)?;
                }
            }
        }
        Ok(())
    }

    fn unwind(&mut self, cliques: &[CliqueId], teeth: &[ToothId]) -> TspResult<()> {
        for &c in cliques {
            self.cliques.release(c)?;
        }
        for &t in teeth {
            self.teeth.release(t)?;
        }
        Ok(())
    }
}
