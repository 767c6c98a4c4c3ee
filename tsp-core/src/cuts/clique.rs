//! Interned city subsets.
//!
//! A [`Clique`] stores its cities as maximal runs of positions in the bank's
//! reference tour, so two equal node sets always produce the same key. A set
//! and its complement are distinct cliques.

use super::arena::InternArena;
use crate::error::{TspError, TspResult};
use crate::model::Tour;

/// Inclusive run of reference-tour positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// A city subset as sorted, maximal position runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clique {
    segments: Vec<Segment>,
}

impl Clique {
    /// Canonical clique from arbitrary positions (duplicates are ignored).
    pub fn from_positions(positions: impl IntoIterator<Item = usize>) -> Self {
        let mut positions: Vec<usize> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();

        let mut segments: Vec<Segment> = Vec::new();
        for pos in positions {
            match segments.last_mut() {
                Some(seg) if seg.end + 1 == pos => seg.end = pos,
                _ => segments.push(Segment::new(pos, pos)),
            }
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of cities.
    pub fn size(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// True if reference position `pos` is in the clique.
    pub fn contains_pos(&self, pos: usize) -> bool {
        let i = self.segments.partition_point(|s| s.end < pos);
        self.segments.get(i).is_some_and(|s| s.contains(pos))
    }

    /// Cities of the clique, in reference-tour order.
    pub fn nodes(&self, saved_tour: &[usize]) -> Vec<usize> {
        self.segments
            .iter()
            .flat_map(|s| saved_tour[s.start..=s.end].iter().copied())
            .collect()
    }

    /// Per-city membership flags.
    pub fn membership(&self, saved_tour: &[usize]) -> Vec<bool> {
        let mut marks = vec![false; saved_tour.len()];
        for v in self.nodes(saved_tour) {
            marks[v] = true;
        }
        marks
    }
}

/// Clique in the external cut-library format: inclusive position ranges in
/// the tour that was current when the cut was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalClique {
    pub segments: Vec<(usize, usize)>,
}

/// Stable handle to an interned clique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CliqueId(usize);

impl CliqueId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Validate a node set and map it to reference positions.
pub(crate) fn positions_of(nodes: &[usize], perm: &[usize]) -> TspResult<Vec<usize>> {
    let n = perm.len();
    if nodes.is_empty() {
        return Err(TspError::DegenerateClique("empty node set".into()));
    }
    let mut seen = vec![false; n];
    for &v in nodes {
        if v >= n {
            return Err(TspError::DegenerateClique(format!(
                "city {} out of range for {} cities",
                v, n
            )));
        }
        if seen[v] {
            return Err(TspError::DegenerateClique(format!("city {} repeated", v)));
        }
        seen[v] = true;
    }
    if nodes.len() >= n {
        return Err(TspError::DegenerateClique(format!(
            "node set covers all {} cities",
            n
        )));
    }
    Ok(nodes.iter().map(|&v| perm[v]).collect())
}

/// Reference-counted store of cliques.
#[derive(Debug, Clone)]
pub struct CliqueBank {
    saved_tour: Vec<usize>,
    saved_perm: Vec<usize>,
    arena: InternArena<Clique>,
}

impl CliqueBank {
    /// Bank keyed on positions in `reference`.
    pub fn new(reference: &Tour) -> Self {
        Self {
            saved_tour: reference.nodes().to_vec(),
            saved_perm: reference.perm(),
            arena: InternArena::default(),
        }
    }

    pub fn saved_tour(&self) -> &[usize] {
        &self.saved_tour
    }

    pub fn saved_perm(&self) -> &[usize] {
        &self.saved_perm
    }

    /// Intern a prebuilt clique.
    pub fn add_clique(&mut self, clique: Clique) -> TspResult<CliqueId> {
        let n = self.saved_tour.len();
        let size = clique.size();
        if size == 0 {
            return Err(TspError::DegenerateClique("empty clique".into()));
        }
        if size >= n || clique.segments().last().is_some_and(|s| s.end >= n) {
            return Err(TspError::DegenerateClique(format!(
                "clique of size {} does not fit {} cities",
                size, n
            )));
        }
        let (idx, _) = self.arena.intern(clique);
        Ok(CliqueId(idx))
    }

    /// Intern an explicit node list.
    pub fn add_clique_nodes(&mut self, nodes: &[usize]) -> TspResult<CliqueId> {
        let positions = positions_of(nodes, &self.saved_perm)?;
        self.add_clique(Clique::from_positions(positions))
    }

    /// Intern a raw node vector, consuming it.
    pub fn add_clique_vec(&mut self, nodes: Vec<usize>) -> TspResult<CliqueId> {
        self.add_clique_nodes(&nodes)
    }

    /// Intern positions `[start, end)` of `current_tour`.
    pub fn add_clique_range(
        &mut self,
        start: usize,
        end: usize,
        current_tour: &[usize],
    ) -> TspResult<CliqueId> {
        if start >= end || end > current_tour.len() {
            return Err(TspError::DegenerateClique(format!(
                "range [{}, {}) is empty or exceeds {} cities",
                start,
                end,
                current_tour.len()
            )));
        }
        self.add_clique_nodes(&current_tour[start..end])
    }

    /// Intern a clique given as segments of `current_tour`.
    pub fn add_clique_external(
        &mut self,
        ext: &ExternalClique,
        current_tour: &[usize],
    ) -> TspResult<CliqueId> {
        let mut nodes = Vec::new();
        for &(lo, hi) in &ext.segments {
            if lo > hi || hi >= current_tour.len() {
                return Err(TspError::DegenerateClique(format!(
                    "segment ({}, {}) invalid for {} cities",
                    lo,
                    hi,
                    current_tour.len()
                )));
            }
            nodes.extend_from_slice(&current_tour[lo..=hi]);
        }
        self.add_clique_nodes(&nodes)
    }

    /// Intern `len` consecutive cities of `tour` from `start`, wrapping.
    pub fn add_tour_clique(
        &mut self,
        tour: &[usize],
        start: usize,
        len: usize,
    ) -> TspResult<CliqueId> {
        let n = tour.len();
        if len == 0 || len >= n || start >= n {
            return Err(TspError::DegenerateClique(format!(
                "tour clique start {} len {} invalid for {} cities",
                start, len, n
            )));
        }
        let nodes: Vec<usize> = (0..len).map(|i| tour[(start + i) % n]).collect();
        self.add_clique_nodes(&nodes)
    }

    /// Take another reference to a live clique.
    pub fn retain(&mut self, id: CliqueId) -> TspResult<()> {
        if self.arena.retain(id.0) {
            Ok(())
        } else {
            Err(TspError::InconsistentState(format!(
                "retain of dead clique {}",
                id.0
            )))
        }
    }

    /// Drop one reference; the clique is freed at zero.
    pub fn release(&mut self, id: CliqueId) -> TspResult<()> {
        match self.arena.release(id.0) {
            Some(_) => Ok(()),
            None => Err(TspError::InconsistentState(format!(
                "release of dead clique {}",
                id.0
            ))),
        }
    }

    pub fn refcount(&self, id: CliqueId) -> usize {
        self.arena.refcount(id.0)
    }

    pub fn get(&self, id: CliqueId) -> Option<&Clique> {
        self.arena.get(id.0)
    }

    /// Cities of a live clique.
    pub fn nodes(&self, id: CliqueId) -> TspResult<Vec<usize>> {
        self.get(id)
            .map(|c| c.nodes(&self.saved_tour))
            .ok_or_else(|| TspError::InconsistentState(format!("dead clique {}", id.0)))
    }

    /// Per-city membership flags of a live clique.
    pub fn membership(&self, id: CliqueId) -> TspResult<Vec<bool>> {
        self.get(id)
            .map(|c| c.membership(&self.saved_tour))
            .ok_or_else(|| TspError::InconsistentState(format!("dead clique {}", id.0)))
    }

    /// Number of live cliques.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}
