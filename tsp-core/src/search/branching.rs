//! Branching edge selection and degree feasibility of children.

use super::EdgeFix;
use crate::lp::{LpOutcome, Relaxation, Start};
use crate::model::{CoreGraph, EndPts};
use crate::settings::BranchingRule;

/// A branching decision.
#[derive(Debug, Clone, Copy)]
pub struct BranchDecision {
    /// LP column to branch on.
    pub col: usize,

    /// Current (fractional) value.
    pub value: f64,

    /// Child with the edge excluded.
    pub down_branch: EdgeFix,

    /// Child with the edge forced.
    pub up_branch: EdgeFix,

    /// Score of this decision (for logging/debugging).
    pub score: f64,
}

/// Branching edge selector.
pub struct BranchingSelector {
    rule: BranchingRule,
}

impl BranchingSelector {
    pub fn new(rule: BranchingRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> BranchingRule {
        self.rule
    }

    /// Fractional edges as `(col, value, fractionality)`.
    pub fn fractional_edges(x: &[f64], tol: f64) -> Vec<(usize, f64, f64)> {
        x.iter()
            .enumerate()
            .filter(|&(_, &v)| v > tol && v < 1.0 - tol)
            .map(|(col, &v)| (col, v, v.min(1.0 - v)))
            .collect()
    }

    /// Select a branching edge without solving LPs.
    ///
    /// Strong branching falls back to most-fractional here; use
    /// [`Self::select_strong`] to evaluate candidates. Returns None if
    /// `x` is integral.
    pub fn select(&self, graph: &CoreGraph, x: &[f64], tol: f64) -> Option<BranchDecision> {
        let fractional = Self::fractional_edges(x, tol);
        if fractional.is_empty() {
            return None;
        }
        match self.rule {
            BranchingRule::MostFractional | BranchingRule::StrongBranching { .. } => {
                self.select_most_fractional(&fractional, graph)
            }
            BranchingRule::LengthWeighted => self.select_length_weighted(&fractional, graph),
        }
    }

    /// Strong branching: solve both children of the most fractional
    /// candidates on clones of `relax` and keep the best product score.
    pub fn select_strong<R: Relaxation + Clone>(
        &self,
        relax: &R,
        graph: &CoreGraph,
        x: &[f64],
        base: f64,
        tol: f64,
        candidates: usize,
    ) -> Option<BranchDecision> {
        let mut fractional = Self::fractional_edges(x, tol);
        if fractional.is_empty() {
            return None;
        }
        fractional.sort_by(|a, b| b.2.total_cmp(&a.2));
        fractional.truncate(candidates.max(1));

        let mut best: Option<(usize, f64, f64)> = None;
        for &(col, value, _) in &fractional {
            let down = Self::probe(relax, col, 0.0).unwrap_or(f64::INFINITY);
            let up = Self::probe(relax, col, 1.0).unwrap_or(f64::INFINITY);
            let score = (down - base).max(1e-6) * (up - base).max(1e-6);
            log::debug!(
                "strong branch on column {}: down {:.4}, up {:.4}, score {:.4e}",
                col,
                down,
                up,
                score
            );
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((col, value, score));
            }
        }

        let (col, value, score) = best?;
        Some(Self::make_decision(graph, col, value, score))
    }

    /// Objective of `relax` with column `col` fixed, or None if the child
    /// LP has no optimum.
    fn probe<R: Relaxation + Clone>(relax: &R, col: usize, value: f64) -> Option<f64> {
        let mut child = relax.clone();
        child.set_col_bounds(col, value, value).ok()?;
        match child.optimize(Start::Warm) {
            LpOutcome::Optimal(sol) => Some(sol.objective),
            _ => None,
        }
    }

    fn select_most_fractional(
        &self,
        fractional: &[(usize, f64, f64)],
        graph: &CoreGraph,
    ) -> Option<BranchDecision> {
        let (col, value, frac) = fractional
            .iter()
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .copied()?;
        Some(Self::make_decision(graph, col, value, frac))
    }

    /// Score = length times fractionality, so long half-edges go first.
    fn select_length_weighted(
        &self,
        fractional: &[(usize, f64, f64)],
        graph: &CoreGraph,
    ) -> Option<BranchDecision> {
        let (col, value, score) = fractional
            .iter()
            .map(|&(col, v, frac)| (col, v, graph.edge(col).len.abs().max(1e-9) * frac))
            .max_by(|a, b| a.2.total_cmp(&b.2))?;
        Some(Self::make_decision(graph, col, value, score))
    }

    fn make_decision(graph: &CoreGraph, col: usize, value: f64, score: f64) -> BranchDecision {
        let ends = graph.edge(col).ends;
        BranchDecision {
            col,
            value,
            down_branch: EdgeFix::exclude(col, ends),
            up_branch: EdgeFix::force(col, ends),
            score,
        }
    }
}

/// Per-city counts of forced edges and of edges still allowed.
///
/// A child whose fix would give a city more than two forced edges, or
/// fewer than two allowed ones, cannot contain a tour.
#[derive(Debug, Clone)]
pub struct DegreeTracker {
    fix_degrees: Vec<usize>,
    avail_degrees: Vec<usize>,
}

impl DegreeTracker {
    /// Counts for the core graph with the given fixes applied.
    pub fn new(graph: &CoreGraph, fixes: &[EdgeFix]) -> Self {
        let mut tracker = Self {
            fix_degrees: vec![0; graph.node_count()],
            avail_degrees: (0..graph.node_count())
                .map(|v| graph.adjacency(v).len())
                .collect(),
        };
        for fix in fixes {
            tracker.apply(fix);
        }
        tracker
    }

    /// Counts over every city pair, for a core graph that may still grow
    /// through pricing.
    pub fn for_cities(node_count: usize, fixes: &[EdgeFix]) -> Self {
        let mut tracker = Self {
            fix_degrees: vec![0; node_count],
            avail_degrees: vec![node_count.saturating_sub(1); node_count],
        };
        for fix in fixes {
            tracker.apply(fix);
        }
        tracker
    }

    pub fn apply(&mut self, fix: &EdgeFix) {
        let EndPts { end0, end1 } = fix.ends;
        for v in [end0, end1] {
            if fix.is_forced() {
                self.fix_degrees[v] += 1;
            } else {
                self.avail_degrees[v] = self.avail_degrees[v].saturating_sub(1);
            }
        }
    }

    /// True if applying `fix` still leaves every city able to have degree two.
    pub fn child_feasible(&self, fix: &EdgeFix) -> bool {
        let EndPts { end0, end1 } = fix.ends;
        [end0, end1].iter().all(|&v| {
            if fix.is_forced() {
                self.fix_degrees[v] < 2
            } else {
                self.avail_degrees[v] > 2
            }
        })
    }

    pub fn fix_degree(&self, v: usize) -> usize {
        self.fix_degrees[v]
    }

    pub fn avail_degree(&self, v: usize) -> usize {
        self.avail_degrees[v]
    }
}
