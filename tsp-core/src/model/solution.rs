//! TSP solution types.

use super::{BestGroup, Tour};

/// Status of the TSP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TspStatus {
    /// The search tree was exhausted and no subtree was dropped.
    Optimal,

    /// The search tree was exhausted, but subtrees were dropped after
    /// numerical failures, so the best tour may not be optimal.
    Incomplete,

    /// The root relaxation is infeasible.
    Infeasible,

    /// Node limit reached, best tour returned.
    NodeLimit,

    /// Time limit reached, best tour returned.
    TimeLimit,

    /// Stopped through the external stop flag.
    Interrupted,
}

impl TspStatus {
    /// Returns true if the search ran to completion.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TspStatus::Optimal | TspStatus::Incomplete | TspStatus::Infeasible
        )
    }
}

/// Complete TSP solution with diagnostics.
#[derive(Debug, Clone)]
pub struct TspSolution {
    /// Solve status.
    pub status: TspStatus,

    /// Best tour found (if any).
    pub tour: Option<Tour>,

    /// Length of the best tour (primal bound).
    pub cost: f64,

    /// Best lower bound from the LP relaxations.
    pub bound: f64,

    /// The bound is a certificate: the tree was exhausted, no node was lost
    /// to a numerical abort and every missing edge was priced out.
    pub proven: bool,

    /// Relative optimality gap: (cost - bound) / |cost|.
    pub gap: f64,

    /// Number of search nodes explored.
    pub nodes_explored: u64,

    /// Number of cut rows added to LPs.
    pub cuts_added: u64,

    /// Number of separation rounds.
    pub cut_rounds: u64,

    /// Total solve time in milliseconds.
    pub solve_time_ms: u64,

    /// Number of times the incumbent was improved.
    pub incumbent_updates: u64,
}

impl Default for TspSolution {
    fn default() -> Self {
        Self {
            status: TspStatus::Infeasible,
            tour: None,
            cost: f64::INFINITY,
            bound: f64::NEG_INFINITY,
            proven: false,
            gap: f64::INFINITY,
            nodes_explored: 0,
            cuts_added: 0,
            cut_rounds: 0,
            solve_time_ms: 0,
            incumbent_updates: 0,
        }
    }
}

impl TspSolution {
    /// Returns true if the tour is certified optimal.
    pub fn is_optimal(&self) -> bool {
        self.status == TspStatus::Optimal && self.proven && self.tour.is_some()
    }

    /// Compute relative gap.
    pub fn compute_gap(primal: f64, dual: f64) -> f64 {
        if primal.is_infinite() || dual.is_infinite() {
            return f64::INFINITY;
        }
        let denom = primal.abs().max(1e-10);
        (primal - dual).max(0.0) / denom
    }
}

/// Tracks the best known tour (incumbent).
#[derive(Debug, Clone, Default)]
pub struct IncumbentTracker {
    /// Current best tour bundle (if any).
    pub best: Option<BestGroup>,

    /// Number of times the incumbent was updated.
    pub update_count: u64,
}

impl IncumbentTracker {
    /// Create a new incumbent tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if we have an incumbent.
    pub fn has_incumbent(&self) -> bool {
        self.best.is_some()
    }

    /// Length of the incumbent, or +inf.
    pub fn cost(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |b| b.length)
    }

    /// Try to update the incumbent.
    ///
    /// Returns true if the incumbent was improved.
    pub fn update(&mut self, candidate: BestGroup) -> bool {
        if candidate.length < self.cost() - 1e-9 {
            self.best = Some(candidate);
            self.update_count += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Instance};

    #[test]
    fn test_incumbent_tracker() {
        let inst = Instance::from_matrix(vec![
            vec![0.0, 3.0, 4.0, 2.0, 7.0],
            vec![3.0, 0.0, 4.0, 6.0, 3.0],
            vec![4.0, 4.0, 0.0, 5.0, 8.0],
            vec![2.0, 6.0, 5.0, 0.0, 6.0],
            vec![7.0, 3.0, 8.0, 6.0, 0.0],
        ])
        .unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut tracker = IncumbentTracker::new();
        assert!(!tracker.has_incumbent());
        assert_eq!(tracker.cost(), f64::INFINITY);

        // Identity tour: 3 + 4 + 5 + 6 + 7 = 25
        let identity = Tour::new(vec![0, 1, 2, 3, 4]).unwrap();
        assert!(tracker.update(BestGroup::new(identity.clone(), &graph).unwrap()));
        assert_eq!(tracker.cost(), 25.0);
        assert_eq!(tracker.update_count, 1);

        // Same tour again (rejected)
        assert!(!tracker.update(BestGroup::new(identity, &graph).unwrap()));
        assert_eq!(tracker.update_count, 1);

        // Optimal tour: 4 + 4 + 3 + 6 + 2 = 19 (accepted)
        let opt = Tour::new(vec![0, 2, 1, 4, 3]).unwrap();
        assert!(tracker.update(BestGroup::new(opt, &graph).unwrap()));
        assert_eq!(tracker.cost(), 19.0);
        assert_eq!(tracker.update_count, 2);
    }

    #[test]
    fn test_gap_computation() {
        let gap = TspSolution::compute_gap(10.0, 8.0);
        assert!((gap - 0.2).abs() < 1e-10);
        assert_eq!(TspSolution::compute_gap(10.0, 10.0), 0.0);
        assert!(TspSolution::compute_gap(f64::INFINITY, 1.0).is_infinite());
    }

    #[test]
    fn test_status_methods() {
        assert!(TspStatus::Optimal.is_finished());
        assert!(TspStatus::Incomplete.is_finished());
        assert!(!TspStatus::NodeLimit.is_finished());
    }
}
