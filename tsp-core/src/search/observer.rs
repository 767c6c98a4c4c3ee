//! Search event hooks.

use super::NodeStatus;
use crate::model::{Tour, TspSolution};

/// Outcome of one processed (or discarded) search node.
#[derive(Debug, Clone, Copy)]
pub struct NodeReport {
    pub id: u64,

    pub parent_id: Option<u64>,

    pub depth: usize,

    /// Bound the node was created with.
    pub parent_bound: f64,

    /// Bound after the node's LP work; never below `parent_bound`.
    pub bound: f64,

    pub status: NodeStatus,

    /// Separation rounds run at this node.
    pub cut_rounds: usize,
}

/// Receives incumbent and node events during a solve.
///
/// Every method has an empty default so observers pick what they need.
pub trait SearchObserver {
    fn on_incumbent(&mut self, _tour: &Tour, _cost: f64) {}

    fn on_node(&mut self, _report: &NodeReport) {}

    fn on_finish(&mut self, _solution: &TspSolution) {}
}

/// Observer that forwards events to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogObserver {
    log_freq: u64,
    seen: u64,
}

impl LogObserver {
    /// Log one node line every `log_freq` nodes (at least 1).
    pub fn new(log_freq: u64) -> Self {
        Self {
            log_freq: log_freq.max(1),
            seen: 0,
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SearchObserver for LogObserver {
    fn on_incumbent(&mut self, tour: &Tour, cost: f64) {
        log::info!("Incumbent: length={:.6} over {} cities", cost, tour.len());
    }

    fn on_node(&mut self, report: &NodeReport) {
        self.seen += 1;
        if report.id == 0 {
            log::info!(
                "Root: bound={:.6} after {} cut rounds ({:?})",
                report.bound,
                report.cut_rounds,
                report.status
            );
        } else if self.seen % self.log_freq == 0 {
            log::info!(
                "Node {} (depth {}): {:?}, bound={:.6}",
                report.id,
                report.depth,
                report.status,
                report.bound
            );
        }
    }

    fn on_finish(&mut self, solution: &TspSolution) {
        log::info!(
            "Finished: {:?}, length={:.6}, bound={:.6}, proven={}, nodes={}, time={}ms",
            solution.status,
            solution.cost,
            solution.bound,
            solution.proven,
            solution.nodes_explored,
            solution.solve_time_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        nodes: usize,
    }

    impl SearchObserver for Counting {
        fn on_node(&mut self, _report: &NodeReport) {
            self.nodes += 1;
        }
    }

    #[test]
    fn test_default_methods_are_noops() {
        let mut obs = Counting::default();
        let tour = Tour::new(vec![0, 1, 2]).unwrap();
        obs.on_incumbent(&tour, 3.0);
        obs.on_finish(&TspSolution::default());
        obs.on_node(&NodeReport {
            id: 0,
            parent_id: None,
            depth: 0,
            parent_bound: f64::NEG_INFINITY,
            bound: 1.0,
            status: NodeStatus::Branched,
            cut_rounds: 0,
        });
        assert_eq!(obs.nodes, 1);
    }

    #[test]
    fn test_log_freq_floor() {
        let obs = LogObserver::new(0);
        assert_eq!(obs.log_freq, 1);
    }
}
