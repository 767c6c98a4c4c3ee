//! Benchmark records and JSON output.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tsp_core::{TspSolution, TspStatus};

/// Outcome of one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Instance name
    pub name: String,
    pub cities: usize,
    /// Solve status, as its debug name
    pub status: String,
    pub cost: f64,
    pub bound: f64,
    pub gap: f64,
    pub proven: bool,
    pub nodes: u64,
    pub cuts: u64,
    pub cut_rounds: u64,
    pub time_ms: u64,
    pub incumbent_updates: u64,
    /// Best tour, empty if none
    pub tour: Vec<usize>,
}

impl RunRecord {
    pub fn new(name: String, cities: usize, sol: &TspSolution) -> Self {
        Self {
            name,
            cities,
            status: format!("{:?}", sol.status),
            cost: sol.cost,
            bound: sol.bound,
            gap: sol.gap,
            proven: sol.proven,
            nodes: sol.nodes_explored,
            cuts: sol.cuts_added,
            cut_rounds: sol.cut_rounds,
            time_ms: sol.solve_time_ms,
            incumbent_updates: sol.incumbent_updates,
            tour: sol
                .tour
                .as_ref()
                .map(|t| t.nodes().to_vec())
                .unwrap_or_default(),
        }
    }
}

/// Aggregates over all runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchSummary {
    pub total: usize,
    pub optimal: usize,
    pub proven: usize,
    pub total_time_ms: u64,
    pub mean_nodes: f64,
    pub max_gap: f64,
}

/// Everything written to the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub runs: Vec<RunRecord>,
    pub summary: BenchSummary,
}

impl BenchReport {
    pub fn new(runs: Vec<RunRecord>) -> Self {
        let summary = compute_summary(&runs);
        Self { runs, summary }
    }

    /// Save to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create file {}", path.as_ref().display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.as_ref().display()))?;
        Ok(())
    }
}

pub fn compute_summary(runs: &[RunRecord]) -> BenchSummary {
    if runs.is_empty() {
        return BenchSummary::default();
    }
    let optimal_name = format!("{:?}", TspStatus::Optimal);
    BenchSummary {
        total: runs.len(),
        optimal: runs.iter().filter(|r| r.status == optimal_name).count(),
        proven: runs.iter().filter(|r| r.proven).count(),
        total_time_ms: runs.iter().map(|r| r.time_ms).sum(),
        mean_nodes: runs.iter().map(|r| r.nodes as f64).sum::<f64>() / runs.len() as f64,
        max_gap: runs
            .iter()
            .map(|r| if r.gap.is_finite() { r.gap } else { 1.0 })
            .fold(0.0, f64::max),
    }
}

/// Print a results table to stdout.
pub fn print_table(runs: &[RunRecord]) {
    println!(
        "{:<16} {:>6} {:>12} {:>12} {:>8} {:>7} {:>8} {:>9}  {}",
        "name", "cities", "length", "bound", "gap%", "nodes", "cuts", "time(ms)", "status"
    );
    println!("{}", "-".repeat(96));
    for r in runs {
        println!(
            "{:<16} {:>6} {:>12.2} {:>12.2} {:>8.3} {:>7} {:>8} {:>9}  {}{}",
            r.name,
            r.cities,
            r.cost,
            r.bound,
            r.gap * 100.0,
            r.nodes,
            r.cuts,
            r.time_ms,
            r.status,
            if r.proven { "" } else { " (unproven)" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut sol = TspSolution {
            status: TspStatus::Optimal,
            proven: true,
            cost: 10.0,
            bound: 10.0,
            gap: 0.0,
            nodes_explored: 4,
            ..TspSolution::default()
        };
        let a = RunRecord::new("a".into(), 5, &sol);
        sol.status = TspStatus::NodeLimit;
        sol.proven = false;
        sol.gap = 0.25;
        sol.nodes_explored = 2;
        let b = RunRecord::new("b".into(), 5, &sol);
        // Exhausted tree with a lost subtree
        sol.status = TspStatus::Incomplete;
        sol.gap = 0.0;
        sol.nodes_explored = 3;
        let c = RunRecord::new("c".into(), 5, &sol);
        assert_eq!(c.status, "Incomplete");

        let summary = compute_summary(&[a, b, c]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.optimal, 1);
        assert_eq!(summary.proven, 1);
        assert_eq!(summary.mean_nodes, 3.0);
        assert_eq!(summary.max_gap, 0.25);
    }
}
