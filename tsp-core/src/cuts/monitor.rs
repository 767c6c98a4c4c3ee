//! Slack tracking for cut rows loaded in the node LP.
//!
//! Entries are kept in LP row order (after the degree rows), so a position
//! here is a row offset. Rows that stay slack for too many rounds are
//! reported as stale and can be purged.

use super::external::CutId;

/// A cut row with activity metadata.
#[derive(Debug, Clone)]
pub struct MonitoredCut {
    /// Stored cut behind the row.
    pub id: CutId,

    /// Consecutive rounds with positive slack.
    pub slack_count: usize,

    /// Rounds the row was tight.
    pub times_binding: usize,

    /// Round when the row was loaded.
    pub added_round: usize,
}

/// Counters over the life of a monitor.
#[derive(Debug, Default, Clone)]
pub struct CutMonitorStats {
    /// Total rows loaded.
    pub total_added: usize,

    /// Total rows purged as stale.
    pub total_purged: usize,

    /// Peak number of loaded rows.
    pub peak_size: usize,
}

/// Row-aligned slack ages.
#[derive(Debug, Clone, Default)]
pub struct CutMonitor {
    rows: Vec<MonitoredCut>,
    round: usize,
    stats: CutMonitorStats,
}

impl CutMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly loaded row at the end.
    pub fn push(&mut self, id: CutId) {
        self.rows.push(MonitoredCut {
            id,
            slack_count: 0,
            times_binding: 0,
            added_round: self.round,
        });
        self.stats.total_added += 1;
        self.stats.peak_size = self.stats.peak_size.max(self.rows.len());
    }

    /// Age rows from their slacks after a solve.
    ///
    /// `slacks[i]` belongs to the i-th monitored row; missing entries count
    /// as binding.
    pub fn update(&mut self, slacks: &[f64], tol: f64) {
        self.round += 1;
        for (i, row) in self.rows.iter_mut().enumerate() {
            let s = slacks.get(i).copied().unwrap_or(0.0);
            if s > tol {
                row.slack_count += 1;
            } else {
                row.slack_count = 0;
                row.times_binding += 1;
            }
        }
    }

    /// Positions of rows slack for at least `max_age` rounds, ascending.
    pub fn stale(&self, max_age: usize) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.slack_count >= max_age)
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop the rows at `positions` and return their cut ids.
    ///
    /// Remaining rows keep their relative order.
    pub fn remove(&mut self, positions: &[usize]) -> Vec<CutId> {
        let mut drop = vec![false; self.rows.len()];
        for &p in positions {
            if p < drop.len() {
                drop[p] = true;
            }
        }
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.rows.len());
        for (row, gone) in self.rows.drain(..).zip(drop) {
            if gone {
                removed.push(row.id);
            } else {
                kept.push(row);
            }
        }
        self.rows = kept;
        self.stats.total_purged += removed.len();
        removed
    }

    /// Cut ids in row order.
    pub fn ids(&self) -> Vec<CutId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn rows(&self) -> &[MonitoredCut] {
        &self.rows
    }

    /// Forget every row without touching the counters.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn stats(&self) -> &CutMonitorStats {
        &self.stats
    }
}
