//! Pool of cuts purged from node LPs.
//!
//! A purged row's cut reference moves into the pool instead of being
//! dropped. Each separation round first checks the pool: a pooled cut that
//! the new LP point violates leaves the pool, and its reference goes to the
//! caller, who loads it as a row again.

use std::collections::{HashSet, VecDeque};

use super::external::{CutId, ExternalCuts};
use super::hypergraph::slack;
use crate::error::TspResult;
use crate::model::{CoreGraph, Tour};

/// Statistics for the cut pool.
#[derive(Debug, Default, Clone)]
pub struct CutPoolStats {
    /// Cuts moved into the pool.
    pub total_added: usize,

    /// Cuts dropped to respect the capacity.
    pub total_evicted: usize,

    /// Cuts handed back for loading.
    pub total_hits: usize,

    /// Peak pool size.
    pub peak_size: usize,
}

/// Bounded pool of cut references, oldest evicted first.
#[derive(Debug, Clone)]
pub struct CutPool {
    order: VecDeque<CutId>,
    members: HashSet<CutId>,
    capacity: usize,
    stats: CutPoolStats,
}

impl CutPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity,
            stats: CutPoolStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: CutId) -> bool {
        self.members.contains(&id)
    }

    pub fn stats(&self) -> &CutPoolStats {
        &self.stats
    }

    /// Take over one reference on `id`.
    ///
    /// A cut already pooled, or any cut when the capacity is zero, gives
    /// the reference straight back to the store.
    pub fn insert(&mut self, id: CutId, cuts: &mut ExternalCuts) -> TspResult<()> {
        if self.capacity == 0 || self.members.contains(&id) {
            return cuts.release(id);
        }
        while self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.members.remove(&old);
                cuts.release(old)?;
                self.stats.total_evicted += 1;
            }
        }
        self.order.push_back(id);
        self.members.insert(id);
        self.stats.total_added += 1;
        self.stats.peak_size = self.stats.peak_size.max(self.order.len());
        Ok(())
    }

    /// Pooled cuts violated by at least `cutoff` at `x`, most violated
    /// first, at most `limit` of them.
    ///
    /// Cuts in `loaded` are skipped. With `tight_at` set, only cuts with no
    /// slack at that tour qualify. The returned cuts leave the pool and
    /// their references pass to the caller.
    pub fn separate(
        &mut self,
        cuts: &ExternalCuts,
        graph: &CoreGraph,
        x: &[f64],
        loaded: &HashSet<CutId>,
        cutoff: f64,
        tight_at: Option<&Tour>,
        limit: usize,
    ) -> TspResult<Vec<(CutId, f64)>> {
        let mut hits: Vec<(CutId, f64)> = Vec::new();
        for &id in &self.order {
            if loaded.contains(&id) {
                continue;
            }
            let Some(cut) = cuts.get(id) else {
                continue;
            };
            let violation = -slack(cut.sense, cut.rhs, cuts.lp_activity(id, graph, x)?);
            if violation < cutoff {
                continue;
            }
            if let Some(tour) = tight_at {
                if cuts.tour_slack(id, tour)? > TIGHT_TOL {
                    continue;
                }
            }
            hits.push((id, violation));
        }

        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(limit);
        for &(id, _) in &hits {
            self.members.remove(&id);
        }
        self.order.retain(|id| self.members.contains(id));
        self.stats.total_hits += hits.len();
        Ok(hits)
    }

    /// Hand every pooled reference back to the store.
    pub fn clear(&mut self, cuts: &mut ExternalCuts) -> TspResult<()> {
        for id in self.order.drain(..) {
            cuts.release(id)?;
        }
        self.members.clear();
        Ok(())
    }
}

/// Incumbent slack below which a pooled cut counts as tight.
const TIGHT_TOL: f64 = 1e-9;
