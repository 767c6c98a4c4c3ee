//! Separation orchestrator.
//!
//! Runs the strategies in a fixed priority order and stops early once the
//! batch is full enough or the policy's strategy budget is spent.
//!
//! A round never comes back empty while the point has a violated
//! connectivity cut: when the primal filter rejects every candidate the
//! rejected ones are used instead, and a disconnected support graph always
//! yields its component subtours.

use std::collections::HashSet;

use super::{
    BlockCombs, ConnectCuts, CutTemplate, ExactSubtours, FastBlossoms, SegmentCuts, SepContext,
    Separator, SimpleDominos,
};
use crate::cuts::{CutId, CutSource, ExternalCuts};
use crate::error::{TspError, TspResult};
use crate::model::Tour;
use crate::settings::CutPolicy;

/// A cut of the batch, interned and holding one reference for the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SepCut {
    pub id: CutId,
    pub violation: f64,
    pub source: CutSource,
}

/// Per-strategy counters.
#[derive(Debug, Clone, Default)]
pub struct StrategyStats {
    /// Rounds in which the strategy ran.
    pub calls: usize,

    /// Candidates yielded.
    pub candidates: usize,

    /// Candidates that passed the violation cutoff.
    pub accepted: usize,
}

/// Slack at the incumbent below which a cut counts as tight.
const TIGHT_TOL: f64 = 1e-9;

/// Separation orchestrator.
pub struct MetaCuts {
    strategies: Vec<Box<dyn Separator>>,
    stats: Vec<StrategyStats>,
    policy: CutPolicy,
    filter_primal: bool,
}

impl MetaCuts {
    /// Orchestrator with the standard strategy order: segments, connected
    /// components, exact subtours, fast blossoms, block combs, simple
    /// dominoes.
    pub fn new(policy: CutPolicy, filter_primal: bool) -> Self {
        let strategies: Vec<Box<dyn Separator>> = vec![
            Box::new(SegmentCuts),
            Box::new(ConnectCuts),
            Box::new(ExactSubtours),
            Box::new(FastBlossoms),
            Box::new(BlockCombs),
            Box::new(SimpleDominos::default()),
        ];
        Self::with_strategies(strategies, policy, filter_primal)
    }

    /// Orchestrator over a caller-chosen strategy list, run in order.
    pub fn with_strategies(
        strategies: Vec<Box<dyn Separator>>,
        policy: CutPolicy,
        filter_primal: bool,
    ) -> Self {
        let stats = vec![StrategyStats::default(); strategies.len()];
        Self {
            strategies,
            stats,
            policy,
            filter_primal,
        }
    }

    pub fn policy(&self) -> &CutPolicy {
        &self.policy
    }

    /// True if a violation is large enough to keep.
    pub fn above_threshold(&self, violation: f64) -> bool {
        violation >= self.policy.violation_cutoff
    }

    /// Strategy names with their counters, in run order.
    pub fn stats(&self) -> impl Iterator<Item = (&'static str, &StrategyStats)> {
        self.strategies.iter().map(|s| s.name()).zip(&self.stats)
    }

    /// Find a batch of violated cuts at `ctx`.
    ///
    /// Candidates already in `active` are dropped. With the primal filter
    /// on, cuts tight at `incumbent` are preferred; loose ones enter only
    /// when no tight cut is violated. The batch comes back ranked by
    /// decreasing violation; an empty batch is not an error.
    pub fn attempt_sep(
        &mut self,
        ctx: &SepContext<'_>,
        cuts: &mut ExternalCuts,
        active: &HashSet<CutId>,
        incumbent: Option<&Tour>,
    ) -> TspResult<Vec<SepCut>> {
        let mut found: Vec<(CutTemplate, f64)> = Vec::new();
        let mut loose: Vec<(CutTemplate, f64)> = Vec::new();

        for (tried, strategy) in self.strategies.iter().enumerate() {
            if tried >= self.policy.max_strategies || found.len() >= self.policy.batch_target {
                break;
            }
            let stats = &mut self.stats[tried];
            stats.calls += 1;

            let before = found.len();
            for tpl in strategy.try_separate(ctx) {
                stats.candidates += 1;
                let violation = tpl.violation(ctx);
                if violation < self.policy.violation_cutoff {
                    continue;
                }
                if self.filter_primal {
                    if let Some(tour) = incumbent {
                        if tpl.tour_slack(tour) > TIGHT_TOL {
                            if loose.len() < self.policy.max_batch {
                                loose.push((tpl, violation));
                            }
                            continue;
                        }
                    }
                }
                stats.accepted += 1;
                found.push((tpl, violation));
                if found.len() >= self.policy.max_batch {
                    break;
                }
            }
            log::debug!(
                "separator {}: {} cuts above cutoff",
                strategy.name(),
                found.len() - before
            );
        }

        if found.is_empty() && !loose.is_empty() {
            log::debug!("no tight cut violated, using {} loose cuts", loose.len());
            found = loose;
        }
        if found.is_empty() {
            found = ConnectCuts
                .try_separate(ctx)
                .map(|tpl| {
                    let violation = tpl.violation(ctx);
                    (tpl, violation)
                })
                .filter(|(_, violation)| *violation >= self.policy.violation_cutoff)
                .collect();
        }

        found.sort_by(|a, b| b.1.total_cmp(&a.1));
        found.truncate(self.policy.max_batch);

        let mut seen: HashSet<CutId> = HashSet::new();
        let mut batch = Vec::with_capacity(found.len());
        for (tpl, violation) in found {
            let (id, _) = match tpl.intern(cuts) {
                Ok(res) => res,
                Err(TspError::DegenerateClique(msg)) | Err(TspError::InvalidRow(msg)) => {
                    log::warn!("rejected {:?} cut: {}", tpl.source(), msg);
                    continue;
                }
                Err(err) => return Err(err),
            };
            if active.contains(&id) || !seen.insert(id) {
                cuts.release(id)?;
                continue;
            }
            batch.push(SepCut {
                id,
                violation,
                source: tpl.source(),
            });
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreGraph, Instance};
    use crate::settings::CutAggressiveness;

    fn triangles() -> (CoreGraph, Vec<f64>, Tour) {
        let inst = Instance::random_euclidean(6, 12).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut x = vec![0.0; graph.edge_count()];
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            x[graph.find_edge_ind(u, v).unwrap()] = 1.0;
        }
        (graph, x, Tour::new((0..6).collect()).unwrap())
    }

    #[test]
    fn test_threshold() {
        let meta = MetaCuts::new(CutAggressiveness::Default.policy(), false);
        assert!(meta.above_threshold(1e-2));
        assert!(!meta.above_threshold(1e-5));
    }

    #[test]
    fn test_batch_dedups_across_strategies() {
        let (graph, x, tour) = triangles();
        let ctx = SepContext::new(&graph, &x, &tour);
        let mut cuts = ExternalCuts::new(&tour);
        let mut meta = MetaCuts::new(CutAggressiveness::Aggressive.policy(), false);

        let batch = meta
            .attempt_sep(&ctx, &mut cuts, &HashSet::new(), None)
            .unwrap();
        // Segments stop the loop early only with a full batch, so connect
        // and exact subtours also find the triangles. The store keeps
        // {0,1,2} and {3,4,5} as separate cliques.
        assert!(!batch.is_empty());
        let ids: HashSet<CutId> = batch.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), batch.len());
        for w in batch.windows(2) {
            assert!(w[0].violation >= w[1].violation);
        }
        for c in &batch {
            assert_eq!(cuts.refcount(c.id), 1);
        }

        // A second round with every cut active yields nothing new.
        let batch2 = meta.attempt_sep(&ctx, &mut cuts, &ids, None).unwrap();
        assert!(batch2.is_empty());
        assert_eq!(cuts.len(), ids.len());
    }

    #[test]
    fn test_strategy_budget() {
        let (graph, x, tour) = triangles();
        let ctx = SepContext::new(&graph, &x, &tour);
        let mut cuts = ExternalCuts::new(&tour);
        let policy = CutPolicy {
            max_strategies: 1,
            ..CutAggressiveness::Default.policy()
        };
        let mut meta = MetaCuts::new(policy, false);
        let batch = meta
            .attempt_sep(&ctx, &mut cuts, &HashSet::new(), None)
            .unwrap();
        assert!(batch.iter().all(|c| c.source == CutSource::Segment));

        let calls: Vec<usize> = meta.stats().map(|(_, s)| s.calls).collect();
        assert_eq!(calls, vec![1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_primal_filter_prefers_tight_cuts() {
        let (graph, x, tour) = triangles();
        let ctx = SepContext::new(&graph, &x, &tour);
        let mut cuts = ExternalCuts::new(&tour);
        let mut meta = MetaCuts::new(CutAggressiveness::Aggressive.policy(), true);

        // {0,1,2} crosses the tour 0..5 exactly twice, so it is tight there.
        let kept = meta
            .attempt_sep(&ctx, &mut cuts, &HashSet::new(), Some(&tour))
            .unwrap();
        assert!(!kept.is_empty());
        for c in &kept {
            assert!(cuts.tour_slack(c.id, &tour).unwrap().abs() < 1e-9);
        }
    }

    #[test]
    fn test_primal_filter_falls_back_to_loose_cuts() {
        let (graph, x, tour) = triangles();
        let ctx = SepContext::new(&graph, &x, &tour);
        let mut cuts = ExternalCuts::new(&tour);
        let mut meta = MetaCuts::new(CutAggressiveness::Aggressive.policy(), true);

        // A tour zigzagging between the triangles crosses {0,1,2} six
        // times, so no subtour cut is tight there. The two subtours must
        // still be cut off.
        let zigzag = Tour::new(vec![0, 3, 1, 4, 2, 5]).unwrap();
        let kept = meta
            .attempt_sep(&ctx, &mut cuts, &HashSet::new(), Some(&zigzag))
            .unwrap();
        assert!(!kept.is_empty());
        assert!(kept.iter().all(|c| c.violation > 1.0));
    }

    #[test]
    fn test_disconnected_point_always_cut() {
        let (graph, x, tour) = triangles();
        let ctx = SepContext::new(&graph, &x, &tour);
        let mut cuts = ExternalCuts::new(&tour);
        let policy = CutPolicy {
            max_strategies: 0,
            ..CutAggressiveness::Default.policy()
        };
        let mut meta = MetaCuts::new(policy, true);
        let batch = meta
            .attempt_sep(&ctx, &mut cuts, &HashSet::new(), None)
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].source, CutSource::Connect);
        assert!((batch[0].violation - 2.0).abs() < 1e-9);
    }
}
