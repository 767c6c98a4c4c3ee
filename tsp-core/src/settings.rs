//! Configuration settings for the branch-and-cut search.

/// Branching edge selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Select the edge whose value is closest to 0.5.
    #[default]
    MostFractional,

    /// Prefer long fractional edges; ties broken by fractionality.
    LengthWeighted,

    /// Strong branching: solve both children for the best candidates.
    StrongBranching {
        /// Number of candidate edges to evaluate.
        candidates: usize,
    },
}

/// Node selection strategy for the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Depth-first search; children of the last node are taken next.
    #[default]
    DepthFirst,

    /// Always select the node with the lowest bound.
    BestBound,
}

/// How hard the separation loop works per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutAggressiveness {
    /// Lower violation cutoff, larger batches, every strategy enabled.
    Aggressive,

    /// Subtour, blossom and comb families only.
    #[default]
    Default,
}

/// Parameters derived from a [`CutAggressiveness`] level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutPolicy {
    /// Minimum violation for a candidate to enter the batch.
    pub violation_cutoff: f64,

    /// Maximum number of strategies invoked per round.
    pub max_strategies: usize,

    /// Stop invoking strategies once the batch holds this many cuts.
    pub batch_target: usize,

    /// Hard cap on the batch size after ranking.
    pub max_batch: usize,
}

impl CutAggressiveness {
    /// Policy parameters for this level.
    pub fn policy(self) -> CutPolicy {
        match self {
            CutAggressiveness::Aggressive => CutPolicy {
                violation_cutoff: 1e-4,
                max_strategies: 6,
                batch_target: 250,
                max_batch: 250,
            },
            CutAggressiveness::Default => CutPolicy {
                violation_cutoff: 1e-3,
                max_strategies: 5,
                batch_target: 50,
                max_batch: 100,
            },
        }
    }
}

/// Which edges enter the core LP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePlan {
    /// Every city pair.
    #[default]
    Complete,

    /// The `k` nearest neighbors of each city plus the initial tour.
    ///
    /// Missing edges are priced against the row duals before a node is
    /// pruned or branched on, and enter the core when their reduced cost is
    /// negative.
    Nearest {
        /// Neighbors kept per city.
        k: usize,
    },
}

/// Branch-and-cut solver settings.
#[derive(Debug, Clone)]
pub struct TspSettings {
    // === Termination criteria ===
    /// Maximum number of nodes to explore.
    pub max_nodes: u64,

    /// Time limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Integer feasibility tolerance on edge values.
    pub int_feas_tol: f64,

    // === Search strategy ===
    /// Branching edge selection rule.
    pub branching_rule: BranchingRule,

    /// Node selection strategy.
    pub node_selection: NodeSelection,

    /// Core edge set.
    pub edge_plan: EdgePlan,

    // === Cut settings ===
    /// Separation aggressiveness.
    pub aggressiveness: CutAggressiveness,

    /// Maximum separation rounds per node before branching.
    pub max_cut_rounds: usize,

    /// Purge a cut row after it has been slack for this many solves.
    pub purge_slack_age: usize,

    /// Keep only cuts that are tight at the incumbent tour.
    pub filter_primal: bool,

    /// Purged cuts kept for re-separation; zero disables the pool.
    pub pool_capacity: usize,

    // === Pricing ===
    /// Most edges added to the core per pricing pass.
    pub price_batch: usize,

    // === Output ===
    /// Print progress information.
    pub verbose: bool,

    /// Log frequency (print every N nodes).
    pub log_freq: u64,
}

impl Default for TspSettings {
    fn default() -> Self {
        Self {
            // Termination
            max_nodes: 100_000,
            time_limit_ms: None,
            int_feas_tol: 1e-6,

            // Search
            branching_rule: BranchingRule::default(),
            node_selection: NodeSelection::default(),
            edge_plan: EdgePlan::default(),

            // Cuts
            aggressiveness: CutAggressiveness::default(),
            max_cut_rounds: 50,
            purge_slack_age: 10,
            filter_primal: false,
            pool_capacity: 500,

            // Pricing
            price_batch: 100,

            // Output
            verbose: false,
            log_freq: 100,
        }
    }
}

impl TspSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        let mut s = Self::default();
        s.verbose = true;
        s.log_freq = 1;
        s
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set maximum nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Set the separation aggressiveness.
    pub fn with_aggressiveness(mut self, level: CutAggressiveness) -> Self {
        self.aggressiveness = level;
        self
    }

    /// Set the branching rule.
    pub fn with_branching(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }

    /// Set the node selection strategy.
    pub fn with_node_selection(mut self, selection: NodeSelection) -> Self {
        self.node_selection = selection;
        self
    }

    /// Set the core edge plan.
    pub fn with_edge_plan(mut self, plan: EdgePlan) -> Self {
        self.edge_plan = plan;
        self
    }

    /// Keep only cuts tight at the incumbent.
    pub fn with_primal_filter(mut self, on: bool) -> Self {
        self.filter_primal = on;
        self
    }

    /// Set the separation round cap per node.
    pub fn with_max_cut_rounds(mut self, rounds: usize) -> Self {
        self.max_cut_rounds = rounds;
        self
    }

    /// Set the cut pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggressive_policy_is_looser() {
        let agg = CutAggressiveness::Aggressive.policy();
        let def = CutAggressiveness::Default.policy();

        assert!(agg.violation_cutoff < def.violation_cutoff);
        assert!(agg.max_strategies > def.max_strategies);
        assert!(agg.batch_target >= def.batch_target);
    }

    #[test]
    fn test_builders() {
        let s = TspSettings::default()
            .with_time_limit(1.5)
            .with_max_nodes(7)
            .with_edge_plan(EdgePlan::Nearest { k: 5 });

        assert_eq!(s.time_limit_ms, Some(1500));
        assert_eq!(s.max_nodes, 7);
        assert_eq!(s.edge_plan, EdgePlan::Nearest { k: 5 });
        assert!(!s.filter_primal);

        let s = TspSettings::default()
            .with_max_cut_rounds(1)
            .with_pool_capacity(0);
        assert_eq!(s.max_cut_rounds, 1);
        assert_eq!(s.pool_capacity, 0);
    }
}
