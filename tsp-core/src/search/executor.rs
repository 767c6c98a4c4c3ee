//! Branch-and-cut executor.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{
    BranchingSelector, DegreeTracker, Lineage, NodeQueue, NodeReport, NodeStatus, Pricer,
    SearchNode, SearchObserver,
};
use crate::cuts::{CutId, CutMonitor, CutPool, CutShape, CutSource, ExternalCuts};
use crate::error::{TspError, TspResult};
use crate::lp::{core_lp, ActiveTour, LpOutcome, LpSolution, Relaxation, SparseRow, Start};
use crate::model::{
    BestGroup, CoreGraph, EndPts, IncumbentTracker, Instance, Tour, TspSolution, TspStatus,
};
use crate::sep::{MetaCuts, SepCut, SepContext};
use crate::settings::{BranchingRule, EdgePlan, TspSettings};

/// Slack above which a loaded cut row counts as loose.
const SLACK_TOL: f64 = 1e-6;

/// Most negative incumbent slack accepted for a new cut.
const VALIDITY_TOL: f64 = 1e-6;

/// Node relaxation with its loaded cut rows.
///
/// Rows `0..n` are the degree equations; row `n + i` is `rows[i]`, the
/// materialized form of `monitor.rows()[i]`. Every loaded row holds one
/// reference on its cut.
struct NodeLp<R> {
    relax: R,
    monitor: CutMonitor,
    rows: Vec<SparseRow>,
}

/// Relaxation left by the last branched node.
struct Checkpoint<R> {
    node_id: u64,
    lp: NodeLp<R>,
}

/// Branch-and-cut executor.
///
/// Owns the core graph, the base degree LP, the cut store and the node
/// queue. Nodes are descriptors (one edge fix plus a shared cut list); a
/// node's LP is either taken over from the parent's checkpoint or rebuilt
/// from the base LP, the lineage fixes and the listed cuts.
///
/// Before a node is closed the city pairs outside the core are priced, so
/// a sparse core still ends in a proven optimum.
pub struct Executor<'a, R: Relaxation + Clone> {
    /// Problem data.
    instance: &'a Instance,

    /// Settings.
    settings: TspSettings,

    /// Edge set of the LP columns.
    graph: CoreGraph,

    /// Degree LP without fixes or cuts.
    base: R,

    /// Interned cuts shared by every node.
    cuts: ExternalCuts,

    /// Separation orchestrator.
    meta: MetaCuts,

    /// Cuts purged from node LPs, kept for re-separation.
    pool: CutPool,

    /// Prices edges outside the core.
    pricer: Pricer,

    /// Branching edge selector.
    branching: BranchingSelector,

    /// Node queue.
    queue: NodeQueue,

    /// Parent links and fixes of every created node.
    lineage: Lineage,

    /// Best tour so far.
    pub incumbent: IncumbentTracker,

    /// Reference tour for separation.
    active: ActiveTour,

    /// LP of the last branched node.
    checkpoint: Option<Checkpoint<R>>,

    /// Event hooks.
    observer: Option<Box<dyn SearchObserver + 'a>>,

    /// Cooperative cancellation.
    stop: Option<Arc<AtomicBool>>,

    /// Next node ID to assign.
    next_node_id: u64,

    /// Nodes whose LP was processed.
    nodes_explored: u64,

    /// Nodes discarded by bound or degree feasibility.
    nodes_pruned: u64,

    /// Nodes dropped after a numerical failure.
    nodes_lost: u64,

    /// Lowest bound among lost nodes.
    lost_bound: f64,

    /// Cut rows added.
    cuts_added: u64,

    /// Separation rounds run.
    cut_rounds: u64,

    /// Edges added to the core by pricing.
    columns_added: u64,

    /// Missing edges priced over all passes.
    edges_priced: u64,

    /// Bound after the root's cutting loop.
    root_bound: Option<f64>,

    root_infeasible: bool,

    /// Tour lengths are integers, so bounds may be rounded up.
    integral_costs: bool,

    /// Start time.
    start_time: Option<Instant>,
}

impl<'a, R: Relaxation + Clone> Executor<'a, R> {
    /// Set up the core graph, the base LP in `relax` (which must be empty)
    /// and the starting incumbent.
    ///
    /// Without `initial_tour` the nearest-neighbor tour from city 0 is used.
    /// The tour's edges are always added to the core graph.
    pub fn new(
        instance: &'a Instance,
        settings: TspSettings,
        relax: R,
        initial_tour: Option<Tour>,
    ) -> TspResult<Self> {
        let n = instance.num_nodes();
        let tour = match initial_tour {
            Some(t) if t.len() != n => {
                return Err(TspError::InvalidTour(format!(
                    "tour visits {} cities, instance has {}",
                    t.len(),
                    n
                )))
            }
            Some(t) => t,
            None => Tour::nearest_neighbor(instance, 0)?,
        };

        let mut graph = match settings.edge_plan {
            EdgePlan::Complete => CoreGraph::complete(instance),
            EdgePlan::Nearest { k } => CoreGraph::nearest(instance, k),
        };
        for e in tour.edges() {
            graph.add_edge(e.end0, e.end1, instance.cost(e.end0, e.end1));
        }
        if n % 2 == 0 {
            // Basis chord of the starting tour
            let nodes = tour.nodes();
            graph.add_edge(nodes[0], nodes[n - 2], instance.cost(nodes[0], nodes[n - 2]));
        }

        let mut base = relax;
        core_lp::load_base(&mut base, &graph)?;

        let best = BestGroup::new(tour.clone(), &graph)?;
        let active = ActiveTour::from_best(&graph, &best)?;
        base.load_basis(active.basis())?;

        let mut incumbent = IncumbentTracker::new();
        incumbent.update(best);

        Ok(Self {
            instance,
            graph,
            base,
            cuts: ExternalCuts::new(&tour),
            meta: MetaCuts::new(settings.aggressiveness.policy(), settings.filter_primal),
            pool: CutPool::new(settings.pool_capacity),
            pricer: Pricer::new(settings.price_batch),
            branching: BranchingSelector::new(settings.branching_rule),
            queue: NodeQueue::new(settings.node_selection),
            lineage: Lineage::new(),
            incumbent,
            active,
            checkpoint: None,
            observer: None,
            stop: None,
            next_node_id: 1, // 0 reserved for root
            nodes_explored: 0,
            nodes_pruned: 0,
            nodes_lost: 0,
            lost_bound: f64::INFINITY,
            cuts_added: 0,
            cut_rounds: 0,
            columns_added: 0,
            edges_priced: 0,
            root_bound: None,
            root_infeasible: false,
            integral_costs: instance.has_integral_costs(),
            start_time: None,
            settings,
        })
    }

    /// Stop between nodes once `flag` is set.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SearchObserver + 'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn graph(&self) -> &CoreGraph {
        &self.graph
    }

    pub fn cuts(&self) -> &ExternalCuts {
        &self.cuts
    }

    pub fn active_tour(&self) -> &ActiveTour {
        &self.active
    }

    pub fn settings(&self) -> &TspSettings {
        &self.settings
    }

    /// Offer an externally found tour.
    ///
    /// Missing edges join the core graph and the base LP. The tour is
    /// instated in the base LP to obtain its basis; if that fails the
    /// incumbent is still updated. Returns true if it improved the incumbent.
    pub fn offer_tour(&mut self, tour: Tour) -> TspResult<bool> {
        if tour.len() != self.graph.node_count() {
            return Err(TspError::InvalidTour(format!(
                "tour visits {} cities, instance has {}",
                tour.len(),
                self.graph.node_count()
            )));
        }

        let mut grew = false;
        for e in tour.edges() {
            if self.graph.find_edge_ind(e.end0, e.end1).is_none() {
                let len = self.instance.cost(e.end0, e.end1);
                let idx = self.graph.add_edge(e.end0, e.end1, len);
                self.base.add_col(core_lp::edge_column(&self.graph, idx))?;
                grew = true;
            }
        }
        if grew {
            // The checkpoint LP lacks the new columns
            if let Some(cp) = self.checkpoint.take() {
                self.release_lp(cp.lp)?;
            }
        }

        let best = BestGroup::new(tour, &self.graph)?;
        if best.length >= self.incumbent.cost() - 1e-9 {
            return Ok(false);
        }
        let active = match ActiveTour::from_relaxation(
            best.tour.nodes().to_vec(),
            &mut self.base,
            &self.graph,
        ) {
            Ok(active) => Some(active),
            Err(err) => {
                log::warn!("Could not instate offered tour: {}", err);
                None
            }
        };
        self.install_incumbent(best, active)
    }

    /// Run the search to completion or until a limit is hit.
    pub fn run(&mut self) -> TspResult<TspSolution> {
        self.start_time = Some(Instant::now());

        let root = SearchNode::root();
        self.lineage.record(&root);
        self.queue.push(root);

        let mut stopped = None;
        while !self.queue.is_empty() {
            if let Some(status) = self.check_limits() {
                stopped = Some(status);
                break;
            }
            let Some(node) = self.queue.pop() else {
                break;
            };

            if self.prunable(node.bound) {
                self.release_list(&node.cuts)?;
                let bound = node.bound;
                self.finish_node(&node, NodeStatus::Pruned, bound, 0);
                continue;
            }

            self.process_node(node)?;
            self.nodes_explored += 1;
            self.log_progress();
        }

        let status = match stopped {
            Some(status) => status,
            None if self.root_infeasible => TspStatus::Infeasible,
            None if self.nodes_lost > 0 => TspStatus::Incomplete,
            None => TspStatus::Optimal,
        };
        let solution = self.finalize(status);
        self.release_all()?;

        if let Some(obs) = self.observer.as_mut() {
            obs.on_finish(&solution);
        }
        Ok(solution)
    }

    /// Cutting loop of one node, ending in a prune, a tour or a branch.
    ///
    /// A point with fractional edges is cut for at most `max_cut_rounds`
    /// rounds; an integral point that is not a tour is cut until it is
    /// gone. Pricing runs before the node is closed, and edges that enter
    /// send it back into the loop.
    fn process_node(&mut self, mut node: SearchNode) -> TspResult<()> {
        node.status = NodeStatus::Processing;
        let (mut lp, mut start) = self.node_lp(&node)?;
        let mut rounds = 0;

        loop {
            let outcome = lp.relax.optimize(start);
            start = Start::Warm;

            let sol = match outcome {
                LpOutcome::Optimal(sol) => sol,
                LpOutcome::Infeasible if !self.graph.is_complete() => {
                    // The fixes may need edges outside the core.
                    let missing = self.graph.missing_edges();
                    log::debug!(
                        "Node {}: core LP infeasible, adding {} missing edges",
                        node.id,
                        missing.len()
                    );
                    self.add_columns(&mut lp, &missing)?;
                    start = Start::Cold;
                    continue;
                }
                LpOutcome::Infeasible => {
                    if node.id == 0 {
                        self.root_infeasible = true;
                    }
                    self.release_lp(lp)?;
                    self.finish_node(&node, NodeStatus::Infeasible, f64::INFINITY, rounds);
                    return Ok(());
                }
                LpOutcome::Abort(msg) => {
                    log::warn!("Node {}: LP aborted ({}), subtree dropped", node.id, msg);
                    self.release_lp(lp)?;
                    self.lose_node(&node, node.bound, rounds);
                    return Ok(());
                }
                LpOutcome::IterationLimit => {
                    log::warn!("Node {}: LP hit its iteration limit, subtree dropped", node.id);
                    self.release_lp(lp)?;
                    self.lose_node(&node, node.bound, rounds);
                    return Ok(());
                }
            };

            let bound = sol.objective.max(node.bound);
            let tol = self.settings.int_feas_tol;
            let verdict = if self.prunable(bound) {
                NodeStatus::Pruned
            } else if let Ok(tour) = Tour::from_edge_values(&self.graph, &sol.x, tol) {
                self.accept_lp_tour(tour, &sol)?;
                NodeStatus::TourFound
            } else if rounds >= self.settings.max_cut_rounds
                && !BranchingSelector::fractional_edges(&sol.x, tol).is_empty()
            {
                NodeStatus::Branched
            } else {
                if rounds < self.settings.max_cut_rounds {
                    self.purge_stale(&mut lp, &sol.x)?;
                }
                let batch = self.separate(&lp, &sol.x)?;
                rounds += 1;
                self.cut_rounds += 1;
                if self.load_batch(&mut lp, batch)? > 0 {
                    continue;
                }
                NodeStatus::Branched
            };

            if let Some(lower) = self.price_edges(&mut lp)? {
                let lower = lower.max(node.bound);
                if self.prunable(lower) {
                    self.release_lp(lp)?;
                    self.finish_node(&node, NodeStatus::Pruned, lower, rounds);
                    return Ok(());
                }
                continue;
            }

            if verdict == NodeStatus::Branched {
                return self.branch(node, lp, &sol, bound, rounds);
            }
            self.release_lp(lp)?;
            self.finish_node(&node, verdict, bound, rounds);
            return Ok(());
        }
    }

    /// LP for `node`: the parent's checkpoint if it is the last branched
    /// node, otherwise a rebuild.
    fn node_lp(&mut self, node: &SearchNode) -> TspResult<(NodeLp<R>, Start)> {
        if let Some(cp) = self.checkpoint.take() {
            if node.parent_id == Some(cp.node_id) {
                let mut lp = cp.lp;
                if let Some(fix) = node.fix {
                    lp.relax.set_col_bounds(fix.col, fix.value, fix.value)?;
                }
                // The checkpoint rows already reference the node's cuts.
                self.release_list(&node.cuts)?;
                return Ok((lp, Start::Warm));
            }
            self.release_lp(cp.lp)?;
        }

        let mut relax = self.base.clone();
        for fix in self.lineage.fixings(node.id) {
            relax.set_col_bounds(fix.col, fix.value, fix.value)?;
        }
        let mut monitor = CutMonitor::new();
        let mut rows = Vec::with_capacity(node.cuts.len());
        for &id in node.cuts.iter() {
            let row = self.cuts.materialize(id, &self.graph)?;
            relax.add_cut(&row)?;
            monitor.push(id);
            rows.push(row);
        }
        Ok((
            NodeLp {
                relax,
                monitor,
                rows,
            },
            Start::Cold,
        ))
    }

    /// Violated cuts at `x`: pooled cuts first, then the separators.
    fn separate(&mut self, lp: &NodeLp<R>, x: &[f64]) -> TspResult<Vec<SepCut>> {
        let mut known: HashSet<CutId> = lp.monitor.rows().iter().map(|r| r.id).collect();
        let incumbent = self.incumbent.best.as_ref().map(|b| &b.tour);
        let policy = *self.meta.policy();
        let tight_at = if self.settings.filter_primal {
            incumbent
        } else {
            None
        };

        let hits = self.pool.separate(
            &self.cuts,
            &self.graph,
            x,
            &known,
            policy.violation_cutoff,
            tight_at,
            policy.max_batch,
        )?;
        let mut batch: Vec<SepCut> = hits
            .into_iter()
            .map(|(id, violation)| SepCut {
                id,
                violation,
                source: self.cuts.get(id).map_or(CutSource::External, |c| c.source),
            })
            .collect();
        if !batch.is_empty() {
            log::debug!("Cut pool: {} violated cuts", batch.len());
        }
        if batch.len() >= policy.batch_target {
            return Ok(batch);
        }

        known.extend(batch.iter().map(|c| c.id));
        let ctx = SepContext::new(&self.graph, x, self.active.tour());
        batch.extend(self.meta.attempt_sep(&ctx, &mut self.cuts, &known, incumbent)?);
        Ok(batch)
    }

    /// Add a separated batch to the node LP; returns the rows added.
    ///
    /// A cut the incumbent violates is dropped with a warning.
    fn load_batch(&mut self, lp: &mut NodeLp<R>, batch: Vec<SepCut>) -> TspResult<usize> {
        let mut added = 0;
        for cut in batch {
            if let Some(best) = self.incumbent.best.as_ref() {
                let slack = self.cuts.tour_slack(cut.id, &best.tour)?;
                if slack < -VALIDITY_TOL {
                    log::warn!(
                        "Dropping {:?} cut violated by the incumbent (slack {:.3e})",
                        cut.source,
                        slack
                    );
                    self.cuts.release(cut.id)?;
                    continue;
                }
            }

            let row = self.cuts.materialize(cut.id, &self.graph)?;
            match lp.relax.add_cut(&row) {
                Ok(_) => {
                    lp.monitor.push(cut.id);
                    lp.rows.push(row);
                    added += 1;
                }
                Err(TspError::InvalidRow(msg)) => {
                    log::warn!("Dropping {:?} cut: {}", cut.source, msg);
                    self.cuts.release(cut.id)?;
                }
                Err(err) => return Err(err),
            }
        }
        self.cuts_added += added as u64;
        Ok(added)
    }

    /// Age the loaded rows at `x` and delete those slack for too long.
    fn purge_stale(&mut self, lp: &mut NodeLp<R>, x: &[f64]) -> TspResult<()> {
        let slacks: Vec<f64> = lp.rows.iter().map(|r| r.slack(x)).collect();
        lp.monitor.update(&slacks, SLACK_TOL);
        let stale = lp.monitor.stale(self.settings.purge_slack_age);
        if stale.is_empty() {
            return Ok(());
        }

        let n = self.graph.node_count();
        let lp_rows: Vec<usize> = stale.iter().map(|&p| n + p).collect();
        lp.relax.del_rows(&lp_rows)?;

        let mut keep = vec![true; lp.rows.len()];
        for &p in &stale {
            keep[p] = false;
        }
        lp.rows = std::mem::take(&mut lp.rows)
            .into_iter()
            .zip(keep)
            .filter_map(|(row, k)| k.then_some(row))
            .collect();
        for id in lp.monitor.remove(&stale) {
            self.pool.insert(id, &mut self.cuts)?;
        }
        log::debug!("Purged {} slack cut rows", stale.len());
        Ok(())
    }

    /// Price the city pairs outside the core at the node's last optimum.
    ///
    /// Returns None when the core optimum is optimal over every pair.
    /// Otherwise the entering edges join the core and the node LP, and the
    /// Lagrangian bound of the priced point comes back.
    fn price_edges(&mut self, lp: &mut NodeLp<R>) -> TspResult<Option<f64>> {
        if self.graph.is_complete() {
            return Ok(None);
        }
        let shapes = self.loaded_shapes(lp)?;
        let priced = self
            .pricer
            .price(self.instance, &self.graph, &lp.relax, &lp.rows, &shapes);
        let outcome = match priced {
            Ok(outcome) => outcome,
            Err(TspError::NumericalAbort(msg)) => {
                log::warn!("Pricing failed ({}), adding every missing edge", msg);
                let missing = self.graph.missing_edges();
                self.add_columns(lp, &missing)?;
                return Ok(Some(f64::NEG_INFINITY));
            }
            Err(err) => return Err(err),
        };
        self.edges_priced += outcome.scanned as u64;
        if outcome.entering.is_empty() {
            return Ok(None);
        }

        let entering: Vec<EndPts> = outcome.entering.iter().map(|&(e, _)| e).collect();
        self.add_columns(lp, &entering)?;
        Ok(Some(outcome.bound))
    }

    fn loaded_shapes(&self, lp: &NodeLp<R>) -> TspResult<Vec<CutShape>> {
        lp.monitor
            .rows()
            .iter()
            .map(|r| self.cuts.shape(r.id))
            .collect()
    }

    /// Add `edges` to the core graph, the base LP and the node LP.
    ///
    /// Loaded rows are rebuilt over the grown column set. A checkpoint
    /// lacks the new columns and is dropped.
    fn add_columns(&mut self, lp: &mut NodeLp<R>, edges: &[EndPts]) -> TspResult<()> {
        let n = self.graph.node_count();
        let shapes = self.loaded_shapes(lp)?;
        let mut added = 0;
        for &ends in edges {
            if self.graph.find_edge_ind(ends.end0, ends.end1).is_some() {
                continue;
            }
            let len = self.instance.cost(ends.end0, ends.end1);
            let idx = self.graph.add_edge(ends.end0, ends.end1, len);
            let col = core_lp::edge_column(&self.graph, idx);
            self.base.add_col(col.clone())?;

            let mut node_col = col;
            for (k, shape) in shapes.iter().enumerate() {
                let coef = shape.coef(ends);
                if coef != 0.0 {
                    node_col.entries.push((n + k, coef));
                }
            }
            lp.relax.add_col(node_col)?;
            added += 1;
        }
        if added == 0 {
            return Ok(());
        }

        lp.rows = lp
            .monitor
            .rows()
            .iter()
            .map(|r| self.cuts.materialize(r.id, &self.graph))
            .collect::<TspResult<_>>()?;
        if let Some(cp) = self.checkpoint.take() {
            self.release_lp(cp.lp)?;
        }
        self.columns_added += added;
        log::debug!(
            "Added {} priced edges, core has {}",
            added,
            self.graph.edge_count()
        );
        Ok(())
    }

    /// Create the two children of `node` and keep its LP as checkpoint.
    ///
    /// The exclude child is pushed first so depth-first search dives into
    /// the forced child.
    fn branch(
        &mut self,
        node: SearchNode,
        lp: NodeLp<R>,
        sol: &LpSolution,
        bound: f64,
        rounds: usize,
    ) -> TspResult<()> {
        let tol = self.settings.int_feas_tol;
        let decision = match self.branching.rule() {
            BranchingRule::StrongBranching { candidates } => self.branching.select_strong(
                &lp.relax,
                &self.graph,
                &sol.x,
                sol.objective,
                tol,
                candidates,
            ),
            _ => self.branching.select(&self.graph, &sol.x, tol),
        };
        let Some(decision) = decision else {
            log::warn!(
                "Node {}: integral point without violated cuts, subtree dropped",
                node.id
            );
            self.release_lp(lp)?;
            self.lose_node(&node, bound, rounds);
            return Ok(());
        };

        // Missing pairs may still enter, so every city counts all partners.
        let tracker =
            DegreeTracker::for_cities(self.graph.node_count(), &self.lineage.fixings(node.id));
        let list: Rc<[CutId]> = Rc::from(lp.monitor.ids());
        for fix in [decision.down_branch, decision.up_branch] {
            let mut child = node.child(self.next_node_id, fix, Rc::clone(&list));
            self.next_node_id += 1;
            child.bound = bound;

            if !tracker.child_feasible(&fix) {
                child.status = NodeStatus::Pruned;
                self.nodes_pruned += 1;
                self.report(&child, bound, 0);
                continue;
            }
            for &id in list.iter() {
                self.cuts.retain(id)?;
            }
            self.lineage.record(&child);
            self.queue.push(child);
        }
        log::debug!(
            "Node {}: branched on edge ({}, {}) at {:.4}, score {:.4e}",
            node.id,
            decision.up_branch.ends.end0,
            decision.up_branch.ends.end1,
            decision.value,
            decision.score
        );

        if let Some(old) = self.checkpoint.take() {
            self.release_lp(old.lp)?;
        }
        self.checkpoint = Some(Checkpoint {
            node_id: node.id,
            lp,
        });
        self.finish_node(&node, NodeStatus::Branched, bound, rounds);
        Ok(())
    }

    /// Take an LP optimum that is a tour as incumbent if it improves.
    fn accept_lp_tour(&mut self, tour: Tour, sol: &LpSolution) -> TspResult<bool> {
        let best = BestGroup::new(tour, &self.graph)?;
        if best.length >= self.incumbent.cost() - 1e-9 {
            return Ok(false);
        }
        let active = ActiveTour::from_lp_state(
            best.tour.nodes().to_vec(),
            sol.x.clone(),
            sol.basis.clone(),
            sol.objective,
            &self.graph,
        )
        .or_else(|err| {
            log::warn!("LP tour state rejected ({}), rebuilding its basis", err);
            ActiveTour::from_best(&self.graph, &best)
        });
        let active = match active {
            Ok(active) => Some(active),
            Err(err) => {
                log::warn!("Keeping the previous reference tour: {}", err);
                None
            }
        };
        self.install_incumbent(best, active)
    }

    fn install_incumbent(
        &mut self,
        best: BestGroup,
        active: Option<ActiveTour>,
    ) -> TspResult<bool> {
        let tour = best.tour.clone();
        let cost = best.length;
        if !self.incumbent.update(best) {
            return Ok(false);
        }
        if let Some(active) = active {
            self.active = active;
        }
        if let Some(obs) = self.observer.as_mut() {
            obs.on_incumbent(&tour, cost);
        }

        // Prune nodes dominated by new incumbent
        let pruned = self.queue.prune_by_bound(self.prune_target());
        let count = pruned.len();
        for node in pruned {
            self.release_list(&node.cuts)?;
            let bound = node.bound;
            self.finish_node(&node, NodeStatus::Pruned, bound, 0);
        }

        if self.settings.verbose {
            log::info!("New incumbent: length={:.6}, pruned {} nodes", cost, count);
        }
        Ok(true)
    }

    /// Bound at or above which a node is pruned.
    ///
    /// With integral costs a node prunes once its bound rounds up to the
    /// incumbent length.
    fn prune_target(&self) -> f64 {
        let cost = self.incumbent.cost();
        if self.integral_costs && cost.is_finite() {
            cost - 1.0 + 2e-6
        } else {
            cost
        }
    }

    fn prunable(&self, bound: f64) -> bool {
        bound >= self.prune_target() - 1e-9
    }

    fn lose_node(&mut self, node: &SearchNode, bound: f64, rounds: usize) {
        self.nodes_lost += 1;
        self.lost_bound = self.lost_bound.min(bound);
        self.finish_node(node, NodeStatus::Aborted, bound, rounds);
    }

    fn finish_node(&mut self, node: &SearchNode, status: NodeStatus, bound: f64, rounds: usize) {
        if status == NodeStatus::Pruned {
            self.nodes_pruned += 1;
        }
        if node.id == 0 && !matches!(status, NodeStatus::Infeasible | NodeStatus::Aborted) {
            self.root_bound = Some(bound);
        }
        self.lineage.close(node.id);
        let mut done = node.clone();
        done.status = status;
        self.report(&done, bound, rounds);
    }

    fn report(&mut self, node: &SearchNode, bound: f64, rounds: usize) {
        if let Some(obs) = self.observer.as_mut() {
            obs.on_node(&NodeReport {
                id: node.id,
                parent_id: node.parent_id,
                depth: node.depth,
                parent_bound: node.bound,
                bound: bound.max(node.bound),
                status: node.status,
                cut_rounds: rounds,
            });
        }
    }

    fn release_list(&mut self, ids: &[CutId]) -> TspResult<()> {
        for &id in ids {
            self.cuts.release(id)?;
        }
        Ok(())
    }

    fn release_lp(&mut self, lp: NodeLp<R>) -> TspResult<()> {
        for row in lp.monitor.rows() {
            self.cuts.release(row.id)?;
        }
        Ok(())
    }

    /// Drop the references held by queued nodes, the checkpoint and the
    /// cut pool.
    fn release_all(&mut self) -> TspResult<()> {
        for node in self.queue.drain() {
            self.release_list(&node.cuts)?;
        }
        if let Some(cp) = self.checkpoint.take() {
            self.release_lp(cp.lp)?;
        }
        self.pool.clear(&mut self.cuts)
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Check if time limit is exceeded.
    pub fn time_limit_exceeded(&self) -> bool {
        if let Some(limit) = self.settings.time_limit_ms {
            self.elapsed_ms() >= limit
        } else {
            false
        }
    }

    /// Returns Some(status) if the search must stop before the next node.
    fn check_limits(&self) -> Option<TspStatus> {
        if self
            .stop
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
        {
            return Some(TspStatus::Interrupted);
        }
        if self.time_limit_exceeded() {
            return Some(TspStatus::TimeLimit);
        }
        if self.nodes_explored >= self.settings.max_nodes {
            return Some(TspStatus::NodeLimit);
        }
        None
    }

    /// Lowest bound over open and lost nodes, capped by the incumbent.
    pub fn best_bound(&self) -> f64 {
        self.queue
            .best_bound()
            .min(self.lost_bound)
            .min(self.incumbent.cost())
    }

    /// Get the current optimality gap.
    pub fn gap(&self) -> f64 {
        TspSolution::compute_gap(self.incumbent.cost(), self.best_bound())
    }

    fn finalize(&self, status: TspStatus) -> TspSolution {
        let base = TspSolution {
            status,
            nodes_explored: self.nodes_explored,
            cuts_added: self.cuts_added,
            cut_rounds: self.cut_rounds,
            solve_time_ms: self.elapsed_ms(),
            incumbent_updates: self.incumbent.update_count,
            ..TspSolution::default()
        };
        if status == TspStatus::Infeasible {
            return TspSolution {
                bound: f64::INFINITY,
                ..base
            };
        }

        let proven = status == TspStatus::Optimal;
        TspSolution {
            tour: self.incumbent.best.as_ref().map(|b| b.tour.clone()),
            cost: self.incumbent.cost(),
            bound: self.best_bound(),
            proven,
            gap: self.gap(),
            ..base
        }
    }

    /// Log progress (if verbose).
    pub fn log_progress(&self) {
        if !self.settings.verbose {
            return;
        }

        if self.nodes_explored % self.settings.log_freq.max(1) != 0 {
            return;
        }

        log::info!(
            "Nodes: {} ({} open) | Bound: {:.6} | Incumbent: {:.6} | Gap: {:.2}% | Cuts: {} | Time: {:.1}s",
            self.nodes_explored,
            self.queue.len(),
            self.best_bound(),
            self.incumbent.cost(),
            self.gap() * 100.0,
            self.cuts_added,
            self.elapsed_ms() as f64 / 1000.0,
        );
    }

    /// Get statistics for display.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes_explored: self.nodes_explored,
            nodes_pruned: self.nodes_pruned,
            nodes_open: self.queue.len() as u64,
            nodes_lost: self.nodes_lost,
            cuts_added: self.cuts_added,
            cut_rounds: self.cut_rounds,
            cuts_stored: self.cuts.len(),
            pool_size: self.pool.len(),
            columns_added: self.columns_added,
            edges_priced: self.edges_priced,
            core_edges: self.graph.edge_count(),
            incumbent_updates: self.incumbent.update_count,
            root_bound: self.root_bound,
            best_bound: self.best_bound(),
            incumbent_cost: self.incumbent.cost(),
            gap: self.gap(),
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// Statistics from the search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub nodes_explored: u64,
    pub nodes_pruned: u64,
    pub nodes_open: u64,
    pub nodes_lost: u64,
    pub cuts_added: u64,
    pub cut_rounds: u64,
    pub cuts_stored: usize,
    pub pool_size: usize,
    pub columns_added: u64,
    pub edges_priced: u64,
    pub core_edges: usize,
    pub incumbent_updates: u64,
    pub root_bound: Option<f64>,
    pub best_bound: f64,
    pub incumbent_cost: f64,
    pub gap: f64,
    pub elapsed_ms: u64,
}
