//! End-to-end branch-and-cut tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tsp_core::lp::{Basis, LpColumn, LpOutcome, Relaxation, SparseRow, Start};
use tsp_core::model::Tour;
use tsp_core::search::{Executor, NodeReport, SearchObserver};
use tsp_core::{
    solve_tsp, BranchingRule, EdgePlan, Instance, NodeSelection, TspError, TspResult,
    TspSettings, TspStatus,
};

/// Route engine logs through the test harness; `RUST_LOG=debug` shows them.
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn five_city() -> Instance {
    Instance::from_matrix(vec![
        vec![0.0, 3.0, 4.0, 2.0, 7.0],
        vec![3.0, 0.0, 4.0, 6.0, 3.0],
        vec![4.0, 4.0, 0.0, 5.0, 8.0],
        vec![2.0, 6.0, 5.0, 0.0, 6.0],
        vec![7.0, 3.0, 8.0, 6.0, 0.0],
    ])
    .unwrap()
}

/// Shortest tour by enumerating every permutation with city 0 first.
fn brute_force(inst: &Instance) -> f64 {
    fn extend(inst: &Instance, path: &mut Vec<usize>, used: &mut [bool], best: &mut f64) {
        let n = used.len();
        if path.len() == n {
            *best = best.min(inst.tour_cost(path));
            return;
        }
        for v in 1..n {
            if !used[v] {
                used[v] = true;
                path.push(v);
                extend(inst, path, used, best);
                path.pop();
                used[v] = false;
            }
        }
    }

    let n = inst.num_nodes();
    let mut used = vec![false; n];
    used[0] = true;
    let mut best = f64::INFINITY;
    extend(inst, &mut vec![0], &mut used, &mut best);
    best
}

/// Observer that records everything it sees.
#[derive(Default)]
struct Recorder {
    nodes: Vec<NodeReport>,
    incumbents: Vec<f64>,
    finished: bool,
}

struct Shared(Rc<RefCell<Recorder>>);

impl SearchObserver for Shared {
    fn on_incumbent(&mut self, _tour: &Tour, cost: f64) {
        self.0.borrow_mut().incumbents.push(cost);
    }

    fn on_node(&mut self, report: &NodeReport) {
        self.0.borrow_mut().nodes.push(*report);
    }

    fn on_finish(&mut self, _solution: &tsp_core::TspSolution) {
        self.0.borrow_mut().finished = true;
    }
}

#[test]
fn test_five_city_scenario() {
    init_logger();
    let inst = five_city();
    let log = Rc::new(RefCell::new(Recorder::default()));
    let mut exec = Executor::new(
        &inst,
        TspSettings::default(),
        tsp_core::lp::MicroLpRelaxation::new(),
        None,
    )
    .unwrap()
    .with_observer(Box::new(Shared(Rc::clone(&log))));

    let sol = exec.run().unwrap();
    assert_eq!(sol.status, TspStatus::Optimal);
    assert!(sol.proven);
    assert!(sol.is_optimal());
    assert_eq!(sol.cost, 19.0);
    assert!((sol.bound - 19.0).abs() < 1e-9);

    let tour = sol.tour.unwrap();
    assert_eq!(tour.cost(&inst), 19.0);
    let mut sorted = tour.nodes().to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4]);

    let log = log.borrow();
    assert!(log.finished);
    let root = log.nodes.iter().find(|r| r.id == 0).unwrap();
    assert!(root.bound >= 15.0);
    assert!(root.bound <= 19.0 + 1e-9);
    // Incumbents strictly improve down to the optimum
    for w in log.incumbents.windows(2) {
        assert!(w[1] < w[0]);
    }
    if let Some(&last) = log.incumbents.last() {
        assert_eq!(last, 19.0);
    }
}

#[test]
fn test_child_bounds_never_drop() {
    let inst = Instance::random_euclidean(9, 21).unwrap();
    let log = Rc::new(RefCell::new(Recorder::default()));
    let settings = TspSettings::default().with_node_selection(NodeSelection::BestBound);
    let mut exec = Executor::new(&inst, settings, tsp_core::lp::MicroLpRelaxation::new(), None)
        .unwrap()
        .with_observer(Box::new(Shared(Rc::clone(&log))));
    exec.run().unwrap();

    let log = log.borrow();
    let by_id: HashMap<u64, &NodeReport> = log.nodes.iter().map(|r| (r.id, r)).collect();
    for report in &log.nodes {
        assert!(report.bound >= report.parent_bound);
        if let Some(parent) = report.parent_id.and_then(|p| by_id.get(&p)) {
            assert!(report.parent_bound >= parent.bound - 1e-9);
            assert_eq!(report.depth, parent.depth + 1);
        }
    }
}

#[test]
fn test_agrees_with_brute_force() {
    init_logger();
    for (n, seed) in [(5, 1), (6, 2), (7, 3), (7, 4), (8, 5)] {
        let inst = Instance::random_euclidean(n, seed).unwrap();
        let expected = brute_force(&inst);
        let sol = solve_tsp(&inst, &TspSettings::default()).unwrap();
        assert!(sol.proven, "n={} seed={}", n, seed);
        assert!(
            (sol.cost - expected).abs() < 1e-6,
            "n={} seed={}: got {}, brute force {}",
            n,
            seed,
            sol.cost,
            expected
        );
    }
}

#[test]
fn test_search_options_agree() {
    let inst = Instance::random_euclidean(8, 11).unwrap();
    let expected = brute_force(&inst);
    let variants = [
        TspSettings::default().with_branching(BranchingRule::LengthWeighted),
        TspSettings::default().with_branching(BranchingRule::StrongBranching { candidates: 3 }),
        TspSettings::default().with_node_selection(NodeSelection::BestBound),
        TspSettings::default().with_primal_filter(true),
        TspSettings::default().with_aggressiveness(tsp_core::CutAggressiveness::Aggressive),
    ];
    for settings in variants {
        let sol = solve_tsp(&inst, &settings).unwrap();
        assert_eq!(sol.status, TspStatus::Optimal);
        assert!((sol.cost - expected).abs() < 1e-6, "{:?}", settings);
    }
}

#[test]
fn test_purge_releases_bank_slots() {
    let inst = Instance::random_euclidean(10, 8).unwrap();
    let mut settings = TspSettings::default();
    settings.purge_slack_age = 1;
    let mut exec =
        Executor::new(&inst, settings, tsp_core::lp::MicroLpRelaxation::new(), None).unwrap();
    let sol = exec.run().unwrap();
    assert!((sol.cost - brute_force(&inst)).abs() < 1e-6);

    let stats = exec.stats();
    assert_eq!(stats.cuts_stored, 0);
    assert!(exec.cuts().cliques().is_empty());
    assert!(exec.cuts().teeth().is_empty());
}

#[test]
fn test_node_limit_is_unproven() {
    let inst = Instance::random_euclidean(14, 6).unwrap();
    let settings = TspSettings::default().with_max_nodes(1);
    let sol = solve_tsp(&inst, &settings).unwrap();
    match sol.status {
        TspStatus::NodeLimit => {
            assert!(!sol.proven);
            assert!(sol.bound <= sol.cost);
        }
        TspStatus::Optimal => assert!(sol.proven),
        other => panic!("unexpected status {:?}", other),
    }
    assert!(sol.tour.is_some());
}

#[test]
fn test_sparse_edge_set_is_priced_to_optimality() {
    init_logger();
    for (n, k, seed) in [(9, 4, 4), (8, 2, 7), (9, 2, 12), (7, 3, 31)] {
        let inst = Instance::random_euclidean(n, seed).unwrap();
        let settings = TspSettings::default().with_edge_plan(EdgePlan::Nearest { k });
        let sol = solve_tsp(&inst, &settings).unwrap();
        assert_eq!(sol.status, TspStatus::Optimal, "n={} k={} seed={}", n, k, seed);
        assert!(sol.proven, "n={} k={} seed={}", n, k, seed);
        assert!(
            (sol.cost - brute_force(&inst)).abs() < 1e-6,
            "n={} k={} seed={}: got {}",
            n,
            k,
            seed,
            sol.cost
        );
    }
}

#[test]
fn test_single_cut_round_still_optimal() {
    init_logger();
    // One round per node leaves integral subtour points to later rounds.
    let mut cases: Vec<(usize, u64)> = vec![(7, 104)];
    for n in 5..=9 {
        cases.extend((0..6).map(|seed| (n, 100 + seed)));
    }
    for (n, seed) in cases {
        let inst = Instance::random_euclidean(n, seed).unwrap();
        let settings = TspSettings::default().with_max_cut_rounds(1);
        let sol = solve_tsp(&inst, &settings).unwrap();
        assert_eq!(sol.status, TspStatus::Optimal, "n={} seed={}", n, seed);
        assert!(sol.proven);
        assert!(
            (sol.cost - brute_force(&inst)).abs() < 1e-6,
            "n={} seed={}: got {}",
            n,
            seed,
            sol.cost
        );
    }
}

#[test]
fn test_no_cut_rounds_still_optimal() {
    let inst = Instance::random_euclidean(8, 3).unwrap();
    let sol = solve_tsp(&inst, &TspSettings::default().with_max_cut_rounds(0)).unwrap();
    assert_eq!(sol.status, TspStatus::Optimal);
    assert!((sol.cost - brute_force(&inst)).abs() < 1e-6);
}

#[test]
fn test_primal_filter_agrees_with_brute_force() {
    init_logger();
    let mut cases: Vec<(usize, u64)> = vec![(8, 1)];
    for n in 5..=9 {
        cases.extend((0..5).map(|seed| (n, 40 + seed)));
    }
    for (n, seed) in cases {
        let inst = Instance::random_euclidean(n, seed).unwrap();
        let settings = TspSettings::default().with_primal_filter(true);
        let sol = solve_tsp(&inst, &settings).unwrap();
        assert_eq!(sol.status, TspStatus::Optimal, "n={} seed={}", n, seed);
        assert!(
            (sol.cost - brute_force(&inst)).abs() < 1e-6,
            "n={} seed={}: got {}",
            n,
            seed,
            sol.cost
        );
    }
}

#[test]
fn test_cut_pool_settings_agree() {
    let inst = Instance::random_euclidean(10, 19).unwrap();
    let expected = brute_force(&inst);
    for capacity in [0, 3, 500] {
        let mut settings = TspSettings::default().with_pool_capacity(capacity);
        settings.purge_slack_age = 1;
        let mut exec =
            Executor::new(&inst, settings, tsp_core::lp::MicroLpRelaxation::new(), None).unwrap();
        let sol = exec.run().unwrap();
        assert_eq!(sol.status, TspStatus::Optimal);
        assert!((sol.cost - expected).abs() < 1e-6, "capacity {}", capacity);

        let stats = exec.stats();
        assert_eq!(stats.pool_size, 0);
        assert_eq!(stats.cuts_stored, 0);
    }
}

/// Relaxation whose every solve reports the same outcome.
#[derive(Clone)]
struct FixedOutcome {
    outcome: LpOutcome,
    bounds: Vec<(f64, f64)>,
    rows: usize,
}

impl FixedOutcome {
    fn new(outcome: LpOutcome) -> Self {
        Self {
            outcome,
            bounds: Vec::new(),
            rows: 0,
        }
    }
}

impl Relaxation for FixedOutcome {
    fn num_cols(&self) -> usize {
        self.bounds.len()
    }

    fn num_rows(&self) -> usize {
        self.rows
    }

    fn add_col(&mut self, col: LpColumn) -> TspResult<usize> {
        self.bounds.push((col.lb, col.ub));
        Ok(self.bounds.len() - 1)
    }

    fn add_cut(&mut self, _row: &SparseRow) -> TspResult<usize> {
        self.rows += 1;
        Ok(self.rows - 1)
    }

    fn del_rows(&mut self, rows: &[usize]) -> TspResult<()> {
        self.rows -= rows.len();
        Ok(())
    }

    fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) -> TspResult<()> {
        let slot = self
            .bounds
            .get_mut(col)
            .ok_or_else(|| TspError::InvalidRow(format!("no column {}", col)))?;
        *slot = (lb, ub);
        Ok(())
    }

    fn col_bounds(&self, col: usize) -> TspResult<(f64, f64)> {
        self.bounds
            .get(col)
            .copied()
            .ok_or_else(|| TspError::InvalidRow(format!("no column {}", col)))
    }

    fn optimize(&mut self, _start: Start) -> LpOutcome {
        self.outcome.clone()
    }

    fn objective(&self) -> Option<f64> {
        None
    }

    fn primal(&self) -> Option<&[f64]> {
        None
    }

    fn basis(&self) -> Option<&Basis> {
        None
    }
}

#[test]
fn test_root_infeasible_is_reported() {
    let inst = five_city();
    let mut exec = Executor::new(
        &inst,
        TspSettings::default(),
        FixedOutcome::new(LpOutcome::Infeasible),
        None,
    )
    .unwrap();
    let sol = exec.run().unwrap();
    assert_eq!(sol.status, TspStatus::Infeasible);
    assert!(!sol.proven);
    assert!(sol.tour.is_none());
}

#[test]
fn test_root_abort_is_unproven() {
    let inst = five_city();
    let mut exec = Executor::new(
        &inst,
        TspSettings::default(),
        FixedOutcome::new(LpOutcome::Abort("singular basis".into())),
        None,
    )
    .unwrap();
    let sol = exec.run().unwrap();
    assert_eq!(sol.status, TspStatus::Incomplete);
    assert!(!sol.proven);
    assert!(!sol.is_optimal());
    assert_eq!(exec.stats().nodes_lost, 1);
    // The starting tour survives
    assert!(sol.tour.is_some());
    assert!(sol.cost.is_finite());
}
