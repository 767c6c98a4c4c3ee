//! A tour paired with the LP point and basis that justify it.
//!
//! An `ActiveTour` is replaced, not edited, when the relaxation moves on.
//! Keeping it in step with later cuts or columns is the caller's job.

use super::backend::{Basis, BasisStatus, LpOutcome, Relaxation, Start};
use crate::error::{TspError, TspResult};
use crate::model::{BestGroup, CoreGraph, Tour};

/// Tolerance for integrality and objective agreement.
const LP_TOL: f64 = 1e-6;

/// Incumbent tour with its LP edge vector and basis.
#[derive(Debug, Clone)]
pub struct ActiveTour {
    tour: Tour,
    perm: Vec<usize>,
    edges: Vec<f64>,
    basis: Basis,
    length: f64,
}

impl ActiveTour {
    /// Starting point for a degree-only LP, with a Padberg-Hong basis.
    ///
    /// Tour edges are basic. For even `n` the last tour edge goes to its
    /// upper bound and the chord `(t[0], t[n-2])` becomes basic instead,
    /// which keeps the basis nonsingular.
    pub fn from_best(graph: &CoreGraph, best: &BestGroup) -> TspResult<Self> {
        let nodes = best.tour.nodes();
        let n = nodes.len();
        let mut colstat = vec![BasisStatus::AtLower; graph.edge_count()];

        for idx in graph.tour_edge_indices(&best.tour)? {
            colstat[idx] = BasisStatus::Basic;
        }

        if n % 2 == 0 {
            let last = graph.find_edge_ind(nodes[n - 2], nodes[n - 1]).ok_or_else(|| {
                TspError::InconsistentState("last tour edge missing from core graph".into())
            })?;
            let chord = graph.find_edge_ind(nodes[0], nodes[n - 2]).ok_or_else(|| {
                TspError::InconsistentState(format!(
                    "basis chord ({}, {}) missing from core graph",
                    nodes[0],
                    nodes[n - 2]
                ))
            })?;
            colstat[last] = BasisStatus::AtUpper;
            colstat[chord] = BasisStatus::Basic;
        }

        Ok(Self {
            tour: best.tour.clone(),
            perm: best.perm.clone(),
            edges: best.edges.clone(),
            basis: Basis {
                colstat,
                rowstat: vec![BasisStatus::AtLower; n],
            },
            length: best.length,
        })
    }

    /// Rehydrate from a stored LP state.
    ///
    /// `lp_edges` must be integral, have exactly `n` ones matching the
    /// tour's edges, and sum to `objective`.
    pub fn from_lp_state(
        tour_nodes: Vec<usize>,
        lp_edges: Vec<f64>,
        basis: Basis,
        objective: f64,
        graph: &CoreGraph,
    ) -> TspResult<Self> {
        let tour = Tour::new(tour_nodes)?;
        let n = tour.len();

        if lp_edges.len() != graph.edge_count() {
            return Err(TspError::InconsistentState(format!(
                "edge vector has {} entries for {} core edges",
                lp_edges.len(),
                graph.edge_count()
            )));
        }

        let mut ones = 0;
        let mut length = 0.0;
        for (idx, &val) in lp_edges.iter().enumerate() {
            if val > LP_TOL && val < 1.0 - LP_TOL {
                return Err(TspError::InvalidTour(format!(
                    "edge {} is fractional ({})",
                    idx, val
                )));
            }
            if val >= 1.0 - LP_TOL {
                ones += 1;
                length += graph.edge(idx).len;
            }
        }
        if ones != n {
            return Err(TspError::InvalidTour(format!(
                "{} edges at one, expected {}",
                ones, n
            )));
        }

        for idx in graph.tour_edge_indices(&tour)? {
            if lp_edges[idx] < 1.0 - LP_TOL {
                return Err(TspError::InconsistentState(format!(
                    "tour edge {} is not at one in the LP vector",
                    idx
                )));
            }
        }

        if (length - objective).abs() > LP_TOL * length.abs().max(1.0) {
            return Err(TspError::InconsistentState(format!(
                "tour length {} disagrees with LP objective {}",
                length, objective
            )));
        }

        let perm = tour.perm();
        Ok(Self {
            tour,
            perm,
            edges: lp_edges,
            basis,
            length,
        })
    }

    /// Instate a tour in `relax` and read back its point and basis.
    ///
    /// Every column is fixed to its tour value for one solve; the previous
    /// bounds are restored before returning, on success or failure.
    pub fn from_relaxation<R: Relaxation>(
        tour_nodes: Vec<usize>,
        relax: &mut R,
        graph: &CoreGraph,
    ) -> TspResult<Self> {
        let tour = Tour::new(tour_nodes)?;
        let target = graph.tour_edge_vec(&tour)?;
        let length: f64 = graph
            .tour_edge_indices(&tour)?
            .into_iter()
            .map(|idx| graph.edge(idx).len)
            .sum();

        let saved: Vec<(f64, f64)> = (0..relax.num_cols())
            .map(|col| relax.col_bounds(col))
            .collect::<TspResult<_>>()?;

        let outcome = Self::instate(relax, &target);

        for (col, &(lb, ub)) in saved.iter().enumerate() {
            relax.set_col_bounds(col, lb, ub)?;
        }

        let sol = match outcome? {
            LpOutcome::Optimal(sol) => sol,
            LpOutcome::Infeasible => return Err(TspError::Infeasible),
            LpOutcome::Abort(msg) => return Err(TspError::NumericalAbort(msg)),
            LpOutcome::IterationLimit => {
                return Err(TspError::NumericalAbort("iteration limit".into()))
            }
        };

        if (sol.objective - length).abs() > LP_TOL * length.abs().max(1.0) {
            return Err(TspError::InconsistentState(format!(
                "instated objective {} differs from tour length {}",
                sol.objective, length
            )));
        }

        let perm = tour.perm();
        Ok(Self {
            tour,
            perm,
            edges: sol.x,
            basis: sol.basis,
            length,
        })
    }

    fn instate<R: Relaxation>(relax: &mut R, target: &[f64]) -> TspResult<LpOutcome> {
        for (col, &val) in target.iter().enumerate() {
            relax.set_col_bounds(col, val, val)?;
        }
        Ok(relax.optimize(Start::Warm))
    }

    pub fn tour(&self) -> &Tour {
        &self.tour
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{core_lp, MicroLpRelaxation};
    use crate::model::Instance;

    fn setup(n: usize) -> (Instance, CoreGraph, BestGroup) {
        let inst = Instance::random_euclidean(n, 21).unwrap();
        let graph = CoreGraph::complete(&inst);
        let tour = Tour::nearest_neighbor(&inst, 0).unwrap();
        let best = BestGroup::new(tour, &graph).unwrap();
        (inst, graph, best)
    }

    fn count(basis: &Basis, status: BasisStatus) -> usize {
        basis.colstat.iter().filter(|&&s| s == status).count()
    }

    #[test]
    fn test_padberg_hong_basis_odd() {
        let (_, graph, best) = setup(7);
        let active = ActiveTour::from_best(&graph, &best).unwrap();
        assert_eq!(count(active.basis(), BasisStatus::Basic), 7);
        assert_eq!(count(active.basis(), BasisStatus::AtUpper), 0);
    }

    #[test]
    fn test_padberg_hong_basis_even() {
        let (_, graph, best) = setup(8);
        let active = ActiveTour::from_best(&graph, &best).unwrap();
        let nodes = best.tour.nodes();

        // n basic columns: n - 1 tour edges plus the chord
        assert_eq!(count(active.basis(), BasisStatus::Basic), 8);
        assert_eq!(count(active.basis(), BasisStatus::AtUpper), 1);
        let chord = graph.find_edge_ind(nodes[0], nodes[6]).unwrap();
        assert_eq!(active.basis().colstat[chord], BasisStatus::Basic);
    }

    #[test]
    fn test_from_lp_state_checks() {
        let (_, graph, best) = setup(6);
        let nodes = best.tour.nodes().to_vec();

        let ok = ActiveTour::from_lp_state(
            nodes.clone(),
            best.edges.clone(),
            Basis::default(),
            best.length,
            &graph,
        )
        .unwrap();
        assert_eq!(ok.length(), best.length);

        // Objective disagreement
        assert!(ActiveTour::from_lp_state(
            nodes.clone(),
            best.edges.clone(),
            Basis::default(),
            best.length + 1.0,
            &graph,
        )
        .is_err());

        // Fractional entry
        let mut frac = best.edges.clone();
        let idx = graph.tour_edge_indices(&best.tour).unwrap()[0];
        frac[idx] = 0.5;
        assert!(matches!(
            ActiveTour::from_lp_state(nodes, frac, Basis::default(), best.length, &graph),
            Err(TspError::InvalidTour(_))
        ));
    }

    #[test]
    fn test_from_relaxation_restores_bounds() {
        let (_, graph, best) = setup(6);
        let mut lp = MicroLpRelaxation::new();
        core_lp::load_base(&mut lp, &graph).unwrap();

        let active =
            ActiveTour::from_relaxation(best.tour.nodes().to_vec(), &mut lp, &graph).unwrap();
        assert!((active.length() - best.length).abs() < 1e-6);
        for (a, b) in active.edges().iter().zip(&best.edges) {
            assert!((a - b).abs() < 1e-7);
        }
        for col in 0..lp.num_cols() {
            assert_eq!(lp.col_bounds(col).unwrap(), (0.0, 1.0));
        }
    }
}
