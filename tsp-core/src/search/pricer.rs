//! Reduced-cost pricing of city pairs outside the core graph.
//!
//! With row duals `y` (degree rows first, then one per cut row), the
//! reduced cost of edge `e = {u, v}` is
//!
//! ```text
//! rc_e = len_e - y_u - y_v - sum_k y_k a_k(e)
//! ```
//!
//! and for any sign-correct `y` the Lagrangian value
//!
//! ```text
//! sum_i b_i y_i + sum_core min(rc_e lb_e, rc_e ub_e) + sum_missing min(0, rc_e)
//! ```
//!
//! bounds the node LP over every city pair from below.

use crate::cuts::CutShape;
use crate::error::{TspError, TspResult};
use crate::lp::{Relaxation, Sense, SparseRow};
use crate::model::{CoreGraph, EndPts, Instance};

/// Reduced cost below which a missing edge enters the core.
const ENTER_TOL: f64 = 1e-7;

/// Result of one pricing pass.
#[derive(Debug, Clone)]
pub struct PriceOutcome {
    /// Lower bound on the node LP over every city pair.
    pub bound: f64,

    /// Missing edges with negative reduced cost, most negative first.
    pub entering: Vec<(EndPts, f64)>,

    /// Missing edges priced.
    pub scanned: usize,
}

/// Exact pricer over every missing city pair.
#[derive(Debug, Clone)]
pub struct Pricer {
    batch: usize,
}

impl Pricer {
    /// Pricer that hands back at most `batch` entering edges per pass.
    pub fn new(batch: usize) -> Self {
        Self {
            batch: batch.max(1),
        }
    }

    /// Price the missing edges of `graph` at the last optimum of `relax`.
    ///
    /// `rows` are the loaded cut rows in LP order after the degree rows and
    /// `shapes` their column-independent forms.
    pub fn price<R: Relaxation>(
        &self,
        instance: &Instance,
        graph: &CoreGraph,
        relax: &R,
        rows: &[SparseRow],
        shapes: &[CutShape],
    ) -> TspResult<PriceOutcome> {
        let n = graph.node_count();
        if rows.len() != shapes.len()
            || relax.num_rows() != n + rows.len()
            || relax.num_cols() != graph.edge_count()
        {
            return Err(TspError::InconsistentState(format!(
                "pricing {} rows and {} shapes against an LP of {} rows and {} columns",
                rows.len(),
                shapes.len(),
                relax.num_rows(),
                relax.num_cols()
            )));
        }

        let mut y = relax.row_duals()?;
        if y.len() != n + rows.len() {
            return Err(TspError::InconsistentState(format!(
                "{} duals for {} rows",
                y.len(),
                n + rows.len()
            )));
        }
        for (yk, row) in y[n..].iter_mut().zip(rows) {
            *yk = match row.sense {
                Sense::Ge => yk.max(0.0),
                Sense::Le => yk.min(0.0),
                Sense::Eq => *yk,
            };
        }

        let mut bound = 2.0 * y[..n].iter().sum::<f64>()
            + rows
                .iter()
                .zip(&y[n..])
                .map(|(row, &yk)| row.rhs * yk)
                .sum::<f64>();

        let mut rc: Vec<f64> = graph
            .edges()
            .iter()
            .map(|e| e.len - y[e.ends.end0] - y[e.ends.end1])
            .collect();
        for (row, &yk) in rows.iter().zip(&y[n..]) {
            if yk == 0.0 {
                continue;
            }
            for (col, coef) in row.iter() {
                if let Some(r) = rc.get_mut(col) {
                    *r -= yk * coef;
                }
            }
        }
        for (col, &r) in rc.iter().enumerate() {
            let (lb, ub) = relax.col_bounds(col)?;
            bound += (r * lb).min(r * ub);
        }

        let priced: Vec<(&CutShape, f64)> = shapes
            .iter()
            .zip(&y[n..])
            .filter(|&(_, &yk)| yk != 0.0)
            .map(|(shape, &yk)| (shape, yk))
            .collect();

        let missing = graph.missing_edges();
        let mut entering = Vec::new();
        for &ends in &missing {
            let mut r = instance.cost(ends.end0, ends.end1) - y[ends.end0] - y[ends.end1];
            for &(shape, yk) in &priced {
                r -= yk * shape.coef(ends);
            }
            if r < 0.0 {
                bound += r;
            }
            if r < -ENTER_TOL {
                entering.push((ends, r));
            }
        }

        entering.sort_by(|a, b| a.1.total_cmp(&b.1));
        entering.truncate(self.batch);
        log::debug!(
            "Priced {} missing edges: {} entering, bound {:.6}",
            missing.len(),
            entering.len(),
            bound
        );
        Ok(PriceOutcome {
            bound,
            entering,
            scanned: missing.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{core_lp, LpOutcome, MicroLpRelaxation, Start};

    fn solve(lp: &mut MicroLpRelaxation) -> f64 {
        match lp.optimize(Start::Cold) {
            LpOutcome::Optimal(sol) => sol.objective,
            other => panic!("expected optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_core_bound_matches_lp() {
        let inst = Instance::random_euclidean(7, 21).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut lp = MicroLpRelaxation::new();
        core_lp::load_base(&mut lp, &graph).unwrap();
        let obj = solve(&mut lp);

        let out = Pricer::new(10).price(&inst, &graph, &lp, &[], &[]).unwrap();
        assert_eq!(out.scanned, 0);
        assert!(out.entering.is_empty());
        assert!((out.bound - obj).abs() < 1e-6);
    }

    #[test]
    fn test_cheap_diagonals_enter() {
        // A 4-cycle of length 10 edges with diagonals of length 1. The core
        // holds only the cycle, whose degree LP is the cycle itself.
        let inst = Instance::from_matrix(vec![
            vec![0.0, 10.0, 1.0, 10.0],
            vec![10.0, 0.0, 10.0, 1.0],
            vec![1.0, 10.0, 0.0, 10.0],
            vec![10.0, 1.0, 10.0, 0.0],
        ])
        .unwrap();
        let mut graph = CoreGraph::new(4);
        for v in 0..4 {
            graph.add_edge(v, (v + 1) % 4, 10.0);
        }
        let mut lp = MicroLpRelaxation::new();
        core_lp::load_base(&mut lp, &graph).unwrap();
        assert!((solve(&mut lp) - 40.0).abs() < 1e-9);

        let out = Pricer::new(10).price(&inst, &graph, &lp, &[], &[]).unwrap();
        assert_eq!(out.scanned, 2);
        assert!(!out.entering.is_empty());
        for w in out.entering.windows(2) {
            assert!(w[0].1 <= w[1].1);
        }
        // The best tour over all pairs has length 22.
        assert!(out.bound <= 22.0 + 1e-6);

        let one = Pricer::new(1).price(&inst, &graph, &lp, &[], &[]).unwrap();
        assert_eq!(one.entering.len(), 1);
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        let inst = Instance::random_euclidean(5, 2).unwrap();
        let graph = CoreGraph::complete(&inst);
        let mut lp = MicroLpRelaxation::new();
        core_lp::load_base(&mut lp, &graph).unwrap();
        solve(&mut lp);

        let shape = CutShape::subtour(&[0, 1], 5);
        assert!(matches!(
            Pricer::new(5).price(&inst, &graph, &lp, &[], &[shape]),
            Err(TspError::InconsistentState(_))
        ));
    }
}
