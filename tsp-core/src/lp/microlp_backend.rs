//! Relaxation backed by the `microlp` dual simplex.
//!
//! `microlp` can add rows and fix or unfix columns on a solved model, which
//! covers the warm path of cutting and branching. Anything else (new
//! columns, deleted rows, general bound changes) rebuilds the model and the
//! next solve is cold.

use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};

use super::backend::{
    check_row, Basis, BasisStatus, LpColumn, LpOutcome, LpSolution, Relaxation, Sense, SparseRow,
    Start,
};
use crate::error::{TspError, TspResult};

/// Bound/activity tolerance for deriving a basis from primal values.
const STATUS_TOL: f64 = 1e-9;

#[derive(Debug, Clone)]
struct ColData {
    obj: f64,
    lb: f64,
    ub: f64,
}

#[derive(Debug, Clone)]
struct RowData {
    sense: Sense,
    rhs: f64,
    entries: Vec<(usize, f64)>,
}

/// Model edits not yet pushed into the warm solver.
#[derive(Debug, Clone, Copy)]
enum PendingOp {
    Row(usize),
    Fix(usize, f64),
    Unfix(usize),
}

/// A solved `microlp` model and the column handles it was built with.
#[derive(Clone)]
struct WarmState {
    solution: microlp::Solution,
    vars: Vec<Variable>,
    /// Bounds each column had when the model was built.
    built: Vec<(f64, f64)>,
    /// Columns currently fixed through `fix_var`.
    fixed: Vec<Option<f64>>,
}

/// LP relaxation over `microlp`.
#[derive(Clone, Default)]
pub struct MicroLpRelaxation {
    cols: Vec<ColData>,
    rows: Vec<RowData>,
    warm: Option<WarmState>,
    pending: Vec<PendingOp>,
    last: Option<LpSolution>,
}

impl MicroLpRelaxation {
    /// Create an empty relaxation.
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate(&mut self) {
        self.warm = None;
        self.pending.clear();
    }

    fn expr(&self, row: usize, vars: &[Variable]) -> Vec<(Variable, f64)> {
        self.rows[row]
            .entries
            .iter()
            .map(|&(col, coef)| (vars[col], coef))
            .collect()
    }

    fn comparison(sense: Sense) -> ComparisonOp {
        match sense {
            Sense::Le => ComparisonOp::Le,
            Sense::Ge => ComparisonOp::Ge,
            Sense::Eq => ComparisonOp::Eq,
        }
    }

    fn solve_cold(&self) -> Result<WarmState, microlp::Error> {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<Variable> = self
            .cols
            .iter()
            .map(|c| problem.add_var(c.obj, (c.lb, c.ub)))
            .collect();
        for (i, row) in self.rows.iter().enumerate() {
            problem.add_constraint(self.expr(i, &vars), Self::comparison(row.sense), row.rhs);
        }
        let solution = problem.solve()?;
        Ok(WarmState {
            solution,
            vars,
            built: self.cols.iter().map(|c| (c.lb, c.ub)).collect(),
            fixed: vec![None; self.cols.len()],
        })
    }

    fn solve_warm(
        &self,
        state: WarmState,
        pending: Vec<PendingOp>,
    ) -> Result<WarmState, microlp::Error> {
        let WarmState {
            mut solution,
            vars,
            built,
            fixed,
        } = state;
        for op in pending {
            solution = match op {
                PendingOp::Row(i) => solution.add_constraint(
                    self.expr(i, &vars),
                    Self::comparison(self.rows[i].sense),
                    self.rows[i].rhs,
                )?,
                PendingOp::Fix(col, val) => solution.fix_var(vars[col], val)?,
                PendingOp::Unfix(col) => solution.unfix_var(vars[col]).0,
            };
        }
        Ok(WarmState {
            solution,
            vars,
            built,
            fixed,
        })
    }

    fn extract(&self, state: &WarmState) -> LpSolution {
        let x: Vec<f64> = state
            .vars
            .iter()
            .map(|&v| *state.solution.var_value(v))
            .collect();

        let colstat = self
            .cols
            .iter()
            .zip(&x)
            .map(|(c, &val)| {
                if (val - c.lb).abs() <= STATUS_TOL {
                    BasisStatus::AtLower
                } else if (val - c.ub).abs() <= STATUS_TOL {
                    BasisStatus::AtUpper
                } else {
                    BasisStatus::Basic
                }
            })
            .collect();

        let rowstat = self
            .rows
            .iter()
            .map(|r| {
                let act: f64 = r.entries.iter().map(|&(col, a)| a * x[col]).sum();
                if (act - r.rhs).abs() <= STATUS_TOL {
                    BasisStatus::AtLower
                } else {
                    BasisStatus::Basic
                }
            })
            .collect();

        LpSolution {
            objective: state.solution.objective(),
            x,
            basis: Basis { colstat, rowstat },
        }
    }

    fn check_col(&self, col: usize) -> TspResult<()> {
        if col >= self.cols.len() {
            return Err(TspError::InconsistentState(format!(
                "column {} does not exist ({} columns)",
                col,
                self.cols.len()
            )));
        }
        Ok(())
    }
}

impl Relaxation for MicroLpRelaxation {
    fn num_cols(&self) -> usize {
        self.cols.len()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn add_col(&mut self, col: LpColumn) -> TspResult<usize> {
        let idx = self.cols.len();
        for &(row, coef) in &col.entries {
            if row >= self.rows.len() || !coef.is_finite() {
                return Err(TspError::InvalidRow(format!(
                    "column entry ({}, {}) is invalid for {} rows",
                    row,
                    coef,
                    self.rows.len()
                )));
            }
        }
        for &(row, coef) in &col.entries {
            if coef != 0.0 {
                self.rows[row].entries.push((idx, coef));
            }
        }
        self.cols.push(ColData {
            obj: col.obj,
            lb: col.lb,
            ub: col.ub,
        });
        self.invalidate();
        Ok(idx)
    }

    fn add_cut(&mut self, row: &SparseRow) -> TspResult<usize> {
        check_row(row, self.cols.len())?;
        let idx = self.rows.len();
        self.rows.push(RowData {
            sense: row.sense,
            rhs: row.rhs,
            entries: row.iter().collect(),
        });
        if self.warm.is_some() {
            self.pending.push(PendingOp::Row(idx));
        }
        Ok(idx)
    }

    fn del_rows(&mut self, rows: &[usize]) -> TspResult<()> {
        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&last) = sorted.last() {
            if last >= self.rows.len() {
                return Err(TspError::InvalidRow(format!(
                    "row {} does not exist ({} rows)",
                    last,
                    self.rows.len()
                )));
            }
        }
        for &r in sorted.iter().rev() {
            self.rows.remove(r);
        }
        self.invalidate();
        self.last = None;
        Ok(())
    }

    fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) -> TspResult<()> {
        self.check_col(col)?;
        if lb.is_nan() || ub.is_nan() || lb > ub {
            return Err(TspError::InconsistentState(format!(
                "bounds [{}, {}] on column {} are empty",
                lb, ub, col
            )));
        }

        if let Some(state) = self.warm.as_mut() {
            let built = state.built[col];
            let current = state.fixed[col];
            if (lb, ub) == built {
                if current.is_some() {
                    self.pending.push(PendingOp::Unfix(col));
                    state.fixed[col] = None;
                }
            } else if lb == ub {
                if current != Some(lb) {
                    if current.is_some() {
                        self.pending.push(PendingOp::Unfix(col));
                    }
                    self.pending.push(PendingOp::Fix(col, lb));
                    state.fixed[col] = Some(lb);
                }
            } else {
                self.invalidate();
            }
        }

        self.cols[col].lb = lb;
        self.cols[col].ub = ub;
        Ok(())
    }

    fn col_bounds(&self, col: usize) -> TspResult<(f64, f64)> {
        self.check_col(col)?;
        Ok((self.cols[col].lb, self.cols[col].ub))
    }

    fn optimize(&mut self, start: Start) -> LpOutcome {
        let pending = std::mem::take(&mut self.pending);
        let attempt = match (start, self.warm.take()) {
            (Start::Warm, Some(state)) => match self.solve_warm(state, pending) {
                Err(microlp::Error::InternalError(msg)) => {
                    log::warn!("Warm re-solve failed ({}), retrying cold", msg);
                    self.solve_cold()
                }
                other => other,
            },
            _ => self.solve_cold(),
        };

        match attempt {
            Ok(state) => {
                let sol = self.extract(&state);
                self.warm = Some(state);
                self.last = Some(sol.clone());
                LpOutcome::Optimal(sol)
            }
            Err(microlp::Error::Infeasible) => {
                self.last = None;
                LpOutcome::Infeasible
            }
            Err(err) => {
                self.last = None;
                LpOutcome::Abort(err.to_string())
            }
        }
    }

    fn objective(&self) -> Option<f64> {
        self.last.as_ref().map(|s| s.objective)
    }

    fn primal(&self) -> Option<&[f64]> {
        self.last.as_ref().map(|s| s.x.as_slice())
    }

    fn basis(&self) -> Option<&Basis> {
        self.last.as_ref().map(|s| &s.basis)
    }

    /// Solves the dual LP of the current model:
    ///
    /// ```text
    /// max  b^T y + lb^T v - ub^T w
    /// s.t. A^T y + v - w = c,   v, w >= 0
    /// ```
    fn row_duals(&self) -> TspResult<Vec<f64>> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let ys: Vec<Variable> = self
            .rows
            .iter()
            .map(|r| {
                let range = match r.sense {
                    Sense::Ge => (0.0, f64::INFINITY),
                    Sense::Le => (f64::NEG_INFINITY, 0.0),
                    Sense::Eq => (f64::NEG_INFINITY, f64::INFINITY),
                };
                problem.add_var(r.rhs, range)
            })
            .collect();

        let mut by_col: Vec<Vec<(Variable, f64)>> = vec![Vec::new(); self.cols.len()];
        for (y, row) in ys.iter().zip(&self.rows) {
            for &(col, coef) in &row.entries {
                by_col[col].push((*y, coef));
            }
        }
        for (col, mut expr) in self.cols.iter().zip(by_col) {
            if col.lb.is_finite() {
                expr.push((problem.add_var(col.lb, (0.0, f64::INFINITY)), 1.0));
            }
            if col.ub.is_finite() {
                expr.push((problem.add_var(-col.ub, (0.0, f64::INFINITY)), -1.0));
            }
            problem.add_constraint(expr, ComparisonOp::Eq, col.obj);
        }

        let solution = problem
            .solve()
            .map_err(|err| TspError::NumericalAbort(format!("dual LP: {}", err)))?;
        Ok(ys.iter().map(|&y| *solution.var_value(y)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// min x0 + 2 x1  s.t.  x0 + x1 >= 1,  0 <= x <= 1
    fn small_lp() -> MicroLpRelaxation {
        let mut lp = MicroLpRelaxation::new();
        for obj in [1.0, 2.0] {
            lp.add_col(LpColumn {
                obj,
                lb: 0.0,
                ub: 1.0,
                entries: Vec::new(),
            })
            .unwrap();
        }
        let row = SparseRow::new(2, Sense::Ge, 1.0, vec![(0, 1.0), (1, 1.0)]).unwrap();
        lp.add_cut(&row).unwrap();
        lp
    }

    fn objective(outcome: LpOutcome) -> f64 {
        match outcome {
            LpOutcome::Optimal(sol) => sol.objective,
            other => panic!("expected optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_cold_solve() {
        let mut lp = small_lp();
        let obj = objective(lp.optimize(Start::Cold));
        assert!((obj - 1.0).abs() < 1e-9);

        let x = lp.primal().unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert_eq!(lp.basis().unwrap().colstat[0], BasisStatus::AtUpper);
    }

    #[test]
    fn test_warm_matches_cold_after_fix_and_cut() {
        let mut warm = small_lp();
        objective(warm.optimize(Start::Cold));

        // Branch x0 = 0, then require x1 <= 1 (redundant row)
        warm.set_col_bounds(0, 0.0, 0.0).unwrap();
        let extra = SparseRow::new(2, Sense::Le, 1.0, vec![(1, 1.0)]).unwrap();
        warm.add_cut(&extra).unwrap();
        let warm_obj = objective(warm.optimize(Start::Warm));

        let mut cold = warm.clone();
        let cold_obj = objective(cold.optimize(Start::Cold));
        assert!((warm_obj - 2.0).abs() < 1e-9);
        assert!((warm_obj - cold_obj).abs() < 1e-9);

        // Unfixing restores the first optimum
        warm.set_col_bounds(0, 0.0, 1.0).unwrap();
        assert!((objective(warm.optimize(Start::Warm)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_row_duals() {
        // min 3 x0  s.t.  x0 >= 0.5: the row prices x0 at 3.
        let mut lp = MicroLpRelaxation::new();
        lp.add_col(LpColumn {
            obj: 3.0,
            lb: 0.0,
            ub: 1.0,
            entries: Vec::new(),
        })
        .unwrap();
        lp.add_cut(&SparseRow::new(1, Sense::Ge, 0.5, vec![(0, 1.0)]).unwrap())
            .unwrap();
        assert!((objective(lp.optimize(Start::Cold)) - 1.5).abs() < 1e-9);
        let y = lp.row_duals().unwrap();
        assert_eq!(y.len(), 1);
        assert!((y[0] - 3.0).abs() < 1e-7);

        // Degenerate duals still give the primal optimum as Lagrangian value.
        let mut lp = small_lp();
        objective(lp.optimize(Start::Cold));
        let y = lp.row_duals().unwrap()[0];
        assert!(y >= -1e-9);
        let lagrangian = y + (1.0 - y).min(0.0) + (2.0 - y).min(0.0);
        assert!((lagrangian - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_infeasible() {
        let mut lp = small_lp();
        lp.set_col_bounds(0, 0.0, 0.0).unwrap();
        lp.set_col_bounds(1, 0.0, 0.0).unwrap();
        assert!(matches!(lp.optimize(Start::Cold), LpOutcome::Infeasible));
        assert!(lp.objective().is_none());
    }

    #[test]
    fn test_add_cut_validation() {
        let mut lp = small_lp();
        let bad = SparseRow::new(3, Sense::Le, 1.0, vec![(2, 1.0)]).unwrap();
        assert!(matches!(lp.add_cut(&bad), Err(TspError::InvalidRow(_))));

        let empty = SparseRow::new(2, Sense::Le, 1.0, Vec::new()).unwrap();
        assert!(matches!(lp.add_cut(&empty), Err(TspError::InvalidRow(_))));
        assert_eq!(lp.num_rows(), 1);
    }

    #[test]
    fn test_add_col_and_del_rows() {
        let mut lp = small_lp();
        objective(lp.optimize(Start::Cold));

        // A cheaper column entering the covering row
        let col = lp
            .add_col(LpColumn {
                obj: 0.5,
                lb: 0.0,
                ub: 1.0,
                entries: vec![(0, 1.0)],
            })
            .unwrap();
        assert_eq!(col, 2);
        assert!((objective(lp.optimize(Start::Warm)) - 0.5).abs() < 1e-9);

        // x2 >= 0.25, then drop the covering row
        let floor = SparseRow::new(3, Sense::Ge, 0.25, vec![(2, 1.0)]).unwrap();
        lp.add_cut(&floor).unwrap();
        lp.del_rows(&[0]).unwrap();
        assert_eq!(lp.num_rows(), 1);
        assert!((objective(lp.optimize(Start::Warm)) - 0.125).abs() < 1e-9);
        assert!(lp.del_rows(&[3]).is_err());
    }
}
