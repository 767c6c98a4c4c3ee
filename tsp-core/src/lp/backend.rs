//! LP relaxation trait and row/basis types.

use sprs::CsVec;

use crate::error::{TspError, TspResult};

/// Row sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    /// `a^T x <= rhs`
    Le,
    /// `a^T x >= rhs`
    Ge,
    /// `a^T x == rhs`
    Eq,
}

/// A materialized LP row with sorted, unique column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    /// Row sense.
    pub sense: Sense,

    /// Right-hand side.
    pub rhs: f64,

    /// Coefficients keyed by column.
    coefs: CsVec<f64>,
}

impl SparseRow {
    /// Build a row over `dim` columns.
    ///
    /// Repeated columns are summed and explicit zeros dropped. Fails with
    /// [`TspError::InvalidRow`] on a column `>= dim` or a non-finite value.
    pub fn new(
        dim: usize,
        sense: Sense,
        rhs: f64,
        entries: impl IntoIterator<Item = (usize, f64)>,
    ) -> TspResult<Self> {
        if !rhs.is_finite() {
            return Err(TspError::InvalidRow(format!("non-finite rhs {}", rhs)));
        }

        let mut entries: Vec<(usize, f64)> = entries.into_iter().collect();
        entries.sort_unstable_by_key(|&(col, _)| col);

        let mut indices: Vec<usize> = Vec::with_capacity(entries.len());
        let mut data: Vec<f64> = Vec::with_capacity(entries.len());
        for (col, coef) in entries {
            if col >= dim {
                return Err(TspError::InvalidRow(format!(
                    "column {} out of range for {} columns",
                    col, dim
                )));
            }
            if !coef.is_finite() {
                return Err(TspError::InvalidRow(format!(
                    "non-finite coefficient on column {}",
                    col
                )));
            }
            match indices.last() {
                Some(&last) if last == col => {
                    if let Some(d) = data.last_mut() {
                        *d += coef;
                    }
                }
                _ => {
                    indices.push(col);
                    data.push(coef);
                }
            }
        }

        let (indices, data): (Vec<usize>, Vec<f64>) = indices
            .into_iter()
            .zip(data)
            .filter(|&(_, coef)| coef != 0.0)
            .unzip();

        let coefs = CsVec::new_from_unsorted(dim, indices, data)
            .map_err(|(_, _, err)| TspError::InvalidRow(err.to_string()))?;

        Ok(Self { sense, rhs, coefs })
    }

    /// Number of columns the row was built against.
    pub fn dim(&self) -> usize {
        self.coefs.dim()
    }

    pub fn nnz(&self) -> usize {
        self.coefs.nnz()
    }

    pub fn is_empty(&self) -> bool {
        self.coefs.nnz() == 0
    }

    pub fn cols(&self) -> &[usize] {
        self.coefs.indices()
    }

    pub fn values(&self) -> &[f64] {
        self.coefs.data()
    }

    /// `(column, coefficient)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cols().iter().copied().zip(self.values().iter().copied())
    }

    /// Coefficient of `col` (zero if absent).
    pub fn coef(&self, col: usize) -> f64 {
        match self.cols().binary_search(&col) {
            Ok(pos) => self.values()[pos],
            Err(_) => 0.0,
        }
    }

    /// `a^T x`; columns beyond `x.len()` count as zero.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.iter()
            .map(|(col, coef)| coef * x.get(col).copied().unwrap_or(0.0))
            .sum()
    }

    /// Slack at `x`: nonnegative when satisfied.
    pub fn slack(&self, x: &[f64]) -> f64 {
        let act = self.activity(x);
        match self.sense {
            Sense::Le => self.rhs - act,
            Sense::Ge => act - self.rhs,
            Sense::Eq => -(act - self.rhs).abs(),
        }
    }

    /// Violation at `x` (positive means violated).
    pub fn violation(&self, x: &[f64]) -> f64 {
        -self.slack(x)
    }
}

/// Status of a column or row slack in a basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    Basic,
    AtLower,
    AtUpper,
}

/// A simplex basis; fully determines a warm-start point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Basis {
    /// Per-column status.
    pub colstat: Vec<BasisStatus>,

    /// Per-row slack status.
    pub rowstat: Vec<BasisStatus>,
}

/// An optimal LP point.
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Objective value.
    pub objective: f64,

    /// Column values.
    pub x: Vec<f64>,

    /// Basis at the optimum.
    pub basis: Basis,
}

/// Result of a re-optimization.
#[derive(Debug, Clone)]
pub enum LpOutcome {
    /// Optimal solution found.
    Optimal(LpSolution),

    /// No feasible point (node can be pruned).
    Infeasible,

    /// The kernel gave up; the node is lost.
    Abort(String),

    /// The kernel hit its iteration limit.
    IterationLimit,
}

impl LpOutcome {
    /// The solution, if optimal.
    pub fn solution(&self) -> Option<&LpSolution> {
        match self {
            LpOutcome::Optimal(sol) => Some(sol),
            _ => None,
        }
    }
}

/// Where re-optimization starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// Continue from the retained solver state.
    Warm,

    /// Start from scratch.
    Cold,
}

/// A new structural column.
#[derive(Debug, Clone)]
pub struct LpColumn {
    /// Objective coefficient.
    pub obj: f64,

    /// Lower bound.
    pub lb: f64,

    /// Upper bound.
    pub ub: f64,

    /// `(row, coefficient)` entries in existing rows.
    pub entries: Vec<(usize, f64)>,
}

/// Trait for LP relaxation backends.
///
/// A relaxation holds one LP over the current edge set and supports:
/// - Appending columns and cut rows
/// - Removing cut rows
/// - Tightening column bounds (for branching)
/// - Warm or cold re-optimization
/// - Row duals for pricing edges outside the core graph
pub trait Relaxation {
    /// Number of structural columns.
    fn num_cols(&self) -> usize;

    /// Number of rows.
    fn num_rows(&self) -> usize;

    /// Append a column; returns its index.
    ///
    /// Fails with [`TspError::InvalidRow`] if an entry names a missing row.
    fn add_col(&mut self, col: LpColumn) -> TspResult<usize>;

    /// Append a row; returns its index.
    ///
    /// Fails with [`TspError::InvalidRow`] if the row is empty or references
    /// a column that does not exist.
    fn add_cut(&mut self, row: &SparseRow) -> TspResult<usize>;

    /// Append several rows.
    fn add_cuts(&mut self, rows: &[SparseRow]) -> TspResult<Vec<usize>> {
        rows.iter().map(|r| self.add_cut(r)).collect()
    }

    /// Remove rows by index; later rows shift down.
    fn del_rows(&mut self, rows: &[usize]) -> TspResult<()>;

    /// Set column bounds.
    fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) -> TspResult<()>;

    /// Current column bounds.
    fn col_bounds(&self, col: usize) -> TspResult<(f64, f64)>;

    /// Offer a starting basis. Kernels that cannot take one ignore it.
    fn load_basis(&mut self, _basis: &Basis) -> TspResult<()> {
        Ok(())
    }

    /// Re-optimize.
    fn optimize(&mut self, start: Start) -> LpOutcome;

    /// Objective of the last optimal solve.
    fn objective(&self) -> Option<f64>;

    /// Column values of the last optimal solve.
    fn primal(&self) -> Option<&[f64]>;

    /// Basis of the last optimal solve.
    fn basis(&self) -> Option<&Basis>;

    /// Row duals at the current model's optimum, signed for minimization:
    /// nonnegative on `>=` rows and nonpositive on `<=` rows.
    ///
    /// Kernels without dual information fail with
    /// [`TspError::NumericalAbort`].
    fn row_duals(&self) -> TspResult<Vec<f64>> {
        Err(TspError::NumericalAbort("row duals are not available".into()))
    }
}

/// Shared row validation for backends.
pub(crate) fn check_row(row: &SparseRow, num_cols: usize) -> TspResult<()> {
    if row.is_empty() {
        return Err(TspError::InvalidRow("row has no nonzero coefficients".into()));
    }
    if let Some(&last) = row.cols().last() {
        if last >= num_cols {
            return Err(TspError::InvalidRow(format!(
                "column {} does not exist ({} columns)",
                last, num_cols
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_merges_and_sorts() {
        let row = SparseRow::new(5, Sense::Ge, 2.0, vec![(3, 1.0), (0, 2.0), (3, 1.5), (1, 0.0)])
            .unwrap();
        assert_eq!(row.cols(), &[0, 3]);
        assert_eq!(row.values(), &[2.0, 2.5]);
        assert_eq!(row.coef(3), 2.5);
        assert_eq!(row.coef(4), 0.0);
    }

    #[test]
    fn test_row_rejects_bad_entries() {
        assert!(matches!(
            SparseRow::new(3, Sense::Le, 1.0, vec![(3, 1.0)]),
            Err(TspError::InvalidRow(_))
        ));
        assert!(matches!(
            SparseRow::new(3, Sense::Le, 1.0, vec![(0, f64::NAN)]),
            Err(TspError::InvalidRow(_))
        ));
        assert!(SparseRow::new(3, Sense::Le, f64::INFINITY, vec![(0, 1.0)]).is_err());
    }

    #[test]
    fn test_slack_and_violation() {
        // x0 + x1 >= 2
        let row = SparseRow::new(2, Sense::Ge, 2.0, vec![(0, 1.0), (1, 1.0)]).unwrap();
        assert!((row.slack(&[1.0, 1.5]) - 0.5).abs() < 1e-12);
        assert!((row.violation(&[0.5, 0.5]) - 1.0).abs() < 1e-12);

        let eq = SparseRow::new(2, Sense::Eq, 1.0, vec![(0, 1.0)]).unwrap();
        assert_eq!(eq.slack(&[1.0, 0.0]), 0.0);
        assert!(eq.slack(&[0.5, 0.0]) < 0.0);
    }

    #[test]
    fn test_check_row() {
        let empty = SparseRow::new(4, Sense::Le, 0.0, Vec::new()).unwrap();
        assert!(check_row(&empty, 4).is_err());

        let wide = SparseRow::new(10, Sense::Le, 1.0, vec![(7, 1.0)]).unwrap();
        assert!(check_row(&wide, 5).is_err());
        assert!(check_row(&wide, 8).is_ok());
    }
}
