//! Symmetric TSP instance data.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{TspError, TspResult};

/// Tolerance for symmetry checks on input matrices.
const SYMMETRY_TOL: f64 = 1e-9;

/// Side length of the square used by [`Instance::random_euclidean`].
const GRID: f64 = 1000.0;

/// A complete symmetric cost matrix over `n` cities.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Number of cities.
    n: usize,

    /// Row-major `n x n` costs; the diagonal is unused.
    costs: Vec<f64>,

    /// Every off-diagonal cost is an integer.
    integral: bool,

    /// Optional display name.
    name: Option<String>,
}

impl Instance {
    /// Build an instance from a dense matrix.
    ///
    /// Fails with [`TspError::InvalidInstance`] if the matrix is not square,
    /// has fewer than three cities, holds a non-finite cost, or is asymmetric.
    pub fn from_matrix(rows: Vec<Vec<f64>>) -> TspResult<Self> {
        let n = rows.len();
        if n < 3 {
            return Err(TspError::InvalidInstance(format!(
                "need at least 3 cities, got {}",
                n
            )));
        }

        let mut costs = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(TspError::InvalidInstance(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            costs.extend_from_slice(row);
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let a = costs[i * n + j];
                let b = costs[j * n + i];
                if !a.is_finite() || !b.is_finite() {
                    return Err(TspError::InvalidInstance(format!(
                        "non-finite cost between {} and {}",
                        i, j
                    )));
                }
                if (a - b).abs() > SYMMETRY_TOL {
                    return Err(TspError::InvalidInstance(format!(
                        "asymmetric cost between {} and {}: {} vs {}",
                        i, j, a, b
                    )));
                }
            }
        }

        let integral = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .all(|(i, j)| costs[i * n + j].fract() == 0.0);

        Ok(Self {
            n,
            costs,
            integral,
            name: None,
        })
    }

    /// Build a Euclidean instance with distances rounded to the nearest integer.
    pub fn from_points(points: &[(f64, f64)]) -> TspResult<Self> {
        let n = points.len();
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            let dx = points[i].0 - points[j].0;
                            let dy = points[i].1 - points[j].1;
                            (dx * dx + dy * dy).sqrt().round()
                        }
                    })
                    .collect()
            })
            .collect();
        Self::from_matrix(rows)
    }

    /// Uniform random points in a square, seeded for reproducibility.
    pub fn random_euclidean(n: usize, seed: u64) -> TspResult<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points: Vec<(f64, f64)> = (0..n)
            .map(|_| (rng.gen::<f64>() * GRID, rng.gen::<f64>() * GRID))
            .collect();
        Ok(Self::from_points(&points)?.with_name(format!("rand{}-s{}", n, seed)))
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of cities.
    pub fn num_nodes(&self) -> usize {
        self.n
    }

    /// Cost of travelling between `i` and `j`.
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.costs[i * self.n + j]
    }

    /// True if every cost is an integer, so bounds may be rounded up.
    pub fn has_integral_costs(&self) -> bool {
        self.integral
    }

    /// Length of the closed tour visiting `nodes` in order.
    pub fn tour_cost(&self, nodes: &[usize]) -> f64 {
        let n = nodes.len();
        (0..n)
            .map(|i| self.cost(nodes[i], nodes[(i + 1) % n]))
            .sum()
    }
}
