//! Error types for the TSP engine.

use thiserror::Error;

/// Errors that can occur while building or solving a TSP relaxation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TspError {
    /// Instance validation failed (asymmetric, non-finite or too small).
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    /// A node sequence is not a permutation of the cities.
    #[error("Invalid tour: {0}")]
    InvalidTour(String),

    /// A clique or tooth would be empty or cover every city.
    #[error("Degenerate clique: {0}")]
    DegenerateClique(String),

    /// A row references a nonexistent column or carries non-finite data.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// The LP relaxation has no feasible point.
    #[error("LP relaxation is infeasible")]
    Infeasible,

    /// The LP kernel gave up on the current model.
    #[error("Numerical abort: {0}")]
    NumericalAbort(String),

    /// Internal bookkeeping disagrees with itself.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// A cut id does not refer to a live cut.
    #[error("Unknown cut id {0}")]
    UnknownCut(usize),

    /// Time limit exceeded
    #[error("Time limit exceeded")]
    TimeLimit,

    /// Node limit exceeded
    #[error("Node limit exceeded")]
    NodeLimit,
}

/// Result type for TSP operations.
pub type TspResult<T> = Result<T, TspError>;
