//! LP relaxation management.

mod active_tour;
mod backend;
pub mod core_lp;
mod microlp_backend;

pub use active_tour::ActiveTour;
pub use backend::{
    Basis, BasisStatus, LpColumn, LpOutcome, LpSolution, Relaxation, Sense, SparseRow, Start,
};
pub use microlp_backend::MicroLpRelaxation;
