//! Branch-and-cut engine for the symmetric traveling salesman problem.
//!
//! The solver keeps an LP relaxation over a core edge set (degree
//! equations plus cutting planes) and closes the integrality gap by
//! branching on edges. Key pieces:
//!
//! - **Relaxation**: LP kernel boundary with warm re-optimization
//!   ([`lp::MicroLpRelaxation`] is the bundled backend)
//! - **Cut store**: subtour, blossom, comb and domino-parity inequalities
//!   kept as hypergraphs over interned cliques and teeth
//!   ([`cuts::ExternalCuts`]), plus a pool of purged cuts
//! - **Separation**: segment, connectivity, exact subtour, blossom, block
//!   comb and domino heuristics run by [`sep::MetaCuts`]
//! - **Search**: depth-first or best-bound node selection with
//!   checkpointed node LPs and reduced-cost pricing of edges outside the
//!   core ([`search::Executor`])
//!
//! # Example
//!
//! ```ignore
//! use tsp_core::{solve_tsp, Instance, TspSettings};
//!
//! let inst = Instance::random_euclidean(20, 42)?;
//! let sol = solve_tsp(&inst, &TspSettings::default())?;
//!
//! println!("Status: {:?}", sol.status);
//! println!("Length: {} (bound {})", sol.cost, sol.bound);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod cuts;
pub mod error;
pub mod lp;
pub mod model;
pub mod search;
pub mod sep;
pub mod settings;

// Re-export main types
pub use error::{TspError, TspResult};
pub use model::{CoreGraph, Instance, Tour, TspSolution, TspStatus};
pub use search::{Executor, LogObserver, SearchObserver};
pub use settings::{BranchingRule, CutAggressiveness, EdgePlan, NodeSelection, TspSettings};

/// Main solve entry point.
///
/// Runs branch-and-cut on `instance` with the bundled LP backend, starting
/// from the nearest-neighbor tour.
pub fn solve_tsp(instance: &Instance, settings: &TspSettings) -> TspResult<TspSolution> {
    let mut exec = Executor::new(
        instance,
        settings.clone(),
        lp::MicroLpRelaxation::new(),
        None,
    )?;
    exec.run()
}
