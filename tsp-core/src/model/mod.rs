//! Instance, graph, tour and solution types.

mod best;
mod graph;
mod instance;
mod solution;
mod tour;

pub use best::BestGroup;
pub use graph::{AdjEntry, CoreGraph, Edge, EndPts};
pub use instance::Instance;
pub use solution::{IncumbentTracker, TspSolution, TspStatus};
pub use tour::Tour;
