//! Branch-and-cut search tree management.

mod branching;
mod executor;
mod node;
mod observer;
mod pricer;
mod queue;

pub use branching::{BranchDecision, BranchingSelector, DegreeTracker};
pub use executor::{Executor, TreeStats};
pub use node::{EdgeFix, Lineage, NodeStatus, SearchNode};
pub use observer::{LogObserver, NodeReport, SearchObserver};
pub use pricer::{PriceOutcome, Pricer};
pub use queue::NodeQueue;
