//! Cut storage for the branch-and-cut engine.
//!
//! - Clique and tooth banks with reference-counted interning
//! - Column-independent hypergraph cuts and their store
//! - Row slack monitoring for purging
//! - A bounded pool of purged cuts for re-separation

mod arena;
mod clique;
mod external;
mod hypergraph;
mod monitor;
mod pool;
mod tooth;

pub use clique::{Clique, CliqueBank, CliqueId, ExternalClique, Segment};
pub use external::{CutId, ExternalCut, ExternalCuts};
pub use hypergraph::{
    slack, CutBody, CutShape, CutSource, DominoWitness, HyperGraph, WitnessTooth,
};
pub use monitor::{CutMonitor, CutMonitorStats, MonitoredCut};
pub use pool::{CutPool, CutPoolStats};
pub use tooth::{SimpleTooth, ToothBank, ToothId};
