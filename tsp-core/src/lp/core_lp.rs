//! Base degree LP over the core graph.
//!
//! ```text
//! min  sum_e len(e) x_e
//! s.t. x(delta(v)) = 2   for every city v   (row v)
//!      0 <= x_e <= 1
//! ```

use super::backend::{LpColumn, Relaxation, Sense, SparseRow};
use crate::error::{TspError, TspResult};
use crate::model::CoreGraph;

/// Column for core edge `idx`, with its two degree-row entries.
pub fn edge_column(graph: &CoreGraph, idx: usize) -> LpColumn {
    let edge = graph.edge(idx);
    LpColumn {
        obj: edge.len,
        lb: 0.0,
        ub: 1.0,
        entries: vec![(edge.ends.end0, 1.0), (edge.ends.end1, 1.0)],
    }
}

/// Degree equation of city `v`.
pub fn degree_row(graph: &CoreGraph, v: usize) -> TspResult<SparseRow> {
    SparseRow::new(
        graph.edge_count(),
        Sense::Eq,
        2.0,
        graph.adjacency(v).iter().map(|a| (a.edge_index, 1.0)),
    )
}

/// Load the degree LP of `graph` into an empty relaxation.
///
/// Row `v` is the degree equation of city `v`; column `e` is core edge `e`.
pub fn load_base<R: Relaxation>(relax: &mut R, graph: &CoreGraph) -> TspResult<()> {
    if relax.num_cols() != 0 || relax.num_rows() != 0 {
        return Err(TspError::InconsistentState(format!(
            "base LP must start empty, found {} columns and {} rows",
            relax.num_cols(),
            relax.num_rows()
        )));
    }

    for edge in graph.edges() {
        relax.add_col(LpColumn {
            obj: edge.len,
            lb: 0.0,
            ub: 1.0,
            entries: Vec::new(),
        })?;
    }

    for v in 0..graph.node_count() {
        let row = degree_row(graph, v)?;
        if row.is_empty() {
            return Err(TspError::InvalidInstance(format!(
                "city {} has no core edges",
                v
            )));
        }
        relax.add_cut(&row)?;
    }

    log::debug!(
        "Base LP: {} columns, {} degree rows",
        relax.num_cols(),
        relax.num_rows()
    );
    Ok(())
}
