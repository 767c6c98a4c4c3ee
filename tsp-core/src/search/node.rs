//! Search node representation.

use std::collections::HashMap;
use std::rc::Rc;

use crate::cuts::CutId;
use crate::model::EndPts;

/// Status of a search node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node is waiting to be processed.
    Pending,

    /// Node is currently being processed.
    Processing,

    /// Node was pruned (bound >= incumbent, or no tour can satisfy its fixings).
    Pruned,

    /// Node LP relaxation is infeasible.
    Infeasible,

    /// Node LP was lost to a numerical abort.
    Aborted,

    /// Node LP optimum is a tour.
    TourFound,

    /// Node was branched (children created).
    Branched,
}

/// An edge fixed by branching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFix {
    /// LP column of the edge.
    pub col: usize,

    /// Edge endpoints.
    pub ends: EndPts,

    /// Fixed value, 0 or 1.
    pub value: f64,
}

impl EdgeFix {
    /// Edge excluded: `x_e = 0`.
    pub fn exclude(col: usize, ends: EndPts) -> Self {
        Self {
            col,
            ends,
            value: 0.0,
        }
    }

    /// Edge forced: `x_e = 1`.
    pub fn force(col: usize, ends: EndPts) -> Self {
        Self {
            col,
            ends,
            value: 1.0,
        }
    }

    pub fn is_forced(&self) -> bool {
        self.value > 0.5
    }
}

/// A node in the search tree.
///
/// A node is a delta from its parent: at most one edge fix plus the cut
/// list it starts from. Siblings share the parent's list.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Unique node identifier.
    pub id: u64,

    /// Parent node ID (None for root).
    pub parent_id: Option<u64>,

    /// Depth in the tree (0 for root).
    pub depth: usize,

    /// Edge fixed on the way from the parent.
    pub fix: Option<EdgeFix>,

    /// Cuts to load into the node LP.
    pub cuts: Rc<[CutId]>,

    /// Lower bound on any tour in this subtree.
    pub bound: f64,

    /// Node processing status.
    pub status: NodeStatus,
}

impl SearchNode {
    /// Create the root node.
    pub fn root() -> Self {
        Self {
            id: 0,
            parent_id: None,
            depth: 0,
            fix: None,
            cuts: Rc::from(Vec::new()),
            bound: f64::NEG_INFINITY,
            status: NodeStatus::Pending,
        }
    }

    /// Create a child node from an edge fix.
    pub fn child(&self, id: u64, fix: EdgeFix, cuts: Rc<[CutId]>) -> Self {
        Self {
            id,
            parent_id: Some(self.id),
            depth: self.depth + 1,
            fix: Some(fix),
            cuts,
            bound: self.bound,
            status: NodeStatus::Pending,
        }
    }

    /// Check if this node can be pruned by an incumbent.
    pub fn can_prune(&self, incumbent_cost: f64) -> bool {
        self.bound >= incumbent_cost - 1e-9
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    parent: Option<u64>,
    fix: Option<EdgeFix>,
    /// Recorded children not yet dropped from the lineage.
    children: usize,
    closed: bool,
}

/// Parent links and edge fixes of the nodes that are open or have an open
/// descendant.
///
/// A node is dropped once it is closed and all its children are gone.
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    links: HashMap<u64, Link>,
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: &SearchNode) {
        if let Some(parent) = node.parent_id.and_then(|p| self.links.get_mut(&p)) {
            parent.children += 1;
        }
        self.links.insert(
            node.id,
            Link {
                parent: node.parent_id,
                fix: node.fix,
                children: 0,
                closed: false,
            },
        );
    }

    /// Mark `id` as finished and drop every ancestor left without a reason
    /// to stay.
    pub fn close(&mut self, id: u64) {
        match self.links.get_mut(&id) {
            Some(link) => link.closed = true,
            None => return,
        }
        let mut cur = Some(id);
        while let Some(node) = cur {
            let Some(&link) = self.links.get(&node) else {
                break;
            };
            if !link.closed || link.children > 0 {
                break;
            }
            self.links.remove(&node);
            cur = link.parent;
            if let Some(parent) = cur.and_then(|p| self.links.get_mut(&p)) {
                parent.children = parent.children.saturating_sub(1);
            }
        }
    }

    /// Edge fixes from the root down to `id`.
    pub fn fixings(&self, id: u64) -> Vec<EdgeFix> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(node) = cur {
            match self.links.get(&node) {
                Some(link) => {
                    out.extend(link.fix);
                    cur = link.parent;
                }
                None => break,
            }
        }
        out.reverse();
        out
    }

    pub fn contains(&self, id: u64) -> bool {
        self.links.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
