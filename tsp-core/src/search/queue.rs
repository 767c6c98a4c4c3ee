//! Node priority queue for tree exploration.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::settings::NodeSelection;

/// Entry in the node queue with priority.
struct QueuedNode {
    node: SearchNode,
    priority: f64, // Higher = selected first
    seq: u64,      // Later pushes win ties
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Priority queue of pending search nodes.
pub struct NodeQueue {
    /// Node selection strategy.
    strategy: NodeSelection,

    /// Priority queue (max-heap by priority).
    heap: BinaryHeap<QueuedNode>,

    /// Count of nodes added.
    nodes_added: u64,

    /// Count of nodes popped.
    nodes_popped: u64,

    /// Best (lowest) bound in queue.
    best_bound: f64,
}

impl NodeQueue {
    /// Create a new node queue with the given strategy.
    pub fn new(strategy: NodeSelection) -> Self {
        Self {
            strategy,
            heap: BinaryHeap::new(),
            nodes_added: 0,
            nodes_popped: 0,
            best_bound: f64::INFINITY,
        }
    }

    /// Add a node to the queue.
    pub fn push(&mut self, node: SearchNode) {
        let priority = self.compute_priority(&node);
        self.best_bound = self.best_bound.min(node.bound);
        self.heap.push(QueuedNode {
            node,
            priority,
            seq: self.nodes_added,
        });
        self.nodes_added += 1;
    }

    /// Get the next node to process.
    pub fn pop(&mut self) -> Option<SearchNode> {
        let queued = self.heap.pop()?;
        self.nodes_popped += 1;
        self.recompute_best_bound();
        Some(queued.node)
    }

    /// Peek at the next node without removing it.
    pub fn peek(&self) -> Option<&SearchNode> {
        self.heap.peek().map(|q| &q.node)
    }

    /// Best (lowest) bound across queued nodes; +inf when empty.
    pub fn best_bound(&self) -> f64 {
        self.best_bound
    }

    /// Remove nodes dominated by the incumbent.
    ///
    /// Returns the removed nodes so the caller can release what they hold.
    pub fn prune_by_bound(&mut self, incumbent_cost: f64) -> Vec<SearchNode> {
        let (pruned, kept): (Vec<QueuedNode>, Vec<QueuedNode>) = self
            .heap
            .drain()
            .partition(|q| q.node.can_prune(incumbent_cost));
        self.heap = kept.into_iter().collect();
        self.recompute_best_bound();
        pruned.into_iter().map(|q| q.node).collect()
    }

    /// Empty the queue, returning every pending node.
    pub fn drain(&mut self) -> Vec<SearchNode> {
        let nodes = self.heap.drain().map(|q| q.node).collect();
        self.best_bound = f64::INFINITY;
        nodes
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn total_added(&self) -> u64 {
        self.nodes_added
    }

    pub fn total_popped(&self) -> u64 {
        self.nodes_popped
    }

    fn compute_priority(&self, node: &SearchNode) -> f64 {
        match self.strategy {
            // Lowest bound first (negate for max-heap)
            NodeSelection::BestBound => -node.bound,
            // Deepest first; ties go to the latest push
            NodeSelection::DepthFirst => node.depth as f64,
        }
    }

    fn recompute_best_bound(&mut self) {
        self.best_bound = self
            .heap
            .iter()
            .map(|q| q.node.bound)
            .fold(f64::INFINITY, f64::min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, depth: usize, bound: f64) -> SearchNode {
        let mut n = SearchNode::root();
        n.id = id;
        n.depth = depth;
        n.bound = bound;
        n
    }

    #[test]
    fn test_best_bound_selection() {
        let mut queue = NodeQueue::new(NodeSelection::BestBound);
        queue.push(node(1, 0, 10.0));
        queue.push(node(2, 0, 5.0));
        queue.push(node(3, 0, 15.0));

        assert_eq!(queue.best_bound(), 5.0);
        assert_eq!(queue.pop().unwrap().id, 2);
        assert_eq!(queue.pop().unwrap().id, 1);
        assert_eq!(queue.pop().unwrap().id, 3);
        assert!(queue.is_empty());
        assert_eq!(queue.best_bound(), f64::INFINITY);
    }

    #[test]
    fn test_depth_first_is_lifo_on_ties() {
        let mut queue = NodeQueue::new(NodeSelection::DepthFirst);
        queue.push(node(1, 1, 0.0));
        queue.push(node(2, 1, 0.0));
        queue.push(node(3, 0, 0.0));

        // Same depth: the later push first
        assert_eq!(queue.pop().unwrap().id, 2);
        assert_eq!(queue.pop().unwrap().id, 1);
        assert_eq!(queue.pop().unwrap().id, 3);
    }

    #[test]
    fn test_pruning_returns_nodes() {
        let mut queue = NodeQueue::new(NodeSelection::BestBound);
        for i in 0..5 {
            queue.push(node(i, 0, i as f64 * 10.0)); // 0, 10, 20, 30, 40
        }

        let pruned = queue.prune_by_bound(25.0);
        let mut ids: Vec<u64> = pruned.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.best_bound(), 0.0);
    }
}
