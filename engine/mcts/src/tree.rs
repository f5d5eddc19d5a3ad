//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by `NodeId` indices,
//! so there are no parent/child reference cycles. Committing an action is a
//! cheap re-rooting: the new root's parent link is cut and the pair is
//! recorded so the advance can be rolled back later with every accumulated
//! statistic intact. Nodes made unreachable by a commit stay in the arena
//! until `reset`; the rollback history keeps them meaningful.

use std::fmt::Debug;

use tracing::{debug, warn};

use crate::config::SelectionRule;
use crate::node::{Node, NodeId, NodeStats};

/// Pending-advance count at which the first memory warning fires.
const ADVANCE_WARN_THRESHOLD: usize = 10_000;

/// Arena-backed search tree.
#[derive(Debug)]
pub struct Tree<A> {
    /// Arena storing all nodes, including ones detached by commits.
    nodes: Vec<Node<A>>,

    /// Current root.
    root: NodeId,

    /// (old_root, new_root) pairs in commit order. Empty exactly when no
    /// rollback is possible.
    pending_advances: Vec<(NodeId, NodeId)>,

    /// Selection rule all nodes in this tree are created under.
    rule: SelectionRule,

    /// Next pending-advance length that triggers a memory warning.
    warn_at: usize,
}

impl<A: Copy + PartialEq + Debug> Tree<A> {
    /// Create a tree holding a single unexpanded root.
    pub fn new(rule: SelectionRule) -> Self {
        let root = Node::new(NodeId::NONE, NodeStats::new(rule, 1.0));
        Self {
            nodes: vec![root],
            root: NodeId(0),
            pending_advances: Vec::new(),
            rule,
            warn_at: ADVANCE_WARN_THRESHOLD,
        }
    }

    /// Get the current root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<A> {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<A> {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of nodes in the arena, reachable or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of commits that have not been rolled back.
    #[inline]
    pub fn pending_advances(&self) -> usize {
        self.pending_advances.len()
    }

    /// Expand `id` with one child per (action, prior) pair not already
    /// present. Idempotent: actions that already have a child are skipped and
    /// their statistics are left untouched.
    pub fn expand(&mut self, id: NodeId, actions_and_priors: &[(A, f32)]) {
        for &(action, prior) in actions_and_priors {
            if self.get(id).child(action).is_some() {
                continue;
            }
            let child = Node::new(id, NodeStats::new(self.rule, prior));
            let child_id = NodeId(self.nodes.len() as u32);
            self.nodes.push(child);
            self.get_mut(id).children.push((action, child_id));
        }
    }

    /// Select the child of `id` maximizing the selection score.
    /// Returns `None` on a leaf. Exact ties fall to whichever maximal child
    /// the scan sees last; driver-level ties are broken by the engine.
    pub fn select_child(&self, id: NodeId, exploration: f32) -> Option<(A, NodeId)> {
        let node = self.get(id);
        let parent_visits = node.visit_count;

        node.children
            .iter()
            .max_by(|(_, a), (_, b)| {
                let node_a = self.get(*a);
                let node_b = self.get(*b);
                let score_a = node_a
                    .stats
                    .selection_score(node_a.visit_count, parent_visits, exploration);
                let score_b = node_b
                    .stats
                    .selection_score(node_b.visit_count, parent_visits, exploration);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(action, id)| (*action, *id))
    }

    /// Backpropagate `value` from `leaf` to the current root inclusive.
    ///
    /// The same sign is applied at every level: the search frames generation
    /// as a single agent extending one line, not as alternating adversaries.
    /// Each node on the path gains exactly one visit.
    pub fn backpropagate(&mut self, leaf: NodeId, value: f32) {
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.visit_count += 1;
            let visits = node.visit_count;
            node.stats.record(visits, value);
            current = node.parent;
        }
    }

    /// Visit counts of the current root's children, in expansion order.
    pub fn root_visits(&self) -> Vec<(A, u32)> {
        self.get(self.root)
            .children
            .iter()
            .map(|(action, id)| (*action, self.get(*id).visit_count))
            .collect()
    }

    /// Advance the root into the child reached by `action`, recording the
    /// advance for rollback. Returns the new root, or `None` when `action`
    /// was never expanded as a child of the current root.
    pub fn commit(&mut self, action: A) -> Option<NodeId> {
        let child = self.get(self.root).child(action)?;

        self.pending_advances.push((self.root, child));
        if self.pending_advances.len() > self.warn_at {
            warn!(
                pending = self.pending_advances.len(),
                "pending root advances growing, watch memory"
            );
            self.warn_at *= 10;
        }

        // Detaching the parent link is what stops backpropagation at the
        // new root while the old subtree is kept for rollback.
        self.get_mut(child).parent = NodeId::NONE;
        self.root = child;
        Some(child)
    }

    /// Replay all recorded advances in reverse, restoring each old root and
    /// its parent link. Statistics accumulated anywhere in the tree survive.
    pub fn rollback_all(&mut self) {
        while let Some((old_root, new_root)) = self.pending_advances.pop() {
            self.get_mut(new_root).parent = old_root;
            self.root = old_root;
        }
        self.warn_at = ADVANCE_WARN_THRESHOLD;
    }

    /// Discard the whole tree and the advance history.
    pub fn reset(&mut self) {
        debug!(discarded_nodes = self.nodes.len(), "resetting tree");
        self.nodes.clear();
        self.nodes
            .push(Node::new(NodeId::NONE, NodeStats::new(self.rule, 1.0)));
        self.root = NodeId(0);
        self.pending_advances.clear();
        self.warn_at = ADVANCE_WARN_THRESHOLD;
    }

    /// Statistics about the tree for logging and debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, id: NodeId, depth: u32) -> u32 {
        let node = self.get(id);
        node.children
            .iter()
            .map(|(_, child)| self.compute_max_depth(*child, depth + 1))
            .max()
            .unwrap_or(depth)
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uct_tree() -> Tree<usize> {
        Tree::new(SelectionRule::Uct)
    }

    #[test]
    fn test_new_tree() {
        let tree = uct_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));
        assert!(tree.get(tree.root()).parent.is_none());
        assert!(tree.get(tree.root()).is_leaf());
    }

    #[test]
    fn test_expand_creates_children() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 0.5), (1, 0.5)]);

        assert_eq!(tree.len(), 3);
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 2);
        for (_, id) in &root.children {
            assert_eq!(tree.get(*id).parent, tree.root());
        }
    }

    #[test]
    fn test_expand_is_idempotent() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 0.5), (1, 0.5)]);

        // Give one child some history, then re-expand with an overlap.
        let child = tree.get(tree.root()).child(0).unwrap();
        tree.backpropagate(child, 1.0);

        tree.expand(tree.root(), &[(0, 0.9), (1, 0.9), (2, 0.9)]);

        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 3);
        assert_eq!(tree.get(root.child(0).unwrap()).visit_count, 1);
    }

    #[test]
    fn test_backpropagate_chain() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0)]);
        let child = tree.get(tree.root()).child(0).unwrap();
        tree.expand(child, &[(1, 1.0)]);
        let grandchild = tree.get(child).child(1).unwrap();

        tree.backpropagate(grandchild, 1.0);

        // One visit at every level, same value at every level.
        assert_eq!(tree.get(grandchild).visit_count, 1);
        assert_eq!(tree.get(child).visit_count, 1);
        assert_eq!(tree.get(tree.root()).visit_count, 1);
        assert!((tree.get(child).mean_value() - 1.0).abs() < 1e-6);
        assert!((tree.get(tree.root()).mean_value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_select_prefers_unvisited() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0), (1, 1.0)]);

        let first = tree.get(tree.root()).child(0).unwrap();
        tree.backpropagate(first, 1.0);

        // The unvisited child scores +inf and must win.
        let (action, _) = tree.select_child(tree.root(), 1.4).unwrap();
        assert_eq!(action, 1);
    }

    #[test]
    fn test_select_on_leaf_is_none() {
        let tree = uct_tree();
        assert!(tree.select_child(tree.root(), 1.4).is_none());
    }

    #[test]
    fn test_puct_select_follows_prior() {
        let mut tree: Tree<usize> = Tree::new(SelectionRule::Puct);
        tree.expand(tree.root(), &[(0, 0.2), (1, 0.8)]);

        let (action, _) = tree.select_child(tree.root(), 1.0).unwrap();
        assert_eq!(action, 1);
    }

    #[test]
    fn test_commit_reroots_and_detaches() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0), (1, 1.0)]);
        let old_root = tree.root();

        let new_root = tree.commit(1).unwrap();
        assert_eq!(tree.root(), new_root);
        assert!(tree.get(new_root).parent.is_none());
        assert_eq!(tree.pending_advances(), 1);

        // Backprop below the new root no longer reaches the old one.
        let old_visits = tree.get(old_root).visit_count;
        tree.backpropagate(new_root, 1.0);
        assert_eq!(tree.get(old_root).visit_count, old_visits);
    }

    #[test]
    fn test_commit_unknown_action() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0)]);
        assert!(tree.commit(7).is_none());
        assert_eq!(tree.pending_advances(), 0);
    }

    #[test]
    fn test_rollback_restores_original_root() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0), (1, 1.0)]);
        let original_root = tree.root();
        let child0 = tree.get(original_root).child(0).unwrap();
        tree.backpropagate(child0, 1.0);
        let child0_visits = tree.get(child0).visit_count;

        let mid = tree.commit(0).unwrap();
        tree.expand(mid, &[(2, 1.0)]);
        tree.commit(2).unwrap();
        tree.rollback_all();

        assert_eq!(tree.root(), original_root);
        assert_eq!(tree.pending_advances(), 0);

        // Children and their statistics are exactly as before the commits.
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 2);
        assert_eq!(tree.get(child0).visit_count, child0_visits);
        assert_eq!(tree.get(child0).parent, original_root);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0)]);
        tree.commit(0).unwrap();
        tree.reset();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));
        assert_eq!(tree.pending_advances(), 0);
        assert!(tree.get(tree.root()).is_leaf());
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = uct_tree();
        tree.expand(tree.root(), &[(0, 1.0)]);
        let child = tree.get(tree.root()).child(0).unwrap();
        tree.expand(child, &[(1, 1.0)]);

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.max_depth, 2);
    }
}
