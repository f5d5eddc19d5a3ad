//! Tree node representation.
//!
//! Each node represents a state reached by a sequence of actions from the
//! root. Nodes store visit counts plus one of two value-statistic shapes,
//! depending on the tree's selection rule. The shapes sit behind a single
//! contract (`record` / `mean` / `selection_score`) so the rest of the engine
//! never matches on the variant.

use crate::config::SelectionRule;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// Value statistics, one payload shape per selection rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeStats {
    /// Cumulative form: mean value = total_value / visits.
    Uct { total_value: f32 },

    /// Running-mean form with the prior probability fixed at expansion.
    Puct { mean_value: f32, prior: f32 },
}

impl NodeStats {
    /// Fresh statistics for a node created under `rule`. The prior is kept
    /// only by the PUCT shape; the UCT shape drops it.
    pub fn new(rule: SelectionRule, prior: f32) -> Self {
        match rule {
            SelectionRule::Uct => Self::Uct { total_value: 0.0 },
            SelectionRule::Puct => Self::Puct {
                mean_value: 0.0,
                prior,
            },
        }
    }

    /// Fold one backpropagated value into the statistics. `visits` is the
    /// node's visit count *after* this pass was counted.
    pub fn record(&mut self, visits: u32, value: f32) {
        debug_assert!(visits > 0, "record called before the visit was counted");
        match self {
            Self::Uct { total_value } => *total_value += value,
            Self::Puct { mean_value, .. } => {
                *mean_value += (value - *mean_value) / visits as f32;
            }
        }
    }

    /// Mean backpropagated value. 0.0 for an unvisited node.
    pub fn mean(&self, visits: u32) -> f32 {
        match self {
            Self::Uct { total_value } => {
                if visits == 0 {
                    0.0
                } else {
                    total_value / visits as f32
                }
            }
            Self::Puct { mean_value, .. } => *mean_value,
        }
    }

    /// Prior probability fixed at expansion (1.0 for UCT nodes, which do not
    /// carry one).
    pub fn prior(&self) -> f32 {
        match self {
            Self::Uct { .. } => 1.0,
            Self::Puct { prior, .. } => *prior,
        }
    }

    /// Score used when the parent picks a child to descend into.
    ///
    /// UCT: mean + c * sqrt(2 * ln(parent visits) / visits), with unvisited
    /// children scoring +inf so every child is tried at least once.
    ///
    /// PUCT: mean + c * prior * sqrt(parent visits) / (1 + visits).
    pub fn selection_score(&self, visits: u32, parent_visits: u32, c: f32) -> f32 {
        match self {
            Self::Uct { total_value } => {
                if visits == 0 {
                    return f32::INFINITY;
                }
                let exploit = total_value / visits as f32;
                let explore = c * (2.0 * (parent_visits as f32).ln() / visits as f32).sqrt();
                exploit + explore
            }
            Self::Puct { mean_value, prior } => {
                mean_value + c * prior * (parent_visits as f32).sqrt() / (1.0 + visits as f32)
            }
        }
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct Node<A> {
    /// Parent node index (NONE for the current root and for detached
    /// ancestors of a committed root).
    pub parent: NodeId,

    /// Number of backpropagation passes through this node.
    pub visit_count: u32,

    /// Value statistics in the tree's selection-rule shape.
    pub stats: NodeStats,

    /// Children as (action, node) pairs. Empty until expanded.
    pub children: Vec<(A, NodeId)>,
}

impl<A: Copy + PartialEq> Node<A> {
    pub fn new(parent: NodeId, stats: NodeStats) -> Self {
        Self {
            parent,
            visit_count: 0,
            stats,
            children: Vec::new(),
        }
    }

    /// A node is a leaf iff it has no children. A dead-end state is never
    /// expanded, so it stays a true leaf and remains distinguishable from an
    /// expanded interior node.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Mean backpropagated value.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        self.stats.mean(self.visit_count)
    }

    /// Child id for `action`, if that action has been expanded.
    pub fn child(&self, action: A) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(!NodeId(0).is_none());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_uct_stats_accumulate() {
        let mut stats = NodeStats::new(SelectionRule::Uct, 0.5);

        stats.record(1, 1.0);
        stats.record(2, 0.0);
        assert!((stats.mean(2) - 0.5).abs() < 1e-6);

        // UCT drops the prior.
        assert!((stats.prior() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_puct_running_mean() {
        let mut stats = NodeStats::new(SelectionRule::Puct, 0.3);

        stats.record(1, 1.0);
        stats.record(2, 0.0);
        stats.record(3, 0.5);
        assert!((stats.mean(3) - 0.5).abs() < 1e-6);
        assert!((stats.prior() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_uct_unvisited_scores_infinite() {
        let stats = NodeStats::new(SelectionRule::Uct, 1.0);
        assert_eq!(stats.selection_score(0, 10, 1.4), f32::INFINITY);
    }

    #[test]
    fn test_uct_score_formula() {
        let mut stats = NodeStats::new(SelectionRule::Uct, 1.0);
        stats.record(1, 1.0);
        stats.record(2, 1.0);

        // mean = 1.0, explore = 1.0 * sqrt(2 * ln(8) / 2)
        let expected = 1.0 + (2.0 * (8.0f32).ln() / 2.0).sqrt();
        let score = stats.selection_score(2, 8, 1.0);
        assert!((score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_puct_score_formula() {
        let mut stats = NodeStats::new(SelectionRule::Puct, 0.5);
        stats.record(1, 0.4);

        // mean + c * prior * sqrt(parent) / (1 + visits)
        let expected = 0.4 + 1.0 * 0.5 * (100.0f32).sqrt() / 2.0;
        let score = stats.selection_score(1, 100, 1.0);
        assert!((score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_puct_unvisited_ranked_by_prior() {
        let low = NodeStats::new(SelectionRule::Puct, 0.1);
        let high = NodeStats::new(SelectionRule::Puct, 0.9);

        assert!(high.selection_score(0, 10, 1.0) > low.selection_score(0, 10, 1.0));
    }

    #[test]
    fn test_is_leaf() {
        let mut node: Node<usize> = Node::new(NodeId::NONE, NodeStats::new(SelectionRule::Uct, 1.0));
        assert!(node.is_leaf());

        node.children.push((0, NodeId(1)));
        assert!(!node.is_leaf());
        assert_eq!(node.child(0), Some(NodeId(1)));
        assert_eq!(node.child(3), None);
    }
}
