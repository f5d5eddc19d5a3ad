//! Monte Carlo Tree Search engine for melodic line generation.
//!
//! This crate provides a domain-agnostic MCTS implementation that works with
//! any environment implementing the `search-core` [`StateManager`]
//! (`search_core::StateManager`) trait. It was built to search species
//! counterpoint lines against hand-coded rule checkers, but nothing in the
//! engine knows about music.
//!
//! # Overview
//!
//! Each decision runs a batch of simulations. A simulation consists of:
//!
//! 1. **Selection**: walk from the root to a leaf, choosing children by the
//!    tree's selection rule (UCB1 or PUCT)
//! 2. **Expansion**: add a child per legal action at the leaf, with priors
//!    from the evaluator
//! 3. **Evaluation**: estimate the leaf's value with a random rollout or a
//!    policy/value function
//! 4. **Backpropagation**: update visit counts and value statistics from the
//!    leaf up to the root
//!
//! The driver then reads a visit-count-derived action distribution, commits
//! the chosen action (the root descends into that child) and steps its real
//! state with the same manager. When a generation attempt dead-ends, the
//! committed advances can be rolled back wholesale without losing any
//! explored statistics, or the tree can be reset outright.
//!
//! # Usage
//!
//! ```rust
//! use managers_chain::ChainManager;
//! use mcts::{RolloutEvaluator, SearchConfig, SearchTree};
//! use search_core::StateManager;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut search = SearchTree::new(
//!     ChainManager::new(4),
//!     RolloutEvaluator::default(),
//!     SearchConfig::uct().with_simulations(500),
//! );
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let state = search.manager().initial_state();
//!
//! let action = search
//!     .most_visited_action(&state, &mut rng)
//!     .unwrap()
//!     .expect("chain start has legal moves");
//! search.commit_action(action).unwrap();
//! ```
//!
//! # Variants
//!
//! [`SelectionRule::Uct`](config::SelectionRule) pairs with
//! [`RolloutEvaluator`] (priors unused, value from random play-outs);
//! [`SelectionRule::Puct`](config::SelectionRule) pairs with a policy/value
//! source such as [`PolicyValueFn`]. One rule per tree, fixed at
//! construction.

pub mod config;
pub mod evaluator;
pub mod node;
pub mod search;
pub mod tree;

// Re-export main types
pub use config::{SearchConfig, SelectionRule};
pub use evaluator::{
    Evaluation, Evaluator, EvaluatorError, PolicyValueFn, RolloutEvaluator, UniformEvaluator,
};
pub use node::{Node, NodeId, NodeStats};
pub use search::{SearchError, SearchTree};
pub use tree::{Tree, TreeStats};
