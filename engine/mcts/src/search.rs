//! The search engine.
//!
//! Each decision runs a fixed number of simulations. A simulation walks from
//! the root to a leaf following the selection rule, threading a local copy of
//! the state through the manager, then expands the leaf (unless terminal or
//! dead-ended), obtains a value and backpropagates it to the root. Decisions
//! are read off the root children's visit counts.
//!
//! Simulations run strictly sequentially: every backpropagation completes
//! before the next simulation starts, so the tree is never observed in a
//! partially updated state.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use search_core::StateManager;
use thiserror::Error;
use tracing::trace;

use crate::config::SearchConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::tree::{Tree, TreeStats};

/// Errors that can occur during search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The committed action was never expanded as a child of the current
    /// root. Fatal to the generation attempt: the caller must roll back or
    /// reset, never substitute another action.
    #[error("action {0} is not a child of the current root")]
    ActionNotAvailable(String),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
}

/// Monte Carlo search tree bound to a state manager and an evaluator.
///
/// The tree encodes path-dependent progress through its root; the caller owns
/// the real state and must step it with the same manager after every
/// committed action.
pub struct SearchTree<M: StateManager, E: Evaluator<M>> {
    tree: Tree<M::Action>,
    manager: M,
    evaluator: E,
    config: SearchConfig,
}

impl<M: StateManager, E: Evaluator<M>> SearchTree<M, E> {
    pub fn new(manager: M, evaluator: E, config: SearchConfig) -> Self {
        Self {
            tree: Tree::new(config.rule),
            manager,
            evaluator,
            config,
        }
    }

    /// The state manager this tree searches with. Drivers step the real
    /// state through this same instance.
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// The underlying tree, for inspection and logging.
    pub fn tree(&self) -> &Tree<M::Action> {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Tree statistics snapshot.
    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }

    /// Run one simulation from `state` (the state the current root stands
    /// for). Returns the value that was backpropagated.
    pub fn run_simulation(
        &mut self,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Result<f32, SearchError> {
        // Selection: descend to a leaf, advancing a local state copy.
        let mut current = self.tree.root();
        let mut local = state.clone();
        let mut depth = 0u32;

        while let Some((action, child)) = self.tree.select_child(current, self.config.exploration) {
            local = self.manager.next_state(&local, action);
            current = child;
            depth += 1;
        }

        let (outcome, over) = self.manager.is_finished(&local);
        let value = if over {
            outcome
        } else {
            let actions = self.manager.valid_actions(&local);
            if actions.is_empty() {
                // A non-terminal dead end counts as an immediate loss. The
                // node is left unexpanded so it stays a true leaf.
                self.config.failure_value
            } else {
                let eval = self.evaluator.evaluate(&self.manager, &local, rng)?;
                let pairs = restrict_priors(&actions, &eval.priors);
                self.tree.expand(current, &pairs);
                eval.value
            }
        };

        self.tree.backpropagate(current, value);
        trace!(depth, value, terminal = over, "simulation complete");
        Ok(value)
    }

    /// Run the configured number of simulations from `state`, then return the
    /// distribution over the root's children proportional to
    /// `visit_count^(1/temperature)`.
    ///
    /// Returns `None` when the root has no children after simulation, i.e.
    /// the root state has no legal continuation. That is a normal domain
    /// outcome, not an error.
    pub fn action_distribution(
        &mut self,
        state: &M::State,
        temperature: f32,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<Vec<(M::Action, f32)>>, SearchError> {
        debug_assert!(temperature > 0.0, "temperature must be positive");

        for _ in 0..self.config.num_simulations {
            self.run_simulation(state, rng)?;
        }

        let visits = self.tree.root_visits();
        if visits.is_empty() {
            return Ok(None);
        }

        let total: u32 = visits.iter().map(|(_, n)| *n).sum();
        if total == 0 {
            // Children exist but none were ever descended into (possible
            // with a zero-simulation budget). Fall back to uniform.
            let p = 1.0 / visits.len() as f32;
            return Ok(Some(visits.into_iter().map(|(a, _)| (a, p)).collect()));
        }

        // softmax(ln(visits) / temperature), stabilized by max subtraction.
        // Unvisited children get ln(0) = -inf and therefore zero mass.
        let logits: Vec<f32> = visits
            .iter()
            .map(|(_, n)| (*n as f32).ln() / temperature)
            .collect();
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        Ok(Some(
            visits
                .into_iter()
                .zip(exps)
                .map(|((action, _), e)| (action, e / sum))
                .collect(),
        ))
    }

    /// Sample an action from the visit-count distribution, optionally mixing
    /// in Dirichlet exploration noise. Returns the sampled action together
    /// with the noiseless distribution (the training target).
    ///
    /// `None` mirrors [`Self::action_distribution`]: no legal continuation.
    #[allow(clippy::type_complexity)]
    pub fn sample_action(
        &mut self,
        state: &M::State,
        temperature: f32,
        add_noise: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<(M::Action, Vec<(M::Action, f32)>)>, SearchError> {
        let Some(distribution) = self.action_distribution(state, temperature, rng)? else {
            return Ok(None);
        };

        let weights: Vec<f32> = if add_noise {
            let noise = dirichlet_noise(distribution.len(), self.config.noise_alpha, rng);
            distribution
                .iter()
                .zip(noise)
                .map(|((_, p), n)| (1.0 - self.config.noise_weight) * p + self.config.noise_weight * n)
                .collect()
        } else {
            distribution.iter().map(|(_, p)| *p).collect()
        };

        let index = sample_index(&weights, rng);
        let action = distribution[index].0;
        Ok(Some((action, distribution)))
    }

    /// Deterministic decision: the root child with the largest visit count.
    /// Exact ties are broken uniformly at random with the caller's RNG.
    pub fn most_visited_action(
        &mut self,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<M::Action>, SearchError> {
        for _ in 0..self.config.num_simulations {
            self.run_simulation(state, rng)?;
        }

        let visits = self.tree.root_visits();
        let Some(max) = visits.iter().map(|(_, n)| *n).max() else {
            return Ok(None);
        };

        let tied: Vec<M::Action> = visits
            .into_iter()
            .filter(|(_, n)| *n == max)
            .map(|(a, _)| a)
            .collect();
        Ok(Some(tied[rng.gen_range(0..tied.len())]))
    }

    /// Advance the root into the child reached by `action`, recording the
    /// advance so it can be rolled back.
    pub fn commit_action(&mut self, action: M::Action) -> Result<(), SearchError> {
        self.tree
            .commit(action)
            .map(|_| ())
            .ok_or_else(|| SearchError::ActionNotAvailable(format!("{action:?}")))
    }

    /// Undo every committed advance, restoring the original root with all
    /// accumulated statistics. Used to retry a generation attempt that
    /// dead-ended without throwing away what the search learned.
    pub fn rollback_all(&mut self) {
        self.tree.rollback_all();
    }

    /// Discard the tree and the advance history entirely.
    pub fn reset(&mut self) {
        self.tree.reset();
    }
}

/// Keep evaluator priors only for actions the manager reports valid; valid
/// actions the evaluator did not mention get a zero prior so they still
/// become children (UCT ignores priors entirely).
fn restrict_priors<A: Copy + PartialEq>(valid: &[A], priors: &[(A, f32)]) -> Vec<(A, f32)> {
    valid
        .iter()
        .map(|&action| {
            let prior = priors
                .iter()
                .find(|(a, _)| *a == action)
                .map(|(_, p)| *p)
                .unwrap_or(0.0);
            (action, prior)
        })
        .collect()
}

/// Sample an index from non-negative weights by cumulative sum.
fn sample_index(weights: &[f32], rng: &mut ChaCha20Rng) -> usize {
    let total: f32 = weights.iter().sum();
    let r: f32 = rng.gen::<f32>() * total;

    let mut cumsum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return i;
        }
    }

    // Floating point slack: fall back to the last non-zero weight.
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1)
}

/// Dirichlet(alpha) noise via normalized Gamma variates.
fn dirichlet_noise(n: usize, alpha: f32, rng: &mut ChaCha20Rng) -> Vec<f32> {
    use rand_distr::{Distribution, Gamma};

    let gamma = Gamma::new(alpha as f64, 1.0).expect("noise alpha must be positive and finite");
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    }

    samples
}
