//! Leaf evaluation.
//!
//! When a simulation reaches a non-terminal leaf the engine asks an evaluator
//! for (action, prior) pairs and a scalar value estimate. Two shapes are
//! supported behind one trait: a rollout evaluator that plays random legal
//! moves to a terminal state (the prior channel is uniform and effectively
//! unused under UCT), and a policy/value function, typically backed by a
//! trained network, that supplies real priors for PUCT.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use search_core::StateManager;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by evaluators. The built-in evaluators never fail;
/// network-backed implementations report inference problems here.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),
}

/// Result of evaluating a leaf state.
#[derive(Debug, Clone)]
pub struct Evaluation<A> {
    /// (action, prior probability) pairs. Priors must be non-negative; they
    /// need not be restricted to legal actions, the engine intersects them
    /// with the state manager's valid actions at expansion.
    pub priors: Vec<(A, f32)>,

    /// Scalar value estimate for the state.
    pub value: f32,
}

/// Trait for leaf evaluators.
pub trait Evaluator<M: StateManager>: Send + Sync {
    /// Evaluate `state`, using `manager` for legal moves and transitions.
    /// Randomized evaluators draw from the caller-supplied `rng` so search
    /// runs stay reproducible end to end.
    fn evaluate(
        &self,
        manager: &M,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Result<Evaluation<M::Action>, EvaluatorError>;
}

/// Uniform priors over valid actions, neutral value. Useful for exercising
/// the search without a model or rollouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<M: StateManager> Evaluator<M> for UniformEvaluator {
    fn evaluate(
        &self,
        manager: &M,
        state: &M::State,
        _rng: &mut ChaCha20Rng,
    ) -> Result<Evaluation<M::Action>, EvaluatorError> {
        Ok(Evaluation {
            priors: uniform_priors(manager, state),
            value: 0.0,
        })
    }
}

/// Estimates a leaf's value by playing uniformly random legal moves until a
/// terminal state or the step limit.
///
/// Terminal outcomes are scaled by the reciprocal of the number of states
/// the rollout visited, so a state from which completions are short scores
/// higher than one that wanders first. Without this shaping, environments
/// where almost every rollout eventually succeeds give every child the same
/// flat value and visit counts carry no gradient.
#[derive(Debug, Clone, Copy)]
pub struct RolloutEvaluator {
    /// Maximum rollout length before giving up with a neutral value.
    pub step_limit: u32,

    /// Value returned when the rollout runs out of legal moves at a
    /// non-terminal state.
    pub failure_value: f32,
}

impl Default for RolloutEvaluator {
    fn default() -> Self {
        Self {
            step_limit: 1000,
            failure_value: -1.0,
        }
    }
}

impl RolloutEvaluator {
    pub fn new(step_limit: u32) -> Self {
        Self {
            step_limit,
            ..Self::default()
        }
    }
}

impl<M: StateManager> Evaluator<M> for RolloutEvaluator {
    fn evaluate(
        &self,
        manager: &M,
        state: &M::State,
        rng: &mut ChaCha20Rng,
    ) -> Result<Evaluation<M::Action>, EvaluatorError> {
        let mut current = state.clone();
        let mut value = None;
        let mut visited = 1u32;

        for _ in 0..self.step_limit {
            let (outcome, over) = manager.is_finished(&current);
            if over {
                // Shortest-path credit: the same outcome is worth more the
                // fewer states the rollout had to visit to reach it.
                value = Some(outcome / visited as f32);
                break;
            }
            let actions = manager.valid_actions(&current);
            if actions.is_empty() {
                value = Some(self.failure_value);
                break;
            }
            let action = actions[rng.gen_range(0..actions.len())];
            current = manager.next_state(&current, action);
            visited += 1;
        }

        let value = value.unwrap_or_else(|| {
            // Recovered locally with a neutral value, but a manager that
            // cannot reach a terminal state within the budget is suspect.
            warn!(
                step_limit = self.step_limit,
                "rollout hit the step limit without reaching a terminal state"
            );
            0.0
        });

        Ok(Evaluation {
            priors: uniform_priors(manager, state),
            value,
        })
    }
}

/// Adapter turning a plain policy/value function into an [`Evaluator`].
///
/// The function receives the state and returns (action, prior) pairs plus a
/// value estimate, the contract a trained policy/value network exposes.
pub struct PolicyValueFn<F>(F);

impl<F> PolicyValueFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<M, F> Evaluator<M> for PolicyValueFn<F>
where
    M: StateManager,
    F: Fn(&M::State) -> (Vec<(M::Action, f32)>, f32) + Send + Sync,
{
    fn evaluate(
        &self,
        _manager: &M,
        state: &M::State,
        _rng: &mut ChaCha20Rng,
    ) -> Result<Evaluation<M::Action>, EvaluatorError> {
        let (priors, value) = (self.0)(state);
        Ok(Evaluation { priors, value })
    }
}

fn uniform_priors<M: StateManager>(manager: &M, state: &M::State) -> Vec<(M::Action, f32)> {
    let actions = manager.valid_actions(state);
    if actions.is_empty() {
        return Vec::new();
    }
    let prior = 1.0 / actions.len() as f32;
    actions.into_iter().map(|a| (a, prior)).collect()
}
