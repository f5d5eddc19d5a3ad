//! Counting-chain reference state manager
//!
//! A deliberately trivial environment used by the engine's tests, benches and
//! the generator demo. The state is a counter starting at 0. Choosing the
//! action equal to the current count advances the chain by one; any other
//! action knocks the counter back to 0. The chain terminates with outcome 1.0
//! when the counter reaches the goal.
//!
//! Only one action advances the chain at each step, so a working search must
//! concentrate visits on that action. This makes the chain a sharp smoke test
//! for selection and backpropagation without any domain machinery.

use search_core::StateManager;

/// Counting-chain environment.
#[derive(Debug, Clone)]
pub struct ChainManager {
    /// Counter value at which the chain terminates with outcome 1.0.
    goal: usize,
    /// Number of actions offered at every state.
    num_actions: usize,
}

impl ChainManager {
    /// Chain with the given goal, offering `goal + 1` actions per step.
    pub fn new(goal: usize) -> Self {
        Self {
            goal,
            num_actions: goal + 1,
        }
    }

    /// Chain with an explicit action count (must cover `0..goal`).
    pub fn with_actions(goal: usize, num_actions: usize) -> Self {
        assert!(num_actions > goal, "action set must include every chain step");
        Self { goal, num_actions }
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }
}

impl Default for ChainManager {
    fn default() -> Self {
        Self::new(4)
    }
}

impl StateManager for ChainManager {
    type State = usize;
    type Action = usize;

    fn initial_state(&self) -> usize {
        0
    }

    fn next_state(&self, state: &usize, action: usize) -> usize {
        if action == *state {
            state + 1
        } else {
            0
        }
    }

    fn valid_actions(&self, _state: &usize) -> Vec<usize> {
        (0..self.num_actions).collect()
    }

    fn is_finished(&self, state: &usize) -> (f32, bool) {
        if *state == self.goal {
            (1.0, true)
        } else {
            (0.0, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_actions_advance() {
        let mgr = ChainManager::default();
        let mut state = mgr.initial_state();

        for step in 0..mgr.goal() {
            state = mgr.next_state(&state, step);
            assert_eq!(state, step + 1);
        }
        assert_eq!(mgr.is_finished(&state), (1.0, true));
    }

    #[test]
    fn test_wrong_action_resets() {
        let mgr = ChainManager::default();
        let state = mgr.next_state(&0, 0);
        assert_eq!(state, 1);

        // Any action other than the current count restarts the chain.
        assert_eq!(mgr.next_state(&state, 3), 0);
    }

    #[test]
    fn test_action_set_is_constant() {
        let mgr = ChainManager::with_actions(4, 5);
        assert_eq!(mgr.valid_actions(&0), vec![0, 1, 2, 3, 4]);
        assert_eq!(mgr.valid_actions(&3), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_not_finished_before_goal() {
        let mgr = ChainManager::new(4);
        for state in 0..4 {
            assert_eq!(mgr.is_finished(&state), (0.0, false));
        }
    }
}
