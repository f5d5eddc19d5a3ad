//! The `StateManager` trait.
//!
//! A state manager is a pure function of `(state, action)`. All methods take
//! `&self`: a manager must not accumulate mutable per-call state the search
//! could observe. Anything like a "current guide trace" selection is an
//! immutable field fixed at construction, so the same manager instance can be
//! shared between the search tree and the driver that steps the real state.

use std::fmt::Debug;

/// Domain environment consumed by the search engine.
///
/// # Example
///
/// ```rust
/// use search_core::StateManager;
///
/// /// Advances only when the chosen action equals the current count.
/// struct Counter;
///
/// impl StateManager for Counter {
///     type State = usize;
///     type Action = usize;
///
///     fn initial_state(&self) -> usize {
///         0
///     }
///
///     fn next_state(&self, state: &usize, action: usize) -> usize {
///         if action == *state { state + 1 } else { 0 }
///     }
///
///     fn valid_actions(&self, _state: &usize) -> Vec<usize> {
///         (0..5).collect()
///     }
///
///     fn is_finished(&self, state: &usize) -> (f32, bool) {
///         if *state == 4 { (1.0, true) } else { (0.0, false) }
///     }
/// }
/// ```
pub trait StateManager: Send + Sync {
    /// Search state. The engine never inspects or compares states, it only
    /// clones them at the start of each simulation and threads them through
    /// `next_state`.
    type State: Clone + Send + Sync;

    /// Action identifier. Used as the key in each node's children list.
    type Action: Copy + PartialEq + Debug + Send + Sync;

    /// The state a fresh generation attempt starts from.
    fn initial_state(&self) -> Self::State;

    /// Apply `action` to `state` and return the successor state.
    fn next_state(&self, state: &Self::State, action: Self::Action) -> Self::State;

    /// Actions that are legal in `state`. May be empty: the engine treats a
    /// non-terminal state with no valid actions as an immediate dead end.
    fn valid_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Terminal judgment: `(outcome_signal, terminal)`.
    ///
    /// The outcome signal is domain-defined (win/loss/partial score) and only
    /// meaningful when `terminal` is true.
    fn is_finished(&self, state: &Self::State) -> (f32, bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter;

    impl StateManager for Counter {
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
            (0..5).collect()
        }

        fn is_finished(&self, state: &usize) -> (f32, bool) {
            if *state == 4 {
                (1.0, true)
            } else {
                (0.0, false)
            }
        }
    }

    #[test]
    fn test_manager_is_pure_per_call() {
        let mgr = Counter;
        let state = mgr.initial_state();

        // Repeated calls with the same inputs give the same outputs.
        assert_eq!(mgr.next_state(&state, 0), mgr.next_state(&state, 0));
        assert_eq!(mgr.valid_actions(&state), mgr.valid_actions(&state));
        assert_eq!(mgr.is_finished(&state), mgr.is_finished(&state));
    }

    #[test]
    fn test_counter_reaches_terminal() {
        let mgr = Counter;
        let mut state = mgr.initial_state();
        for step in 0..4 {
            assert!(!mgr.is_finished(&state).1);
            state = mgr.next_state(&state, step);
        }
        assert_eq!(mgr.is_finished(&state), (1.0, true));
    }
}
