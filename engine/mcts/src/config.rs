//! Search configuration parameters.

/// Which node-value formula the tree uses for child selection.
///
/// Chosen once per tree; the two rules are never mixed within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    /// Classic UCB1: mean value + c * sqrt(2 * ln(parent visits) / visits),
    /// with unvisited children forced to the front. Pairs with rollout-based
    /// evaluation; expansion priors are ignored.
    Uct,

    /// AlphaZero-style: mean value + c * prior * sqrt(parent visits)
    /// / (1 + visits). Pairs with a policy/value evaluator that supplies
    /// prior probabilities at expansion.
    Puct,
}

/// Configuration for a search tree.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Selection formula for the whole tree.
    pub rule: SelectionRule,

    /// Number of simulations per decision.
    pub num_simulations: u32,

    /// Exploration constant (c_uct or c_puct depending on the rule).
    pub exploration: f32,

    /// Value backpropagated when a simulation reaches a non-terminal state
    /// with no valid actions. Treated as an immediate loss.
    pub failure_value: f32,

    /// Fraction of the sampling distribution replaced by Dirichlet noise
    /// when `sample_action` is called with noise enabled.
    pub noise_weight: f32,

    /// Concentration parameter of the Dirichlet noise.
    pub noise_alpha: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rule: SelectionRule::Uct,
            num_simulations: 1000,
            exploration: 1.4,
            failure_value: -1.0,
            noise_weight: 0.25,
            noise_alpha: 0.3,
        }
    }
}

impl SearchConfig {
    /// Rollout-driven search with the UCB1 selection rule.
    pub fn uct() -> Self {
        Self::default()
    }

    /// Prior-guided search with the PUCT selection rule.
    pub fn puct() -> Self {
        Self {
            rule: SelectionRule::Puct,
            ..Self::default()
        }
    }

    /// A fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 50,
            ..Self::default()
        }
    }

    /// Builder pattern: set the number of simulations per decision.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration(mut self, c: f32) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set the Dirichlet noise mix.
    ///
    /// Panics on parameters the Dirichlet distribution cannot be built from,
    /// so misconfiguration surfaces here instead of mid-search.
    pub fn with_noise(mut self, weight: f32, alpha: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&weight),
            "noise weight must be in [0, 1], got {weight}"
        );
        assert!(
            alpha > 0.0 && alpha.is_finite(),
            "noise alpha must be positive and finite, got {alpha}"
        );
        self.noise_weight = weight;
        self.noise_alpha = alpha;
        self
    }

    /// Builder pattern: set the dead-end failure value.
    pub fn with_failure_value(mut self, value: f32) -> Self {
        self.failure_value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.rule, SelectionRule::Uct);
        assert_eq!(config.num_simulations, 1000);
        assert!((config.exploration - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_puct_config() {
        let config = SearchConfig::puct();
        assert_eq!(config.rule, SelectionRule::Puct);
    }

    #[test]
    fn test_with_noise_accepts_valid_mix() {
        let config = SearchConfig::uct().with_noise(0.25, 0.3);
        assert!((config.noise_weight - 0.25).abs() < 1e-6);
        assert!((config.noise_alpha - 0.3).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "noise alpha must be positive")]
    fn test_with_noise_rejects_zero_alpha() {
        let _ = SearchConfig::uct().with_noise(0.25, 0.0);
    }

    #[test]
    #[should_panic(expected = "noise weight must be in [0, 1]")]
    fn test_with_noise_rejects_weight_above_one() {
        let _ = SearchConfig::uct().with_noise(1.5, 0.3);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SearchConfig::uct()
            .with_simulations(500)
            .with_exploration(1.0);

        assert_eq!(config.num_simulations, 500);
        assert!((config.exploration - 1.0).abs() < 1e-6);
    }
}
