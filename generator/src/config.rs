use anyhow::{bail, Context, Result};
use clap::Parser;
use mcts::{SearchConfig, SelectionRule};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use crate::central_config::{load_config, CentralConfig};

/// Central configuration, loaded once. CLI defaults below read from this via
/// env-var fallback so precedence is: CLI flag > env var > config.toml >
/// built-in default.
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_rule() -> String {
    std::env::var("GENERATOR_RULE").unwrap_or_else(|_| CENTRAL_CONFIG.search.rule.clone())
}

fn default_num_simulations() -> u32 {
    std::env::var("GENERATOR_NUM_SIMULATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.num_simulations)
}

fn default_exploration() -> f32 {
    std::env::var("GENERATOR_EXPLORATION")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.exploration)
}

fn default_temperature() -> f32 {
    std::env::var("GENERATOR_TEMPERATURE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.temperature)
}

fn default_noise_weight() -> f32 {
    std::env::var("GENERATOR_NOISE_WEIGHT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.noise_weight)
}

fn default_noise_alpha() -> f32 {
    std::env::var("GENERATOR_NOISE_ALPHA")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.noise_alpha)
}

fn default_rollout_limit() -> u32 {
    std::env::var("GENERATOR_ROLLOUT_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.search.rollout_limit)
}

fn default_max_episodes() -> i64 {
    std::env::var("GENERATOR_MAX_EPISODES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.max_episodes)
}

fn default_max_steps() -> u32 {
    std::env::var("GENERATOR_MAX_STEPS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.max_steps)
}

fn default_max_retries() -> u32 {
    std::env::var("GENERATOR_MAX_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.max_retries)
}

fn default_max_resets() -> u32 {
    std::env::var("GENERATOR_MAX_RESETS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.max_resets)
}

fn default_greedy_after_retries() -> u32 {
    std::env::var("GENERATOR_GREEDY_AFTER_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.greedy_after_retries)
}

fn default_chain_goal() -> usize {
    std::env::var("GENERATOR_CHAIN_GOAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.generator.chain_goal)
}

fn default_seed() -> u64 {
    std::env::var("GENERATOR_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CENTRAL_CONFIG.common.seed)
}

fn default_data_dir() -> PathBuf {
    std::env::var("GENERATOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&CENTRAL_CONFIG.common.data_dir))
}

fn default_log_level() -> String {
    std::env::var("GENERATOR_LOG_LEVEL").unwrap_or_else(|_| CENTRAL_CONFIG.common.log_level.clone())
}

/// Episode generation driver.
///
/// Runs batches of tree-search simulations to pick one action at a time,
/// retries dead-ended attempts by rolling the tree back to its original
/// root, and writes the finished action sequences as JSONL.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Selection rule: "uct" or "puct". No policy/value source is wired
    /// here, so "puct" runs prior-less: rollout values with uniform priors.
    #[arg(long, default_value_t = default_rule())]
    pub rule: String,

    /// Simulations per decision
    #[arg(long, default_value_t = default_num_simulations())]
    pub num_simulations: u32,

    /// Exploration constant for the selection rule
    #[arg(long, default_value_t = default_exploration())]
    pub exploration: f32,

    /// Sampling temperature for the action distribution
    #[arg(long, default_value_t = default_temperature())]
    pub temperature: f32,

    /// Fraction of the sampling distribution replaced by Dirichlet noise
    #[arg(long, default_value_t = default_noise_weight())]
    pub noise_weight: f32,

    /// Concentration parameter of the Dirichlet noise
    #[arg(long, default_value_t = default_noise_alpha())]
    pub noise_alpha: f32,

    /// Step cap for random rollouts
    #[arg(long, default_value_t = default_rollout_limit())]
    pub rollout_limit: u32,

    /// Episodes to generate; -1 runs until interrupted
    #[arg(long, default_value_t = default_max_episodes())]
    pub max_episodes: i64,

    /// Hard cap on committed actions per attempt
    #[arg(long, default_value_t = default_max_steps())]
    pub max_steps: u32,

    /// Rollbacks before the tree is reset
    #[arg(long, default_value_t = default_max_retries())]
    pub max_retries: u32,

    /// Resets before an episode is abandoned
    #[arg(long, default_value_t = default_max_resets())]
    pub max_resets: u32,

    /// Retries after which sampling switches to the greedy decision
    #[arg(long, default_value_t = default_greedy_after_retries())]
    pub greedy_after_retries: u32,

    /// Target value for the chain environment
    #[arg(long, default_value_t = default_chain_goal())]
    pub chain_goal: usize,

    /// RNG seed; episode i uses seed + i
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Directory for the traces.jsonl output
    #[arg(long, default_value_os_t = default_data_dir())]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.selection_rule()?;

        if self.num_simulations == 0 {
            bail!("num_simulations must be positive");
        }
        if self.exploration < 0.0 {
            bail!("exploration must be non-negative, got {}", self.exploration);
        }
        if self.temperature <= 0.0 {
            bail!("temperature must be positive, got {}", self.temperature);
        }
        if !(0.0..=1.0).contains(&self.noise_weight) {
            bail!("noise_weight must be in [0, 1], got {}", self.noise_weight);
        }
        if !(self.noise_alpha > 0.0 && self.noise_alpha.is_finite()) {
            bail!(
                "noise_alpha must be positive and finite, got {}",
                self.noise_alpha
            );
        }
        if self.max_steps == 0 {
            bail!("max_steps must be positive");
        }
        if self.max_episodes < -1 {
            bail!("max_episodes must be -1 (unlimited) or non-negative");
        }

        self.log_level
            .parse::<LevelFilter>()
            .with_context(|| format!("invalid log level: {}", self.log_level))?;

        Ok(())
    }

    pub fn selection_rule(&self) -> Result<SelectionRule> {
        match self.rule.as_str() {
            "uct" => Ok(SelectionRule::Uct),
            "puct" => Ok(SelectionRule::Puct),
            other => bail!("unknown selection rule {other:?}, expected \"uct\" or \"puct\""),
        }
    }

    /// Translate the CLI-level settings into an engine search config.
    pub fn search_config(&self) -> Result<SearchConfig> {
        let base = match self.selection_rule()? {
            SelectionRule::Uct => SearchConfig::uct(),
            SelectionRule::Puct => SearchConfig::puct(),
        };
        Ok(base
            .with_simulations(self.num_simulations)
            .with_exploration(self.exploration)
            .with_noise(self.noise_weight, self.noise_alpha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["generator"])
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rule_parsing() {
        let mut config = base_config();
        config.rule = "puct".to_string();
        assert_eq!(config.selection_rule().unwrap(), SelectionRule::Puct);

        config.rule = "alphabeta".to_string();
        assert!(config.selection_rule().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = base_config();
        config.temperature = 0.0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.num_simulations = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_noise_parameters() {
        let mut config = base_config();
        config.noise_alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.noise_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_config_translation() {
        let mut config = base_config();
        config.rule = "uct".to_string();
        config.num_simulations = 250;
        config.exploration = 0.7;

        let search = config.search_config().unwrap();
        assert_eq!(search.rule, SelectionRule::Uct);
        assert_eq!(search.num_simulations, 250);
        assert!((search.exploration - 0.7).abs() < 1e-6);

        config.rule = "puct".to_string();
        assert_eq!(config.search_config().unwrap().rule, SelectionRule::Puct);
    }
}
