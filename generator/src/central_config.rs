//! Centralized configuration loading from config.toml.
//!
//! Single source of truth for configuration values, loaded once from a
//! config.toml found on the standard search path. Environment variables and
//! CLI flags override individual values in `config.rs`.

use serde::Deserialize;
use std::path::PathBuf;

mod defaults {
    pub const DATA_DIR: &str = "./data";
    pub const LOG_LEVEL: &str = "info";
    pub const SEED: u64 = 1110;

    pub const RULE: &str = "uct";
    pub const NUM_SIMULATIONS: u32 = 1000;
    pub const EXPLORATION: f32 = 1.4;
    pub const TEMPERATURE: f32 = 1.0;
    pub const NOISE_WEIGHT: f32 = 0.25;
    pub const NOISE_ALPHA: f32 = 0.3;
    pub const ROLLOUT_LIMIT: u32 = 1000;

    pub const MAX_EPISODES: i64 = 10;
    pub const MAX_STEPS: u32 = 64;
    pub const MAX_RETRIES: u32 = 30;
    pub const MAX_RESETS: u32 = 3;
    pub const GREEDY_AFTER_RETRIES: u32 = 30;
    pub const CHAIN_GOAL: usize = 4;
}

/// Root configuration structure matching config.toml.
#[derive(Debug, Deserialize, Default)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

fn d_data_dir() -> String {
    defaults::DATA_DIR.to_string()
}
fn d_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}
fn d_seed() -> u64 {
    defaults::SEED
}

#[derive(Debug, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
    #[serde(default = "d_seed")]
    pub seed: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: d_data_dir(),
            log_level: d_log_level(),
            seed: d_seed(),
        }
    }
}

fn d_rule() -> String {
    defaults::RULE.to_string()
}
fn d_num_simulations() -> u32 {
    defaults::NUM_SIMULATIONS
}
fn d_exploration() -> f32 {
    defaults::EXPLORATION
}
fn d_temperature() -> f32 {
    defaults::TEMPERATURE
}
fn d_noise_weight() -> f32 {
    defaults::NOISE_WEIGHT
}
fn d_noise_alpha() -> f32 {
    defaults::NOISE_ALPHA
}
fn d_rollout_limit() -> u32 {
    defaults::ROLLOUT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct SearchSection {
    #[serde(default = "d_rule")]
    pub rule: String,
    #[serde(default = "d_num_simulations")]
    pub num_simulations: u32,
    #[serde(default = "d_exploration")]
    pub exploration: f32,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_noise_weight")]
    pub noise_weight: f32,
    #[serde(default = "d_noise_alpha")]
    pub noise_alpha: f32,
    #[serde(default = "d_rollout_limit")]
    pub rollout_limit: u32,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            rule: d_rule(),
            num_simulations: d_num_simulations(),
            exploration: d_exploration(),
            temperature: d_temperature(),
            noise_weight: d_noise_weight(),
            noise_alpha: d_noise_alpha(),
            rollout_limit: d_rollout_limit(),
        }
    }
}

fn d_max_episodes() -> i64 {
    defaults::MAX_EPISODES
}
fn d_max_steps() -> u32 {
    defaults::MAX_STEPS
}
fn d_max_retries() -> u32 {
    defaults::MAX_RETRIES
}
fn d_max_resets() -> u32 {
    defaults::MAX_RESETS
}
fn d_greedy_after_retries() -> u32 {
    defaults::GREEDY_AFTER_RETRIES
}
fn d_chain_goal() -> usize {
    defaults::CHAIN_GOAL
}

#[derive(Debug, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "d_max_episodes")]
    pub max_episodes: i64,
    #[serde(default = "d_max_steps")]
    pub max_steps: u32,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_max_resets")]
    pub max_resets: u32,
    #[serde(default = "d_greedy_after_retries")]
    pub greedy_after_retries: u32,
    #[serde(default = "d_chain_goal")]
    pub chain_goal: usize,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            max_episodes: d_max_episodes(),
            max_steps: d_max_steps(),
            max_retries: d_max_retries(),
            max_resets: d_max_resets(),
            greedy_after_retries: d_greedy_after_retries(),
            chain_goal: d_chain_goal(),
        }
    }
}

/// Standard locations to search for config.toml.
const CONFIG_SEARCH_PATHS: &[&str] = &["config.toml", "../config.toml"];

/// Load the central configuration.
///
/// Checks `GENERATOR_CONFIG` first, then the standard search path, then
/// falls back to built-in defaults. Parse failures fall back too; loading
/// happens before tracing is initialized, so problems surface on stderr.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var("GENERATOR_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            return load_from_path(&path);
        }
        eprintln!(
            "GENERATOR_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return load_from_path(&path);
        }
    }

    CentralConfig::default()
}

fn load_from_path(path: &PathBuf) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to parse {}: {}, using defaults", path.display(), e);
                CentralConfig::default()
            }
        },
        Err(e) => {
            eprintln!("failed to read {}: {}, using defaults", path.display(), e);
            CentralConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CentralConfig::default();
        assert_eq!(config.search.rule, "uct");
        assert_eq!(config.search.num_simulations, 1000);
        assert_eq!(config.generator.chain_goal, 4);
        assert_eq!(config.common.seed, 1110);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CentralConfig = toml::from_str(
            r#"
            [search]
            rule = "puct"
            num_simulations = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.search.rule, "puct");
        assert_eq!(config.search.num_simulations, 200);
        // Untouched sections and fields keep their defaults.
        assert!((config.search.exploration - 1.4).abs() < 1e-6);
        assert_eq!(config.generator.max_retries, 30);
    }
}
