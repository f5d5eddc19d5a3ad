//! Generator - episode trace generation driver
//!
//! A batch process that:
//! 1. Builds a search tree over the configured chain environment
//! 2. Generates episodes one decision at a time, retrying dead-ended
//!    attempts by rolling the tree back to its original root
//! 3. Appends finished traces to `./data/traces.jsonl`

use anyhow::Result;
use clap::Parser;
use managers_chain::ChainManager;
use mcts::{RolloutEvaluator, SearchTree};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn};

mod central_config;
mod config;
mod episode;

use crate::config::Config;
use crate::episode::{run_episode, TraceWriter};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "tracing initialized");

    let max_episode_description = if config.max_episodes < 0 {
        "unlimited".to_string()
    } else {
        config.max_episodes.to_string()
    };
    info!(
        rule = %config.rule,
        num_simulations = config.num_simulations,
        chain_goal = config.chain_goal,
        seed = config.seed,
        max_episodes = %max_episode_description,
        "generator starting"
    );

    let search_config = config.search_config()?;
    if search_config.rule == mcts::SelectionRule::Puct {
        // The generator has no policy/value source; rollout evaluation
        // yields uniform priors, so puct selection is prior-less here.
        warn!("rule=puct without a policy/value source, priors are uniform");
    }
    let mut search = SearchTree::new(
        ChainManager::new(config.chain_goal),
        RolloutEvaluator::new(config.rollout_limit),
        search_config,
    );
    let mut writer = TraceWriter::create(&config.data_dir)?;

    let mut episode = 0u64;
    let mut solved = 0u64;
    while config.max_episodes < 0 || episode < config.max_episodes as u64 {
        // A fresh stream per episode keeps traces reproducible regardless of
        // how much randomness earlier episodes consumed.
        let mut rng = ChaCha20Rng::seed_from_u64(config.seed.wrapping_add(episode));

        let record = run_episode(&mut search, &config, episode, &mut rng)?;
        if record.success {
            solved += 1;
        }
        writer.append(&record)?;

        episode += 1;
        if episode % 10 == 0 {
            info!(episode, solved, tree_nodes = search.tree().len(), "progress");
        }
    }

    info!(episodes = episode, solved, "generator finished");
    Ok(())
}
