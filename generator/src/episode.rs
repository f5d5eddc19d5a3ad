//! Episode driver: turns per-decision searches into complete action traces.
//!
//! An episode repeatedly asks the search tree for one action, commits it and
//! steps the real state. Attempts that dead-end or blow the step cap are
//! rolled back to the original root and retried with everything the search
//! already learned intact; after too many retries the tree is reset, and
//! after too many resets the episode is recorded as a failure.

use anyhow::{Context, Result};
use managers_chain::ChainManager;
use mcts::{RolloutEvaluator, SearchTree};
use rand_chacha::ChaCha20Rng;
use search_core::StateManager;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;

/// One finished episode, serialized as a JSONL line.
#[derive(Debug, Serialize)]
pub struct EpisodeRecord {
    pub episode: u64,
    pub actions: Vec<usize>,
    pub steps: u32,
    pub retries: u32,
    pub resets: u32,
    pub success: bool,
}

/// How a single attempt within an episode ended.
enum Attempt {
    Solved(Vec<usize>),
    DeadEnd { steps: u32 },
    StepCap,
}

pub fn run_episode(
    search: &mut SearchTree<ChainManager, RolloutEvaluator>,
    config: &Config,
    episode: u64,
    rng: &mut ChaCha20Rng,
) -> Result<EpisodeRecord> {
    let mut retries = 0u32;
    let mut resets = 0u32;

    loop {
        let attempt = run_attempt(search, config, retries, rng)?;
        // Whatever happened, restore the original root so the next attempt
        // (or the next episode) starts from the initial decision again.
        search.rollback_all();

        match attempt {
            Attempt::Solved(actions) => {
                let steps = actions.len() as u32;
                info!(episode, steps, retries, resets, "episode solved");
                return Ok(EpisodeRecord {
                    episode,
                    actions,
                    steps,
                    retries,
                    resets,
                    success: true,
                });
            }
            Attempt::DeadEnd { steps } => {
                debug!(episode, steps, retries, "attempt dead-ended, retrying");
            }
            Attempt::StepCap => {
                debug!(episode, retries, "attempt hit the step cap, retrying");
            }
        }

        retries += 1;
        if retries > config.max_retries {
            resets += 1;
            if resets > config.max_resets {
                warn!(episode, retries, resets, "episode abandoned");
                return Ok(EpisodeRecord {
                    episode,
                    actions: Vec::new(),
                    steps: 0,
                    retries,
                    resets,
                    success: false,
                });
            }
            warn!(episode, resets, "retry budget exhausted, resetting tree");
            search.reset();
            retries = 0;
        }
    }
}

/// Drive one attempt from the initial state to a terminal, a dead end, or
/// the step cap. Committed advances are left in place for the caller to
/// roll back.
fn run_attempt(
    search: &mut SearchTree<ChainManager, RolloutEvaluator>,
    config: &Config,
    retries: u32,
    rng: &mut ChaCha20Rng,
) -> Result<Attempt> {
    let mut state = search.manager().initial_state();
    let mut actions = Vec::new();

    // Stubborn attempts stop sampling and take the most-visited action
    // outright.
    let greedy = retries >= config.greedy_after_retries;

    for step in 0..config.max_steps {
        let decision = if greedy {
            search.most_visited_action(&state, rng)?
        } else {
            search
                .sample_action(&state, config.temperature, true, rng)?
                .map(|(action, _)| action)
        };

        let Some(action) = decision else {
            return Ok(Attempt::DeadEnd { steps: step });
        };

        search.commit_action(action)?;
        state = search.manager().next_state(&state, action);
        actions.push(action);

        let (outcome, over) = search.manager().is_finished(&state);
        if over {
            debug!(steps = actions.len(), outcome, greedy, "attempt finished");
            return if outcome > 0.0 {
                Ok(Attempt::Solved(actions))
            } else {
                Ok(Attempt::DeadEnd {
                    steps: actions.len() as u32,
                })
            };
        }
    }

    Ok(Attempt::StepCap)
}

/// Appends episode records to `traces.jsonl` under the data directory.
pub struct TraceWriter {
    writer: BufWriter<File>,
}

impl TraceWriter {
    pub fn create(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join("traces.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, record: &EpisodeRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        // One line per episode so partial runs still leave usable data.
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mcts::SearchConfig;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn test_config() -> Config {
        let mut config = Config::parse_from(["generator"]);
        config.num_simulations = 100;
        config.max_steps = 16;
        config.max_retries = 5;
        config.max_resets = 1;
        // Greedy from the first attempt keeps the trace deterministic.
        config.greedy_after_retries = 0;
        config
    }

    fn test_search(goal: usize) -> SearchTree<ChainManager, RolloutEvaluator> {
        SearchTree::new(
            ChainManager::new(goal),
            RolloutEvaluator::default(),
            SearchConfig::uct().with_simulations(300).with_exploration(1.0),
        )
    }

    #[test]
    fn test_episode_solves_chain() {
        // Shortest-path-shaped rollouts make the advancing action's mean
        // value dominate, so the greedy trace is exactly the in-order
        // sequence, never a detour that happens to reach the goal.
        let mut search = test_search(2);
        let config = test_config();
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        let record = run_episode(&mut search, &config, 0, &mut rng).unwrap();

        assert!(record.success);
        assert_eq!(record.actions, vec![0, 1]);
        assert_eq!(record.steps, 2);
    }

    #[test]
    fn test_episode_leaves_tree_at_original_root() {
        let mut search = test_search(2);
        let config = test_config();
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        run_episode(&mut search, &config, 0, &mut rng).unwrap();

        assert_eq!(search.tree().pending_advances(), 0);
        // A second episode on the same tree still works.
        let record = run_episode(&mut search, &config, 1, &mut rng).unwrap();
        assert!(record.success);
    }

    #[test]
    fn test_trace_writer_appends_jsonl() {
        let dir = tempdir().unwrap();
        let mut writer = TraceWriter::create(dir.path()).unwrap();

        for episode in 0..2 {
            writer
                .append(&EpisodeRecord {
                    episode,
                    actions: vec![0, 1],
                    steps: 2,
                    retries: 0,
                    resets: 0,
                    success: true,
                })
                .unwrap();
        }
        drop(writer);

        let content = std::fs::read_to_string(dir.path().join("traces.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["episode"], 0);
        assert_eq!(first["actions"], serde_json::json!([0, 1]));
        assert_eq!(first["success"], true);
    }
}
