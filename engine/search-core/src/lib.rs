//! Core contract between the search engine and its environments
//!
//! The engine in the `mcts` crate is generic over a "state manager": the
//! domain-specific object that defines legal moves, state transitions and
//! terminal judgment. Species counterpoint managers, toy puzzles and test
//! fixtures all plug in through the same trait.

pub mod manager;

pub use manager::StateManager;
