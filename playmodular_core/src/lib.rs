//! Game-agnostic search strategies: minimax, parallel alpha-beta and Monte
//! Carlo Tree Search, driven through the [`logic::GameState`] trait.

pub mod engine;
pub mod logic;
