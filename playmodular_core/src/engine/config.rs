use crate::engine::alpha_beta::AlphaBetaEngine;
use crate::engine::error::ConfigError;
use crate::engine::eval::HeuristicRegistry;
use crate::engine::mcts::MctsEngine;
use crate::engine::minimax::MinimaxEngine;
use crate::engine::options::{
    available_threads, check_int, check_real, OPT_EXPLORATION, OPT_FINAL_MOVE, OPT_ITERATIONS,
    OPT_MAX_DEPTH, OPT_MAX_MOVES, OPT_THREAD_COUNT, OPT_WINDOW_MODE,
};
use crate::engine::random::RandomStrategy;
use crate::engine::Strategy;
use crate::logic::game::GameState;
use serde::{Deserialize, Serialize};

pub const MAX_DEPTH_MIN: i64 = 1;
pub const MAX_DEPTH_MAX: i64 = 10;
pub const ITERATIONS_MIN: i64 = 1;
pub const ITERATIONS_MAX: i64 = 10_000;
pub const EXPLORATION_MIN: f64 = 0.1;
pub const EXPLORATION_MAX: f64 = 10.0;
pub const MAX_MOVES_MIN: i64 = 10;
pub const MAX_MOVES_MAX: i64 = 1000;

/// How alpha-beta root workers bound their windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Every root move is searched with a fresh (-inf, +inf) window. Loses
    /// pruning across root moves but needs no coordination.
    #[default]
    Independent,
    /// Root workers start from the best root score published so far.
    Shared,
}

impl WindowMode {
    pub const ALL: [Self; 2] = [Self::Independent, Self::Shared];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Shared => "shared",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownChoice {
                name: OPT_WINDOW_MODE.to_string(),
                choice: name.to_string(),
            })
    }
}

/// Which root child MCTS plays once the iterations are spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalMovePolicy {
    #[default]
    HighestValue,
    MostVisits,
}

impl FinalMovePolicy {
    pub const ALL: [Self; 2] = [Self::HighestValue, Self::MostVisits];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighestValue => "highest_value",
            Self::MostVisits => "most_visits",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownChoice {
                name: OPT_FINAL_MOVE.to_string(),
                choice: name.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimaxConfig {
    pub max_depth: u8,
    /// Registered heuristic name; `None` picks the registry's preferred one.
    pub heuristic: Option<String>,
}

impl Default for MinimaxConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            heuristic: None,
        }
    }
}

impl MinimaxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_int(OPT_MAX_DEPTH, i64::from(self.max_depth), MAX_DEPTH_MIN, MAX_DEPTH_MAX)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaBetaConfig {
    pub max_depth: u8,
    pub thread_count: usize,
    pub heuristic: Option<String>,
    pub window_mode: WindowMode,
}

impl Default for AlphaBetaConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            thread_count: available_threads(),
            heuristic: None,
            window_mode: WindowMode::Independent,
        }
    }
}

impl AlphaBetaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_int(OPT_MAX_DEPTH, i64::from(self.max_depth), MAX_DEPTH_MIN, MAX_DEPTH_MAX)?;
        check_threads(self.thread_count)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    pub iteration_count: u32,
    pub exploration_constant: f64,
    /// Plies a random playout may run before it is scored as a draw.
    pub max_moves: u32,
    pub thread_count: usize,
    pub final_move_policy: FinalMovePolicy,
    /// Base seed for playouts and the fallback move. Iteration `i` plays out
    /// with a generator seeded from `seed + i`.
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iteration_count: 500,
            exploration_constant: 1.41,
            max_moves: 150,
            thread_count: available_threads(),
            final_move_policy: FinalMovePolicy::HighestValue,
            seed: None,
        }
    }
}

impl MctsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_int(
            OPT_ITERATIONS,
            i64::from(self.iteration_count),
            ITERATIONS_MIN,
            ITERATIONS_MAX,
        )?;
        check_real(
            OPT_EXPLORATION,
            self.exploration_constant,
            EXPLORATION_MIN,
            EXPLORATION_MAX,
        )?;
        check_int(
            OPT_MAX_MOVES,
            i64::from(self.max_moves),
            MAX_MOVES_MIN,
            MAX_MOVES_MAX,
        )?;
        check_threads(self.thread_count)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

/// Serialized choice of strategy plus its settings, e.g.
/// `{"strategy": "mcts", "iteration_count": 2000}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyConfig {
    Random(RandomConfig),
    Minimax(MinimaxConfig),
    AlphaBeta(AlphaBetaConfig),
    Mcts(MctsConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::AlphaBeta(AlphaBetaConfig::default())
    }
}

impl StrategyConfig {
    /// Parses and validates a config. Fields left out keep their defaults.
    pub fn load_from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Random(_) => Ok(()),
            Self::Minimax(c) => c.validate(),
            Self::AlphaBeta(c) => c.validate(),
            Self::Mcts(c) => c.validate(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Random(_) => "random",
            Self::Minimax(_) => "minimax",
            Self::AlphaBeta(_) => "alpha_beta",
            Self::Mcts(_) => "mcts",
        }
    }

    /// Builds the configured strategy, resolving its heuristic in `registry`.
    pub fn build<G: GameState>(
        &self,
        registry: &HeuristicRegistry<G>,
    ) -> Result<Box<dyn Strategy<G>>, ConfigError> {
        self.validate()?;
        let strategy: Box<dyn Strategy<G>> = match self {
            Self::Random(c) => Box::new(RandomStrategy::new(c.seed)),
            Self::Minimax(c) => Box::new(MinimaxEngine::new(c.clone(), registry.clone())?),
            Self::AlphaBeta(c) => Box::new(AlphaBetaEngine::new(c.clone(), registry.clone())?),
            Self::Mcts(c) => Box::new(MctsEngine::new(c.clone())?),
        };
        log::debug!("built {} strategy", self.name());
        Ok(strategy)
    }
}

#[allow(clippy::cast_possible_wrap)]
pub fn check_threads(threads: usize) -> Result<usize, ConfigError> {
    let max = available_threads() as i64;
    check_int(OPT_THREAD_COUNT, threads as i64, 1, max)?;
    Ok(threads)
}
