use crate::logic::game::GameState;
use serde::{Deserialize, Serialize};

pub mod alpha_beta;
pub mod config;
pub mod error;
pub mod eval;
pub mod mcts;
pub mod minimax;
pub mod options;
pub mod pool;
pub mod random;


pub use config::StrategyConfig;
pub use error::{ConfigError, SearchError};
pub use options::{Configurable, OptionKind, OptionSpec, OptionValue};

/// Score of a forced win. Half the integer range so it negates safely.
pub const WIN_SCORE: i32 = i32::MAX / 2;
/// Score of a forced loss.
pub const LOSS_SCORE: i32 = i32::MIN / 2;

/// Scores a position for `player`; larger is better for that player.
pub trait Evaluator<G: GameState>: Send + Sync {
    /// Name the heuristic is registered and selected under.
    fn name(&self) -> &str;

    fn evaluate(&self, state: &G, player: G::Player) -> i32;
}

/// Something that picks a move for the side to move.
pub trait Strategy<G: GameState>: Send {
    /// Returns `None` only when `legal_moves` is empty.
    fn choose_move(&mut self, state: &G, legal_moves: &[G::Move]) -> Option<G::Move>;

    /// Statistics of the most recent decision.
    fn last_stats(&self) -> SearchStats {
        SearchStats::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u64,
    pub iterations: u32,
    pub failed_tasks: u32,
    pub time_ms: u64,
}

/// A root move together with the score its worker produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedMove<M> {
    pub mv: M,
    pub score: i32,
    /// `false` when the worker cut off against a bound shared with other
    /// root workers, so `score` is only an upper bound on the true value.
    pub exact: bool,
}

impl<M> EvaluatedMove<M> {
    pub const fn new(mv: M, score: i32) -> Self {
        Self {
            mv,
            score,
            exact: true,
        }
    }

    /// Whether `self` should replace `best` when scanning in move order.
    fn beats(&self, best: &Self) -> bool {
        self.score > best.score || (self.score == best.score && self.exact && !best.exact)
    }
}

/// Picks the best of the surviving root results, scanning in root move order
/// so that ties go to the earlier move no matter which worker finished first.
pub fn select_best<M>(results: impl IntoIterator<Item = Option<EvaluatedMove<M>>>) -> Option<EvaluatedMove<M>> {
    results.into_iter().flatten().fold(None, |best, candidate| match best {
        Some(b) if !candidate.beats(&b) => Some(b),
        _ => Some(candidate),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
