use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Outcome of a finished game from one player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl GameResult {
    /// Scalar outcome used by rollouts: +1 win, -1 loss, 0 draw.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Loss => -1.0,
            Self::Draw => 0.0,
        }
    }
}

/// The rule engine a search strategy drives.
///
/// States are values: `apply` and `handle_no_moves` hand back brand new
/// states and never touch the receiver, so the search can fan a state out to
/// several worker threads without any locking.
pub trait GameState: Clone + Send + Sync + 'static {
    type Move: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Player: Copy + Eq + Debug + Send + Sync + 'static;

    /// Side to move.
    fn current_player(&self) -> Self::Player;

    /// Legal moves for `player`. No ordering is promised; implementations
    /// may shuffle.
    fn legal_moves(&self, player: Self::Player) -> Vec<Self::Move>;

    #[must_use]
    fn apply(&self, mv: &Self::Move) -> Self;

    fn is_terminal(&self) -> bool;

    /// Successor state when the side to move has nothing to play (a forced
    /// pass). `None` means no successor exists and the game is stuck.
    fn handle_no_moves(&self) -> Option<Self>;

    /// Only meaningful once `is_terminal` holds.
    fn result_for(&self, player: Self::Player) -> GameResult;
}
