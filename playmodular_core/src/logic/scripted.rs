//! A game whose whole tree is written out by hand.
//!
//! Useful for exercising the search strategies on positions whose minimax
//! value is known in advance. Scores are always given from the point of view
//! of [`Seat::First`], the side to move at the root.
//!
//! This is a test fixture, not a game meant for play. It stays public so the
//! integration tests can reach it, and is hidden from the rendered docs.

use crate::engine::{Evaluator, LOSS_SCORE, WIN_SCORE};
use crate::logic::game::{GameResult, GameState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Shape of a scripted game tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Terminal position. A positive score is a win for `First`, a negative
    /// one a loss, zero a draw.
    Leaf(i32),
    /// Interior position with a static score of zero.
    Branch(Vec<Script>),
    /// Interior position with an explicit static score, seen when the depth
    /// limit cuts the search off here.
    Scored(i32, Vec<Script>),
    /// Side to move has no moves and must pass into the inner position.
    Pass(Box<Script>),
    /// Side to move has no moves and no pass exists.
    Stuck(i32),
}

/// Picks the child with the given ordinal among the current position's
/// branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptedMove(pub usize);

#[derive(Debug, Clone)]
struct ScriptNode {
    score: i32,
    children: Vec<usize>,
    pass_to: Option<usize>,
    terminal: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptedGame {
    nodes: Arc<Vec<ScriptNode>>,
    at: usize,
    to_move: Seat,
}

impl ScriptedGame {
    #[must_use]
    pub fn new(script: &Script) -> Self {
        let mut nodes = Vec::new();
        flatten(script, &mut nodes);
        Self {
            nodes: Arc::new(nodes),
            at: 0,
            to_move: Seat::First,
        }
    }

    /// Static score of the current position for `First`.
    #[must_use]
    pub fn score(&self) -> i32 {
        self.node().map_or(0, |n| n.score)
    }

    /// Index of the current position in preorder, root being 0.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.at
    }

    fn node(&self) -> Option<&ScriptNode> {
        self.nodes.get(self.at)
    }

    fn moved_to(&self, at: usize) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
            at,
            to_move: self.to_move.opposite(),
        }
    }
}

fn flatten(script: &Script, nodes: &mut Vec<ScriptNode>) -> usize {
    let id = nodes.len();
    nodes.push(ScriptNode {
        score: 0,
        children: Vec::new(),
        pass_to: None,
        terminal: false,
    });

    let (score, children, pass_to, terminal) = match script {
        Script::Leaf(score) => (*score, Vec::new(), None, true),
        Script::Stuck(score) => (*score, Vec::new(), None, false),
        Script::Branch(children) => (0, flatten_all(children, nodes), None, false),
        Script::Scored(score, children) => (*score, flatten_all(children, nodes), None, false),
        Script::Pass(next) => (0, Vec::new(), Some(flatten(next, nodes)), false),
    };

    if let Some(node) = nodes.get_mut(id) {
        node.score = score;
        node.children = children;
        node.pass_to = pass_to;
        node.terminal = terminal;
    }
    id
}

fn flatten_all(children: &[Script], nodes: &mut Vec<ScriptNode>) -> Vec<usize> {
    children.iter().map(|c| flatten(c, nodes)).collect()
}

impl GameState for ScriptedGame {
    type Move = ScriptedMove;
    type Player = Seat;

    fn current_player(&self) -> Seat {
        self.to_move
    }

    fn legal_moves(&self, player: Seat) -> Vec<ScriptedMove> {
        if player != self.to_move {
            return Vec::new();
        }
        self.node()
            .map(|n| (0..n.children.len()).map(ScriptedMove).collect())
            .unwrap_or_default()
    }

    /// Unknown ordinals leave the position unchanged.
    fn apply(&self, mv: &ScriptedMove) -> Self {
        self.node()
            .and_then(|n| n.children.get(mv.0))
            .map_or_else(|| self.clone(), |&child| self.moved_to(child))
    }

    fn is_terminal(&self) -> bool {
        self.node().is_some_and(|n| n.terminal)
    }

    fn handle_no_moves(&self) -> Option<Self> {
        self.node()
            .and_then(|n| n.pass_to)
            .map(|next| self.moved_to(next))
    }

    fn result_for(&self, player: Seat) -> GameResult {
        let score = match player {
            Seat::First => self.score(),
            Seat::Second => -self.score(),
        };
        match score.signum() {
            1 => GameResult::Win,
            -1 => GameResult::Loss,
            _ => GameResult::Draw,
        }
    }
}

/// Reads the scripted score, flipped for [`Seat::Second`]. Terminal wins and
/// losses keep their scripted magnitude rather than the sentinel so tests can
/// tell leaves apart; use [`ScriptedEvaluator::with_sentinels`] to map them
/// onto `WIN_SCORE` / `LOSS_SCORE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedEvaluator {
    sentinels: bool,
}

impl ScriptedEvaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self { sentinels: false }
    }

    #[must_use]
    pub const fn with_sentinels() -> Self {
        Self { sentinels: true }
    }
}

impl Evaluator<ScriptedGame> for ScriptedEvaluator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn evaluate(&self, state: &ScriptedGame, player: Seat) -> i32 {
        if self.sentinels && state.is_terminal() {
            return match state.result_for(player) {
                GameResult::Win => WIN_SCORE,
                GameResult::Loss => LOSS_SCORE,
                GameResult::Draw => 0,
            };
        }
        match player {
            Seat::First => state.score(),
            Seat::Second => -state.score(),
        }
    }
}
