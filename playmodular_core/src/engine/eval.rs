use crate::engine::error::ConfigError;
use crate::engine::{Evaluator, LOSS_SCORE, WIN_SCORE};
use crate::logic::game::{GameResult, GameState};
use std::sync::Arc;

/// Game-agnostic heuristic: the win/loss sentinels on finished games and 0
/// everywhere else. Minimax over it plays perfectly inside its horizon and
/// indifferently beyond it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalEvaluator;

impl<G: GameState> Evaluator<G> for TerminalEvaluator {
    fn name(&self) -> &str {
        "terminal"
    }

    fn evaluate(&self, state: &G, player: G::Player) -> i32 {
        if !state.is_terminal() {
            return 0;
        }
        match state.result_for(player) {
            GameResult::Win => WIN_SCORE,
            GameResult::Loss => LOSS_SCORE,
            GameResult::Draw => 0,
        }
    }
}

/// Heuristics a strategy may switch between by name.
pub struct HeuristicRegistry<G: GameState> {
    entries: Vec<Arc<dyn Evaluator<G>>>,
}

impl<G: GameState> Clone for HeuristicRegistry<G> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<G: GameState> Default for HeuristicRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GameState> std::fmt::Debug for HeuristicRegistry<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<G: GameState> HeuristicRegistry<G> {
    /// Registry holding only [`TerminalEvaluator`].
    pub fn new() -> Self {
        Self {
            entries: vec![Arc::new(TerminalEvaluator)],
        }
    }

    /// Adds `heuristic`, replacing any entry with the same name.
    #[must_use]
    pub fn with(mut self, heuristic: Arc<dyn Evaluator<G>>) -> Self {
        self.register(heuristic);
        self
    }

    pub fn register(&mut self, heuristic: Arc<dyn Evaluator<G>>) {
        match self
            .entries
            .iter_mut()
            .find(|h| h.name() == heuristic.name())
        {
            Some(slot) => *slot = heuristic,
            None => self.entries.push(heuristic),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Evaluator<G>>, ConfigError> {
        self.entries
            .iter()
            .find(|h| h.name() == name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownHeuristic(name.to_string()))
    }

    /// Looks `name` up, or falls back to [`Self::preferred`] for `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Evaluator<G>>, ConfigError> {
        name.map_or_else(|| Ok(self.preferred()), |n| self.get(n))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|h| h.name().to_string()).collect()
    }

    /// Most recently registered heuristic.
    pub fn preferred(&self) -> Arc<dyn Evaluator<G>> {
        self.entries
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::new(TerminalEvaluator))
    }
}
