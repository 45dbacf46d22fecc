use anyhow::{bail, Context, Result};
use playmodular_core::engine::eval::HeuristicRegistry;
use playmodular_core::engine::{Strategy, StrategyConfig};
use playmodular_core::logic::tictactoe::{LineHeuristic, Mark, TicTacToe};
use playmodular_core::logic::GameState;
use std::path::Path;
use std::sync::Arc;

/// Seat in a match. Red moves first unless the seats are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Red,
    Black,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub red_wins: usize,
    pub black_wins: usize,
    pub draws: usize,
}

impl MatchSummary {
    fn record(&mut self, winner: Option<Side>) {
        match winner {
            Some(Side::Red) => self.red_wins += 1,
            Some(Side::Black) => self.black_wins += 1,
            None => self.draws += 1,
        }
    }
}

pub fn registry() -> HeuristicRegistry<TicTacToe> {
    HeuristicRegistry::new().with(Arc::new(LineHeuristic))
}

/// Reads a strategy config, or the default one when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<StrategyConfig> {
    let Some(path) = path else {
        return Ok(StrategyConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    StrategyConfig::load_from_json(&json)
        .with_context(|| format!("invalid strategy config {}", path.display()))
}

/// Plays one game to the end and returns the winning mark, `None` on a draw.
pub fn play_game(
    x: &mut dyn Strategy<TicTacToe>,
    o: &mut dyn Strategy<TicTacToe>,
) -> Result<Option<Mark>> {
    let mut state = TicTacToe::new();
    while !state.is_terminal() {
        let mark = state.current_player();
        let moves = state.legal_moves(mark);
        if moves.is_empty() {
            match state.handle_no_moves() {
                Some(next) => {
                    state = next;
                    continue;
                }
                None => break,
            }
        }

        let (chosen, nodes) = match mark {
            Mark::X => (x.choose_move(&state, &moves), x.last_stats().nodes),
            Mark::O => (o.choose_move(&state, &moves), o.last_stats().nodes),
        };
        let Some(mv) = chosen else {
            bail!("{mark:?} returned no move with {} legal moves", moves.len());
        };
        tracing::debug!(mark = ?mark, cell = mv.0, nodes, "Move played");
        state = state.apply(&mv);
    }
    Ok(state.winner())
}

/// Plays `games` games between the two configured strategies. With `swap`
/// the sides alternate who moves first.
pub fn run_match(
    red: &StrategyConfig,
    black: &StrategyConfig,
    games: usize,
    swap: bool,
) -> Result<MatchSummary> {
    let registry = registry();
    let mut red_strategy = red.build(&registry).context("cannot build red strategy")?;
    let mut black_strategy = black.build(&registry).context("cannot build black strategy")?;

    tracing::info!(red = red.name(), black = black.name(), games, "Starting match");
    let mut summary = MatchSummary::default();
    for game in 1..=games {
        let red_first = !swap || game % 2 == 1;
        let winner = if red_first {
            play_game(red_strategy.as_mut(), black_strategy.as_mut())?.map(|m| match m {
                Mark::X => Side::Red,
                Mark::O => Side::Black,
            })
        } else {
            play_game(black_strategy.as_mut(), red_strategy.as_mut())?.map(|m| match m {
                Mark::X => Side::Black,
                Mark::O => Side::Red,
            })
        };
        tracing::info!(game, red_first, winner = ?winner, "Game finished");
        summary.record(winner);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmodular_core::engine::config::{AlphaBetaConfig, RandomConfig};

    fn perfect() -> StrategyConfig {
        StrategyConfig::AlphaBeta(AlphaBetaConfig {
            max_depth: 9,
            thread_count: 1,
            ..AlphaBetaConfig::default()
        })
    }

    #[test]
    fn test_perfect_play_draws() {
        let summary = run_match(&perfect(), &perfect(), 1, false).unwrap();
        assert_eq!(summary.draws, 1);
    }

    #[test]
    fn test_perfect_play_never_loses_to_random() {
        let random = StrategyConfig::Random(RandomConfig { seed: Some(11) });
        let summary = run_match(&perfect(), &random, 4, true).unwrap();
        assert_eq!(summary.black_wins, 0);
        assert_eq!(summary.red_wins + summary.draws, 4);
    }

    #[test]
    fn test_play_game_hands_each_mark_its_own_strategy() {
        let registry = registry();
        let mut x = perfect().build(&registry).unwrap();
        let mut o = StrategyConfig::Random(RandomConfig { seed: Some(2) })
            .build(&registry)
            .unwrap();
        let winner = play_game(x.as_mut(), o.as_mut()).unwrap();
        assert_ne!(winner, Some(Mark::O));
        // Only the searching side reports explored nodes.
        assert!(x.last_stats().nodes > 0);
        assert_eq!(o.last_stats().nodes, 0);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("does/not/exist.json"))).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
        assert_eq!(load_config(None).unwrap().name(), "alpha_beta");
    }
}
