use crate::engine::config::{MinimaxConfig, MAX_DEPTH_MAX, MAX_DEPTH_MIN};
use crate::engine::error::ConfigError;
use crate::engine::eval::HeuristicRegistry;
use crate::engine::options::{
    check_int, Configurable, OptionSpec, OptionValue, OPT_HEURISTIC, OPT_MAX_DEPTH,
};
use crate::engine::{elapsed_ms, select_best, EvaluatedMove, Evaluator, SearchStats, Strategy};
use crate::logic::game::GameState;
use std::sync::Arc;
use std::time::Instant;

/// Plain depth-limited minimax. Visits every node inside the horizon.
pub struct MinimaxEngine<G: GameState> {
    config: MinimaxConfig,
    registry: HeuristicRegistry<G>,
    evaluator: Arc<dyn Evaluator<G>>,
    stats: SearchStats,
}

impl<G: GameState> MinimaxEngine<G> {
    pub fn new(config: MinimaxConfig, registry: HeuristicRegistry<G>) -> Result<Self, ConfigError> {
        config.validate()?;
        let evaluator = registry.resolve(config.heuristic.as_deref())?;
        Ok(Self {
            config,
            registry,
            evaluator,
            stats: SearchStats::default(),
        })
    }

    pub fn update_config(&mut self, config: MinimaxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.evaluator = self.registry.resolve(config.heuristic.as_deref())?;
        self.config = config;
        Ok(())
    }

    pub const fn config(&self) -> &MinimaxConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &dyn Evaluator<G> {
        self.evaluator.as_ref()
    }
}

/// Minimax value of `state` for `root`, looking `depth` plies ahead.
///
/// `maximizing` is the role of the side to move at `state`. A forced pass
/// costs a ply and flips the role; a position with neither moves nor a pass
/// is scored as it stands.
pub fn minimax<G: GameState>(
    state: &G,
    depth: u8,
    maximizing: bool,
    root: G::Player,
    evaluator: &dyn Evaluator<G>,
    nodes: &mut u64,
) -> i32 {
    *nodes += 1;

    if depth == 0 || state.is_terminal() {
        return evaluator.evaluate(state, root);
    }

    let moves = state.legal_moves(state.current_player());
    if moves.is_empty() {
        return match state.handle_no_moves() {
            Some(next) => minimax(&next, depth - 1, !maximizing, root, evaluator, nodes),
            None => evaluator.evaluate(state, root),
        };
    }

    let children = moves
        .iter()
        .map(|mv| minimax(&state.apply(mv), depth - 1, !maximizing, root, evaluator, nodes));
    if maximizing {
        children.fold(i32::MIN, i32::max)
    } else {
        children.fold(i32::MAX, i32::min)
    }
}

impl<G: GameState> Strategy<G> for MinimaxEngine<G> {
    fn choose_move(&mut self, state: &G, legal_moves: &[G::Move]) -> Option<G::Move> {
        let start = Instant::now();
        let root = state.current_player();
        let depth = self.config.max_depth.saturating_sub(1);
        let evaluator = self.evaluator.as_ref();
        let mut nodes = 1;

        let results: Vec<_> = legal_moves
            .iter()
            .map(|mv| {
                let score = minimax(&state.apply(mv), depth, false, root, evaluator, &mut nodes);
                Some(EvaluatedMove::new(mv.clone(), score))
            })
            .collect();
        let best = select_best(results);

        self.stats = SearchStats {
            depth: self.config.max_depth,
            nodes,
            time_ms: elapsed_ms(start),
            ..SearchStats::default()
        };
        if let Some(best) = &best {
            log::debug!(
                "minimax picked {:?} (score {}, {} nodes, {} ms)",
                best.mv,
                best.score,
                nodes,
                self.stats.time_ms
            );
        }
        best.map(|b| b.mv)
    }

    fn last_stats(&self) -> SearchStats {
        self.stats
    }
}

impl<G: GameState> Configurable for MinimaxEngine<G> {
    fn options(&self) -> Vec<OptionSpec> {
        vec![
            OptionSpec::integer(
                OPT_MAX_DEPTH,
                "Plies searched below the current position",
                i64::from(self.config.max_depth),
                MAX_DEPTH_MIN,
                MAX_DEPTH_MAX,
            ),
            OptionSpec::choice(
                OPT_HEURISTIC,
                "Heuristic used to score positions at the search horizon",
                self.evaluator.name(),
                self.registry.names(),
            ),
        ]
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), ConfigError> {
        match name {
            OPT_MAX_DEPTH => {
                let depth = check_int(name, value.as_int(name)?, MAX_DEPTH_MIN, MAX_DEPTH_MAX)?;
                self.config.max_depth = depth as u8;
            }
            OPT_HEURISTIC => {
                let heuristic = value.as_choice(name)?;
                self.evaluator = self.registry.get(heuristic)?;
                self.config.heuristic = Some(heuristic.to_string());
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scripted::{Script, ScriptedEvaluator, ScriptedGame, ScriptedMove, Seat};

    fn registry() -> HeuristicRegistry<ScriptedGame> {
        HeuristicRegistry::new().with(Arc::new(ScriptedEvaluator::new()))
    }

    fn engine(max_depth: u8) -> MinimaxEngine<ScriptedGame> {
        let config = MinimaxConfig {
            max_depth,
            heuristic: None,
        };
        MinimaxEngine::new(config, registry()).unwrap()
    }

    #[test]
    fn test_depth_zero_is_static_evaluation() {
        let game = ScriptedGame::new(&Script::Scored(17, vec![Script::Leaf(-4)]));
        let mut nodes = 0;
        let eval = ScriptedEvaluator::new();
        assert_eq!(minimax(&game, 0, true, Seat::First, &eval, &mut nodes), 17);
        assert_eq!(minimax(&game, 0, false, Seat::Second, &eval, &mut nodes), -17);
        assert_eq!(nodes, 2);
    }

    #[test]
    fn test_picks_best_leaf() {
        let game = ScriptedGame::new(&Script::Branch(vec![
            Script::Leaf(5),
            Script::Leaf(-3),
            Script::Leaf(2),
        ]));
        let mut engine = engine(1);
        let moves = game.legal_moves(Seat::First);
        assert_eq!(engine.choose_move(&game, &moves), Some(ScriptedMove(0)));
        assert_eq!(engine.last_stats().nodes, 4);
    }

    #[test]
    fn test_forced_pass_flips_role() {
        // After the pass the opponent moves again and will pick the -6 leaf.
        let game = ScriptedGame::new(&Script::Branch(vec![
            Script::Branch(vec![Script::Pass(Box::new(Script::Branch(vec![
                Script::Leaf(4),
                Script::Leaf(-6),
            ])))]),
            Script::Branch(vec![Script::Leaf(1)]),
        ]));
        let eval = ScriptedEvaluator::new();
        let mut nodes = 0;
        assert_eq!(minimax(&game, 4, true, Seat::First, &eval, &mut nodes), 1);

        let mut engine = engine(4);
        let moves = game.legal_moves(Seat::First);
        assert_eq!(engine.choose_move(&game, &moves), Some(ScriptedMove(1)));
    }

    #[test]
    fn test_stuck_position_is_evaluated() {
        let game = ScriptedGame::new(&Script::Branch(vec![Script::Stuck(-2), Script::Stuck(3)]));
        let mut engine = engine(5);
        let moves = game.legal_moves(Seat::First);
        assert_eq!(engine.choose_move(&game, &moves), Some(ScriptedMove(1)));
    }

    #[test]
    fn test_options() {
        let mut engine = engine(3);
        assert!(engine.set_option(OPT_MAX_DEPTH, OptionValue::Int(6)).is_ok());
        assert_eq!(engine.config().max_depth, 6);
        assert!(engine.set_option(OPT_MAX_DEPTH, OptionValue::Int(0)).is_err());
        assert!(engine
            .set_option(OPT_HEURISTIC, OptionValue::Choice("terminal".into()))
            .is_ok());
        assert_eq!(engine.evaluator().name(), "terminal");
        assert!(matches!(
            engine.set_option(OPT_HEURISTIC, OptionValue::Choice("nope".into())),
            Err(ConfigError::UnknownHeuristic(_))
        ));
        assert!(matches!(
            engine.set_option("thread_count", OptionValue::Int(2)),
            Err(ConfigError::UnknownOption(_))
        ));
        assert_eq!(engine.options().len(), 2);
    }

    #[test]
    fn test_update_config() {
        let game = ScriptedGame::new(&Script::Branch(vec![
            Script::Branch(vec![Script::Leaf(3), Script::Leaf(5)]),
            Script::Branch(vec![Script::Leaf(2), Script::Leaf(9)]),
        ]));
        let moves = game.legal_moves(Seat::First);
        let mut engine = engine(1);
        engine.choose_move(&game, &moves);
        assert_eq!(engine.last_stats().nodes, 3);

        let config = MinimaxConfig {
            max_depth: 2,
            heuristic: Some("terminal".to_string()),
        };
        engine.update_config(config.clone()).unwrap();
        assert_eq!(engine.config(), &config);
        assert_eq!(engine.evaluator().name(), "terminal");
        assert_eq!(engine.choose_move(&game, &moves), Some(ScriptedMove(0)));
        assert_eq!(engine.last_stats().nodes, 7);

        // A rejected config leaves the engine untouched.
        let too_shallow = MinimaxConfig {
            max_depth: 0,
            heuristic: None,
        };
        assert!(matches!(
            engine.update_config(too_shallow),
            Err(ConfigError::OutOfRange { .. })
        ));
        let unknown = MinimaxConfig {
            max_depth: 3,
            heuristic: Some("nope".to_string()),
        };
        assert!(matches!(
            engine.update_config(unknown),
            Err(ConfigError::UnknownHeuristic(_))
        ));
        assert_eq!(engine.config(), &config);
        assert_eq!(engine.evaluator().name(), "terminal");
    }
}
