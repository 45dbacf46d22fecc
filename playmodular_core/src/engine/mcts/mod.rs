//! Monte Carlo Tree Search over a tree shared by all worker threads.
//!
//! Every iteration runs select, expand, simulate and backpropagate against
//! the same [`SearchTree`]. Iterations do not apply virtual loss, so workers
//! descending at the same moment may pick the same path; the tree only
//! promises that statistics stay consistent and that no node expands twice.

pub mod node;

use crate::engine::config::{
    check_threads, FinalMovePolicy, MctsConfig, EXPLORATION_MAX, EXPLORATION_MIN, ITERATIONS_MAX,
    ITERATIONS_MIN, MAX_MOVES_MAX, MAX_MOVES_MIN,
};
use crate::engine::error::{ConfigError, SearchError};
use crate::engine::options::{
    available_threads, check_int, check_real, Configurable, OptionSpec, OptionValue,
    OPT_EXPLORATION, OPT_FINAL_MOVE, OPT_ITERATIONS, OPT_MAX_MOVES, OPT_THREAD_COUNT,
};
use crate::engine::pool::WorkerPool;
use crate::engine::{elapsed_ms, SearchStats, Strategy};
use crate::logic::game::GameState;
use node::{NodeId, NodeStats, SearchTree};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::marker::PhantomData;
use std::time::Instant;

pub struct MctsEngine<G: GameState> {
    config: MctsConfig,
    pool: WorkerPool,
    /// Drives the fallback move when the root could not be expanded.
    rng: StdRng,
    stats: SearchStats,
    game: PhantomData<fn() -> G>,
}

fn seeded(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

impl<G: GameState> MctsEngine<G> {
    pub fn new(config: MctsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::new(config.thread_count)?;
        let rng = seeded(config.seed);
        Ok(Self {
            config,
            pool,
            rng,
            stats: SearchStats::default(),
            game: PhantomData,
        })
    }

    pub fn update_config(&mut self, config: MctsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.pool.resize(config.thread_count)?;
        if config.seed != self.config.seed {
            self.rng = seeded(config.seed);
        }
        self.config = config;
        Ok(())
    }

    pub const fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Grows a fresh tree rooted at `state` and returns it together with the
    /// number of iterations that failed.
    pub fn search(&self, state: &G, legal_moves: &[G::Move]) -> (SearchTree<G>, u32) {
        let tree = SearchTree::new(state.clone(), legal_moves.to_vec());
        let root_player = state.current_player();
        let exploration = self.config.exploration_constant;
        let max_moves = self.config.max_moves;
        let seed = self.config.seed;

        let results = self
            .pool
            .run_each(self.config.iteration_count as usize, |i| {
                let mut rng = seed.map_or_else(StdRng::from_entropy, |s| {
                    StdRng::seed_from_u64(s.wrapping_add(i as u64))
                });
                run_iteration(&tree, root_player, exploration, max_moves, &mut rng)
            });

        let mut failed = 0;
        for (i, result) in results.into_iter().enumerate() {
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) | Err(e) => e,
            };
            failed += 1;
            log::warn!("mcts iteration {i} skipped: {error}");
        }
        (tree, failed)
    }

    fn pick<M: Clone>(&self, children: &[(M, NodeStats)]) -> Option<M> {
        let key = |stats: &NodeStats| match self.config.final_move_policy {
            FinalMovePolicy::HighestValue => stats.value,
            FinalMovePolicy::MostVisits => f64::from(stats.visits),
        };
        let mut best: Option<(&M, f64)> = None;
        for (mv, stats) in children {
            let score = key(stats);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((mv, score));
            }
        }
        best.map(|(mv, _)| mv.clone())
    }
}

/// One select, expand, simulate, backpropagate pass.
fn run_iteration<G: GameState, R: Rng>(
    tree: &SearchTree<G>,
    root_player: G::Player,
    exploration: f64,
    max_moves: u32,
    rng: &mut R,
) -> Result<(), SearchError> {
    let selected = tree.select(exploration)?;
    tree.expand(selected)?;
    let leaf = tree.best_child(selected, exploration)?.unwrap_or(selected);
    let outcome = simulate(tree.get(leaf)?.state(), root_player, max_moves, rng);
    log::trace!("mcts: selected {selected:?}, simulated {leaf:?}, outcome {outcome}");
    tree.backpropagate(leaf, outcome, root_player)
}

/// Plays uniformly random moves from `state` and scores the end position for
/// `root_player`: +1 win, -1 loss, 0 for a draw, a stuck position or running
/// out of `max_moves` plies.
pub fn simulate<G: GameState, R: Rng>(state: &G, root_player: G::Player, max_moves: u32, rng: &mut R) -> f64 {
    let mut game = state.clone();
    for _ in 0..max_moves {
        if game.is_terminal() {
            break;
        }
        let moves = game.legal_moves(game.current_player());
        game = match moves.choose(rng) {
            Some(mv) => game.apply(mv),
            None => match game.handle_no_moves() {
                Some(next) => next,
                None => break,
            },
        };
    }

    if game.is_terminal() {
        game.result_for(root_player).sign()
    } else {
        0.0
    }
}

impl<G: GameState> Strategy<G> for MctsEngine<G> {
    fn choose_move(&mut self, state: &G, legal_moves: &[G::Move]) -> Option<G::Move> {
        if legal_moves.is_empty() {
            return None;
        }
        let start = Instant::now();
        let (tree, failed) = self.search(state, legal_moves);

        let children = tree.root_children().unwrap_or_else(|e| {
            log::warn!("mcts root unreadable: {e}");
            Vec::new()
        });
        let best = match self.pick(&children) {
            Some(mv) => mv,
            None => {
                log::debug!("mcts root has no children, playing a random move");
                legal_moves.choose(&mut self.rng).cloned()?
            }
        };

        let root_visits = tree.get(NodeId::ROOT).map_or(0, |n| n.stats().visits);
        self.stats = SearchStats {
            nodes: tree.len() as u64,
            iterations: root_visits,
            failed_tasks: failed,
            time_ms: elapsed_ms(start),
            ..SearchStats::default()
        };
        log::debug!(
            "mcts picked {:?} ({} iterations, {} nodes, {} ms)",
            best,
            root_visits,
            self.stats.nodes,
            self.stats.time_ms
        );
        Some(best)
    }

    fn last_stats(&self) -> SearchStats {
        self.stats
    }
}

impl<G: GameState> Configurable for MctsEngine<G> {
    #[allow(clippy::cast_possible_wrap)]
    fn options(&self) -> Vec<OptionSpec> {
        vec![
            OptionSpec::integer(
                OPT_MAX_MOVES,
                "Plies simulated before a playout counts as a draw",
                i64::from(self.config.max_moves),
                MAX_MOVES_MIN,
                MAX_MOVES_MAX,
            ),
            OptionSpec::real(
                OPT_EXPLORATION,
                "Exploration (high) versus exploitation (low); sqrt(2) is the usual value",
                self.config.exploration_constant,
                EXPLORATION_MIN,
                EXPLORATION_MAX,
            ),
            OptionSpec::integer(
                OPT_ITERATIONS,
                "Simulations run for each move",
                i64::from(self.config.iteration_count),
                ITERATIONS_MIN,
                ITERATIONS_MAX,
            ),
            OptionSpec::integer(
                OPT_THREAD_COUNT,
                "Worker threads running iterations",
                self.config.thread_count as i64,
                1,
                available_threads() as i64,
            ),
            OptionSpec::choice(
                OPT_FINAL_MOVE,
                "Root child played once the iterations are spent",
                self.config.final_move_policy.as_str(),
                FinalMovePolicy::ALL.iter().map(|p| p.as_str().to_string()).collect(),
            ),
        ]
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), ConfigError> {
        match name {
            OPT_MAX_MOVES => {
                let moves = check_int(name, value.as_int(name)?, MAX_MOVES_MIN, MAX_MOVES_MAX)?;
                self.config.max_moves = moves as u32;
            }
            OPT_EXPLORATION => {
                self.config.exploration_constant =
                    check_real(name, value.as_real(name)?, EXPLORATION_MIN, EXPLORATION_MAX)?;
            }
            OPT_ITERATIONS => {
                let iterations = check_int(name, value.as_int(name)?, ITERATIONS_MIN, ITERATIONS_MAX)?;
                self.config.iteration_count = iterations as u32;
            }
            OPT_THREAD_COUNT => {
                let requested = value.as_int(name)?;
                let threads = check_threads(usize::try_from(requested).unwrap_or(0))?;
                self.pool.resize(threads)?;
                self.config.thread_count = threads;
            }
            OPT_FINAL_MOVE => {
                self.config.final_move_policy = FinalMovePolicy::parse(value.as_choice(name)?)?;
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::game::GameResult;
    use crate::logic::scripted::{Script, ScriptedGame, ScriptedMove, Seat};
    use crate::logic::tictactoe::{Cell, Mark, TicTacToe};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn engine<G: GameState>(iteration_count: u32, thread_count: usize) -> MctsEngine<G> {
        MctsEngine::new(MctsConfig {
            iteration_count,
            thread_count,
            seed: Some(7),
            ..MctsConfig::default()
        })
        .unwrap()
    }

    fn three_leaves() -> ScriptedGame {
        ScriptedGame::new(&Script::Branch(vec![
            Script::Leaf(5),
            Script::Leaf(-3),
            Script::Leaf(2),
        ]))
    }

    /// Scripted game whose first `apply` panics, shared by every clone.
    #[derive(Debug, Clone)]
    struct FlakyGame {
        inner: ScriptedGame,
        armed: Arc<AtomicBool>,
    }

    impl GameState for FlakyGame {
        type Move = ScriptedMove;
        type Player = Seat;

        fn current_player(&self) -> Seat {
            self.inner.current_player()
        }

        fn legal_moves(&self, player: Seat) -> Vec<ScriptedMove> {
            self.inner.legal_moves(player)
        }

        fn apply(&self, mv: &ScriptedMove) -> Self {
            assert!(!self.armed.swap(false, Ordering::SeqCst), "apply failed");
            Self {
                inner: self.inner.apply(mv),
                armed: Arc::clone(&self.armed),
            }
        }

        fn is_terminal(&self) -> bool {
            self.inner.is_terminal()
        }

        fn handle_no_moves(&self) -> Option<Self> {
            self.inner.handle_no_moves().map(|inner| Self {
                inner,
                armed: Arc::clone(&self.armed),
            })
        }

        fn result_for(&self, player: Seat) -> GameResult {
            self.inner.result_for(player)
        }
    }

    #[test]
    fn test_single_iteration_scores_fresh_child() {
        let game = three_leaves();
        let moves = game.legal_moves(Seat::First);
        let (tree, failed) = engine::<ScriptedGame>(1, 1).search(&game, &moves);
        assert_eq!(failed, 0);
        assert_eq!(tree.len(), 4);

        let children = tree.root_children().unwrap();
        let (mv, stats) = &children[0];
        assert_eq!(*mv, ScriptedMove(0));
        assert_eq!(stats.visits, 1);
        assert!((stats.value - 1.0).abs() < f64::EPSILON);
        assert_eq!(children[1].1, NodeStats::default());

        let root = tree.get(NodeId::ROOT).unwrap().stats();
        assert_eq!(root.visits, 1);
        assert!((root.value - -1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unvisited_children_tried_first() {
        let game = three_leaves();
        let moves = game.legal_moves(Seat::First);
        let (tree, _) = engine::<ScriptedGame>(3, 1).search(&game, &moves);
        let children = tree.root_children().unwrap();
        assert!(children.iter().all(|(_, stats)| stats.visits == 1));
        let values: Vec<f64> = children.iter().map(|(_, s)| s.value).collect();
        assert_eq!(values, vec![1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_zero_iterations_falls_back() {
        let game = three_leaves();
        let moves = game.legal_moves(Seat::First);
        let mut engine = engine::<ScriptedGame>(1, 1);
        engine.config.iteration_count = 0;
        let mv = engine.choose_move(&game, &moves).unwrap();
        assert!(moves.contains(&mv));
        assert_eq!(engine.last_stats().iterations, 0);
    }

    #[test]
    fn test_failed_expansion_keeps_moves() {
        let game = FlakyGame {
            inner: three_leaves(),
            armed: Arc::new(AtomicBool::new(true)),
        };
        let moves = game.legal_moves(Seat::First);
        let mut engine = engine::<FlakyGame>(200, 1);

        let (tree, failed) = engine.search(&game, &moves);
        assert_eq!(failed, 1);
        let root = tree.get(NodeId::ROOT).unwrap();
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.untried_count(), 0);
        assert_eq!(root.stats().visits, 199);

        game.armed.store(true, Ordering::SeqCst);
        let mv = engine.choose_move(&game, &moves).unwrap();
        assert_ne!(mv, ScriptedMove(1));
        assert_eq!(engine.last_stats().failed_tasks, 1);
        assert_eq!(engine.last_stats().nodes, 4);
    }

    #[test]
    fn test_empty_moves() {
        let mut engine = engine::<TicTacToe>(10, 1);
        assert_eq!(engine.choose_move(&TicTacToe::new(), &[]), None);
    }

    #[test]
    fn test_concurrent_iterations_count_every_visit() {
        let game = TicTacToe::new();
        let moves = game.legal_moves(Mark::X);
        let threads = available_threads().min(4);
        let (tree, failed) = engine::<TicTacToe>(400, threads).search(&game, &moves);
        assert_eq!(failed, 0);

        let root = tree.get(NodeId::ROOT).unwrap().stats();
        assert_eq!(root.visits, 400);
        let children = tree.root_children().unwrap();
        assert_eq!(children.len(), 9);
        let child_visits: u32 = children.iter().map(|(_, s)| s.visits).sum();
        assert_eq!(child_visits, 400);
    }

    #[test]
    fn test_takes_immediate_win() {
        let game = TicTacToe::from_layout("XX.OO....", Mark::X).unwrap();
        let moves = game.legal_moves(Mark::X);
        for policy in FinalMovePolicy::ALL {
            let mut engine = engine::<TicTacToe>(2000, available_threads().min(2));
            engine.config.final_move_policy = policy;
            assert_eq!(engine.choose_move(&game, &moves), Some(Cell(2)), "{policy:?}");
        }
    }

    #[test]
    fn test_simulate_respects_max_moves() {
        // Cut off before the leaf: scored as a draw.
        let game = ScriptedGame::new(&Script::Pass(Box::new(Script::Pass(Box::new(
            Script::Leaf(4),
        )))));
        let mut rng = StdRng::seed_from_u64(1);
        assert!((simulate(&game, Seat::First, 1, &mut rng)).abs() < f64::EPSILON);
        assert!((simulate(&game, Seat::First, 10, &mut rng) - 1.0).abs() < f64::EPSILON);
        let stuck = ScriptedGame::new(&Script::Stuck(9));
        assert!((simulate(&stuck, Seat::First, 10, &mut rng)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_options() {
        let mut engine = engine::<ScriptedGame>(10, 1);
        engine
            .set_option(OPT_EXPLORATION, OptionValue::Int(2))
            .unwrap();
        assert!((engine.config().exploration_constant - 2.0).abs() < f64::EPSILON);
        assert!(engine
            .set_option(OPT_EXPLORATION, OptionValue::Real(0.05))
            .is_err());
        assert!(engine.set_option(OPT_ITERATIONS, OptionValue::Int(0)).is_err());
        assert!(engine.set_option(OPT_MAX_MOVES, OptionValue::Int(9)).is_err());
        engine
            .set_option(OPT_FINAL_MOVE, OptionValue::Choice("most_visits".into()))
            .unwrap();
        assert_eq!(engine.config().final_move_policy, FinalMovePolicy::MostVisits);
        assert!(matches!(
            engine.set_option("max_depth", OptionValue::Int(3)),
            Err(ConfigError::UnknownOption(_))
        ));
        assert_eq!(engine.options().len(), 5);
    }

    #[test]
    fn test_thread_count_rebuilds_pool() {
        let mut engine = engine::<ScriptedGame>(10, 1);
        assert_eq!(engine.pool().threads(), 1);
        let max = available_threads();
        engine
            .set_option(OPT_THREAD_COUNT, OptionValue::Int(i64::try_from(max).unwrap()))
            .unwrap();
        assert_eq!(engine.pool().threads(), max);
        assert_eq!(engine.config().thread_count, max);
        assert!(engine
            .set_option(OPT_THREAD_COUNT, OptionValue::Int(i64::try_from(max + 1).unwrap()))
            .is_err());
        assert!(engine.set_option(OPT_THREAD_COUNT, OptionValue::Int(-1)).is_err());
        assert_eq!(engine.pool().threads(), max);

        // Searches still run on the rebuilt pool.
        let game = three_leaves();
        let moves = game.legal_moves(Seat::First);
        let (tree, failed) = engine.search(&game, &moves);
        assert_eq!(failed, 0);
        assert_eq!(tree.get(NodeId::ROOT).unwrap().stats().visits, 10);
    }

    #[test]
    fn test_update_config() {
        let mut engine = engine::<ScriptedGame>(10, 1);
        let config = MctsConfig {
            iteration_count: 25,
            thread_count: available_threads(),
            final_move_policy: FinalMovePolicy::MostVisits,
            seed: Some(1),
            ..MctsConfig::default()
        };
        engine.update_config(config.clone()).unwrap();
        assert_eq!(engine.config(), &config);
        assert_eq!(engine.pool().threads(), available_threads());

        let rejected = MctsConfig {
            max_moves: 5,
            ..config.clone()
        };
        assert!(matches!(
            engine.update_config(rejected),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert_eq!(engine.config(), &config);
        assert_eq!(engine.pool().threads(), available_threads());

        let game = three_leaves();
        let moves = game.legal_moves(Seat::First);
        engine.choose_move(&game, &moves);
        assert_eq!(engine.last_stats().iterations, 25);
    }
}
