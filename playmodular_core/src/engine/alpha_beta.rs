use crate::engine::config::{check_threads, AlphaBetaConfig, WindowMode, MAX_DEPTH_MAX, MAX_DEPTH_MIN};
use crate::engine::error::ConfigError;
use crate::engine::eval::HeuristicRegistry;
use crate::engine::options::{
    available_threads, check_int, Configurable, OptionSpec, OptionValue, OPT_HEURISTIC,
    OPT_MAX_DEPTH, OPT_THREAD_COUNT, OPT_WINDOW_MODE,
};
use crate::engine::pool::WorkerPool;
use crate::engine::{elapsed_ms, select_best, EvaluatedMove, Evaluator, SearchStats, Strategy};
use crate::logic::game::GameState;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Minimax with alpha-beta pruning, parallel over the root moves.
///
/// Each root move is one task on the worker pool. In
/// [`WindowMode::Independent`] every task searches with its own
/// `(-inf, +inf)` window, so a cutoff found under one root move never helps
/// another; that trades pruning for root throughput. [`WindowMode::Shared`]
/// lets tasks start from the best root score published so far.
pub struct AlphaBetaEngine<G: GameState> {
    config: AlphaBetaConfig,
    registry: HeuristicRegistry<G>,
    evaluator: Arc<dyn Evaluator<G>>,
    pool: WorkerPool,
    stats: SearchStats,
}

impl<G: GameState> AlphaBetaEngine<G> {
    pub fn new(config: AlphaBetaConfig, registry: HeuristicRegistry<G>) -> Result<Self, ConfigError> {
        config.validate()?;
        let evaluator = registry.resolve(config.heuristic.as_deref())?;
        let pool = WorkerPool::new(config.thread_count)?;
        Ok(Self {
            config,
            registry,
            evaluator,
            pool,
            stats: SearchStats::default(),
        })
    }

    pub fn update_config(&mut self, config: AlphaBetaConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.evaluator = self.registry.resolve(config.heuristic.as_deref())?;
        self.pool.resize(config.thread_count)?;
        self.config = config;
        Ok(())
    }

    pub const fn config(&self) -> &AlphaBetaConfig {
        &self.config
    }

    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// Alpha-beta value of `state` for `root` inside the `(alpha, beta)` window.
///
/// Returns the exact minimax value when it lies strictly inside the window.
/// Otherwise the result is a bound on the far side of the window edge it
/// crossed.
#[allow(clippy::too_many_arguments)]
pub fn alpha_beta<G: GameState>(
    state: &G,
    mut alpha: i32,
    mut beta: i32,
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
            Some(next) => alpha_beta(
                &next,
                alpha,
                beta,
                depth - 1,
                !maximizing,
                root,
                evaluator,
                nodes,
            ),
            None => evaluator.evaluate(state, root),
        };
    }

    let mut best = if maximizing { i32::MIN } else { i32::MAX };
    for mv in &moves {
        let value = alpha_beta(
            &state.apply(mv),
            alpha,
            beta,
            depth - 1,
            !maximizing,
            root,
            evaluator,
            nodes,
        );

        if maximizing {
            best = best.max(value);
            alpha = alpha.max(value);
        } else {
            best = best.min(value);
            beta = beta.min(value);
        }
        if beta <= alpha {
            break;
        }
    }
    best
}

impl<G: GameState> Strategy<G> for AlphaBetaEngine<G> {
    fn choose_move(&mut self, state: &G, legal_moves: &[G::Move]) -> Option<G::Move> {
        let start = Instant::now();
        let root = state.current_player();
        let depth = self.config.max_depth.saturating_sub(1);
        let mode = self.config.window_mode;
        let evaluator = self.evaluator.as_ref();
        let shared_alpha = AtomicI32::new(i32::MIN);

        let tasks: Vec<_> = legal_moves
            .iter()
            .map(|mv| {
                let child = state.apply(mv);
                let shared_alpha = &shared_alpha;
                move || {
                    let alpha = match mode {
                        WindowMode::Independent => i32::MIN,
                        WindowMode::Shared => shared_alpha.load(Ordering::Acquire),
                    };
                    let mut nodes = 0;
                    let score =
                        alpha_beta(&child, alpha, i32::MAX, depth, false, root, evaluator, &mut nodes);
                    if mode == WindowMode::Shared {
                        shared_alpha.fetch_max(score, Ordering::AcqRel);
                    }
                    let evaluated = EvaluatedMove {
                        mv: mv.clone(),
                        score,
                        exact: alpha == i32::MIN || score > alpha,
                    };
                    (evaluated, nodes)
                }
            })
            .collect();

        let mut nodes = 1;
        let mut failed_tasks = 0;
        let results: Vec<_> = self
            .pool
            .run_all(tasks)
            .into_iter()
            .map(|result| match result {
                Ok((evaluated, task_nodes)) => {
                    nodes += task_nodes;
                    Some(evaluated)
                }
                Err(e) => {
                    failed_tasks += 1;
                    log::warn!("alpha-beta root task dropped: {e}");
                    None
                }
            })
            .collect();
        let best = select_best(results);

        self.stats = SearchStats {
            depth: self.config.max_depth,
            nodes,
            failed_tasks,
            time_ms: elapsed_ms(start),
            ..SearchStats::default()
        };
        if let Some(best) = &best {
            log::debug!(
                "alpha-beta picked {:?} (score {}, {} nodes, {} threads, {} ms)",
                best.mv,
                best.score,
                nodes,
                self.pool.threads(),
                self.stats.time_ms
            );
        }
        best.map(|b| b.mv)
    }

    fn last_stats(&self) -> SearchStats {
        self.stats
    }
}

impl<G: GameState> Configurable for AlphaBetaEngine<G> {
    #[allow(clippy::cast_possible_wrap)]
    fn options(&self) -> Vec<OptionSpec> {
        vec![
            OptionSpec::integer(
                OPT_MAX_DEPTH,
                "Plies searched below the current position",
                i64::from(self.config.max_depth),
                MAX_DEPTH_MIN,
                MAX_DEPTH_MAX,
            ),
            OptionSpec::integer(
                OPT_THREAD_COUNT,
                "Worker threads searching root moves; lower it if the machine is contended",
                self.config.thread_count as i64,
                1,
                available_threads() as i64,
            ),
            OptionSpec::choice(
                OPT_HEURISTIC,
                "Heuristic used to score positions at the search horizon",
                self.evaluator.name(),
                self.registry.names(),
            ),
            OptionSpec::choice(
                OPT_WINDOW_MODE,
                "Whether root workers share their alpha bound",
                self.config.window_mode.as_str(),
                WindowMode::ALL.iter().map(|m| m.as_str().to_string()).collect(),
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
            OPT_THREAD_COUNT => {
                let requested = value.as_int(name)?;
                let threads = check_threads(usize::try_from(requested).unwrap_or(0))?;
                self.pool.resize(threads)?;
                self.config.thread_count = threads;
            }
            OPT_HEURISTIC => {
                let heuristic = value.as_choice(name)?;
                self.evaluator = self.registry.get(heuristic)?;
                self.config.heuristic = Some(heuristic.to_string());
            }
            OPT_WINDOW_MODE => {
                self.config.window_mode = WindowMode::parse(value.as_choice(name)?)?;
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}
