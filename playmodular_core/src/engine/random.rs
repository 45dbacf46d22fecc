use crate::engine::Strategy;
use crate::logic::game::GameState;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Plays a uniformly random legal move.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    /// `None` seeds from the operating system.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { rng }
    }
}

impl<G: GameState> Strategy<G> for RandomStrategy {
    fn choose_move(&mut self, _state: &G, legal_moves: &[G::Move]) -> Option<G::Move> {
        legal_moves.choose(&mut self.rng).cloned()
    }
}
