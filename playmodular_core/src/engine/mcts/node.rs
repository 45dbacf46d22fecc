//! Arena-backed search tree shared by concurrent MCTS iterations.
//!
//! Nodes live in one growable arena and refer to each other by [`NodeId`].
//! A parent link is only an index, so dropping the tree drops every node.
//!
//! Locking: each node guards its statistics and its expansion state with
//! separate mutexes, and the arena sits behind a `RwLock`. A node's expansion
//! lock may be held while taking the arena write lock, never the other way
//! round, and no two node locks are ever held together.

use crate::engine::error::SearchError;
use crate::logic::game::GameState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: Self = Self(0);
}

/// Visit count and accumulated value, always updated together.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub visits: u32,
    /// Sum of backpropagated outcomes, from the point of view of the player
    /// who moved into this node.
    pub value: f64,
}

impl NodeStats {
    /// Mean value, or `None` before the first visit.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.visits > 0).then(|| self.value / f64::from(self.visits))
    }
}

#[derive(Debug)]
struct Expansion<M> {
    children: Vec<NodeId>,
    untried: Vec<M>,
}

#[derive(Debug)]
pub struct SearchNode<G: GameState> {
    state: G,
    parent: Option<NodeId>,
    mv: Option<G::Move>,
    stats: Mutex<NodeStats>,
    expansion: Mutex<Expansion<G::Move>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<G: GameState> SearchNode<G> {
    fn new(state: G, parent: Option<NodeId>, mv: Option<G::Move>, untried: Vec<G::Move>) -> Self {
        Self {
            state,
            parent,
            mv,
            stats: Mutex::new(NodeStats::default()),
            expansion: Mutex::new(Expansion {
                children: Vec::new(),
                untried,
            }),
        }
    }

    fn child(state: G, parent: NodeId, mv: G::Move) -> Self {
        let untried = if state.is_terminal() {
            Vec::new()
        } else {
            state.legal_moves(state.current_player())
        };
        Self::new(state, Some(parent), Some(mv), untried)
    }

    pub const fn state(&self) -> &G {
        &self.state
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Move that led here; `None` for the root.
    pub const fn mv(&self) -> Option<&G::Move> {
        self.mv.as_ref()
    }

    pub fn stats(&self) -> NodeStats {
        *lock(&self.stats)
    }

    pub fn children(&self) -> Vec<NodeId> {
        lock(&self.expansion).children.clone()
    }

    pub fn untried_count(&self) -> usize {
        lock(&self.expansion).untried.len()
    }

    /// Whether selection should keep descending through this node.
    fn is_fully_expanded(&self) -> bool {
        let expansion = lock(&self.expansion);
        !expansion.children.is_empty() && expansion.untried.is_empty()
    }

    fn record(&self, delta: f64) {
        let mut stats = lock(&self.stats);
        stats.visits = stats.visits.saturating_add(1);
        stats.value += delta;
    }
}

/// UCB1 score of a child. Unvisited children score `+inf` so that every
/// sibling is tried once before any is revisited.
#[must_use]
pub fn ucb1(child: NodeStats, parent_visits: u32, exploration: f64) -> f64 {
    if child.visits == 0 {
        return f64::INFINITY;
    }
    let visits = f64::from(child.visits);
    let parent = f64::from(parent_visits.max(1));
    child.value / visits + exploration * (parent.ln() / visits).sqrt()
}

#[derive(Debug)]
pub struct SearchTree<G: GameState> {
    nodes: RwLock<Vec<Arc<SearchNode<G>>>>,
}

impl<G: GameState> SearchTree<G> {
    /// Tree holding only the root. `root_moves` become its untried moves.
    pub fn new(root: G, root_moves: Vec<G::Move>) -> Self {
        let untried = if root.is_terminal() { Vec::new() } else { root_moves };
        Self {
            nodes: RwLock::new(vec![Arc::new(SearchNode::new(root, None, None, untried))]),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: NodeId) -> Result<Arc<SearchNode<G>>, SearchError> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0)
            .cloned()
            .ok_or(SearchError::MissingNode(id.0))
    }

    /// Descends from the root through fully expanded nodes, following the
    /// UCB1-best child, and returns the first node that is not.
    pub fn select(&self, exploration: f64) -> Result<NodeId, SearchError> {
        let mut current = NodeId::ROOT;
        loop {
            if !self.get(current)?.is_fully_expanded() {
                return Ok(current);
            }
            match self.best_child(current, exploration)? {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
    }

    /// Child of `id` with the highest UCB1 score; the earliest wins ties.
    pub fn best_child(&self, id: NodeId, exploration: f64) -> Result<Option<NodeId>, SearchError> {
        let node = self.get(id)?;
        let parent_visits = node.stats().visits;
        let mut best: Option<(NodeId, f64)> = None;
        for child in node.children() {
            let score = ucb1(self.get(child)?.stats(), parent_visits, exploration);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((child, score));
            }
        }
        Ok(best.map(|(child, _)| child))
    }

    /// Creates one child per untried move of `id` in a single batch.
    ///
    /// Terminal and already expanded nodes are left alone, so concurrent
    /// callers expand a node at most once. Untried moves are only cleared
    /// once the whole batch is built, so a panic in `apply` leaves the node
    /// expandable by the next iteration.
    pub fn expand(&self, id: NodeId) -> Result<(), SearchError> {
        let node = self.get(id)?;
        if node.state.is_terminal() {
            return Ok(());
        }

        let mut expansion = lock(&node.expansion);
        if !expansion.children.is_empty() || expansion.untried.is_empty() {
            return Ok(());
        }
        let fresh: Vec<_> = expansion
            .untried
            .iter()
            .map(|mv| Arc::new(SearchNode::child(node.state.apply(mv), id, mv.clone())))
            .collect();

        let mut arena = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let first = arena.len();
        arena.extend(fresh);
        expansion.children = (first..arena.len()).map(NodeId).collect();
        expansion.untried.clear();
        Ok(())
    }

    /// Adds `outcome` (from `root_player`'s point of view) to every node from
    /// `leaf` up to the root. A node whose side to move is `root_player` was
    /// moved into by the opponent and gets the negated outcome.
    pub fn backpropagate(
        &self,
        leaf: NodeId,
        outcome: f64,
        root_player: G::Player,
    ) -> Result<(), SearchError> {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get(id)?;
            let delta = if node.state.current_player() == root_player {
                -outcome
            } else {
                outcome
            };
            node.record(delta);
            current = node.parent;
        }
        Ok(())
    }

    /// Root children with the move that produced each and its statistics.
    pub fn root_children(&self) -> Result<Vec<(G::Move, NodeStats)>, SearchError> {
        self.get(NodeId::ROOT)?
            .children()
            .into_iter()
            .map(|id| {
                let child = self.get(id)?;
                let mv = child.mv.clone().ok_or(SearchError::MissingNode(id.0))?;
                Ok((mv, child.stats()))
            })
            .collect()
    }
}
