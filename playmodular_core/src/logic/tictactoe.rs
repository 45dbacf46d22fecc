use crate::engine::{Evaluator, LOSS_SCORE, WIN_SCORE};
use crate::logic::game::{GameResult, GameState};
use serde::{Deserialize, Serialize};
use std::fmt;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// Cell index, row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicTacToe {
    cells: [Option<Mark>; 9],
    to_move: Mark,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [None; 9],
            to_move: Mark::X,
        }
    }

    /// Builds a position from a 9 character string of `X`, `O` and `.`.
    /// Returns `None` for malformed input.
    #[must_use]
    pub fn from_layout(layout: &str, to_move: Mark) -> Option<Self> {
        if layout.chars().count() != 9 {
            return None;
        }
        let mut cells = [None; 9];
        for (slot, ch) in cells.iter_mut().zip(layout.chars()) {
            *slot = match ch {
                'X' | 'x' => Some(Mark::X),
                'O' | 'o' => Some(Mark::O),
                '.' | '-' | ' ' => None,
                _ => return None,
            };
        }
        Some(Self { cells, to_move })
    }

    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Mark> {
        self.cells.get(usize::from(cell.0)).copied().flatten()
    }

    #[must_use]
    pub fn winner(&self) -> Option<Mark> {
        let cell = |i: usize| self.cells.get(i).copied().flatten();
        LINES.iter().find_map(|&[a, b, c]| {
            match (cell(a), cell(b), cell(c)) {
                (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
                _ => None,
            }
        })
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Marks of `mark` and of its opponent on each line.
    fn line_counts(&self, mark: Mark) -> impl Iterator<Item = (usize, usize)> + '_ {
        LINES.iter().map(move |line| {
            line.iter()
                .filter_map(|&i| self.cells.get(i).copied().flatten())
                .fold((0, 0), |(own, other), m| {
                    if m == mark {
                        (own + 1, other)
                    } else {
                        (own, other + 1)
                    }
                })
        })
    }
}

impl GameState for TicTacToe {
    type Move = Cell;
    type Player = Mark;

    fn current_player(&self) -> Mark {
        self.to_move
    }

    fn legal_moves(&self, player: Mark) -> Vec<Cell> {
        if player != self.to_move || self.winner().is_some() {
            return Vec::new();
        }
        (0u8..9)
            .filter(|&i| self.get(Cell(i)).is_none())
            .map(Cell)
            .collect()
    }

    fn apply(&self, mv: &Cell) -> Self {
        let mut next = *self;
        if let Some(slot) = next.cells.get_mut(usize::from(mv.0)) {
            if slot.is_none() {
                *slot = Some(self.to_move);
                next.to_move = self.to_move.opposite();
            }
        }
        next
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    fn handle_no_moves(&self) -> Option<Self> {
        None
    }

    fn result_for(&self, player: Mark) -> GameResult {
        match self.winner() {
            Some(w) if w == player => GameResult::Win,
            Some(_) => GameResult::Loss,
            None => GameResult::Draw,
        }
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            let ch = match cell {
                Some(Mark::X) => 'X',
                Some(Mark::O) => 'O',
                None => '.',
            };
            write!(f, "{ch}")?;
            if i % 3 == 2 && i < 8 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Counts open lines: a line holding only our marks is worth 1 for one mark
/// and 10 for two, mirrored for the opponent. Finished games score the win
/// and loss sentinels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineHeuristic;

impl Evaluator<TicTacToe> for LineHeuristic {
    fn name(&self) -> &str {
        "lines"
    }

    fn evaluate(&self, state: &TicTacToe, player: Mark) -> i32 {
        if state.is_terminal() {
            return match state.result_for(player) {
                GameResult::Win => WIN_SCORE,
                GameResult::Loss => LOSS_SCORE,
                GameResult::Draw => 0,
            };
        }
        state
            .line_counts(player)
            .map(|counts| match counts {
                (1, 0) => 1,
                (2, 0) => 10,
                (0, 1) => -1,
                (0, 2) => -10,
                _ => 0,
            })
            .sum()
    }
}
