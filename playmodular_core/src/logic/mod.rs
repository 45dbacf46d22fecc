pub mod game;
#[doc(hidden)]
pub mod scripted;
pub mod tictactoe;

pub use game::{GameResult, GameState};
