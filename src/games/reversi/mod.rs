//! Reversi game logic: board, clocks, and the session state machine.

mod board;
mod game;
mod strategy;
mod timer;
mod types;

pub use board::{Board, DEFAULT_SIZE, InvalidBoardSize, PlacementError};
pub use game::{Game, GameConfig, JoinError, MoveError, MoveOutcome, Player, StartError};
pub use strategy::{FirstLegalMoveSelector, MoveSelector};
pub use timer::{
    TimeoutAction, TimerConfig, TimerEvent, TimerPair, TimerPhase, TimerPolicy, TimerState,
};
pub use types::{Cell, GameStatus, Outcome, Piece, Score};
