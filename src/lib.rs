//! Reversi Engine library - authoritative game engine and session
//! lifecycle manager.
//!
//! # Architecture
//!
//! - **Board**: pure capture/legality logic, no I/O
//! - **Timer**: per-player clocks with policy, warnings, and timeout
//!   actions, driven by an external tick scheduler
//! - **Game**: the waiting/active/finished session state machine
//! - **GameManager**: the concurrency-safe registry serializing all
//!   mutation per game while independent games proceed in parallel
//! - **Server**: a thin HTTP adapter translating requests to engine
//!   calls and broadcast events to SSE
//!
//! # Example
//!
//! ```
//! use reversi_engine::{GameConfig, GameManager};
//!
//! let manager = GameManager::new();
//! let game_id = manager.create_game(GameConfig::default())?;
//! manager.join_game(&game_id, "alice", "Alice")?;
//! manager.join_game(&game_id, "bob", "Bob")?;
//! manager.start_game(&game_id)?;
//! // Black opens with the classical capture toward the center.
//! manager.place_piece(&game_id, "alice", 19)?;
//! # Ok::<(), reversi_engine::EngineError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod games;
mod manager;
mod scheduler;
mod server;
mod session;
mod snapshot;

/// Command-line interface definitions.
pub mod cli;

// Crate-level exports - game types
pub use games::reversi::{
    Board, Cell, FirstLegalMoveSelector, Game, GameConfig, GameStatus, InvalidBoardSize,
    JoinError, MoveError, MoveOutcome, MoveSelector, Outcome, Piece, PlacementError, Player,
    Score, StartError, TimeoutAction, TimerConfig, TimerEvent, TimerPair, TimerPhase,
    TimerPolicy, TimerState,
};

// Crate-level exports - registry and engine boundary
pub use manager::{EngineError, GameEvent, GameEventKind, GameManager};

// Crate-level exports - session directory
pub use session::{GameId, PlayerDirectory, UserId};

// Crate-level exports - projections
pub use snapshot::{CellView, GameSnapshot, GameSummary, PlayerView, TimerPairView, TimerView};

// Crate-level exports - scheduler and transport adapter
pub use scheduler::run_tick_loop;
pub use server::{
    CreateGameRequest, CreateGameResponse, JoinGameRequest, ListParams, MoveRequest,
    MoveResponse, UserRequest, router, serve,
};
