//! Game session state machine.
//!
//! A [`Game`] owns its [`Board`] and clocks exclusively and funnels every
//! mutation through a handful of instrumented operations. All rejections
//! are pure: a failed call leaves the game byte-identical to an observer.

use super::board::{Board, InvalidBoardSize, PlacementError};
use super::strategy::{FirstLegalMoveSelector, MoveSelector};
use super::timer::{TimerConfig, TimerEvent, TimerPair, TimeoutAction};
use super::types::{GameStatus, Outcome, Piece, Score};
use crate::session::{GameId, UserId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identity, externally issued.
    pub user_id: UserId,
    /// Name shown to the opponent.
    pub display_name: String,
    /// Assigned color, fixed for the life of the game.
    pub piece: Piece,
    /// Whether the player currently has a live connection.
    pub connected: bool,
}

/// Per-game configuration fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board width in cells.
    #[serde(default = "default_dimension")]
    pub board_width: usize,
    /// Board height in cells.
    #[serde(default = "default_dimension")]
    pub board_height: usize,
    /// Clock configuration; `None` for untimed games.
    #[serde(default)]
    pub timer: Option<TimerConfig>,
}

fn default_dimension() -> usize {
    super::board::DEFAULT_SIZE
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: default_dimension(),
            board_height: default_dimension(),
            timer: None,
        }
    }
}

/// Why a seat request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinError {
    /// Two distinct users are already seated.
    #[display("game is full")]
    GameFull,
}

/// Why a start request was refused. The caller treats these as logged
/// no-ops; they exist so the log line can say which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartError {
    /// Fewer than two players are seated.
    #[display("game needs two players to start")]
    NotEnoughPlayers,
    /// The game is already running.
    #[display("game has already started")]
    AlreadyStarted,
    /// The game already ended.
    #[display("game has already finished")]
    AlreadyFinished,
}

/// Why a move (or resignation) was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveError {
    /// The game is not in the `Active` status.
    #[display("game is not active")]
    GameNotActive,
    /// The acting user holds the other color, or no color.
    #[display("not your turn")]
    NotYourTurn,
    /// The acting user is not seated in this game.
    #[display("player is not seated in this game")]
    NotSeated,
    /// The board rejected the placement.
    #[display("illegal move: {_0}")]
    #[from]
    Board(PlacementError),
}

/// Result of a successful move, including what the next snapshot will say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    /// Color that moved.
    pub piece: Piece,
    /// Cell the piece was placed on.
    pub cell: usize,
    /// Opponent cells flipped by the move.
    pub flipped: Vec<usize>,
    /// Color that was skipped because it had no legal reply, if any.
    pub passed: Option<Piece>,
    /// Status after the move.
    pub status: GameStatus,
    /// How the game ended, when the move finished it.
    pub outcome: Option<Outcome>,
}

/// One two-player match from creation through waiting, active, and
/// finished. Transitions are one-way: `Waiting -> Active -> Finished`.
#[derive(Debug, Getters)]
pub struct Game {
    /// Registry key.
    id: GameId,
    /// Lifecycle status.
    status: GameStatus,
    /// Seated players in join order; the first seat gets black.
    players: Vec<Player>,
    /// The board, reset to the starting position when the game starts.
    board: Board,
    /// Turn owner. Meaningful while `Active`.
    current_piece: Piece,
    /// Clocks, present only for timed games.
    timers: Option<TimerPair>,
    /// Strategy used by the `AutoMove` timeout action.
    #[getter(skip)]
    selector: Box<dyn MoveSelector>,
    /// Fixed at finish.
    outcome: Option<Outcome>,
    /// Color skipped by the most recent turn advance, if any.
    passed: Option<Piece>,
    /// Creation instant.
    created_at: DateTime<Utc>,
    /// Last successful mutation; inactivity collection keys off this.
    last_activity_at: DateTime<Utc>,
    #[getter(skip)]
    config: GameConfig,
}

impl Game {
    /// Creates a game in `Waiting` with no players seated.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoardSize`] when the configured dimensions cannot
    /// hold a starting position.
    #[instrument]
    pub fn new(id: GameId, config: GameConfig) -> Result<Self, InvalidBoardSize> {
        let board = Board::with_size(config.board_width, config.board_height)?;
        let now = Utc::now();
        info!(game_id = %id, timed = config.timer.is_some(), "creating game");
        Ok(Self {
            id,
            status: GameStatus::Waiting,
            players: Vec::new(),
            board,
            current_piece: Piece::Black,
            timers: None,
            selector: Box::new(FirstLegalMoveSelector),
            outcome: None,
            passed: None,
            created_at: now,
            last_activity_at: now,
            config,
        })
    }

    /// Replaces the `AutoMove` strategy.
    pub fn set_selector(&mut self, selector: Box<dyn MoveSelector>) {
        self.selector = selector;
    }

    /// The seated player with the given user id.
    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// The seated player holding the given color.
    pub fn player_by_piece(&self, piece: Piece) -> Option<&Player> {
        self.players.iter().find(|p| p.piece == piece)
    }

    /// Current piece counts.
    pub fn score(&self) -> Score {
        self.board.score()
    }

    /// Seats a new player or re-attaches a seated one.
    ///
    /// New players take the first free color: the first seat gets black,
    /// the second white. Re-joining an already-seated user is the resume
    /// path: it marks them connected (resuming a paused clock) and never
    /// reassigns the color or resets game state.
    ///
    /// # Errors
    ///
    /// [`JoinError::GameFull`] when two distinct users are seated and this
    /// user is a third.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn add_or_update_player(
        &mut self,
        user_id: UserId,
        display_name: String,
    ) -> Result<Piece, JoinError> {
        if let Some(seat) = self.players.iter_mut().find(|p| p.user_id == user_id) {
            seat.display_name = display_name;
            let piece = seat.piece;
            info!(user_id = %user_id, piece = %piece, "player resumed");
            self.mark_connected(piece, true);
            self.last_activity_at = Utc::now();
            return Ok(piece);
        }
        if self.players.len() >= 2 {
            warn!(user_id = %user_id, "join refused, game is full");
            return Err(JoinError::GameFull);
        }
        let piece = if self.players.is_empty() {
            Piece::Black
        } else {
            Piece::White
        };
        info!(user_id = %user_id, piece = %piece, "player seated");
        self.players.push(Player {
            user_id,
            display_name,
            piece,
            connected: true,
        });
        self.last_activity_at = Utc::now();
        Ok(piece)
    }

    /// Starts the game: resets the board to the starting position, gives
    /// black the first turn, and arms the clocks for timed games.
    ///
    /// # Errors
    ///
    /// Typed reasons for the caller to log; none of them mutate state.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn start(&mut self) -> Result<(), StartError> {
        match self.status {
            GameStatus::Active => return Err(StartError::AlreadyStarted),
            GameStatus::Finished => return Err(StartError::AlreadyFinished),
            GameStatus::Waiting => {}
        }
        if self.players.len() < 2 {
            return Err(StartError::NotEnoughPlayers);
        }
        self.board = Board::with_size(self.config.board_width, self.config.board_height)
            .expect("dimensions validated at creation");
        self.current_piece = Piece::Black;
        self.passed = None;
        if let Some(timer_config) = self.config.timer {
            self.timers = Some(TimerPair::new(timer_config));
            self.activate_clock(Piece::Black);
        }
        self.status = GameStatus::Active;
        self.last_activity_at = Utc::now();
        info!(game_id = %self.id, "game started, black to move");
        Ok(())
    }

    /// Validates and applies a move for `user_id` at `cell`.
    ///
    /// On success the board is updated, the mover's clock gets its
    /// increment/delay treatment, and the turn advances: to the opponent
    /// when they can reply, back to the mover when only they can (the
    /// opponent passes), or to `Finished` when neither side has a legal
    /// move. On any rejection nothing changes anywhere.
    ///
    /// # Errors
    ///
    /// [`MoveError`] with the policy reason; never partial effects.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn place_piece(&mut self, user_id: &str, cell: usize) -> Result<MoveOutcome, MoveError> {
        if self.status != GameStatus::Active {
            debug!(status = %self.status, "move refused, game not active");
            return Err(MoveError::GameNotActive);
        }
        let piece = self.player(user_id).ok_or(MoveError::NotSeated)?.piece;
        if piece != self.current_piece {
            debug!(user_id, piece = %piece, turn = %self.current_piece, "move refused, out of turn");
            return Err(MoveError::NotYourTurn);
        }
        // Server-side legality is the only authority; the board validates
        // the full capture rule before mutating anything.
        let flipped = self.board.apply(piece, cell)?;
        if let Some(timers) = self.timers.as_mut() {
            timers.on_move_made(piece);
        }
        self.advance_after_move(piece);
        self.last_activity_at = Utc::now();
        info!(
            user_id,
            piece = %piece,
            cell,
            flipped = flipped.len(),
            status = %self.status,
            "move applied"
        );
        Ok(MoveOutcome {
            piece,
            cell,
            flipped,
            passed: self.passed,
            status: self.status,
            outcome: self.outcome,
        })
    }

    /// Resigns the game for `user_id`; the opponent wins.
    ///
    /// # Errors
    ///
    /// [`MoveError::GameNotActive`] unless the game is running,
    /// [`MoveError::NotSeated`] for an unseated user.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn resign(&mut self, user_id: &str) -> Result<(), MoveError> {
        if self.status != GameStatus::Active {
            return Err(MoveError::GameNotActive);
        }
        let piece = self.player(user_id).ok_or(MoveError::NotSeated)?.piece;
        info!(user_id, piece = %piece, "player resigned");
        self.finish(Outcome::Winner(piece.opponent()));
        Ok(())
    }

    /// Records a connection change for `user_id`.
    ///
    /// Disconnecting the turn owner pauses their clock when the policy
    /// says so; reconnecting resumes it. A disconnect never cancels an
    /// in-flight move and never changes the turn.
    ///
    /// # Errors
    ///
    /// [`MoveError::NotSeated`] for an unseated user.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn set_connected(&mut self, user_id: &str, connected: bool) -> Result<(), MoveError> {
        let piece = self.player(user_id).ok_or(MoveError::NotSeated)?.piece;
        self.mark_connected(piece, connected);
        Ok(())
    }

    /// Advances the turn owner's clock by one interval and applies the
    /// timeout action on expiry. Returns the emitted events so the caller
    /// can broadcast warnings and expiry distinctly. A tick against an
    /// untimed or non-active game is a no-op.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.status != GameStatus::Active {
            return Vec::new();
        }
        let current = self.current_piece;
        let events = match self.timers.as_mut() {
            Some(timers) => timers.tick(current),
            None => return Vec::new(),
        };
        if events
            .iter()
            .any(|event| matches!(event, TimerEvent::Expired(_)))
        {
            self.handle_timeout(current);
        }
        events
    }

    /// Starts `piece`'s clock for a new turn. A turn handed to a
    /// disconnected player begins paused; the pause budget is spent
    /// before their bank drains.
    fn activate_clock(&mut self, piece: Piece) {
        let connected = self.player_by_piece(piece).map_or(true, |p| p.connected);
        if let Some(timers) = self.timers.as_mut() {
            timers.activate(piece);
            if !connected {
                timers.pause(piece);
            }
        }
    }

    fn mark_connected(&mut self, piece: Piece, connected: bool) {
        if let Some(seat) = self.players.iter_mut().find(|p| p.piece == piece) {
            seat.connected = connected;
        }
        let is_turn_owner = piece == self.current_piece && self.status == GameStatus::Active;
        if let Some(timers) = self.timers.as_mut() {
            if is_turn_owner && !connected {
                timers.pause(piece);
            } else if connected {
                timers.resume(piece);
            }
        }
    }

    /// Turn logic shared by moves and auto-moves. The mover keeps the turn
    /// when the opponent has no reply; two blocked sides end the game.
    fn advance_after_move(&mut self, mover: Piece) {
        let opponent = mover.opponent();
        if self.board.has_legal_move(opponent) {
            self.passed = None;
            self.current_piece = opponent;
            self.activate_clock(opponent);
        } else if self.board.has_legal_move(mover) {
            debug!(skipped = %opponent, "opponent has no legal move, turn stays");
            self.passed = Some(opponent);
            // A fresh turn for the mover: re-arms delay/correspondence.
            self.activate_clock(mover);
        } else {
            self.finish_by_score();
        }
        debug_assert!(
            self.status != GameStatus::Active || self.player_by_piece(self.current_piece).is_some(),
            "turn owner must be a seated player"
        );
    }

    /// Forced pass for `piece` (timeout path). Prefers handing the turn to
    /// the opponent; keeps it when only `piece` can move; ends the game
    /// when neither side can.
    fn advance_pass(&mut self, piece: Piece) {
        let opponent = piece.opponent();
        if self.board.has_legal_move(opponent) {
            self.passed = Some(piece);
            self.current_piece = opponent;
            self.activate_clock(opponent);
        } else if self.board.has_legal_move(piece) {
            self.passed = Some(opponent);
            self.current_piece = piece;
            self.activate_clock(piece);
        } else {
            self.finish_by_score();
        }
    }

    fn handle_timeout(&mut self, piece: Piece) {
        let Some(action) = self.timers.as_ref().map(|t| t.config().timeout_action) else {
            return;
        };
        warn!(game_id = %self.id, piece = %piece, action = %action, "clock expired");
        match action {
            TimeoutAction::Forfeit => {
                self.finish(Outcome::Winner(piece.opponent()));
            }
            TimeoutAction::AutoPass => {
                if let Some(timers) = self.timers.as_mut() {
                    timers.refill(piece);
                }
                self.advance_pass(piece);
            }
            TimeoutAction::AutoMove => {
                let choice = self.selector.select_move(&self.board, piece);
                if let Some(timers) = self.timers.as_mut() {
                    timers.refill(piece);
                }
                match choice {
                    Some(cell) => match self.board.apply(piece, cell) {
                        Ok(flipped) => {
                            info!(piece = %piece, cell, flipped = flipped.len(), "auto-move played");
                            if let Some(timers) = self.timers.as_mut() {
                                timers.on_move_made(piece);
                            }
                            self.advance_after_move(piece);
                        }
                        Err(reason) => {
                            // The selector contract requires a legal cell.
                            debug_assert!(false, "selector returned illegal move: {reason}");
                            error!(piece = %piece, cell, %reason, "selector returned illegal move");
                            self.advance_pass(piece);
                        }
                    },
                    None => self.advance_pass(piece),
                }
            }
        }
        self.last_activity_at = Utc::now();
    }

    fn finish_by_score(&mut self) {
        let score = self.board.score();
        let outcome = if score.black > score.white {
            Outcome::Winner(Piece::Black)
        } else if score.white > score.black {
            Outcome::Winner(Piece::White)
        } else {
            Outcome::Draw
        };
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Outcome) {
        self.status = GameStatus::Finished;
        self.outcome = Some(outcome);
        self.passed = None;
        if let Some(timers) = self.timers.as_mut() {
            timers.stop();
        }
        self.last_activity_at = Utc::now();
        info!(game_id = %self.id, ?outcome, "game finished");
    }
}
