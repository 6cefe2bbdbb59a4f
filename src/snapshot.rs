//! Read-only projections broadcast to clients.
//!
//! A [`GameSnapshot`] is the single source of truth a client renders from
//! after any successful mutation; there are no delta updates. Legal-move
//! markers are overlaid here, at projection time, for the current turn
//! owner only — they are never part of stored board state.

use crate::games::reversi::{Cell, Game, GameStatus, Outcome, Piece, Score, TimerPhase};
use crate::session::{GameId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cell as a client sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellView {
    /// Unoccupied.
    Empty,
    /// Black piece.
    Black,
    /// White piece.
    White,
    /// Empty cell that is a legal move for the current turn owner.
    Legal,
}

/// A seated player as a client sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Stable identity.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Assigned color.
    pub piece: Piece,
    /// Live-connection flag.
    pub connected: bool,
}

/// One player's clock as a client sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerView {
    /// Seconds left.
    pub remaining_secs: u32,
    /// True for the turn owner while the game is active.
    pub is_active: bool,
    /// True while paused for a disconnect.
    pub is_paused: bool,
}

/// Both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPairView {
    /// Black's clock.
    pub black: TimerView,
    /// White's clock.
    pub white: TimerView,
}

/// Complete projection of a game, broadcast after every successful
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Registry key.
    pub game_id: GameId,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Board width in cells.
    pub width: usize,
    /// Board height in cells.
    pub height: usize,
    /// Row-major cells with legal-move markers for the turn owner.
    pub cells: Vec<CellView>,
    /// Piece counts.
    pub score: Score,
    /// Turn owner; `None` unless the game is active.
    pub current_piece: Option<Piece>,
    /// Seated players.
    pub players: Vec<PlayerView>,
    /// Clocks; `None` for untimed games.
    pub timers: Option<TimerPairView>,
    /// Color skipped by the latest turn advance, if any.
    pub passed: Option<Piece>,
    /// How the game ended, once finished.
    pub outcome: Option<Outcome>,
    /// Instant of the latest successful mutation.
    pub last_activity_at: DateTime<Utc>,
}

impl GameSnapshot {
    /// Projects the given game. Callers must hold that game's exclusive
    /// access so the projection is of a single consistent state.
    pub fn of(game: &Game) -> Self {
        let board = game.board();
        let active = *game.status() == GameStatus::Active;
        let legal: Vec<usize> = if active {
            board.legal_moves(*game.current_piece())
        } else {
            Vec::new()
        };
        let cells = board
            .cells()
            .iter()
            .enumerate()
            .map(|(index, cell)| match cell {
                Cell::Occupied(Piece::Black) => CellView::Black,
                Cell::Occupied(Piece::White) => CellView::White,
                Cell::Empty if legal.contains(&index) => CellView::Legal,
                Cell::Empty => CellView::Empty,
            })
            .collect();
        let timers = game.timers().as_ref().map(|pair| TimerPairView {
            black: timer_view(pair.state(Piece::Black)),
            white: timer_view(pair.state(Piece::White)),
        });
        Self {
            game_id: game.id().clone(),
            status: *game.status(),
            width: board.width(),
            height: board.height(),
            cells,
            score: board.score(),
            current_piece: active.then(|| *game.current_piece()),
            players: game.players().iter().map(player_view).collect(),
            timers,
            passed: *game.passed(),
            outcome: *game.outcome(),
            last_activity_at: *game.last_activity_at(),
        }
    }
}

/// Listing/discovery projection; cheaper than a full snapshot and free of
/// board contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Registry key.
    pub game_id: GameId,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Seated players with connection flags.
    pub players: Vec<PlayerView>,
    /// Piece counts.
    pub score: Score,
    /// Whether the game has started.
    pub started: bool,
    /// Whether the game has finished.
    pub finished: bool,
    /// Whether the game runs clocks.
    pub timed: bool,
    /// Instant of the latest successful mutation; inactivity collection
    /// is an external collaborator's concern keyed off this.
    pub last_activity_at: DateTime<Utc>,
}

impl GameSummary {
    /// Projects the given game under its exclusive access.
    pub fn of(game: &Game) -> Self {
        let status = *game.status();
        Self {
            game_id: game.id().clone(),
            status,
            players: game.players().iter().map(player_view).collect(),
            score: game.score(),
            started: status != GameStatus::Waiting,
            finished: status == GameStatus::Finished,
            timed: game.timers().is_some(),
            last_activity_at: *game.last_activity_at(),
        }
    }
}

fn player_view(player: &crate::games::reversi::Player) -> PlayerView {
    PlayerView {
        user_id: player.user_id.clone(),
        display_name: player.display_name.clone(),
        piece: player.piece,
        connected: player.connected,
    }
}

fn timer_view(state: &crate::games::reversi::TimerState) -> TimerView {
    TimerView {
        remaining_secs: *state.remaining_secs(),
        is_active: *state.phase() == TimerPhase::Active,
        is_paused: *state.phase() == TimerPhase::Paused,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::reversi::GameConfig;

    #[test]
    fn test_waiting_snapshot_has_no_markers() {
        let game = Game::new("g1".into(), GameConfig::default()).expect("valid config");
        let snapshot = GameSnapshot::of(&game);
        assert_eq!(snapshot.status, GameStatus::Waiting);
        assert_eq!(snapshot.current_piece, None);
        assert!(!snapshot.cells.contains(&CellView::Legal));
    }

    #[test]
    fn test_active_snapshot_marks_legal_moves() {
        let mut game = Game::new("g1".into(), GameConfig::default()).expect("valid config");
        game.add_or_update_player("alice".into(), "Alice".into())
            .expect("seat");
        game.add_or_update_player("bob".into(), "Bob".into())
            .expect("seat");
        game.start().expect("start");
        let snapshot = GameSnapshot::of(&game);
        let legal: Vec<usize> = snapshot
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == CellView::Legal)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(legal, vec![19, 26, 37, 44]);
        assert_eq!(snapshot.current_piece, Some(Piece::Black));
        assert_eq!(snapshot.score, Score::new(2, 2));
    }
}
