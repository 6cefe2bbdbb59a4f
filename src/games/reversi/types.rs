//! Core domain types for Reversi.

use derive_new::new;
use serde::{Deserialize, Serialize};

/// A piece color, also the symbol occupying a board cell.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Piece {
    /// Black (moves first).
    Black,
    /// White (moves second).
    White,
}

impl Piece {
    /// Returns the opposing color.
    pub fn opponent(self) -> Self {
        match self {
            Piece::Black => Piece::White,
            Piece::White => Piece::Black,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// Unoccupied cell.
    Empty,
    /// Cell holding a piece.
    Occupied(Piece),
}

/// Piece counts for both colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Score {
    /// Number of black pieces on the board.
    pub black: u32,
    /// Number of white pieces on the board.
    pub white: u32,
}

/// Lifecycle status of a game session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Created, fewer than two players seated or not yet started.
    Waiting,
    /// Both players seated, moves accepted.
    Active,
    /// Terminal. No further moves accepted.
    Finished,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// One color won, by score, forfeit, or resignation.
    Winner(Piece),
    /// Equal scores at termination.
    Draw,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involutive() {
        assert_eq!(Piece::Black.opponent(), Piece::White);
        assert_eq!(Piece::White.opponent().opponent(), Piece::White);
    }

    #[test]
    fn test_piece_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Piece::Black).unwrap(), "\"black\"");
    }
}
