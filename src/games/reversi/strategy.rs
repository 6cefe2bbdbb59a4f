//! Move-selection strategies for timeout handling.

use super::board::Board;
use super::types::Piece;

/// Chooses a move on behalf of a player whose clock expired under the
/// `AutoMove` timeout action.
pub trait MoveSelector: Send + Sync + std::fmt::Debug {
    /// Returns a legal cell index for `piece`, or `None` when no legal
    /// move exists.
    fn select_move(&self, board: &Board, piece: Piece) -> Option<usize>;
}

/// Plays the lowest-indexed legal move. The engine's only built-in
/// strategy; anything smarter belongs to an external collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstLegalMoveSelector;

impl MoveSelector for FirstLegalMoveSelector {
    fn select_move(&self, board: &Board, piece: Piece) -> Option<usize> {
        board.legal_moves(piece).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_legal_from_opening() {
        let board = Board::new();
        let selector = FirstLegalMoveSelector;
        assert_eq!(selector.select_move(&board, Piece::Black), Some(19));
    }
}
