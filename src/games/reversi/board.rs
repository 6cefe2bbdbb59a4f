//! Board representation and capture logic.
//!
//! The board is a flat row-major grid of [`Cell`]s. Legality and capture
//! both come from the same 8-direction sandwich scan: a placement is legal
//! iff at least one direction holds a run of opponent pieces terminated by
//! a same-color piece, and applying the move flips exactly those runs.

use super::types::{Cell, Piece, Score};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// The 8 compass vectors as (row, col) deltas.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Default board width and height.
pub const DEFAULT_SIZE: usize = 8;

/// Why a placement was rejected. Rejections never mutate the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementError {
    /// Cell index is outside the grid.
    #[display("cell index out of bounds")]
    OutOfBounds,
    /// Cell already holds a piece.
    #[display("cell is already occupied")]
    Occupied,
    /// Placement captures nothing in any direction.
    #[display("move captures no opponent pieces")]
    NoCapture,
}

/// Requested board dimensions are unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("board dimensions must be even and at least 4x4")]
pub struct InvalidBoardSize;

/// A rectangular Reversi board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates a standard 8x8 board with the four-piece starting position.
    pub fn new() -> Self {
        Self::with_size(DEFAULT_SIZE, DEFAULT_SIZE)
            .expect("default dimensions are valid")
    }

    /// Creates a board of the given dimensions with the centered starting
    /// position: two black and two white pieces, diagonally opposed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoardSize`] unless both dimensions are even and at
    /// least 4, which the starting position requires.
    #[instrument]
    pub fn with_size(width: usize, height: usize) -> Result<Self, InvalidBoardSize> {
        if width < 4 || height < 4 || width % 2 != 0 || height % 2 != 0 {
            return Err(InvalidBoardSize);
        }
        let mut board = Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        };
        // Matches the classical opening: d4/e5 white, e4/d5 black on 8x8.
        let (r, c) = (height / 2 - 1, width / 2 - 1);
        board.cells[r * width + c] = Cell::Occupied(Piece::White);
        board.cells[r * width + c + 1] = Cell::Occupied(Piece::Black);
        board.cells[(r + 1) * width + c] = Cell::Occupied(Piece::Black);
        board.cells[(r + 1) * width + c + 1] = Cell::Occupied(Piece::White);
        Ok(board)
    }

    /// Board width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Board height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell at the given row-major index, if in bounds.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// True when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| *c != Cell::Empty)
    }

    /// Counts pieces of each color.
    pub fn score(&self) -> Score {
        let mut score = Score::new(0, 0);
        for cell in &self.cells {
            match cell {
                Cell::Occupied(Piece::Black) => score.black += 1,
                Cell::Occupied(Piece::White) => score.white += 1,
                Cell::Empty => {}
            }
        }
        score
    }

    /// Enumerates every legal placement for `piece`.
    ///
    /// A cell is legal iff it is empty and at least one direction captures.
    #[instrument(skip(self))]
    pub fn legal_moves(&self, piece: Piece) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&index| {
                self.cells[index] == Cell::Empty && !self.flips_for(piece, index).is_empty()
            })
            .collect()
    }

    /// True when `piece` has at least one legal placement.
    pub fn has_legal_move(&self, piece: Piece) -> bool {
        (0..self.cells.len())
            .any(|index| self.cells[index] == Cell::Empty && !self.flips_for(piece, index).is_empty())
    }

    /// Places `piece` at `index`, flipping every captured run.
    ///
    /// Returns the flipped indices on success. On rejection the board is
    /// untouched: validation runs entirely before any mutation.
    ///
    /// # Errors
    ///
    /// [`PlacementError::OutOfBounds`] for an index off the grid,
    /// [`PlacementError::Occupied`] for a non-empty cell, and
    /// [`PlacementError::NoCapture`] when no direction captures.
    #[instrument(skip(self))]
    pub fn apply(&mut self, piece: Piece, index: usize) -> Result<Vec<usize>, PlacementError> {
        match self.get(index) {
            None => return Err(PlacementError::OutOfBounds),
            Some(Cell::Occupied(_)) => return Err(PlacementError::Occupied),
            Some(Cell::Empty) => {}
        }
        let flips = self.flips_for(piece, index);
        if flips.is_empty() {
            return Err(PlacementError::NoCapture);
        }
        self.cells[index] = Cell::Occupied(piece);
        for &flip in &flips {
            self.cells[flip] = Cell::Occupied(piece);
        }
        Ok(flips)
    }

    /// Collects every opponent index captured by placing `piece` at `index`.
    ///
    /// Scans outward in each direction: the direction captures iff it first
    /// meets one or more opponent pieces and then a same-color piece before
    /// running off-board or hitting an empty cell.
    fn flips_for(&self, piece: Piece, index: usize) -> Vec<usize> {
        let row = (index / self.width) as i32;
        let col = (index % self.width) as i32;
        let mut flips = Vec::new();

        for (dr, dc) in DIRECTIONS {
            let mut run = Vec::new();
            let (mut r, mut c) = (row + dr, col + dc);
            loop {
                if r < 0 || r >= self.height as i32 || c < 0 || c >= self.width as i32 {
                    break;
                }
                let scan = (r as usize) * self.width + c as usize;
                match self.cells[scan] {
                    Cell::Occupied(p) if p == piece.opponent() => run.push(scan),
                    Cell::Occupied(_) => {
                        // Bounded run: everything between is captured.
                        flips.extend(run);
                        break;
                    }
                    Cell::Empty => break,
                }
                r += dr;
                c += dc;
            }
        }

        flips
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position() {
        let board = Board::new();
        assert_eq!(board.get(27), Some(Cell::Occupied(Piece::White)));
        assert_eq!(board.get(28), Some(Cell::Occupied(Piece::Black)));
        assert_eq!(board.get(35), Some(Cell::Occupied(Piece::Black)));
        assert_eq!(board.get(36), Some(Cell::Occupied(Piece::White)));
        assert_eq!(board.score(), Score::new(2, 2));
    }

    #[test]
    fn test_classical_opening_moves_for_black() {
        let board = Board::new();
        let mut moves = board.legal_moves(Piece::Black);
        moves.sort_unstable();
        assert_eq!(moves, vec![19, 26, 37, 44]);
    }

    #[test]
    fn test_apply_flips_single_run() {
        let mut board = Board::new();
        // Black at 19 captures the white piece at 27.
        let flips = board.apply(Piece::Black, 19).expect("legal move");
        assert_eq!(flips, vec![27]);
        assert_eq!(board.get(27), Some(Cell::Occupied(Piece::Black)));
        assert_eq!(board.score(), Score::new(4, 1));
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let mut board = Board::new();
        assert_eq!(board.apply(Piece::Black, 28), Err(PlacementError::Occupied));
    }

    #[test]
    fn test_no_capture_rejected() {
        let mut board = Board::new();
        // Corner is empty but captures nothing from the start position.
        assert_eq!(board.apply(Piece::Black, 0), Err(PlacementError::NoCapture));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut board = Board::new();
        assert_eq!(
            board.apply(Piece::Black, 64),
            Err(PlacementError::OutOfBounds)
        );
    }

    #[test]
    fn test_rejection_leaves_board_unchanged() {
        let mut board = Board::new();
        let before = board.clone();
        let _ = board.apply(Piece::Black, 0);
        let _ = board.apply(Piece::Black, 28);
        let _ = board.apply(Piece::White, 19);
        assert_eq!(board, before);
    }

    #[test]
    fn test_small_board_play() {
        // 4x4 start: 5=white 6=black 9=black 10=white.
        let mut board = Board::with_size(4, 4).expect("valid size");
        let flips = board.apply(Piece::Black, 4).expect("legal");
        assert_eq!(flips, vec![5]);
        // White can answer vertically: 2 captures the black piece at 6.
        assert!(board.legal_moves(Piece::White).contains(&2));
    }

    #[test]
    fn test_multi_direction_capture() {
        let mut board = Board::new();
        board.apply(Piece::Black, 19).expect("legal"); // flips 27
        board.apply(Piece::White, 20).expect("legal"); // flips 28
        // Black at 21 captures west (20) and southwest (28) at once.
        let mut flips = board.apply(Piece::Black, 21).expect("legal");
        flips.sort_unstable();
        assert_eq!(flips, vec![20, 28]);
        assert_eq!(board.score(), Score::new(6, 1));
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(Board::with_size(3, 8).is_err());
        assert!(Board::with_size(8, 7).is_err());
        assert!(Board::with_size(2, 2).is_err());
        assert!(Board::with_size(6, 10).is_ok());
    }
}
