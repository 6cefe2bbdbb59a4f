//! Board legality and capture properties.

use reversi_engine::{Board, Cell, Piece};

/// Independent reference implementation of the sandwich rule, used to
/// cross-check the board's direction scan over reachable positions.
fn reference_is_legal(board: &Board, piece: Piece, index: usize) -> bool {
    let width = board.width() as i32;
    let height = board.height() as i32;
    if board.get(index) != Some(Cell::Empty) {
        return false;
    }
    let row = index as i32 / width;
    let col = index as i32 % width;
    for dr in -1..=1 {
        for dc in -1..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let mut r = row + dr;
            let mut c = col + dc;
            let mut opponents = 0;
            loop {
                if r < 0 || r >= height || c < 0 || c >= width {
                    break;
                }
                match board.get((r * width + c) as usize) {
                    Some(Cell::Occupied(p)) if p == piece.opponent() => opponents += 1,
                    Some(Cell::Occupied(_)) => {
                        if opponents > 0 {
                            return true;
                        }
                        break;
                    }
                    _ => break,
                }
                r += dr;
                c += dc;
            }
        }
    }
    false
}

fn assert_matches_reference(board: &Board) {
    for piece in [Piece::Black, Piece::White] {
        let legal = board.legal_moves(piece);
        for index in 0..board.cells().len() {
            assert_eq!(
                legal.contains(&index),
                reference_is_legal(board, piece, index),
                "disagreement at cell {index} for {piece:?}"
            );
        }
    }
}

/// Plays a deterministic first-legal-move game, cross-checking every
/// reachable position against the reference implementation.
#[test]
fn test_legal_moves_match_brute_force_over_a_full_game() {
    let mut board = Board::new();
    let mut piece = Piece::Black;
    let mut positions = 0;

    loop {
        assert_matches_reference(&board);
        positions += 1;

        let moves = board.legal_moves(piece);
        if let Some(&cell) = moves.first() {
            board.apply(piece, cell).expect("enumerated move is legal");
            piece = piece.opponent();
        } else if board.has_legal_move(piece.opponent()) {
            piece = piece.opponent();
        } else {
            break;
        }
    }

    assert!(positions > 30, "playout should visit many positions");
    let score = board.score();
    assert!(score.black + score.white <= 64);
    // Terminal: neither side can move.
    assert!(!board.has_legal_move(Piece::Black));
    assert!(!board.has_legal_move(Piece::White));
}

#[test]
fn test_every_legal_move_flips_at_least_one_piece() {
    let mut board = Board::new();
    let mut piece = Piece::Black;

    for _ in 0..20 {
        let moves = board.legal_moves(piece);
        let Some(&cell) = moves.first() else { break };
        let before = board.score();
        let flipped = board.apply(piece, cell).expect("legal");
        assert!(!flipped.is_empty(), "a legal move must capture");
        let after = board.score();
        // One piece placed, flips change color but not the total.
        assert_eq!(after.black + after.white, before.black + before.white + 1);
        piece = piece.opponent();
        if !board.has_legal_move(piece) {
            piece = piece.opponent();
        }
    }
}

#[test]
fn test_rejected_apply_is_repeatable_noop() {
    let mut board = Board::new();
    let before = board.clone();
    for _ in 0..3 {
        assert!(board.apply(Piece::White, 19).is_err()); // not white's capture
        assert!(board.apply(Piece::Black, 0).is_err()); // no capture
        assert!(board.apply(Piece::Black, 27).is_err()); // occupied
    }
    assert_eq!(board, before);
}

#[test]
fn test_configurable_dimensions() {
    let board = Board::with_size(6, 10).expect("valid size");
    assert_eq!(board.cells().len(), 60);
    assert_eq!(board.score().black, 2);
    assert_eq!(board.score().white, 2);
    assert_matches_reference(&board);
}
