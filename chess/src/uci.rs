//! Coordinate move notation ("e2e4", "e7e8q") used on the wire and in saved games.
//!
//! Moves are always kept in standard form, where castling is written as the
//! king travelling two squares (e1g1). cozy-chess encodes castling as the king
//! capturing its own rook (e1h1); [`to_board_move`] and [`from_board_move`]
//! translate between the two at the rules boundary.

use cozy_chess::{Board, File, Move, Piece, Square};

use crate::converters::{format_piece, format_square, parse_promotion, parse_square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveParseError {
    #[error("move must be 4 or 5 characters: {0:?}")]
    Length(String),
    #[error("invalid square in move: {0:?}")]
    Square(String),
    #[error("invalid promotion piece in move: {0:?}")]
    Promotion(String),
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, MoveParseError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(MoveParseError::Length(s.to_string()));
    }

    let from = parse_square(&s[0..2]).ok_or_else(|| MoveParseError::Square(s.to_string()))?;
    let to = parse_square(&s[2..4]).ok_or_else(|| MoveParseError::Square(s.to_string()))?;

    let promotion = match s[4..].chars().next() {
        Some(c) => {
            Some(parse_promotion(c).ok_or_else(|| MoveParseError::Promotion(s.to_string()))?)
        }
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Translate a standard-form move into the form `board` understands.
///
/// Only a king on the e-file moving two squares to the g- or c-file is
/// rewritten, and only when the rewritten move is legal in `board`.
pub fn to_board_move(board: &Board, mv: Move) -> Move {
    if mv.promotion.is_some() || board.piece_on(mv.from) != Some(Piece::King) {
        return mv;
    }
    if mv.from.file() != File::E || mv.from.rank() != mv.to.rank() {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

/// Translate a move produced by `board` back to standard form.
pub fn from_board_move(board: &Board, mv: Move) -> Move {
    let castles = board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to).is_some()
        && board.color_on(mv.to) == board.color_on(mv.from);
    if !castles {
        return mv;
    }

    let king_file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Rank;

    const CASTLING_READY: &str = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_uci_move_round_trips_promotion() {
        let mv = parse_uci_move("a7a8n").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Knight));
        assert_eq!(format_uci_move(mv), "a7a8n");
    }

    #[test]
    fn test_parse_uci_move_errors() {
        assert!(matches!(parse_uci_move("e2"), Err(MoveParseError::Length(_))));
        assert!(matches!(parse_uci_move("e2e4qq"), Err(MoveParseError::Length(_))));
        assert!(matches!(parse_uci_move("z2e4"), Err(MoveParseError::Square(_))));
        assert!(matches!(parse_uci_move("e7e8k"), Err(MoveParseError::Promotion(_))));
        assert!(matches!(parse_uci_move("é2e4"), Err(MoveParseError::Length(_))));
    }

    #[test]
    fn test_castling_translation_both_ways() {
        let board: Board = CASTLING_READY.parse().unwrap();

        let standard = parse_uci_move("e1g1").unwrap();
        let internal = to_board_move(&board, standard);
        assert_eq!(format_uci_move(internal), "e1h1");
        assert_eq!(from_board_move(&board, internal), standard);

        let queenside = to_board_move(&board, parse_uci_move("e1c1").unwrap());
        assert_eq!(format_uci_move(queenside), "e1a1");
        assert_eq!(format_uci_move(from_board_move(&board, queenside)), "e1c1");
    }

    #[test]
    fn test_non_castling_moves_untouched() {
        let board = Board::default();
        let mv = parse_uci_move("g1f3").unwrap();
        assert_eq!(to_board_move(&board, mv), mv);
        assert_eq!(from_board_move(&board, mv), mv);
    }
}
