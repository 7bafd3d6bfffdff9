//! The rules provider boundary.
//!
//! Orchestration code never inspects a position directly. It asks a
//! [`RulesProvider`] whether a move is legal, to produce the next position,
//! and how the game stands. [`StandardRules`] answers with cozy-chess.

use cozy_chess::{BitBoard, Board, Color, GameStatus, Move, Piece};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::types::{Outcome, Side};
use crate::uci::{format_uci_move, from_board_move, parse_uci_move, to_board_move, MoveParseError};

pub trait RulesProvider: Send + Sync + 'static {
    type Position: Clone + PartialEq + std::fmt::Debug + Send + Sync;

    fn initial_position(&self) -> Self::Position;

    fn position_from_fen(&self, fen: &str) -> Result<Self::Position, FenError>;

    fn is_legal(&self, position: &Self::Position, mv: Move) -> bool;

    /// Play `mv` on a copy of `position`. `None` when the move is illegal.
    fn apply(&self, position: &Self::Position, mv: Move) -> Option<Self::Position>;

    fn classify(&self, position: &Self::Position) -> Outcome;

    fn side_to_move(&self, position: &Self::Position) -> Side;

    fn fen(&self, position: &Self::Position) -> String;

    /// Every legal move in standard coordinate form.
    fn legal_moves(&self, position: &Self::Position) -> Vec<Move>;

    /// Key identifying a position for repetition counting. Move counters
    /// are not part of it.
    fn repetition_key(&self, position: &Self::Position) -> u64;

    fn encode(&self, mv: Move) -> String {
        format_uci_move(mv)
    }

    fn decode(&self, wire: &str) -> Result<Move, MoveParseError> {
        parse_uci_move(wire)
    }
}

/// Orthodox chess via cozy-chess.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RulesProvider for StandardRules {
    type Position = Board;

    fn initial_position(&self) -> Board {
        Board::default()
    }

    fn position_from_fen(&self, fen: &str) -> Result<Board, FenError> {
        parse_fen(fen)
    }

    fn is_legal(&self, position: &Board, mv: Move) -> bool {
        position.is_legal(to_board_move(position, mv))
    }

    fn apply(&self, position: &Board, mv: Move) -> Option<Board> {
        let mut next = position.clone();
        next.try_play(to_board_move(position, mv)).ok()?;
        Some(next)
    }

    fn classify(&self, position: &Board) -> Outcome {
        match position.status() {
            // The side to move has been mated.
            GameStatus::Won => Outcome::win_for(Side::from(position.side_to_move()).opposite()),
            GameStatus::Drawn => Outcome::Draw,
            GameStatus::Ongoing if insufficient_material(position) => Outcome::Draw,
            GameStatus::Ongoing => Outcome::Ongoing,
        }
    }

    fn side_to_move(&self, position: &Board) -> Side {
        position.side_to_move().into()
    }

    fn fen(&self, position: &Board) -> String {
        format_fen(position)
    }

    fn legal_moves(&self, position: &Board) -> Vec<Move> {
        let mut moves = Vec::new();
        position.generate_moves(|mvs| {
            moves.extend(mvs.into_iter().map(|mv| from_board_move(position, mv)));
            false
        });
        moves
    }

    fn repetition_key(&self, position: &Board) -> u64 {
        position.hash()
    }
}

/// Neither side can mate by any sequence of moves.
fn insufficient_material(board: &Board) -> bool {
    side_cannot_mate(board, Color::White) && side_cannot_mate(board, Color::Black)
}

fn side_cannot_mate(board: &Board, color: Color) -> bool {
    let ours = board.colors(color);
    let majors = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !(ours & majors).is_empty() {
        return false;
    }
    if !(ours & board.pieces(Piece::Knight)).is_empty() {
        // A lone knight mates only with help from enemy minors or rooks.
        let helpers = board.colors(!color) & !board.pieces(Piece::King) & !board.pieces(Piece::Queen);
        return ours.len() <= 2 && helpers.is_empty();
    }
    if !(ours & board.pieces(Piece::Bishop)).is_empty() {
        // Bishops all on one square colour can never mate.
        let bishops = board.pieces(Piece::Bishop);
        let one_colour = (bishops & BitBoard::DARK_SQUARES).is_empty()
            || (bishops & BitBoard::LIGHT_SQUARES).is_empty();
        return one_colour
            && board.pieces(Piece::Pawn).is_empty()
            && board.pieces(Piece::Knight).is_empty();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move;

    fn play(rules: &StandardRules, moves: &[&str]) -> Board {
        moves.iter().fold(rules.initial_position(), |pos, m| {
            rules
                .apply(&pos, parse_uci_move(m).unwrap())
                .unwrap_or_else(|| panic!("{m} should be legal"))
        })
    }

    #[test]
    fn test_initial_position_has_twenty_moves() {
        let rules = StandardRules;
        let start = rules.initial_position();
        assert_eq!(rules.legal_moves(&start).len(), 20);
        assert_eq!(rules.side_to_move(&start), Side::White);
        assert_eq!(rules.classify(&start), Outcome::Ongoing);
    }

    #[test]
    fn test_apply_rejects_illegal_move() {
        let rules = StandardRules;
        let start = rules.initial_position();
        let mv = parse_uci_move("e2e5").unwrap();
        assert!(!rules.is_legal(&start, mv));
        assert!(rules.apply(&start, mv).is_none());
    }

    #[test]
    fn test_fools_mate_is_black_win() {
        let rules = StandardRules;
        let pos = play(&rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(rules.classify(&pos), Outcome::BlackWins);
        assert!(rules.legal_moves(&pos).is_empty());
    }

    #[test]
    fn test_stalemate_is_draw() {
        let rules = StandardRules;
        let pos = rules.position_from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(rules.classify(&pos), Outcome::Draw);
    }

    #[test]
    fn test_bare_kings_is_draw() {
        let rules = StandardRules;
        let pos = rules.position_from_fen("8/8/4k3/8/8/3NK3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.classify(&pos), Outcome::Draw);
        let pos = rules.position_from_fen("8/8/4k3/8/8/3RK3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.classify(&pos), Outcome::Ongoing);
    }

    #[test]
    fn test_bishops_on_one_colour_is_draw() {
        let rules = StandardRules;
        let same = rules.position_from_fen("6b1/8/4k3/8/8/3BK3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.classify(&same), Outcome::Draw);
        let opposite = rules.position_from_fen("7b/8/4k3/8/8/3BK3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.classify(&opposite), Outcome::Ongoing);
    }

    #[test]
    fn test_knight_against_minor_can_still_mate() {
        let rules = StandardRules;
        let pos = rules.position_from_fen("7b/8/4k3/8/8/3NK3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.classify(&pos), Outcome::Ongoing);
    }

    #[test]
    fn test_castling_in_standard_form() {
        let rules = StandardRules;
        let pos = play(&rules, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"]);
        let castle = parse_uci_move("e1g1").unwrap();
        assert!(rules.is_legal(&pos, castle));
        assert!(rules.legal_moves(&pos).contains(&castle));

        let after = rules.apply(&pos, castle).unwrap();
        assert!(rules.fen(&after).starts_with("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b"));
    }

    #[test]
    fn test_repetition_key_ignores_move_counters() {
        let rules = StandardRules;
        let start = rules.initial_position();
        let back = play(&rules, &["g1f3", "g8f6", "f3g1", "f6g8"]);
        assert_ne!(start, back);
        assert_eq!(rules.repetition_key(&start), rules.repetition_key(&back));
    }
}
