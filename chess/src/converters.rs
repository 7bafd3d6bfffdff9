// Conversion helpers between coordinate strings and cozy-chess types

use cozy_chess::{File, Piece, Rank, Square};

/// Parse a square string like "e2" to cozy_chess::Square
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Parse a file character like 'e' to cozy_chess::File
pub fn parse_file(c: char) -> Option<File> {
    match c.to_ascii_lowercase() {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

/// Parse a rank character like '2' to cozy_chess::Rank
pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

/// Parse a promotion letter. Only pieces a pawn can become are accepted.
pub fn parse_promotion(c: char) -> Option<Piece> {
    match c {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

/// Format a square to string like "e2"
pub fn format_square(sq: Square) -> String {
    format!("{}{}", format_file(sq.file()), format_rank(sq.rank()))
}

/// Format a file to character
pub fn format_file(f: File) -> char {
    match f {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

/// Format a rank to character
pub fn format_rank(r: Rank) -> char {
    match r {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

/// Lowercase piece letter as used in coordinate notation
pub fn format_piece(p: Piece) -> char {
    match p {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_square() {
        assert_eq!(parse_square("e2"), Some(Square::new(File::E, Rank::Second)));
        assert_eq!(parse_square("H8"), Some(Square::new(File::H, Rank::Eighth)));
        assert_eq!(parse_square("i1"), None);
        assert_eq!(parse_square("e"), None);
        assert_eq!(parse_square("e22"), None);
    }

    #[test]
    fn test_format_square() {
        assert_eq!(format_square(Square::new(File::A, Rank::First)), "a1");
        assert_eq!(format_square(Square::new(File::G, Rank::Seventh)), "g7");
    }

    #[test]
    fn test_parse_promotion_rejects_king_and_pawn() {
        assert_eq!(parse_promotion('n'), Some(Piece::Knight));
        assert_eq!(parse_promotion('k'), None);
        assert_eq!(parse_promotion('p'), None);
    }
}
