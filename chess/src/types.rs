//! Side and outcome types owned by the project.
//! cozy-chess colours stay an implementation detail of the rules adapter.

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::White, Side::Black];

    /// Side to move after `ply` half-moves from the standard start.
    pub fn from_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            Self::White
        } else {
            Self::Black
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Stable array index, used for per-side tables.
    pub fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Some(Self::White),
            "black" | "b" => Some(Self::Black),
            _ => None,
        }
    }
}

impl From<cozy_chess::Color> for Side {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<Side> for cozy_chess::Color {
    fn from(s: Side) -> Self {
        match s {
            Side::White => Self::White,
            Side::Black => Self::Black,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal-state classification reported by the rules provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ongoing,
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => Self::WhiteWins,
            Side::Black => Self::BlackWins,
        }
    }

    /// Result tag in the usual score notation.
    pub fn result_str(self) -> &'static str {
        match self {
            Self::Ongoing => "*",
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::WhiteWins => write!(f, "white wins"),
            Self::BlackWins => write!(f, "black wins"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_ply_parity() {
        assert_eq!(Side::from_ply(0), Side::White);
        assert_eq!(Side::from_ply(1), Side::Black);
        assert_eq!(Side::from_ply(42), Side::White);
    }

    #[test]
    fn test_side_parse() {
        assert_eq!(Side::parse("Black"), Some(Side::Black));
        assert_eq!(Side::parse("w"), Some(Side::White));
        assert_eq!(Side::parse("red"), None);
    }

    #[test]
    fn test_outcome_result_str() {
        assert_eq!(Outcome::win_for(Side::Black).result_str(), "0-1");
        assert!(!Outcome::Ongoing.is_terminal());
        assert!(Outcome::Draw.is_terminal());
    }
}
