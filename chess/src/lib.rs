//! Chess rules adapter and game record for the duel orchestrator.
//!
//! Legality, move generation and game-end detection come from cozy-chess
//! behind [`RulesProvider`]; [`History`] keeps the authoritative position
//! and move list on top of it.

pub mod converters;
pub mod fen;
pub mod history;
pub mod rules;
pub mod types;
pub mod uci;

pub use converters::*;
pub use fen::{FenError, START_FEN};
pub use history::{History, HistoryError, MoveRecord};
pub use rules::{RulesProvider, StandardRules};
pub use types::{Outcome, Side};
pub use uci::{format_uci_move, parse_uci_move, MoveParseError};

pub use cozy_chess::{Move, Piece, Square};
