use cozy_chess::Move;

use crate::rules::{RulesProvider, StandardRules};
use crate::types::{Outcome, Side};

/// Occurrences of one position that end the game as a draw.
const REPETITION_LIMIT: usize = 5;

/// Authoritative game record: start position, current position and the moves
/// between them. Every change goes through the rules provider.
#[derive(Debug)]
pub struct History<R: RulesProvider = StandardRules> {
    rules: R,
    start: R::Position,
    position: R::Position,
    records: Vec<MoveRecord>,
    /// One key per reached position, the start position included.
    repetition_keys: Vec<u64>,
}

/// A move as it was played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub mv: Move,
    pub wire: String,
    /// Full-move number, starting at 1.
    pub move_number: u32,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("No move to undo")]
    NoMoveToUndo,
    #[error("Recorded move at ply {ply} no longer replays")]
    Replay { ply: usize },
}

impl History<StandardRules> {
    pub fn new() -> Self {
        Self::with_rules(StandardRules)
    }
}

impl Default for History<StandardRules> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RulesProvider> History<R> {
    pub fn with_rules(rules: R) -> Self {
        let start = rules.initial_position();
        let key = rules.repetition_key(&start);
        Self {
            position: start.clone(),
            start,
            records: Vec::new(),
            repetition_keys: vec![key],
            rules,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn position(&self) -> &R::Position {
        &self.position
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived from the number of recorded moves, never stored.
    pub fn side_to_move(&self) -> Side {
        let side = Side::from_ply(self.records.len());
        debug_assert_eq!(side, self.rules.side_to_move(&self.position));
        side
    }

    pub fn fen(&self) -> String {
        self.rules.fen(&self.position)
    }

    pub fn start_fen(&self) -> String {
        self.rules.fen(&self.start)
    }

    pub fn moves(&self) -> Vec<Move> {
        self.records.iter().map(|r| r.mv).collect()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        if self.outcome().is_terminal() {
            return Vec::new();
        }
        self.rules.legal_moves(&self.position)
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.rules.is_legal(&self.position, mv)
    }

    /// Wire-encoded moves in play order.
    pub fn snapshot(&self) -> Vec<String> {
        self.records.iter().map(|r| r.wire.clone()).collect()
    }

    /// Classification of the current position, fivefold repetition included.
    pub fn outcome(&self) -> Outcome {
        match self.rules.classify(&self.position) {
            Outcome::Ongoing if self.repetitions() >= REPETITION_LIMIT => Outcome::Draw,
            outcome => outcome,
        }
    }

    /// How many times the current position has been reached.
    fn repetitions(&self) -> usize {
        let current = self.repetition_keys.last().copied();
        self.repetition_keys
            .iter()
            .filter(|k| Some(**k) == current)
            .count()
    }

    /// Play a move on the current position and return the new classification.
    pub fn apply_move(&mut self, mv: Move) -> Result<Outcome, HistoryError> {
        let wire = self.rules.encode(mv);
        if !self.rules.is_legal(&self.position, mv) {
            return Err(HistoryError::IllegalMove(wire));
        }
        let next = self
            .rules
            .apply(&self.position, mv)
            .ok_or_else(|| HistoryError::IllegalMove(wire.clone()))?;

        let ply = self.records.len();
        self.records.push(MoveRecord {
            mv,
            wire,
            move_number: (ply / 2 + 1) as u32,
            side: Side::from_ply(ply),
        });
        self.repetition_keys.push(self.rules.repetition_key(&next));
        self.position = next;

        tracing::trace!(ply, fen = %self.fen(), "move applied");
        Ok(self.outcome())
    }

    /// Remove the last move, rebuilding the position from the start.
    pub fn undo(&mut self) -> Result<MoveRecord, HistoryError> {
        let keep = self
            .records
            .len()
            .checked_sub(1)
            .ok_or(HistoryError::NoMoveToUndo)?;

        let rebuilt = self.replay(&self.records[..keep])?;
        self.position = rebuilt;
        self.repetition_keys.truncate(keep + 1);
        let undone = self.records.pop().ok_or(HistoryError::NoMoveToUndo)?;
        Ok(undone)
    }

    /// Back to the start position with an empty record.
    pub fn reset(&mut self) {
        self.position = self.start.clone();
        self.records.clear();
        self.repetition_keys.truncate(1);
    }

    fn replay(&self, records: &[MoveRecord]) -> Result<R::Position, HistoryError> {
        records
            .iter()
            .enumerate()
            .try_fold(self.start.clone(), |pos, (ply, record)| {
                self.rules
                    .apply(&pos, record.mv)
                    .ok_or(HistoryError::Replay { ply })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move;
    use proptest::prelude::*;

    fn mv(s: &str) -> Move {
        parse_uci_move(s).unwrap()
    }

    #[test]
    fn test_apply_records_move_number_and_side() {
        let mut history = History::new();
        history.apply_move(mv("e2e4")).unwrap();
        history.apply_move(mv("e7e5")).unwrap();
        history.apply_move(mv("g1f3")).unwrap();

        let records = history.records();
        assert_eq!(records[0].move_number, 1);
        assert_eq!(records[0].side, Side::White);
        assert_eq!(records[1].move_number, 1);
        assert_eq!(records[1].side, Side::Black);
        assert_eq!(records[2].move_number, 2);
        assert_eq!(records[2].wire, "g1f3");
        assert_eq!(history.side_to_move(), Side::Black);
    }

    #[test]
    fn test_illegal_move_leaves_state_untouched() {
        let mut history = History::new();
        history.apply_move(mv("e2e4")).unwrap();
        let before = history.position().clone();

        let err = history.apply_move(mv("e2e4")).unwrap_err();
        assert_eq!(err, HistoryError::IllegalMove("e2e4".into()));
        assert_eq!(history.position(), &before);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut history = History::new();
        assert_eq!(history.undo().unwrap_err(), HistoryError::NoMoveToUndo);
        assert_eq!(history.side_to_move(), Side::White);
    }

    #[test]
    fn test_undo_returns_removed_record() {
        let mut history = History::new();
        history.apply_move(mv("d2d4")).unwrap();
        history.apply_move(mv("d7d5")).unwrap();

        let undone = history.undo().unwrap();
        assert_eq!(undone.wire, "d7d5");
        assert_eq!(history.snapshot(), vec!["d2d4".to_string()]);
        assert_eq!(history.side_to_move(), Side::Black);
    }

    #[test]
    fn test_reset_restores_start() {
        let mut history = History::new();
        history.apply_move(mv("e2e4")).unwrap();
        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.fen(), history.start_fen());
        assert_eq!(history.legal_moves().len(), 20);
    }

    #[test]
    fn test_checkmate_outcome_and_no_legal_moves() {
        let mut history = History::new();
        for m in ["f2f3", "e7e5", "g2g4"] {
            assert_eq!(history.apply_move(mv(m)).unwrap(), Outcome::Ongoing);
        }
        assert_eq!(history.apply_move(mv("d8h4")).unwrap(), Outcome::BlackWins);
        assert!(history.legal_moves().is_empty());
    }

    #[test]
    fn test_fivefold_repetition_is_draw() {
        let mut history = History::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let mut last = Outcome::Ongoing;
        for _ in 0..4 {
            for m in shuffle {
                last = history.apply_move(mv(m)).unwrap();
            }
        }
        assert_eq!(last, Outcome::Draw);

        history.undo().unwrap();
        assert_eq!(history.outcome(), Outcome::Ongoing);
    }

    proptest! {
        #[test]
        fn prop_undo_restores_previous_position(choices in prop::collection::vec(any::<prop::sample::Index>(), 1..40)) {
            let mut history = History::new();
            for choice in choices {
                let legal = history.legal_moves();
                if legal.is_empty() {
                    break;
                }
                let before = history.position().clone();
                let len = history.len();

                history.apply_move(*choice.get(&legal)).unwrap();
                history.undo().unwrap();
                prop_assert_eq!(history.position(), &before);
                prop_assert_eq!(history.len(), len);
                prop_assert_eq!(history.side_to_move(), Side::from_ply(len));

                history.apply_move(*choice.get(&legal)).unwrap();
                prop_assert_eq!(history.side_to_move(), Side::from_ply(len + 1));
            }
        }
    }
}
