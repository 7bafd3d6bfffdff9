//! The saved-game format: one wire-encoded move per line, nothing else.
//! Blank lines are ignored on load.

use chess::{History, MoveParseError, RulesProvider};

/// Render moves in play order, one per line.
pub fn render(moves: &[String]) -> String {
    let mut out = String::with_capacity(moves.len() * 6);
    for mv in moves {
        out.push_str(mv);
        out.push('\n');
    }
    out
}

/// Non-blank lines with their 1-based line numbers in the file.
pub fn lines(transcript: &str) -> impl Iterator<Item = (usize, &str)> {
    transcript
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadFailure {
    #[error("cannot decode move: {0}")]
    Decode(#[from] MoveParseError),
    #[error("illegal in the position reached")]
    Illegal,
    #[error("the game had already ended")]
    GameFinished,
}

/// The first line a load could not apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line} ({mv:?}): {reason}")]
pub struct LoadError {
    pub line: usize,
    pub mv: String,
    pub reason: LoadFailure,
}

/// What a load did. Lines before `failure` stay applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub applied: usize,
    pub failure: Option<LoadError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// The number of applied moves, or the failure if the load stopped early.
    pub fn check(self) -> Result<usize, LoadError> {
        match self.failure {
            None => Ok(self.applied),
            Some(e) => Err(e),
        }
    }
}

/// Reset `history` and replay `transcript` into it, stopping at the first
/// line that cannot be applied.
pub fn replay<R: RulesProvider>(history: &mut History<R>, transcript: &str) -> LoadReport {
    history.reset();
    let mut applied = 0;

    for (line, text) in lines(transcript) {
        let fail = |reason| LoadReport {
            applied,
            failure: Some(LoadError {
                line,
                mv: text.to_string(),
                reason,
            }),
        };

        if history.outcome().is_terminal() {
            return fail(LoadFailure::GameFinished);
        }
        let mv = match history.rules().decode(text) {
            Ok(mv) => mv,
            Err(e) => return fail(LoadFailure::Decode(e)),
        };
        if history.apply_move(mv).is_err() {
            return fail(LoadFailure::Illegal);
        }
        applied += 1;
    }

    LoadReport {
        applied,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Side;

    #[test]
    fn test_render_one_move_per_line() {
        let moves = vec!["e2e4".to_string(), "e7e5".to_string()];
        assert_eq!(render(&moves), "e2e4\ne7e5\n");
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_lines_skip_blanks_and_keep_numbers() {
        let text = "e2e4\n\n  e7e5  \r\n\ng1f3";
        let got: Vec<(usize, &str)> = lines(text).collect();
        assert_eq!(got, vec![(1, "e2e4"), (3, "e7e5"), (5, "g1f3")]);
    }

    #[test]
    fn test_replay_full_transcript() {
        let mut history = History::new();
        let report = replay(&mut history, "e2e4\ne7e5\ng1f3\n");
        assert!(report.is_complete());
        assert_eq!(report.applied, 3);
        assert_eq!(history.side_to_move(), Side::Black);
    }

    #[test]
    fn test_replay_stops_at_illegal_line() {
        let mut history = History::new();
        let report = replay(&mut history, "e2e4\ne7e5\nf1a6\ng1f3\n");
        assert_eq!(report.applied, 2);
        assert_eq!(
            report.failure,
            Some(LoadError {
                line: 3,
                mv: "f1a6".into(),
                reason: LoadFailure::Illegal,
            })
        );
        assert_eq!(history.snapshot(), vec!["e2e4", "e7e5"]);
        assert_eq!(history.side_to_move(), Side::White);
    }

    #[test]
    fn test_replay_reports_undecodable_line() {
        let mut history = History::new();
        let report = replay(&mut history, "e2e4\nNf3\n");
        let failure = report.failure.unwrap();
        assert_eq!(failure.line, 2);
        assert!(matches!(failure.reason, LoadFailure::Decode(_)));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_replay_rejects_moves_after_mate() {
        let mut history = History::new();
        let report = replay(&mut history, "f2f3\ne7e5\ng2g4\nd8h4\ne1f2\n");
        assert_eq!(report.applied, 4);
        assert_eq!(report.failure.unwrap().reason, LoadFailure::GameFinished);
    }

    #[test]
    fn test_replay_resets_previous_game() {
        let mut history = History::new();
        replay(&mut history, "d2d4\nd7d5\n");
        let report = replay(&mut history, "e2e4\n");
        assert_eq!(report.check().unwrap(), 1);
        assert_eq!(history.snapshot(), vec!["e2e4"]);
    }
}
