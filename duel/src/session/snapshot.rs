use chess::{MoveRecord, Outcome, Side};

use super::commands::SearchSettings;
use super::turn::{Mode, TurnState};

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub fen: String,
    pub side_to_move: Side,
    pub mode: Mode,
    pub turn: TurnState,
    pub outcome: Outcome,
    pub battle_active: bool,
    /// Wire-encoded moves in play order.
    pub moves: Vec<String>,
    /// The same moves with their move numbers and movers.
    pub records: Vec<MoveRecord>,
    pub settings: SearchSettings,
    pub workers: [WorkerStatus; 2],
}

impl SessionSnapshot {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn last_move(&self) -> Option<&str> {
        self.moves.last().map(String::as_str)
    }

    pub fn worker(&self, side: Side) -> &WorkerStatus {
        &self.workers[side.index()]
    }
}

/// Lifecycle of the worker session for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Not needed by any mode used so far.
    #[default]
    Absent,
    Starting,
    Ready,
    Unavailable(String),
}

impl WorkerStatus {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Unavailable(reason) => write!(f, "unavailable: {}", reason),
        }
    }
}
