use chess::{HistoryError, Move, Side, Square};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use super::turn::Mode;
use crate::persistence::transcript::{LoadError, LoadReport};
use crate::persistence::PersistenceError;

pub const MIN_TIME_BUDGET_SECS: f64 = 0.1;
pub const MAX_TIME_BUDGET_SECS: f64 = 60.0;
pub const DEFAULT_TIME_BUDGET_SECS: f64 = 2.0;
pub const MAX_SKILL_LEVEL: u8 = 20;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("No move to undo")]
    NoMoveToUndo,
    #[error("Not a human turn")]
    NotHumanTurn,
    #[error("Game is over")]
    GameOver,
    #[error("The {0} worker has a request in flight")]
    WorkerBusy(Side),
    #[error("Workers are not ready")]
    WorkersNotReady,
    #[error("A battle needs worker-vs-worker mode")]
    BattleRequiresWorkers,
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
    /// Never returned to callers; only logged when a worker reply is discarded.
    #[error("Discarded stale reply from the {side} worker (request {request_id})")]
    StaleResponse { side: Side, request_id: u64 },
    #[error("Load stopped at {0}")]
    Load(LoadError),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<HistoryError> for SessionError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::IllegalMove(wire) => Self::IllegalMove(wire),
            HistoryError::NoMoveToUndo => Self::NoMoveToUndo,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PersistenceError> for SessionError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Limits every worker request is issued with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub time_budget: Duration,
    pub skill_level: u8,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs_f64(DEFAULT_TIME_BUDGET_SECS),
            skill_level: MAX_SKILL_LEVEL,
        }
    }
}

impl SearchSettings {
    pub fn time_budget(secs: f64) -> Result<Duration, SessionError> {
        if !(MIN_TIME_BUDGET_SECS..=MAX_TIME_BUDGET_SECS).contains(&secs) {
            return Err(SessionError::InvalidSetting(format!(
                "time budget must be {}-{} seconds, got {}",
                MIN_TIME_BUDGET_SECS, MAX_TIME_BUDGET_SECS, secs
            )));
        }
        Ok(Duration::from_secs_f64(secs))
    }

    pub fn skill_level(level: u8) -> Result<u8, SessionError> {
        if level > MAX_SKILL_LEVEL {
            return Err(SessionError::InvalidSetting(format!(
                "skill level must be 0-{}, got {}",
                MAX_SKILL_LEVEL, level
            )));
        }
        Ok(level)
    }
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    NewGame {
        reply: Reply<SessionSnapshot>,
    },
    MakeMove {
        mv: Move,
        reply: Reply<SessionSnapshot>,
    },
    Undo {
        reply: Reply<SessionSnapshot>,
    },
    Load {
        transcript: String,
        reply: Reply<LoadReport>,
    },
    StartBattle {
        reply: Reply<SessionSnapshot>,
    },
    StopBattle {
        reply: Reply<SessionSnapshot>,
    },
    SetTimeBudget {
        secs: f64,
        reply: Reply<SessionSnapshot>,
    },
    SetSkillLevel {
        level: u8,
        reply: Reply<SessionSnapshot>,
    },
    SetMode {
        mode: Mode,
        reply: Reply<SessionSnapshot>,
    },
    GetLegalMoves {
        from: Option<Square>,
        reply: oneshot::Sender<Vec<Move>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_budget_bounds() {
        assert_eq!(
            SearchSettings::time_budget(0.1).unwrap(),
            Duration::from_millis(100)
        );
        assert!(SearchSettings::time_budget(60.0).is_ok());
        assert!(matches!(
            SearchSettings::time_budget(0.05),
            Err(SessionError::InvalidSetting(_))
        ));
        assert!(SearchSettings::time_budget(61.0).is_err());
        assert!(SearchSettings::time_budget(f64::NAN).is_err());
    }

    #[test]
    fn test_skill_level_bounds() {
        assert_eq!(SearchSettings::skill_level(0).unwrap(), 0);
        assert_eq!(SearchSettings::skill_level(20).unwrap(), 20);
        assert!(SearchSettings::skill_level(21).is_err());
    }

    #[test]
    fn test_history_errors_map_to_session_errors() {
        assert_eq!(
            SessionError::from(HistoryError::IllegalMove("e2e5".into())),
            SessionError::IllegalMove("e2e5".into())
        );
        assert_eq!(
            SessionError::from(HistoryError::NoMoveToUndo),
            SessionError::NoMoveToUndo
        );
        assert!(matches!(
            SessionError::from(HistoryError::Replay { ply: 3 }),
            SessionError::Internal(_)
        ));
    }
}
