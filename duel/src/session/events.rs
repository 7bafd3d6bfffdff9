use chess::{Outcome, Side};

use super::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any change.
    StateChanged(SessionSnapshot),
    WorkerReady {
        side: Side,
    },
    /// A worker move was applied. `mv` is the wire encoding.
    WorkerMoved {
        side: Side,
        mv: String,
    },
    /// The worker could not be started or has gone away; the side is
    /// played by the human from now on.
    WorkerUnavailable {
        side: Side,
        reason: String,
    },
    /// A request failed or produced an illegal move.
    WorkerFailed {
        side: Side,
        reason: String,
    },
    GameOver {
        outcome: Outcome,
    },
}
