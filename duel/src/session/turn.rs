//! Who moves next. Pure decision logic for the turn coordinator.

use chess::{Outcome, Side};

/// Which sides are driven by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HumanVsHuman,
    HumanVsWorker { human: Side },
    WorkerVsWorker,
}

impl Default for Mode {
    fn default() -> Self {
        Self::HumanVsWorker { human: Side::White }
    }
}

impl Mode {
    pub fn is_worker(self, side: Side) -> bool {
        match self {
            Self::HumanVsHuman => false,
            Self::HumanVsWorker { human } => side != human,
            Self::WorkerVsWorker => true,
        }
    }

    pub fn worker_sides(self) -> impl Iterator<Item = Side> {
        Side::BOTH.into_iter().filter(move |s| self.is_worker(*s))
    }

    /// Accepts `hvh`, `hvw` (human plays white), `hvw-black` and `wvw`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hvh" | "human" => Some(Self::HumanVsHuman),
            "hvw" | "hvw-white" => Some(Self::HumanVsWorker { human: Side::White }),
            "hvw-black" => Some(Self::HumanVsWorker { human: Side::Black }),
            "wvw" | "battle" => Some(Self::WorkerVsWorker),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HumanVsHuman => write!(f, "human vs human"),
            Self::HumanVsWorker { human } => write!(f, "human ({}) vs worker", human),
            Self::WorkerVsWorker => write!(f, "worker vs worker"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing is dispatched until the next user operation.
    Idle,
    AwaitingHumanInput,
    /// Waiting on the worker for this side, either starting or searching.
    WorkerThinking(Side),
    GameOver(Outcome),
    /// Worker-vs-worker mode with the battle stopped.
    BattlePaused,
}

/// Everything the next turn depends on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TurnInputs {
    pub outcome: Outcome,
    pub mode: Mode,
    pub side_to_move: Side,
    pub battle_active: bool,
    pub halted: bool,
    /// Whether the side to move still has a usable worker.
    pub worker_usable: bool,
}

impl TurnState {
    /// The terminal check always comes first.
    pub(crate) fn derive(inputs: &TurnInputs) -> Self {
        if inputs.outcome.is_terminal() {
            return Self::GameOver(inputs.outcome);
        }
        let side = inputs.side_to_move;
        // A side whose worker is gone is played by hand, battle or not.
        if !(inputs.mode.is_worker(side) && inputs.worker_usable) {
            return Self::AwaitingHumanInput;
        }
        if inputs.mode == Mode::WorkerVsWorker && !inputs.battle_active {
            return Self::BattlePaused;
        }
        if inputs.halted {
            return Self::Idle;
        }
        Self::WorkerThinking(side)
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self, Self::GameOver(_))
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingHumanInput => write!(f, "awaiting human input"),
            Self::WorkerThinking(side) => write!(f, "{} worker thinking", side),
            Self::GameOver(outcome) => write!(f, "game over ({})", outcome),
            Self::BattlePaused => write!(f, "battle paused"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(mode: Mode, side_to_move: Side) -> TurnInputs {
        TurnInputs {
            outcome: Outcome::Ongoing,
            mode,
            side_to_move,
            battle_active: false,
            halted: false,
            worker_usable: true,
        }
    }

    #[test]
    fn test_human_vs_human_always_waits_for_input() {
        for side in Side::BOTH {
            assert_eq!(
                TurnState::derive(&inputs(Mode::HumanVsHuman, side)),
                TurnState::AwaitingHumanInput
            );
        }
    }

    #[test]
    fn test_human_vs_worker_alternates() {
        let mode = Mode::HumanVsWorker { human: Side::White };
        assert_eq!(
            TurnState::derive(&inputs(mode, Side::White)),
            TurnState::AwaitingHumanInput
        );
        assert_eq!(
            TurnState::derive(&inputs(mode, Side::Black)),
            TurnState::WorkerThinking(Side::Black)
        );
    }

    #[test]
    fn test_unusable_worker_falls_back_to_human() {
        let mut i = inputs(Mode::HumanVsWorker { human: Side::White }, Side::Black);
        i.worker_usable = false;
        assert_eq!(TurnState::derive(&i), TurnState::AwaitingHumanInput);
    }

    #[test]
    fn test_terminal_outcome_wins_over_everything() {
        let mut i = inputs(Mode::WorkerVsWorker, Side::White);
        i.battle_active = true;
        i.halted = true;
        i.outcome = Outcome::Draw;
        assert_eq!(TurnState::derive(&i), TurnState::GameOver(Outcome::Draw));
    }

    #[test]
    fn test_battle_flag_gates_worker_vs_worker() {
        let mut i = inputs(Mode::WorkerVsWorker, Side::Black);
        assert_eq!(TurnState::derive(&i), TurnState::BattlePaused);
        i.battle_active = true;
        assert_eq!(TurnState::derive(&i), TurnState::WorkerThinking(Side::Black));
    }

    #[test]
    fn test_battle_mode_side_without_worker_is_human() {
        let mut i = inputs(Mode::WorkerVsWorker, Side::White);
        i.worker_usable = false;
        assert_eq!(TurnState::derive(&i), TurnState::AwaitingHumanInput);
        i.battle_active = true;
        assert_eq!(TurnState::derive(&i), TurnState::AwaitingHumanInput);

        // The other side still waits on the battle flag.
        let i = inputs(Mode::WorkerVsWorker, Side::Black);
        assert_eq!(TurnState::derive(&i), TurnState::BattlePaused);
    }

    #[test]
    fn test_halted_coordinator_is_idle() {
        let mut i = inputs(Mode::HumanVsWorker { human: Side::White }, Side::Black);
        i.halted = true;
        assert_eq!(TurnState::derive(&i), TurnState::Idle);
    }

    #[test]
    fn test_mode_parse_and_worker_sides() {
        assert_eq!(Mode::parse("HVH"), Some(Mode::HumanVsHuman));
        assert_eq!(
            Mode::parse("hvw-black"),
            Some(Mode::HumanVsWorker { human: Side::Black })
        );
        assert_eq!(Mode::parse("chess960"), None);

        let sides: Vec<Side> = Mode::HumanVsWorker { human: Side::Black }
            .worker_sides()
            .collect();
        assert_eq!(sides, vec![Side::White]);
        assert_eq!(Mode::WorkerVsWorker.worker_sides().count(), 2);
        assert_eq!(Mode::HumanVsHuman.worker_sides().count(), 0);
    }
}
