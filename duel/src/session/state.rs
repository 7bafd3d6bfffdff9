use chess::{format_uci_move, History, Move, Side, Square};
use engine::{SearchRequest, WorkerError, WorkerLauncher};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::commands::{SearchSettings, SessionError};
use super::events::SessionEvent;
use super::snapshot::{SessionSnapshot, WorkerStatus};
use super::turn::{Mode, TurnInputs, TurnState};
use super::worker::{WorkerMessage, WorkerSession};
use crate::persistence::transcript::{self, LoadReport};

/// The request a side is waiting on, and the epoch it was issued in.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    request_id: u64,
    epoch: u64,
}

#[derive(Default)]
struct WorkerSlot {
    status: WorkerStatus,
    session: Option<WorkerSession>,
    in_flight: Option<InFlight>,
}

/// Internal mutable state, owned entirely by the session actor. No locks.
///
/// `epoch` changes whenever a pending worker answer must no longer be
/// applied: any history change, a mode switch, a stopped battle.
pub(crate) struct GameSession {
    pub session_id: String,
    history: History,
    mode: Mode,
    battle_active: bool,
    turn: TurnState,
    settings: SearchSettings,
    slots: [WorkerSlot; 2],
    epoch: u64,
    next_request_id: u64,
    /// Set after a worker failure outside a battle; cleared by the next user operation.
    halted: bool,
    launcher: Option<Arc<dyn WorkerLauncher>>,
    worker_tx: mpsc::Sender<WorkerMessage>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl GameSession {
    pub fn new(
        session_id: String,
        mode: Mode,
        settings: SearchSettings,
        launcher: Option<Arc<dyn WorkerLauncher>>,
        worker_tx: mpsc::Sender<WorkerMessage>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session_id,
            history: History::new(),
            mode,
            battle_active: false,
            turn: TurnState::Idle,
            settings,
            slots: Default::default(),
            epoch: 0,
            next_request_id: 1,
            halted: false,
            launcher,
            worker_tx,
            event_tx,
        }
    }

    /// Start the workers the initial mode needs and settle the first turn.
    pub fn start(&mut self) {
        self.ensure_workers();
        self.settle();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            fen: self.history.fen(),
            side_to_move: self.history.side_to_move(),
            mode: self.mode,
            turn: self.turn,
            outcome: self.history.outcome(),
            battle_active: self.battle_active,
            moves: self.history.snapshot(),
            records: self.history.records().to_vec(),
            settings: self.settings,
            workers: [
                self.slots[0].status.clone(),
                self.slots[1].status.clone(),
            ],
        }
    }

    fn slot(&self, side: Side) -> &WorkerSlot {
        &self.slots[side.index()]
    }

    fn slot_mut(&mut self, side: Side) -> &mut WorkerSlot {
        &mut self.slots[side.index()]
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    // ----- operations -----

    pub fn new_game(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.pause_battle("new game");
        self.history.reset();
        tracing::info!("New game");
        self.after_user_change();
        Ok(self.snapshot())
    }

    pub fn make_move(&mut self, mv: Move) -> Result<SessionSnapshot, SessionError> {
        if self.turn.is_game_over() {
            return Err(SessionError::GameOver);
        }
        if self.turn != TurnState::AwaitingHumanInput {
            return Err(SessionError::NotHumanTurn);
        }

        self.history.apply_move(mv)?;
        tracing::info!("Human played {}", format_uci_move(mv));
        self.epoch += 1;
        self.settle();
        Ok(self.snapshot())
    }

    pub fn undo(&mut self) -> Result<SessionSnapshot, SessionError> {
        let into = self
            .history
            .last()
            .ok_or(SessionError::NoMoveToUndo)?
            .side;
        if self.slot(into).in_flight.is_some() {
            return Err(SessionError::WorkerBusy(into));
        }

        let undone = self.history.undo()?;
        tracing::info!("Undid {}", undone.wire);
        self.pause_battle("undo");
        self.after_user_change();
        Ok(self.snapshot())
    }

    pub fn load(&mut self, text: &str) -> Result<LoadReport, SessionError> {
        self.pause_battle("load");
        let report = transcript::replay(&mut self.history, text);
        match &report.failure {
            None => tracing::info!("Loaded {} moves", report.applied),
            Some(e) => tracing::warn!("Partial load, {} moves applied: {}", report.applied, e),
        }
        self.after_user_change();
        Ok(report)
    }

    pub fn start_battle(&mut self) -> Result<SessionSnapshot, SessionError> {
        if self.mode != Mode::WorkerVsWorker {
            return Err(SessionError::BattleRequiresWorkers);
        }
        if self.history.outcome().is_terminal() {
            return Err(SessionError::GameOver);
        }
        // Unavailable sides are played by hand; anything still starting blocks.
        let statuses = Side::BOTH.map(|s| &self.slot(s).status);
        let settled = statuses
            .iter()
            .all(|st| matches!(st, WorkerStatus::Ready | WorkerStatus::Unavailable(_)));
        if !settled || !statuses.contains(&&WorkerStatus::Ready) {
            return Err(SessionError::WorkersNotReady);
        }

        if !self.battle_active {
            tracing::info!("Battle started");
            self.battle_active = true;
            self.halted = false;
            self.settle();
        }
        Ok(self.snapshot())
    }

    pub fn stop_battle(&mut self) -> Result<SessionSnapshot, SessionError> {
        if self.battle_active {
            self.pause_battle("stop requested");
            self.settle();
        }
        Ok(self.snapshot())
    }

    pub fn set_time_budget(&mut self, secs: f64) -> Result<SessionSnapshot, SessionError> {
        self.settings.time_budget = SearchSettings::time_budget(secs)?;
        tracing::info!("Time budget set to {:?}", self.settings.time_budget);
        self.emit(SessionEvent::StateChanged(self.snapshot()));
        Ok(self.snapshot())
    }

    pub fn set_skill_level(&mut self, level: u8) -> Result<SessionSnapshot, SessionError> {
        self.settings.skill_level = SearchSettings::skill_level(level)?;
        tracing::info!("Skill level set to {}", level);
        self.emit(SessionEvent::StateChanged(self.snapshot()));
        Ok(self.snapshot())
    }

    /// Switching modes never cancels a pending request; its answer goes stale.
    pub fn set_mode(&mut self, mode: Mode) -> Result<SessionSnapshot, SessionError> {
        self.pause_battle("mode change");
        tracing::info!("Mode set to {}", mode);
        self.mode = mode;
        self.ensure_workers();
        self.after_user_change();
        Ok(self.snapshot())
    }

    pub fn legal_moves(&self, from: Option<Square>) -> Vec<Move> {
        self.history
            .legal_moves()
            .into_iter()
            .filter(|mv| from.is_none_or(|sq| mv.from == sq))
            .collect()
    }

    // ----- worker traffic -----

    pub fn handle_worker_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::Started { side } => {
                self.slot_mut(side).status = WorkerStatus::Ready;
                tracing::info!(side = %side, "Worker ready");
                self.emit(SessionEvent::WorkerReady { side });
                self.settle();
            }
            WorkerMessage::Unavailable { side, error } => {
                self.mark_unavailable(side, error.to_string());
                self.settle();
            }
            WorkerMessage::Reply {
                side,
                request_id,
                result,
            } => self.handle_reply(side, request_id, result),
        }
    }

    fn handle_reply(&mut self, side: Side, request_id: u64, result: Result<Move, WorkerError>) {
        let in_flight = match self.slot(side).in_flight {
            Some(f) if f.request_id == request_id => f,
            _ => {
                tracing::warn!(side = %side, request_id, "Reply for a request that is not outstanding");
                return;
            }
        };
        self.slot_mut(side).in_flight = None;

        if in_flight.epoch != self.epoch || self.turn != TurnState::WorkerThinking(side) {
            let stale = SessionError::StaleResponse { side, request_id };
            tracing::debug!("{}", stale);
            // The slot is free again; a fresh request may be due.
            self.settle();
            return;
        }

        match result {
            Ok(mv) => match self.history.apply_move(mv) {
                Ok(_) => {
                    let wire = format_uci_move(mv);
                    tracing::info!(side = %side, "Worker played {}", wire);
                    self.epoch += 1;
                    self.emit(SessionEvent::WorkerMoved { side, mv: wire });
                }
                Err(e) => self.worker_failed(side, SessionError::from(e).to_string()),
            },
            Err(e) => {
                if matches!(e, WorkerError::Closed) {
                    self.mark_unavailable(side, e.to_string());
                }
                self.worker_failed(side, e.to_string());
            }
        }
        self.settle();
    }

    // ----- coordination -----

    fn after_user_change(&mut self) {
        self.epoch += 1;
        self.halted = false;
        self.settle();
    }

    fn pause_battle(&mut self, reason: &str) {
        if self.battle_active {
            tracing::info!("Battle paused: {}", reason);
            self.battle_active = false;
            self.epoch += 1;
        }
    }

    /// Re-derive the turn, dispatch a worker request if one is due, and
    /// tell subscribers. Runs after every change.
    fn settle(&mut self) {
        let was_over = self.turn.is_game_over();

        loop {
            self.turn = TurnState::derive(&self.turn_inputs());
            let TurnState::WorkerThinking(side) = self.turn else {
                break;
            };
            match self.dispatch(side) {
                Ok(()) => break,
                Err(e) => {
                    if matches!(e, WorkerError::Closed) {
                        self.mark_unavailable(side, e.to_string());
                    }
                    self.worker_failed(side, e.to_string());
                }
            }
        }

        if let TurnState::GameOver(outcome) = self.turn {
            if self.battle_active {
                tracing::info!("Battle finished");
                self.battle_active = false;
            }
            if !was_over {
                tracing::info!("Game over: {}", outcome);
                self.emit(SessionEvent::GameOver { outcome });
            }
        }

        self.emit(SessionEvent::StateChanged(self.snapshot()));
    }

    fn turn_inputs(&self) -> TurnInputs {
        let side_to_move = self.history.side_to_move();
        TurnInputs {
            outcome: self.history.outcome(),
            mode: self.mode,
            side_to_move,
            battle_active: self.battle_active,
            halted: self.halted,
            worker_usable: !self.slot(side_to_move).status.is_unavailable(),
        }
    }

    /// Issue a request to `side`'s worker unless it is still starting or
    /// already has one outstanding.
    fn dispatch(&mut self, side: Side) -> Result<(), WorkerError> {
        let slot = self.slot(side);
        if slot.in_flight.is_some() {
            tracing::trace!(side = %side, "Waiting for the outstanding request");
            return Ok(());
        }
        if slot.status != WorkerStatus::Ready {
            return Ok(());
        }

        let request_id = self.next_request_id;
        let request = SearchRequest {
            start_fen: self.history.start_fen(),
            moves: self.history.moves(),
            time_budget: self.settings.time_budget,
            skill_level: self.settings.skill_level,
        };
        let session = self
            .slot(side)
            .session
            .as_ref()
            .ok_or(WorkerError::Closed)?;
        session.request(request_id, request)?;

        self.next_request_id += 1;
        let epoch = self.epoch;
        self.slot_mut(side).in_flight = Some(InFlight { request_id, epoch });
        tracing::debug!(side = %side, request_id, epoch, "Dispatched move request");
        Ok(())
    }

    fn worker_failed(&mut self, side: Side, reason: String) {
        tracing::error!(side = %side, "Worker failed: {}", reason);
        self.emit(SessionEvent::WorkerFailed { side, reason });
        if self.battle_active {
            self.pause_battle("worker failure");
        } else {
            self.halted = true;
        }
    }

    fn mark_unavailable(&mut self, side: Side, reason: String) {
        tracing::warn!(side = %side, "Worker unavailable, the side falls back to the human: {}", reason);
        self.slot_mut(side).status = WorkerStatus::Unavailable(reason.clone());
        self.emit(SessionEvent::WorkerUnavailable { side, reason });
    }

    /// Start a session for every worker side of the current mode that has none.
    fn ensure_workers(&mut self) {
        for side in self.mode.worker_sides() {
            if self.slot(side).status != WorkerStatus::Absent {
                continue;
            }
            match &self.launcher {
                Some(launcher) => {
                    let session =
                        WorkerSession::start(side, Arc::clone(launcher), self.worker_tx.clone());
                    let slot = self.slot_mut(side);
                    slot.session = Some(session);
                    slot.status = WorkerStatus::Starting;
                    tracing::info!(side = %side, "Starting worker");
                }
                None => self.mark_unavailable(side, "no engine configured".to_string()),
            }
        }
    }

    /// Release every worker session exactly once.
    pub async fn release_workers(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut session) = slot.session.take() {
                session.release().await;
            }
            slot.in_flight = None;
        }
    }
}
