//! Scripted workers for tests. No process is spawned; each side answers from
//! a queue of [`ScriptStep`]s and every request is recorded.

use crate::{MoveWorker, SearchRequest, WorkerError, WorkerLauncher};
use async_trait::async_trait;
use chess::{parse_uci_move, Move, RulesProvider, Side, StandardRules};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug)]
pub enum ScriptStep {
    /// Answer with this wire move, legal or not.
    Play(String),
    /// Fail the request with this reason.
    Fail(String),
    /// Fail as if the engine process had exited.
    Close,
    /// Answer with the first legal move of the requested position.
    FirstLegal,
    /// Wait for the notification, then run the inner step.
    Gated(Arc<Notify>, Box<ScriptStep>),
}

impl ScriptStep {
    pub fn play(wire: &str) -> Self {
        Self::Play(wire.to_string())
    }

    pub fn gated(gate: &Arc<Notify>, step: ScriptStep) -> Self {
        Self::Gated(Arc::clone(gate), Box::new(step))
    }
}

#[derive(Debug, Default)]
struct MockState {
    scripts: [VecDeque<ScriptStep>; 2],
    unavailable: [Option<String>; 2],
    launch_gates: [Option<Arc<Notify>>; 2],
    requests: Vec<(Side, SearchRequest)>,
    launches: [usize; 2],
    shutdowns: [usize; 2],
    in_flight: [usize; 2],
    max_concurrent: [usize; 2],
}

/// Launcher whose workers follow per-side scripts. An exhausted script
/// falls back to [`ScriptStep::FirstLegal`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    state: Arc<Mutex<MockState>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn with_script(self, side: Side, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.lock().scripts[side.index()].extend(steps);
        self
    }

    pub fn push(&self, side: Side, step: ScriptStep) {
        self.lock().scripts[side.index()].push_back(step);
    }

    /// Launching `side` fails with `reason`.
    pub fn with_unavailable(self, side: Side, reason: &str) -> Self {
        self.lock().unavailable[side.index()] = Some(reason.to_string());
        self
    }

    /// Launching `side` blocks until `gate` is notified.
    pub fn with_launch_gate(self, side: Side, gate: &Arc<Notify>) -> Self {
        self.lock().launch_gates[side.index()] = Some(Arc::clone(gate));
        self
    }

    pub fn requests(&self) -> Vec<(Side, SearchRequest)> {
        self.lock().requests.clone()
    }

    pub fn requests_for(&self, side: Side) -> Vec<SearchRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|(s, _)| *s == side)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn launches(&self, side: Side) -> usize {
        self.lock().launches[side.index()]
    }

    pub fn shutdowns(&self, side: Side) -> usize {
        self.lock().shutdowns[side.index()]
    }

    /// Most requests ever outstanding at once for `side`.
    pub fn max_concurrent(&self, side: Side) -> usize {
        self.lock().max_concurrent[side.index()]
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl WorkerLauncher for ScriptedLauncher {
    async fn launch(&self, side: Side) -> Result<Box<dyn MoveWorker>, WorkerError> {
        let gate = {
            let mut state = self.lock();
            state.launches[side.index()] += 1;
            if let Some(reason) = state.unavailable[side.index()].clone() {
                return Err(WorkerError::Handshake(reason));
            }
            state.launch_gates[side.index()].clone()
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        Ok(Box::new(ScriptedWorker {
            side,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

pub struct ScriptedWorker {
    side: Side,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl ScriptedWorker {
    async fn run(&self, mut step: Option<ScriptStep>, request: &SearchRequest) -> Result<Move, WorkerError> {
        loop {
            match step {
                Some(ScriptStep::Gated(gate, inner)) => {
                    gate.notified().await;
                    step = Some(*inner);
                }
                Some(ScriptStep::Play(wire)) => {
                    return parse_uci_move(&wire).map_err(|e| WorkerError::Protocol(e.to_string()));
                }
                Some(ScriptStep::Fail(reason)) => return Err(WorkerError::Protocol(reason)),
                Some(ScriptStep::Close) => return Err(WorkerError::Closed),
                Some(ScriptStep::FirstLegal) | None => return first_legal(request),
            }
        }
    }
}

fn first_legal(request: &SearchRequest) -> Result<Move, WorkerError> {
    let rules = StandardRules;
    let start = rules
        .position_from_fen(&request.start_fen)
        .map_err(|e| WorkerError::Protocol(e.to_string()))?;
    let position = request
        .moves
        .iter()
        .try_fold(start, |pos, mv| rules.apply(&pos, *mv))
        .ok_or_else(|| WorkerError::Protocol("request holds an illegal move".into()))?;
    rules
        .legal_moves(&position)
        .into_iter()
        .next()
        .ok_or(WorkerError::NoMove)
}

#[async_trait]
impl MoveWorker for ScriptedWorker {
    async fn best_move(&mut self, request: &SearchRequest) -> Result<Move, WorkerError> {
        let i = self.side.index();
        let step = {
            let mut state = lock(&self.state);
            state.requests.push((self.side, request.clone()));
            state.in_flight[i] += 1;
            state.max_concurrent[i] = state.max_concurrent[i].max(state.in_flight[i]);
            state.scripts[i].pop_front()
        };

        let result = self.run(step, request).await;

        lock(&self.state).in_flight[i] -= 1;
        result
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        lock(&self.state).shutdowns[self.side.index()] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{format_uci_move, START_FEN};
    use std::time::Duration;

    fn request(moves: &[&str]) -> SearchRequest {
        SearchRequest {
            start_fen: START_FEN.to_string(),
            moves: moves.iter().map(|m| parse_uci_move(m).unwrap()).collect(),
            time_budget: Duration::from_millis(100),
            skill_level: 20,
        }
    }

    #[tokio::test]
    async fn test_script_then_first_legal() {
        let launcher = ScriptedLauncher::new().with_script(
            Side::Black,
            [ScriptStep::play("e7e5"), ScriptStep::Fail("boom".into())],
        );
        let mut worker = launcher.launch(Side::Black).await.unwrap();

        let mv = worker.best_move(&request(&["e2e4"])).await.unwrap();
        assert_eq!(format_uci_move(mv), "e7e5");
        assert!(worker.best_move(&request(&["e2e4"])).await.is_err());

        let mv = worker.best_move(&request(&["e2e4"])).await.unwrap();
        let legal = StandardRules
            .apply(&StandardRules.initial_position(), parse_uci_move("e2e4").unwrap())
            .map(|pos| StandardRules.legal_moves(&pos))
            .unwrap();
        assert!(legal.contains(&mv));

        assert_eq!(launcher.requests_for(Side::Black).len(), 3);
        assert_eq!(launcher.max_concurrent(Side::Black), 1);
    }

    #[tokio::test]
    async fn test_unavailable_side_fails_launch() {
        let launcher = ScriptedLauncher::new().with_unavailable(Side::White, "no binary");
        assert!(launcher.launch(Side::White).await.is_err());
        assert!(launcher.launch(Side::Black).await.is_ok());
        assert_eq!(launcher.launches(Side::White), 1);
    }

    #[tokio::test]
    async fn test_shutdown_counted_once() {
        let launcher = ScriptedLauncher::new();
        let mut worker = launcher.launch(Side::White).await.unwrap();
        worker.shutdown().await;
        worker.shutdown().await;
        assert_eq!(launcher.shutdowns(Side::White), 1);
    }
}
