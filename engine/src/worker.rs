use crate::process::{locate_engine, ProcessConfig, UciProcess};
use crate::{EngineCommand, EngineEvent, WorkerError};
use async_trait::async_trait;
use chess::{Move, Side};
use std::path::PathBuf;
use std::time::Duration;

/// Extra time past the budget before a search is considered hung.
const SEARCH_GRACE: Duration = Duration::from_secs(5);

const SKILL_OPTION: &str = "Skill Level";

/// One move request: the game from its start plus the limits to search under.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub start_fen: String,
    pub moves: Vec<Move>,
    pub time_budget: Duration,
    pub skill_level: u8,
}

/// Something that picks a move for a position.
///
/// Callers never issue a second `best_move` before the first resolves.
#[async_trait]
pub trait MoveWorker: Send {
    async fn best_move(&mut self, request: &SearchRequest) -> Result<Move, WorkerError>;

    /// Release the worker's resources. Calling it again is a no-op.
    async fn shutdown(&mut self);
}

/// Starts a worker for one side.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn launch(&self, side: Side) -> Result<Box<dyn MoveWorker>, WorkerError>;
}

/// [`MoveWorker`] backed by a UCI engine process.
pub struct UciWorker {
    process: UciProcess,
    handshake_timeout: Duration,
    skill_level: Option<u8>,
    skill_warned: bool,
    last_start: Option<String>,
    last_len: usize,
}

impl UciWorker {
    pub fn new(process: UciProcess, handshake_timeout: Duration) -> Self {
        Self {
            process,
            handshake_timeout,
            skill_level: None,
            skill_warned: false,
            last_start: None,
            last_len: 0,
        }
    }

    /// Skill is best-effort: engines without the option play at full strength.
    async fn apply_skill(&mut self, level: u8) -> Result<(), WorkerError> {
        if self.skill_level == Some(level) {
            return Ok(());
        }
        self.skill_level = Some(level);

        if !self.process.supports_option(SKILL_OPTION) {
            if !self.skill_warned {
                tracing::warn!(
                    engine = %self.process.label(),
                    "Engine has no '{}' option, ignoring skill level {}",
                    SKILL_OPTION,
                    level
                );
                self.skill_warned = true;
            }
            return Ok(());
        }

        tracing::info!(engine = %self.process.label(), "Setting skill level to {}", level);
        self.process
            .send_command(EngineCommand::SetOption {
                name: SKILL_OPTION.to_string(),
                value: Some(level.to_string()),
            })
            .await
    }

    /// Tell the engine a new game started when the request does not extend the last one.
    async fn sync_game(&mut self, request: &SearchRequest) -> Result<(), WorkerError> {
        let continues = self.last_start.as_deref() == Some(request.start_fen.as_str())
            && request.moves.len() >= self.last_len;
        if !continues {
            tracing::debug!(engine = %self.process.label(), "Starting new engine game");
            self.process.send_command(EngineCommand::NewGame).await?;
            self.process.sync(self.handshake_timeout).await?;
        }
        self.last_start = Some(request.start_fen.clone());
        self.last_len = request.moves.len();
        Ok(())
    }
}

#[async_trait]
impl MoveWorker for UciWorker {
    #[tracing::instrument(level = "debug", skip_all, fields(engine = %self.process.label(), ply = request.moves.len()))]
    async fn best_move(&mut self, request: &SearchRequest) -> Result<Move, WorkerError> {
        self.apply_skill(request.skill_level).await?;
        self.sync_game(request).await?;

        self.process
            .send_command(EngineCommand::SetPosition {
                fen: request.start_fen.clone(),
                moves: request.moves.clone(),
            })
            .await?;

        let movetime = request.time_budget.as_millis().max(1) as u64;
        self.process
            .send_command(EngineCommand::Go { movetime })
            .await?;

        let deadline = request.time_budget + SEARCH_GRACE;
        let is_best_move = |e: &EngineEvent| matches!(e, EngineEvent::BestMove(_));
        match self.process.wait_for(deadline, is_best_move).await {
            Ok(EngineEvent::BestMove(Some(mv))) => Ok(mv),
            Ok(EngineEvent::BestMove(None)) => Err(WorkerError::NoMove),
            Ok(other) => Err(WorkerError::Protocol(format!("unexpected event {:?}", other))),
            Err(WorkerError::Timeout(_)) => {
                tracing::warn!(engine = %self.process.label(), "Search overran {:?}, stopping", deadline);
                // Drain the late answer so it cannot be taken for the next search.
                let _ = self.process.send_command(EngineCommand::Stop).await;
                let _ = self.process.wait_for(SEARCH_GRACE, is_best_move).await;
                self.last_start = None;
                Err(WorkerError::Timeout(deadline))
            }
            Err(e) => Err(e),
        }
    }

    async fn shutdown(&mut self) {
        self.process.shutdown().await;
    }
}

/// How UCI engines are started.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Explicit binary; `None` searches the usual places.
    pub path: Option<PathBuf>,
    pub args: Vec<String>,
    pub handshake_timeout: Duration,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            path: None,
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(10),
            threads: None,
            hash_mb: None,
        }
    }
}

/// Launches one [`UciWorker`] per side.
#[derive(Debug, Clone, Default)]
pub struct UciLauncher {
    settings: EngineSettings,
}

impl UciLauncher {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl WorkerLauncher for UciLauncher {
    async fn launch(&self, side: Side) -> Result<Box<dyn MoveWorker>, WorkerError> {
        let path = locate_engine(self.settings.path.as_deref())?;
        let config = ProcessConfig {
            path,
            args: self.settings.args.clone(),
            label: format!("{}-engine", side.as_str()),
            handshake_timeout: self.settings.handshake_timeout,
            threads: self.settings.threads,
            hash_mb: self.settings.hash_mb,
        };
        let process = UciProcess::spawn(config).await?;
        Ok(Box::new(UciWorker::new(
            process,
            self.settings.handshake_timeout,
        )))
    }
}
