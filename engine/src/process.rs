use crate::uci::{format_command, parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineEvent, WorkerError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::Instrument;

const QUIT_GRACE: Duration = Duration::from_secs(1);

/// How to start one engine process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Name used in logs, e.g. "white-engine".
    pub label: String,
    pub handshake_timeout: Duration,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

impl ProcessConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            label: "engine".to_string(),
            handshake_timeout: Duration::from_secs(10),
            threads: None,
            hash_mb: None,
        }
    }
}

/// A running UCI engine with line-oriented stdin/stdout plumbing.
pub struct UciProcess {
    process: Child,
    stdin: Option<mpsc::Sender<String>>,
    event_rx: mpsc::Receiver<EngineEvent>,
    label: String,
    name: Option<String>,
    options: Vec<String>,
    closed: bool,
}

impl UciProcess {
    /// Spawn the engine and complete the `uci`/`isready` handshake.
    #[tracing::instrument(level = "info", skip(config), fields(engine = %config.label))]
    pub async fn spawn(config: ProcessConfig) -> Result<Self, WorkerError> {
        tracing::info!("Spawning engine process {:?}", config.path);
        let mut process = tokio::process::Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::error!("Failed to spawn engine: {}", source);
                WorkerError::Spawn {
                    path: config.path.clone(),
                    source,
                }
            })?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Handshake("engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Handshake("engine stdout unavailable".into()))?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);
        tokio::spawn(
            async move {
                let mut reader = BufReader::new(stdout);
                let mut line = String::new();

                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) => {
                            tracing::debug!("Engine stdout EOF");
                            break;
                        }
                        Ok(_) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            tracing::trace!("UCI << {}", trimmed);

                            let event = match parse_uci_message(trimmed) {
                                Ok(UciMessage::UciOk) => EngineEvent::UciOk,
                                Ok(UciMessage::ReadyOk) => EngineEvent::ReadyOk,
                                Ok(UciMessage::Id { name, value }) if name == "name" => {
                                    EngineEvent::Identified { name: value }
                                }
                                Ok(UciMessage::Id { .. }) => continue,
                                Ok(UciMessage::Option { name }) => {
                                    EngineEvent::OptionDeclared { name }
                                }
                                Ok(UciMessage::BestMove { mv, .. }) => {
                                    tracing::debug!("Received bestmove: {:?}", mv);
                                    EngineEvent::BestMove(mv)
                                }
                                Ok(UciMessage::Info) => continue,
                                Err(e) => {
                                    tracing::trace!("Ignoring engine output: {}", e);
                                    continue;
                                }
                            };

                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!("Error reading engine stdout: {}", e);
                            break;
                        }
                    }
                }
                let _ = event_tx.send(EngineEvent::Closed).await;
                tracing::debug!("Output reader task exiting");
            }
            .instrument(tracing::debug_span!("uci_reader", engine = %config.label)),
        );

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(
            async move {
                while let Some(cmd) = stdin_rx.recv().await {
                    tracing::trace!("UCI >> {}", cmd.trim());
                    if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
                        tracing::warn!("Failed to write to engine stdin: {}", e);
                        break;
                    }
                    if let Err(e) = stdin.flush().await {
                        tracing::warn!("Failed to flush engine stdin: {}", e);
                        break;
                    }
                }
                tracing::debug!("Stdin writer task exiting");
            }
            .instrument(tracing::debug_span!("uci_writer", engine = %config.label)),
        );

        let mut engine = Self {
            process,
            stdin: Some(stdin_tx),
            event_rx,
            label: config.label.clone(),
            name: None,
            options: Vec::new(),
            closed: false,
        };

        if let Err(e) = engine.handshake(&config).await {
            engine.shutdown().await;
            return Err(e);
        }

        tracing::info!(
            "Engine ready ({})",
            engine.name.as_deref().unwrap_or("unnamed")
        );
        Ok(engine)
    }

    async fn handshake(&mut self, config: &ProcessConfig) -> Result<(), WorkerError> {
        let limit = config.handshake_timeout;

        self.send_command(EngineCommand::Uci)
            .await
            .map_err(handshake_error("uci"))?;
        self.wait_for(limit, |e| matches!(e, EngineEvent::UciOk))
            .await
            .map_err(handshake_error("uciok"))?;

        if let Some(threads) = config.threads {
            self.set_option("Threads", threads.clamp(1, 16))
                .await
                .map_err(handshake_error("Threads"))?;
        }
        if let Some(hash_mb) = config.hash_mb {
            self.set_option("Hash", hash_mb.clamp(1, 2048))
                .await
                .map_err(handshake_error("Hash"))?;
        }

        self.sync(limit).await.map_err(handshake_error("readyok"))
    }

    async fn set_option(&self, name: &str, value: u32) -> Result<(), WorkerError> {
        tracing::info!("Setting {} to {}", name, value);
        self.send_command(EngineCommand::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        })
        .await
    }

    /// `isready` round trip.
    pub async fn sync(&mut self, limit: Duration) -> Result<(), WorkerError> {
        self.send_command(EngineCommand::IsReady).await?;
        self.wait_for(limit, |e| matches!(e, EngineEvent::ReadyOk))
            .await
            .map(|_| ())
    }

    /// Send a command to the engine
    pub async fn send_command(&self, cmd: EngineCommand) -> Result<(), WorkerError> {
        let stdin = self.stdin.as_ref().ok_or(WorkerError::Closed)?;
        tracing::debug!(engine = %self.label, "Queueing command: {:?}", cmd);
        stdin
            .send(format_command(&cmd))
            .await
            .map_err(|_| WorkerError::Closed)
    }

    /// Receive an event from the engine (blocking)
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        let event = self.event_rx.recv().await?;
        match &event {
            EngineEvent::Identified { name } => self.name = Some(name.clone()),
            EngineEvent::OptionDeclared { name } => self.options.push(name.clone()),
            _ => {}
        }
        Some(event)
    }

    /// Wait up to `limit` for the first event matching `want`, dropping the rest.
    pub async fn wait_for<F>(&mut self, limit: Duration, want: F) -> Result<EngineEvent, WorkerError>
    where
        F: Fn(&EngineEvent) -> bool,
    {
        let wait = async {
            loop {
                match self.recv_event().await {
                    None | Some(EngineEvent::Closed) => return Err(WorkerError::Closed),
                    Some(event) if want(&event) => return Ok(event),
                    Some(_) => {}
                }
            }
        };

        match tokio::time::timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(limit)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the engine declared the option during the handshake.
    pub fn supports_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.eq_ignore_ascii_case(name))
    }

    /// Ask the engine to quit, then kill it if it lingers. Safe to call twice.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = self.send_command(EngineCommand::Quit).await;
        self.stdin = None;

        match tokio::time::timeout(QUIT_GRACE, self.process.wait()).await {
            Ok(Ok(status)) => tracing::debug!(engine = %self.label, "Engine exited: {}", status),
            _ => {
                tracing::warn!(engine = %self.label, "Engine did not quit, killing it");
                let _ = self.process.kill().await;
            }
        }
    }
}

fn handshake_error(stage: &'static str) -> impl Fn(WorkerError) -> WorkerError {
    move |e| match e {
        WorkerError::Timeout(_) => e,
        other => WorkerError::Handshake(format!("waiting for {}: {}", stage, other)),
    }
}

/// Common install locations checked before searching `PATH`.
const KNOWN_LOCATIONS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

/// Resolve the engine binary: an explicit path wins, then well-known
/// locations, then `PATH`.
pub fn locate_engine(explicit: Option<&Path>) -> Result<PathBuf, WorkerError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        // A bare program name is looked up on PATH.
        if path.components().count() == 1 {
            if let Some(found) = search_path(path.as_os_str()) {
                return Ok(found);
            }
        }
        return Err(WorkerError::NotFound);
    }

    KNOWN_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .or_else(|| search_path("stockfish".as_ref()))
        .ok_or(WorkerError::NotFound)
}

fn search_path(program: &std::ffi::OsStr) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
