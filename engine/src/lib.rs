//! Move-generation workers.
//!
//! A worker takes a position and a time budget and answers with a move. The
//! session layer only sees the [`MoveWorker`] and [`WorkerLauncher`] traits;
//! [`UciWorker`] drives a UCI engine subprocess behind them.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod process;
pub mod uci;
pub mod worker;

pub use process::{locate_engine, ProcessConfig, UciProcess};
pub use uci::{UciError, UciMessage};
pub use worker::{
    EngineSettings, MoveWorker, SearchRequest, UciLauncher, UciWorker, WorkerLauncher,
};

use chess::Move;
use std::path::PathBuf;
use std::time::Duration;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    NewGame,
    SetOption { name: String, value: Option<String> },
    SetPosition { fen: String, moves: Vec<Move> },
    /// Search for a fixed time in milliseconds.
    Go { movetime: u64 },
    Stop,
    Quit,
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    UciOk,
    ReadyOk,
    Identified { name: String },
    OptionDeclared { name: String },
    BestMove(Option<Move>),
    /// The engine's stdout reached EOF.
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("No engine binary found")]
    NotFound,
    #[error("Failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Engine handshake failed: {0}")]
    Handshake(String),
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Engine process closed")]
    Closed,
    #[error("Engine reported no move")]
    NoMove,
    #[error("Engine protocol error: {0}")]
    Protocol(String),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}
