//! The turn coordinator.
//!
//! One actor task owns the game: history, mode, battle flag and the worker
//! slots. Callers talk to it through [`SessionHandle`]; workers run in their
//! own tasks and only ever send results back, so every state change happens
//! on the actor.

mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
mod state;
pub mod turn;
mod worker;

use engine::WorkerLauncher;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use actor::run_session_actor;
pub use commands::{SearchSettings, SessionError};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::{SessionSnapshot, WorkerStatus};
use state::GameSession;
pub use turn::{Mode, TurnState};

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub mode: Mode,
    pub settings: SearchSettings,
}

/// Spawn a session actor. Without a launcher every worker side is reported
/// unavailable and played by the human.
pub fn spawn_session(
    config: SessionConfig,
    launcher: Option<Arc<dyn WorkerLauncher>>,
) -> SessionHandle {
    let session_id = Uuid::new_v4().to_string();

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(100);
    let (worker_tx, worker_rx) = mpsc::channel(16);

    let session = GameSession::new(
        session_id.clone(),
        config.mode,
        config.settings,
        launcher,
        worker_tx,
        event_tx,
    );
    tokio::spawn(run_session_actor(session, cmd_rx, worker_rx));

    SessionHandle::new(session_id, cmd_tx)
}
