use chess::{Move, Square};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::*;
use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use super::turn::Mode;
use crate::persistence::transcript::LoadReport;
use crate::persistence::TranscriptStore;

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn new_game(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::NewGame { reply }).await?
    }

    pub async fn make_move(&self, mv: Move) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::MakeMove { mv, reply })
            .await?
    }

    pub async fn undo(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Undo { reply }).await?
    }

    /// Write the move list to `name` in `store`. Returns the file written.
    pub async fn save(&self, store: &TranscriptStore, name: &str) -> Result<PathBuf, SessionError> {
        let snapshot = self.snapshot().await?;
        Ok(store.save(name, &snapshot.moves)?)
    }

    /// Replace the game with the transcript stored under `name`.
    pub async fn load(&self, store: &TranscriptStore, name: &str) -> Result<LoadReport, SessionError> {
        let transcript = store.load(name)?;
        self.load_transcript(transcript).await
    }

    pub async fn load_transcript(&self, transcript: String) -> Result<LoadReport, SessionError> {
        self.request(|reply| SessionCommand::Load { transcript, reply })
            .await?
    }

    pub async fn start_battle(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::StartBattle { reply })
            .await?
    }

    pub async fn stop_battle(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::StopBattle { reply })
            .await?
    }

    pub async fn set_time_budget(&self, secs: f64) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::SetTimeBudget { secs, reply })
            .await?
    }

    pub async fn set_skill_level(&self, level: u8) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::SetSkillLevel { level, reply })
            .await?
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::SetMode { mode, reply })
            .await?
    }

    /// Legal moves in the current position, optionally only those from one square.
    pub async fn legal_moves(&self, from: Option<Square>) -> Result<Vec<Move>, SessionError> {
        self.request(|reply| SessionCommand::GetLegalMoves { from, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::GetSnapshot { reply })
            .await
    }

    /// Current snapshot plus every event after it.
    pub async fn subscribe(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        self.request(|reply| SessionCommand::Subscribe { reply })
            .await
    }

    /// Stop the actor and release its workers. Waits until both are done.
    pub async fn shutdown(&self) {
        let _ = self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }
}
