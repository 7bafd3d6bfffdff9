use tokio::sync::mpsc;
use tracing::Instrument;

use super::commands::SessionCommand;
use super::state::GameSession;
use super::worker::WorkerMessage;

/// The main session actor loop.
/// Owns all mutable state. Processes commands and worker messages sequentially.
pub(crate) async fn run_session_actor(
    session: GameSession,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    worker_rx: mpsc::Receiver<WorkerMessage>,
) {
    let session_id = session.session_id.clone();
    run_session_actor_inner(session, cmd_rx, worker_rx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut session: GameSession,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut worker_rx: mpsc::Receiver<WorkerMessage>,
) {
    tracing::info!("Session actor started");
    session.start();

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown { reply }) => {
                        tracing::info!("Session actor shutting down");
                        session.release_workers().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::info!("All handles dropped, shutting down");
                        session.release_workers().await;
                        break;
                    }
                    Some(cmd) => handle_command(&mut session, cmd),
                }
            }

            Some(msg) = worker_rx.recv() => {
                session.handle_worker_message(msg);
            }
        }
    }

    tracing::info!("Session actor exited");
}

fn handle_command(session: &mut GameSession, cmd: SessionCommand) {
    match cmd {
        SessionCommand::NewGame { reply } => {
            let _ = reply.send(session.new_game());
        }
        SessionCommand::MakeMove { mv, reply } => {
            let _ = reply.send(session.make_move(mv));
        }
        SessionCommand::Undo { reply } => {
            let _ = reply.send(session.undo());
        }
        SessionCommand::Load { transcript, reply } => {
            let _ = reply.send(session.load(&transcript));
        }
        SessionCommand::StartBattle { reply } => {
            let _ = reply.send(session.start_battle());
        }
        SessionCommand::StopBattle { reply } => {
            let _ = reply.send(session.stop_battle());
        }
        SessionCommand::SetTimeBudget { secs, reply } => {
            let _ = reply.send(session.set_time_budget(secs));
        }
        SessionCommand::SetSkillLevel { level, reply } => {
            let _ = reply.send(session.set_skill_level(level));
        }
        SessionCommand::SetMode { mode, reply } => {
            let _ = reply.send(session.set_mode(mode));
        }
        SessionCommand::GetLegalMoves { from, reply } => {
            let _ = reply.send(session.legal_moves(from));
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let _ = reply.send((session.snapshot(), session.subscribe()));
        }
        SessionCommand::Shutdown { .. } => unreachable!("handled by the actor loop"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{spawn_session, Mode, SessionConfig, SessionError, SessionEvent, TurnState};
    use chess::{parse_uci_move, Outcome, Side};

    fn hvh() -> SessionConfig {
        SessionConfig {
            mode: Mode::HumanVsHuman,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_make_move_via_actor() {
        let handle = spawn_session(hvh(), None);
        let (snapshot, mut events) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.turn, TurnState::AwaitingHumanInput);

        let snap = handle.make_move(parse_uci_move("e2e4").unwrap()).await.unwrap();
        assert_eq!(snap.move_count(), 1);
        assert_eq!(snap.side_to_move, Side::Black);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::StateChanged(_)));
    }

    #[tokio::test]
    async fn test_illegal_move_rejected_without_change() {
        let handle = spawn_session(hvh(), None);
        let err = handle
            .make_move(parse_uci_move("e2e5").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::IllegalMove("e2e5".into()));
        assert_eq!(handle.snapshot().await.unwrap().move_count(), 0);
    }

    #[tokio::test]
    async fn test_undo_on_empty_game() {
        let handle = spawn_session(hvh(), None);
        assert_eq!(handle.undo().await.unwrap_err(), SessionError::NoMoveToUndo);
    }

    #[tokio::test]
    async fn test_fools_mate_ends_game() {
        let handle = spawn_session(hvh(), None);
        let (_, mut events) = handle.subscribe().await.unwrap();

        let mut snap = None;
        for m in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            snap = Some(handle.make_move(parse_uci_move(m).unwrap()).await.unwrap());
        }
        let snap = snap.unwrap();
        assert_eq!(snap.turn, TurnState::GameOver(Outcome::BlackWins));
        assert!(handle.legal_moves(None).await.unwrap().is_empty());

        let err = handle
            .make_move(parse_uci_move("e2e4").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::GameOver);

        let mut saw_game_over = false;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::GameOver { outcome } = event {
                assert_eq!(outcome, Outcome::BlackWins);
                saw_game_over = true;
            }
        }
        assert!(saw_game_over);
    }

    #[tokio::test]
    async fn test_settings_are_validated() {
        let handle = spawn_session(hvh(), None);
        let snap = handle.set_time_budget(0.5).await.unwrap();
        assert_eq!(snap.settings.time_budget.as_millis(), 500);
        assert!(matches!(
            handle.set_skill_level(25).await,
            Err(SessionError::InvalidSetting(_))
        ));
        assert_eq!(handle.snapshot().await.unwrap().settings.skill_level, 20);
    }

    #[tokio::test]
    async fn test_battle_needs_worker_mode() {
        let handle = spawn_session(hvh(), None);
        assert_eq!(
            handle.start_battle().await.unwrap_err(),
            SessionError::BattleRequiresWorkers
        );
    }

    #[tokio::test]
    async fn test_shutdown() {
        let handle = spawn_session(hvh(), None);
        handle.shutdown().await;
        assert!(matches!(
            handle.make_move(parse_uci_move("e2e4").unwrap()).await,
            Err(SessionError::Internal(_))
        ));
    }
}
