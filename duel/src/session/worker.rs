//! One background task per worker-driven side.
//!
//! The task owns the worker. It never touches game state: it launches the
//! worker, answers requests one at a time and reports everything back to the
//! session actor as [`WorkerMessage`]s.

use chess::{Move, Side};
use engine::{SearchRequest, WorkerError, WorkerLauncher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// How long `release` waits for the worker to wind down before aborting it.
const RELEASE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub(crate) enum WorkerMessage {
    Started {
        side: Side,
    },
    Unavailable {
        side: Side,
        error: WorkerError,
    },
    Reply {
        side: Side,
        request_id: u64,
        result: Result<Move, WorkerError>,
    },
}

pub(crate) struct WorkerSession {
    side: Side,
    request_tx: Option<mpsc::Sender<(u64, SearchRequest)>>,
    task: Option<JoinHandle<()>>,
}

impl WorkerSession {
    pub fn start(
        side: Side,
        launcher: Arc<dyn WorkerLauncher>,
        results: mpsc::Sender<WorkerMessage>,
    ) -> Self {
        // Capacity 1: a second queued request would break the one-in-flight rule.
        let (request_tx, mut request_rx) = mpsc::channel::<(u64, SearchRequest)>(1);

        let task = tokio::spawn(
            async move {
                let mut worker = match launcher.launch(side).await {
                    Ok(worker) => worker,
                    Err(error) => {
                        tracing::warn!("Worker failed to start: {}", error);
                        let _ = results.send(WorkerMessage::Unavailable { side, error }).await;
                        return;
                    }
                };
                tracing::info!("Worker started");

                if results.send(WorkerMessage::Started { side }).await.is_ok() {
                    while let Some((request_id, request)) = request_rx.recv().await {
                        tracing::debug!(request_id, "Searching");
                        let result = worker.best_move(&request).await;
                        let reply = WorkerMessage::Reply {
                            side,
                            request_id,
                            result,
                        };
                        if results.send(reply).await.is_err() {
                            break;
                        }
                    }
                }

                worker.shutdown().await;
                tracing::info!("Worker released");
            }
            .instrument(tracing::info_span!("worker", side = %side)),
        );

        Self {
            side,
            request_tx: Some(request_tx),
            task: Some(task),
        }
    }

    /// Hand a request to the worker task without waiting.
    pub fn request(&self, request_id: u64, request: SearchRequest) -> Result<(), WorkerError> {
        let tx = self.request_tx.as_ref().ok_or(WorkerError::Closed)?;
        tx.try_send((request_id, request)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                WorkerError::Protocol("a request is already queued".into())
            }
            mpsc::error::TrySendError::Closed(_) => WorkerError::Closed,
        })
    }

    /// Stop the worker. A second call does nothing.
    pub async fn release(&mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        self.request_tx = None;

        if tokio::time::timeout(RELEASE_GRACE, &mut task).await.is_err() {
            tracing::warn!(side = %self.side, "Worker did not stop in time, aborting");
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{format_uci_move, parse_uci_move, START_FEN};
    use engine::mock::{ScriptStep, ScriptedLauncher};

    fn request(moves: &[&str]) -> SearchRequest {
        SearchRequest {
            start_fen: START_FEN.to_string(),
            moves: moves.iter().map(|m| parse_uci_move(m).unwrap()).collect(),
            time_budget: Duration::from_millis(100),
            skill_level: 20,
        }
    }

    #[tokio::test]
    async fn test_session_reports_start_and_replies() {
        let launcher = ScriptedLauncher::new().with_script(Side::Black, [ScriptStep::play("e7e5")]);
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = WorkerSession::start(Side::Black, Arc::new(launcher.clone()), tx);

        assert!(matches!(
            rx.recv().await,
            Some(WorkerMessage::Started { side: Side::Black })
        ));

        session.request(7, request(&["e2e4"])).unwrap();
        match rx.recv().await {
            Some(WorkerMessage::Reply {
                side,
                request_id,
                result,
            }) => {
                assert_eq!(side, Side::Black);
                assert_eq!(request_id, 7);
                assert_eq!(format_uci_move(result.unwrap()), "e7e5");
            }
            other => panic!("unexpected message {:?}", other),
        }

        session.release().await;
        session.release().await;
        assert_eq!(launcher.shutdowns(Side::Black), 1);
        assert!(matches!(
            session.request(8, request(&[])),
            Err(WorkerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_failed_launch_reports_unavailable() {
        let launcher = ScriptedLauncher::new().with_unavailable(Side::White, "no engine");
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = WorkerSession::start(Side::White, Arc::new(launcher), tx);

        assert!(matches!(
            rx.recv().await,
            Some(WorkerMessage::Unavailable {
                side: Side::White,
                ..
            })
        ));
        session.release().await;
    }
}
