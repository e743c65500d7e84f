//! Dedicated push worker
//!
//! Owns a [`ConfigPusher`] on its own task and pushes snapshots strictly in
//! the order they were queued. The first fatal outcome is reported once and
//! leaves the worker inert: snapshots still queued are skipped and later
//! batches are dropped until the worker is shut down.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pusher::{ConfigPusher, PushOutcome, PushStats};
use crate::shutdown::{self, ShutdownSignal, ShutdownTrigger};
use crate::types::ConfigSnapshot;
use crate::{Error, Result};

/// Commands sent to the worker task
#[derive(Debug)]
enum WorkerCommand {
    Push(Vec<ConfigSnapshot>),
}

/// Progress reported by the worker
#[derive(Debug)]
pub enum PushEvent {
    /// A snapshot reached a terminal outcome
    Completed {
        position: u64,
        outcome: PushOutcome,
        stats: PushStats,
    },

    /// The worker stopped pushing after a fatal outcome
    Halted {
        /// Snapshot whose failure halted the worker
        position: u64,
        /// Positions queued behind it that were never attempted
        skipped: Vec<u64>,
    },
}

/// Control handle for a running push worker
pub struct PushHandle {
    command_tx: mpsc::UnboundedSender<WorkerCommand>,
    shutdown: ShutdownTrigger,
    task: JoinHandle<()>,
}

impl PushHandle {
    /// Queue snapshots behind anything already pending
    pub fn push_configs(&self, snapshots: Vec<ConfigSnapshot>) -> Result<()> {
        self.command_tx
            .send(WorkerCommand::Push(snapshots))
            .map_err(|_| Error::WorkerStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// An in-flight push is abandoned with [`PushOutcome::Cancelled`] and is
    /// not reported as a failure.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.trigger();
        self.task
            .await
            .map_err(|e| Error::Other(anyhow::Error::new(e).context("push worker task failed")))
    }
}

/// Internal worker that owns the pusher
struct PushWorkerTask {
    pusher: ConfigPusher,
    command_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    event_tx: mpsc::UnboundedSender<PushEvent>,
    shutdown: ShutdownSignal,
    halted: bool,
}

pub struct PushWorker;

impl PushWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(pusher: ConfigPusher) -> (PushHandle, mpsc::UnboundedReceiver<PushEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (trigger, signal) = shutdown::channel();

        let worker = PushWorkerTask {
            pusher,
            command_rx,
            event_tx,
            shutdown: signal,
            halted: false,
        };

        let task = tokio::spawn(worker.run());

        (
            PushHandle {
                command_tx,
                shutdown: trigger,
                task,
            },
            event_rx,
        )
    }
}

impl PushWorkerTask {
    async fn run(mut self) {
        tracing::debug!("Push worker started");

        loop {
            let command = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.command_rx.recv() => command,
            };

            match command {
                Some(WorkerCommand::Push(batch)) => self.process(batch).await,
                None => break,
            }
        }

        tracing::debug!(halted = self.halted, "Push worker stopped");
    }

    async fn process(&mut self, batch: Vec<ConfigSnapshot>) {
        if self.halted {
            tracing::warn!(
                snapshots = batch.len(),
                "Dropping config snapshots, worker halted after a fatal push failure"
            );
            return;
        }

        let mut pending = batch.into_iter();
        while let Some(snapshot) = pending.next() {
            if self.shutdown.is_shutdown() {
                return;
            }

            let (outcome, stats) = self.pusher.push(&snapshot, &mut self.shutdown).await;

            if let PushOutcome::Failed(err) = &outcome {
                self.pusher.report(err);
            }
            let fatal = outcome.is_fatal();
            let cancelled = matches!(outcome, PushOutcome::Cancelled);

            let _ = self.event_tx.send(PushEvent::Completed {
                position: snapshot.position,
                outcome,
                stats,
            });

            if fatal {
                self.halted = true;
                let skipped: Vec<u64> = pending.map(|s| s.position).collect();
                tracing::warn!(
                    position = snapshot.position,
                    skipped = skipped.len(),
                    "Halting config push"
                );
                let _ = self.event_tx.send(PushEvent::Halted {
                    position: snapshot.position,
                    skipped,
                });
                return;
            }

            if cancelled {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushConfig;
    use crate::simulation::{FixedReplyHandler, RecordingReporter, ScriptedSessionSource, StaticPeerSession};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_worker(session: StaticPeerSession) -> (PushHandle, mpsc::UnboundedReceiver<PushEvent>, Arc<RecordingReporter>) {
        let config = PushConfig::new(Duration::from_millis(500), Duration::from_millis(500))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        let reporter = Arc::new(RecordingReporter::new());
        let pusher = ConfigPusher::new(
            config,
            Arc::new(ScriptedSessionSource::new(vec![session])),
            reporter.clone(),
        )
        .unwrap();
        let (handle, events) = PushWorker::spawn(pusher);
        (handle, events, reporter)
    }

    fn snapshot(position: u64, required: &[&str]) -> ConfigSnapshot {
        ConfigSnapshot::new(position, json!({ "position": position }), required.iter().copied().collect())
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_pushed_in_order() {
        let handler = FixedReplyHandler::ok();
        let session = StaticPeerSession::new(["cap1"]).with_handler(handler.clone());
        let (handle, mut events, reporter) = spawn_worker(session);

        handle
            .push_configs(vec![snapshot(1, &["cap1"]), snapshot(2, &[]), snapshot(3, &["cap1"])])
            .unwrap();

        for expected in 1..=3 {
            match events.recv().await.unwrap() {
                PushEvent::Completed { position, outcome, .. } => {
                    assert_eq!(position, expected);
                    assert!(outcome.is_success());
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(handler.calls(), 3);
        assert_eq!(reporter.count(), 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_outcome_halts_and_skips_rest() {
        let handler = FixedReplyHandler::ok();
        let session = StaticPeerSession::new(["cap1"]).with_handler(handler.clone());
        let (handle, mut events, reporter) = spawn_worker(session);

        handle
            .push_configs(vec![snapshot(1, &["cap1"]), snapshot(2, &["missing"]), snapshot(3, &["cap1"])])
            .unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            PushEvent::Completed { position: 1, ref outcome, .. } if outcome.is_success()
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            PushEvent::Completed { position: 2, ref outcome, .. } if outcome.is_fatal()
        ));
        match events.recv().await.unwrap() {
            PushEvent::Halted { position, skipped } => {
                assert_eq!(position, 2);
                assert_eq!(skipped, vec![3]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(reporter.messages(), vec!["Required yang models that are missing: [missing]".to_string()]);

        // Later batches are dropped while the worker stays alive
        handle.push_configs(vec![snapshot(4, &["cap1"])]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(events.try_recv().is_err());
        assert!(handle.is_running());
        assert_eq!(handler.calls(), 1);

        handle.shutdown().await.unwrap();
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_without_reporting() {
        let session = StaticPeerSession::new(Vec::<&str>::new()).with_handler(FixedReplyHandler::ok());
        let (handle, mut events, reporter) = spawn_worker(session);

        handle.push_configs(vec![snapshot(1, &["cap1"]), snapshot(2, &["cap1"])]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await.unwrap();

        match events.recv().await.unwrap() {
            PushEvent::Completed { position, outcome, .. } => {
                assert_eq!(position, 1);
                assert!(matches!(outcome, PushOutcome::Cancelled));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        // Worker is gone, so the channel closes without further events
        assert!(events.recv().await.is_none());
        assert_eq!(reporter.count(), 0);
    }

    #[tokio::test]
    async fn test_push_after_shutdown_fails() {
        let (handle, _events, _reporter) = spawn_worker(StaticPeerSession::new(["cap1"]));
        let command_tx = handle.command_tx.clone();
        handle.shutdown().await.unwrap();

        assert!(command_tx.send(WorkerCommand::Push(vec![])).is_err());
    }
}
