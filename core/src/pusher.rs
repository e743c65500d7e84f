//! Config push engine
//!
//! Drives one snapshot through the retry protocol:
//!
//! ```text
//! AWAIT_CAPS -> DISPATCH -> DONE
//!                        -> RETRY_CONFLICT -> AWAIT_CAPS (fresh session)
//!                        -> FATAL
//! ```
//!
//! Two independent deadlines govern a push. The capability deadline is re-armed
//! every time capability waiting starts. The conflict deadline is set once, at
//! the first conflicting-version failure, and never extended.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::PushConfig;
use crate::dispatch::{DispatchError, OperationDispatcher, OperationError};
use crate::gate::{CapabilityGate, GateOutcome};
use crate::session::{PeerSession, SessionSource};
use crate::shutdown::ShutdownSignal;
use crate::types::{CapabilitySet, ConfigSnapshot, Document};
use crate::Result;

/// Fatal failure of a snapshot push
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Required yang models that are missing: {missing}")]
    CapabilitiesMissing { missing: CapabilitySet },

    #[error("Max wait for conflicting version stabilization timeout")]
    ConflictRetryExhausted {
        attempts: u32,
        #[source]
        last: OperationError,
    },

    #[error("No operation handler can apply the document")]
    Unsupported { document: Document },

    #[error(transparent)]
    OtherFailure(OperationError),
}

/// Terminal result for one snapshot
#[derive(Debug)]
pub enum PushOutcome {
    Success(Document),
    Failed(PushError),
    /// Abandoned because the worker is shutting down; never reported
    Cancelled,
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PushOutcome::Success(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PushOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&PushError> {
        match self {
            PushOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushStats {
    /// Dispatches performed
    pub attempts: u32,
    /// Dispatches that failed with a conflicting version
    pub conflicts: u32,
    pub elapsed: Duration,
}

/// Receives fatal push outcomes, at most once each
pub trait FailureReporter: Send + Sync {
    fn report(&self, message: &str, cause: &PushError);
}

/// Reporter that writes fatal outcomes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReporter;

impl FailureReporter for LoggingReporter {
    fn report(&self, message: &str, cause: &PushError) {
        let chain = std::iter::successors(
            std::error::Error::source(cause),
            |err| err.source(),
        )
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join(": ");

        tracing::error!(cause = %chain, "Config push failed: {}", message);
    }
}

/// Pushes snapshots to whichever peer session is current
pub struct ConfigPusher {
    config: PushConfig,
    sessions: Arc<dyn SessionSource>,
    reporter: Arc<dyn FailureReporter>,
    gate: CapabilityGate,
    dispatcher: OperationDispatcher,
}

impl ConfigPusher {
    pub fn new(
        config: PushConfig,
        sessions: Arc<dyn SessionSource>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gate: CapabilityGate::new(config.capability_poll_interval()),
            dispatcher: OperationDispatcher::new(),
            config,
            sessions,
            reporter,
        })
    }

    /// Hand a fatal outcome to the reporter
    pub fn report(&self, err: &PushError) {
        self.reporter.report(&err.to_string(), err);
    }

    /// Push one snapshot to completion, failure or cancellation
    pub async fn push(&self, snapshot: &ConfigSnapshot, shutdown: &mut ShutdownSignal) -> (PushOutcome, PushStats) {
        let started = Instant::now();
        let required = snapshot.required_capabilities();
        let mut stats = PushStats::default();
        let mut conflict_deadline: Option<Instant> = None;

        tracing::info!(
            position = snapshot.position,
            required = %required,
            "Pushing config snapshot"
        );

        let outcome = loop {
            if shutdown.is_shutdown() {
                break PushOutcome::Cancelled;
            }

            let Some(session) = self.acquire_session(shutdown).await else {
                break PushOutcome::Cancelled;
            };

            let caps_deadline = Instant::now() + self.config.max_wait_for_capabilities();
            match self
                .gate
                .await_required(session.as_ref(), required, caps_deadline, shutdown)
                .await
            {
                GateOutcome::Ready => {}
                GateOutcome::TimedOut { missing } => {
                    break PushOutcome::Failed(PushError::CapabilitiesMissing { missing });
                }
                GateOutcome::Cancelled => break PushOutcome::Cancelled,
            }

            stats.attempts += 1;
            match self.apply(session.as_ref(), &snapshot.document).await {
                Ok(reply) => break PushOutcome::Success(reply),
                Err(DispatchError::Operation(err)) if err.is_conflicting_version() => {
                    stats.conflicts += 1;
                    let now = Instant::now();
                    let deadline = *conflict_deadline
                        .get_or_insert_with(|| now + self.config.conflicting_version_timeout());

                    if now >= deadline {
                        break PushOutcome::Failed(PushError::ConflictRetryExhausted {
                            attempts: stats.attempts,
                            last: err,
                        });
                    }

                    tracing::debug!(
                        position = snapshot.position,
                        session = %session.id(),
                        attempt = stats.attempts,
                        remaining_ms = (deadline - now).as_millis() as u64,
                        error = %err,
                        "Conflicting version, retrying with current session"
                    );

                    let delay = self.config.conflict_retry_delay();
                    if delay.is_zero() {
                        // Nothing else in this loop is guaranteed to suspend
                        tokio::task::yield_now().await;
                    } else if !shutdown.sleep_until((now + delay).min(deadline)).await {
                        break PushOutcome::Cancelled;
                    }
                }
                Err(DispatchError::Unsupported { document }) => {
                    break PushOutcome::Failed(PushError::Unsupported { document });
                }
                Err(DispatchError::Operation(err)) => {
                    break PushOutcome::Failed(PushError::OtherFailure(err));
                }
            }
        };

        stats.elapsed = started.elapsed();
        match &outcome {
            PushOutcome::Success(_) => tracing::info!(
                position = snapshot.position,
                attempts = stats.attempts,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "Config snapshot pushed"
            ),
            PushOutcome::Failed(err) => tracing::warn!(
                position = snapshot.position,
                attempts = stats.attempts,
                error = %err,
                "Config snapshot push failed"
            ),
            PushOutcome::Cancelled => tracing::info!(
                position = snapshot.position,
                "Config snapshot push abandoned on shutdown"
            ),
        }

        (outcome, stats)
    }

    async fn acquire_session(&self, shutdown: &mut ShutdownSignal) -> Option<Arc<dyn PeerSession>> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            session = self.sessions.current() => Some(session),
        }
    }

    /// Dispatch, turning a handler panic into an ordinary failure
    async fn apply(&self, session: &dyn PeerSession, document: &Document) -> std::result::Result<Document, DispatchError> {
        match AssertUnwindSafe(self.dispatcher.dispatch(session, document))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(DispatchError::Operation(OperationError::Other(anyhow::anyhow!(
                "operation handler panicked: {}",
                panic_message(panic.as_ref())
            )))),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
