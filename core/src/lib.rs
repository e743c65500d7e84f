//! Confpush Core Library
//!
//! Reliably applies configuration snapshots to a remote management peer.
//! A snapshot is held back until the peer advertises the schemas it depends
//! on, dispatched to the best operation handler the peer session offers, and
//! retried against a fresh session whenever a concurrent writer wins the race.
//! Every snapshot ends in exactly one outcome; fatal outcomes are reported once.

pub mod config;
pub mod dispatch;
pub mod gate;
pub mod pusher;
pub mod session;
pub mod shutdown;
pub mod types;
pub mod version;
pub mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod simulation;

pub use config::PushConfig;
pub use dispatch::{DispatchError, HandlerChain, OperationDispatcher, OperationError, OperationHandler};
pub use gate::{CapabilityGate, GateOutcome};
pub use pusher::{ConfigPusher, FailureReporter, LoggingReporter, PushError, PushOutcome, PushStats};
pub use session::{PeerSession, SessionSource};
pub use types::*;
pub use version::version_string;
pub use worker::{PushEvent, PushHandle, PushWorker};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Push worker is not running")]
    WorkerStopped,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
