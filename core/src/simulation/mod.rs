//! In-memory peer for exercising the push engine
//!
//! Stand-ins for the collaborators the engine talks to in production: a peer
//! session with mutable capabilities, a session source that replays a scripted
//! sequence of sessions, canned operation handlers, and a reporter that
//! remembers what it was told.
//!
//! # Example
//!
//! ```no_run
//! use confpush_core::simulation::*;
//! use confpush_core::{ConfigPusher, PushConfig, PushWorker};
//! use std::sync::Arc;
//!
//! # async fn demo() -> confpush_core::Result<()> {
//! let session = StaticPeerSession::new(["cap1"]).with_handler(FixedReplyHandler::ok());
//! let reporter = Arc::new(RecordingReporter::new());
//! let pusher = ConfigPusher::new(
//!     PushConfig::default(),
//!     Arc::new(ScriptedSessionSource::new(vec![session])),
//!     reporter.clone(),
//! )?;
//! let (handle, mut events) = PushWorker::spawn(pusher);
//! // handle.push_configs(...)
//! # Ok(())
//! # }
//! ```

mod handlers;
mod reporter;
mod session;

pub use handlers::{ok_reply, ConflictingHandler, FailingHandler, FixedReplyHandler};
pub use reporter::{RecordedReport, RecordingReporter};
pub use session::{ScriptedSessionSource, StaticPeerSession};
