//! Peer session seams
//!
//! A [`PeerSession`] is one live binding to the remote peer. It owns the
//! capability set and operation handlers for that binding; nothing about a
//! session is global. A [`SessionSource`] hands out whichever session is bound
//! right now, which may differ from one call to the next as the underlying
//! connection is renegotiated.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dispatch::OperationHandler;
use crate::types::{CapabilitySet, SessionId};

/// One live connection to the remote peer
pub trait PeerSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Point-in-time snapshot of the advertised capabilities
    fn capabilities(&self) -> CapabilitySet;

    /// Handlers currently registered for this session, in registration order
    fn handlers(&self) -> Vec<Arc<dyn OperationHandler>>;
}

/// Supplies the currently bound peer session
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Returns the presently bound session, waiting if none is bound yet
    async fn current(&self) -> Arc<dyn PeerSession>;
}
