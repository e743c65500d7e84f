//! Simulated peer sessions and a scripted session source

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::dispatch::OperationHandler;
use crate::session::{PeerSession, SessionSource};
use crate::types::{CapabilitySet, SessionId};

/// A peer session with a fixed handler set and adjustable capabilities.
///
/// Clones share identity and capability state.
#[derive(Clone)]
pub struct StaticPeerSession {
    id: SessionId,
    capabilities: Arc<RwLock<CapabilitySet>>,
    handlers: Vec<Arc<dyn OperationHandler>>,
}

impl StaticPeerSession {
    pub fn new<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: SessionId::new(),
            capabilities: Arc::new(RwLock::new(capabilities.into_iter().collect())),
            handlers: Vec::new(),
        }
    }

    pub fn with_handler<H: OperationHandler + 'static>(mut self, handler: Arc<H>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Start advertising another capability, as a peer does once a schema loads
    pub fn advertise(&self, capability: impl Into<String>) {
        self.capabilities.write().insert(capability);
    }
}

impl PeerSession for StaticPeerSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.read().clone()
    }

    fn handlers(&self) -> Vec<Arc<dyn OperationHandler>> {
        self.handlers.clone()
    }
}

/// Yields the scripted sessions in order, then keeps yielding the last one
pub struct ScriptedSessionSource {
    sessions: Vec<Arc<dyn PeerSession>>,
    calls: Mutex<usize>,
}

impl ScriptedSessionSource {
    pub fn new(sessions: Vec<StaticPeerSession>) -> Self {
        Self::from_sessions(
            sessions
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn PeerSession>)
                .collect(),
        )
    }

    /// # Panics
    ///
    /// Panics if `sessions` is empty; a source must always have a session to hand out.
    pub fn from_sessions(sessions: Vec<Arc<dyn PeerSession>>) -> Self {
        assert!(!sessions.is_empty(), "scripted session source needs at least one session");
        Self {
            sessions,
            calls: Mutex::new(0),
        }
    }

    /// Number of times a session has been requested
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl SessionSource for ScriptedSessionSource {
    async fn current(&self) -> Arc<dyn PeerSession> {
        let mut calls = self.calls.lock();
        let index = (*calls).min(self.sessions.len() - 1);
        *calls += 1;
        Arc::clone(&self.sessions[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source_repeats_last() {
        let first = StaticPeerSession::new(["a"]);
        let second = StaticPeerSession::new(["b"]);
        let (first_id, second_id) = (first.id(), second.id());
        let source = ScriptedSessionSource::new(vec![first, second]);

        assert_eq!(source.current().await.id(), first_id);
        assert_eq!(source.current().await.id(), second_id);
        assert_eq!(source.current().await.id(), second_id);
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn test_advertise_is_visible_to_clones() {
        let session = StaticPeerSession::new(Vec::<String>::new());
        let clone = session.clone();

        session.advertise("cap1");

        assert!(clone.capabilities().contains("cap1"));
        assert_eq!(clone.id(), session.id());
    }
}
