//! Canned operation handlers

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::dispatch::{HandlerChain, OperationError, OperationHandler};
use crate::types::{Document, HandlingPriority};

/// The peer's positive acknowledgement
pub fn ok_reply() -> Document {
    json!({ "rpc-reply": { "ok": null } })
}

/// Answers every document it accepts with the same reply
pub struct FixedReplyHandler {
    name: String,
    priority: Option<HandlingPriority>,
    reply: Document,
    calls: AtomicU32,
}

impl FixedReplyHandler {
    pub fn new(name: impl Into<String>, priority: Option<HandlingPriority>, reply: Document) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            priority,
            reply,
            calls: AtomicU32::new(0),
        })
    }

    /// Accepts everything at default priority and replies `ok`
    pub fn ok() -> Arc<Self> {
        Self::new("ok", Some(HandlingPriority::DEFAULT), ok_reply())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationHandler for FixedReplyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, _document: &Document) -> Option<HandlingPriority> {
        self.priority
    }

    async fn apply(&self, _document: &Document, _chain: HandlerChain<'_>) -> Result<Document, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Fails with a conflicting version for its first `conflicts` calls, then replies `ok`
pub struct ConflictingHandler {
    conflicts: Option<u32>,
    calls: AtomicU32,
}

impl ConflictingHandler {
    /// Conflicts on every call
    pub fn always() -> Arc<Self> {
        Arc::new(Self {
            conflicts: None,
            calls: AtomicU32::new(0),
        })
    }

    pub fn times(conflicts: u32) -> Arc<Self> {
        Arc::new(Self {
            conflicts: Some(conflicts),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationHandler for ConflictingHandler {
    fn name(&self) -> &str {
        "conflicting"
    }

    fn can_handle(&self, _document: &Document) -> Option<HandlingPriority> {
        Some(HandlingPriority::DEFAULT)
    }

    async fn apply(&self, _document: &Document, _chain: HandlerChain<'_>) -> Result<Document, OperationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.conflicts {
            Some(limit) if call > limit => Ok(ok_reply()),
            _ => Err(OperationError::ConflictingVersion(format!(
                "configuration changed concurrently (attempt {})",
                call
            ))),
        }
    }
}

/// Fails every call with a non-retryable error
pub struct FailingHandler {
    reason: String,
    calls: AtomicU32,
}

impl FailingHandler {
    pub fn rejecting(reason: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reason: reason.into(),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn can_handle(&self, _document: &Document) -> Option<HandlingPriority> {
        Some(HandlingPriority::DEFAULT)
    }

    async fn apply(&self, _document: &Document, _chain: HandlerChain<'_>) -> Result<Document, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OperationError::Rejected(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_conflicting_handler_recovers_after_limit() {
        let handler = ConflictingHandler::times(2);
        let doc = json!({});

        for _ in 0..2 {
            let err = handler.apply(&doc, HandlerChain::terminal()).await.unwrap_err();
            assert!(err.is_conflicting_version());
        }
        assert_eq!(handler.apply(&doc, HandlerChain::terminal()).await.unwrap(), ok_reply());
        assert_eq!(handler.calls(), 3);
    }
}
