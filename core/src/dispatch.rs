//! Operation dispatch
//!
//! Every handler registered on a session is asked whether it can apply a
//! document. The best candidate becomes the primary receiver; the remaining
//! candidates form a delegation chain it may hand sub-documents to.
//!
//! Candidates are ordered by:
//! 1. priority, highest first
//! 2. handler name, ascending
//! 3. registration index, ascending
//!
//! so the same handler set always yields the same primary and chain.

use async_trait::async_trait;
use std::sync::Arc;

use crate::session::PeerSession;
use crate::types::{Document, HandlingPriority};

/// Failure reported by an operation handler
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// A concurrent writer changed authoritative state first
    #[error("Conflicting version: {0}")]
    ConflictingVersion(String),

    #[error("Operation rejected: {0}")]
    Rejected(String),

    #[error("No handler left in the execution chain")]
    ChainExhausted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OperationError {
    /// True for conflicts, including a conflict wrapped somewhere in an `Other` cause chain
    pub fn is_conflicting_version(&self) -> bool {
        match self {
            OperationError::ConflictingVersion(_) => true,
            OperationError::Other(err) => err.chain().any(|cause| {
                matches!(
                    cause.downcast_ref::<OperationError>(),
                    Some(OperationError::ConflictingVersion(_))
                )
            }),
            _ => false,
        }
    }
}

/// Failure of a single dispatch
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No operation handler can apply the document")]
    Unsupported { document: Document },

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// A unit of logic able to apply a configuration document
#[async_trait]
pub trait OperationHandler: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the document is not for this handler
    fn can_handle(&self, document: &Document) -> Option<HandlingPriority>;

    /// Apply the document, optionally delegating part of it down `chain`
    async fn apply(&self, document: &Document, chain: HandlerChain<'_>) -> Result<Document, OperationError>;
}

/// The ordered handlers after the one currently executing
#[derive(Clone, Copy)]
pub struct HandlerChain<'a> {
    handlers: &'a [Arc<dyn OperationHandler>],
}

impl<'a> HandlerChain<'a> {
    pub fn new(handlers: &'a [Arc<dyn OperationHandler>]) -> Self {
        Self { handlers }
    }

    /// An empty chain; executing it fails with [`OperationError::ChainExhausted`]
    pub fn terminal() -> Self {
        Self { handlers: &[] }
    }

    pub fn is_terminal(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn next_name(&self) -> Option<&'a str> {
        self.handlers.first().map(|h| h.name())
    }

    /// Hand `document` to the next handler, which receives the rest of the chain
    pub async fn execute(&self, document: &Document) -> Result<Document, OperationError> {
        match self.handlers.split_first() {
            Some((next, rest)) => next.apply(document, HandlerChain::new(rest)).await,
            None => Err(OperationError::ChainExhausted),
        }
    }
}

impl std::fmt::Debug for HandlerChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

/// Selects and invokes the handler best suited to a document
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationDispatcher;

impl OperationDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Handlers able to apply `document`, primary receiver first
    pub fn rank(
        &self,
        handlers: &[Arc<dyn OperationHandler>],
        document: &Document,
    ) -> Vec<Arc<dyn OperationHandler>> {
        let mut candidates: Vec<(HandlingPriority, usize, &Arc<dyn OperationHandler>)> = handlers
            .iter()
            .enumerate()
            .filter_map(|(index, handler)| {
                handler
                    .can_handle(document)
                    .map(|priority| (priority, index, handler))
            })
            .collect();

        candidates.sort_by(|(pa, ia, ha), (pb, ib, hb)| {
            pb.cmp(pa)
                .then_with(|| ha.name().cmp(hb.name()))
                .then_with(|| ia.cmp(ib))
        });

        candidates
            .into_iter()
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect()
    }

    /// Apply `document` through the best handler registered on `session`.
    ///
    /// Handler failures are returned unchanged.
    pub async fn dispatch(&self, session: &dyn PeerSession, document: &Document) -> Result<Document, DispatchError> {
        let handlers = session.handlers();
        let ranked = self.rank(&handlers, document);

        let Some((primary, rest)) = ranked.split_first() else {
            return Err(DispatchError::Unsupported {
                document: document.clone(),
            });
        };

        tracing::debug!(
            session = %session.id(),
            handler = primary.name(),
            chain_len = rest.len(),
            "Dispatching document"
        );

        let reply = primary.apply(document, HandlerChain::new(rest)).await?;
        Ok(reply)
    }
}
