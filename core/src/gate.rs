//! Capability gate
//!
//! Samples a session's advertised capabilities until the required set is
//! present, the deadline passes, or shutdown is requested. Sampling never
//! overshoots the deadline by more than one poll interval and always yields
//! to the runtime between samples.

use std::time::Duration;
use tokio::time::Instant;

use crate::session::PeerSession;
use crate::shutdown::ShutdownSignal;
use crate::types::CapabilitySet;

/// Result of waiting for capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Ready,
    /// Deadline elapsed; carries `required − available` at the last sample
    TimedOut { missing: CapabilitySet },
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct CapabilityGate {
    poll_interval: Duration,
}

impl CapabilityGate {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub async fn await_required(
        &self,
        session: &dyn PeerSession,
        required: &CapabilitySet,
        deadline: Instant,
        shutdown: &mut ShutdownSignal,
    ) -> GateOutcome {
        let mut samples: u64 = 0;

        loop {
            if shutdown.is_shutdown() {
                return GateOutcome::Cancelled;
            }

            let available = session.capabilities();
            samples += 1;
            let missing = required.missing_from(&available);
            if missing.is_empty() {
                tracing::debug!(session = %session.id(), samples, "Required capabilities present");
                return GateOutcome::Ready;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(
                    session = %session.id(),
                    samples,
                    missing = %missing,
                    "Capability wait timed out"
                );
                return GateOutcome::TimedOut { missing };
            }

            let wake = (now + self.poll_interval).min(deadline);
            if !shutdown.sleep_until(wake).await {
                return GateOutcome::Cancelled;
            }
        }
    }
}
