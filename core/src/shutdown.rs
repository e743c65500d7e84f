//! Cooperative shutdown signal shared between the worker handle and the engine

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// Owning side of the shutdown flag
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Observing side of the shutdown flag.
///
/// A dropped trigger counts as shutdown: nobody is left to stop the worker.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

/// Create a linked trigger/signal pair
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx, _keepalive: None })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownSignal {
    /// A signal that never fires, for driving the engine outside a worker
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown has been requested
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep until `deadline`; returns `false` if shutdown interrupted the sleep
    pub async fn sleep_until(&mut self, deadline: Instant) -> bool {
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep_until(deadline) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_trigger() {
        let (_trigger, mut signal) = channel();
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(signal.sleep_until(deadline).await);
        assert!(!signal.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_interrupts_sleep() {
        let (trigger, mut signal) = channel();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
            // keep the sender alive past the trigger
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        assert!(!signal.sleep_until(start + Duration::from_secs(30)).await);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn test_dropped_trigger_counts_as_shutdown() {
        let (trigger, mut signal) = channel();
        drop(trigger);
        assert!(signal.is_shutdown());
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_fire() {
        let mut signal = ShutdownSignal::never();
        assert!(!signal.is_shutdown());
        assert!(signal.sleep_until(Instant::now() + Duration::from_millis(5)).await);
    }
}
